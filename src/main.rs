#[tokio::main]
async fn main() {
    food_info::start_server().await;
}
