//! Read-only HTTP API over a food nutrition spreadsheet.
//!
//! The source table is read once at startup into an immutable in-memory
//! [`table::Table`]; every request is a pure read over it, so the whole
//! service shares one [`state::AppState`] with no locking.
//!
//!
//!
//! # Endpoints
//!
//! - `GET /get_food_info?food_name=…` — exact-match lookup, full record
//! - `GET /search_foods?query=…` — case-insensitive substring search over
//!   food names; an empty query returns a capped preview
//! - `GET /health` — readiness signal plus resolved source paths
//! - `GET /` — HTML page listing every food name
//!
//! A failed load does not kill the process: the server still starts and
//! reports the failure through `/health` and the unavailable branch of
//! each endpoint, so an orchestrator can observe it instead of watching a
//! restart loop.
//!
//!
//!
//! # Configuration
//!
//! Environment variables, all optional:
//!
//! - `RUST_PORT` — listen port, default `8000`
//! - `EXCEL_PATH` — source spreadsheet (`.xlsx`/`.xls`/`.ods`/`.csv`),
//!   default `food_info.xlsx`
//! - `TEMPLATES_DIR` — directory holding `index.html`, default
//!   `templates`
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod routes;
pub mod search;
pub mod state;
pub mod table;

use routes::{food_info_handler, health_handler, index_handler, search_handler};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new();

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/get_food_info", get(food_info_handler))
        .route("/search_foods", get(search_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
