use std::sync::Arc;

use tracing::info;

use crate::{config::Config, search::Engine, table::LoadState};

pub struct AppState {
    pub config: Config,
    pub engine: Engine,
}

impl AppState {
    /// Loads the source table once. A failed load still yields a usable
    /// state; the engine reports the failure instead of the process
    /// exiting.
    pub fn new() -> Arc<Self> {
        let config = Config::load();

        info!(
            "excel path: {}, templates dir: {}",
            config.excel_path.display(),
            config.templates_dir.display()
        );

        let engine = Engine::new(LoadState::load(&config.excel_path));

        Arc::new(Self { config, engine })
    }
}
