use std::{
    env,
    fmt::Display,
    path::{self, PathBuf},
    str::FromStr,
};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub excel_path: PathBuf,
    pub templates_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8000"),
            excel_path: absolute(try_load("EXCEL_PATH", "food_info.xlsx")),
            templates_dir: absolute(try_load("TEMPLATES_DIR", "templates")),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Both paths are logged and echoed by /health, so pin them to the
/// working directory at startup instead of reporting relative forms.
fn absolute(path: PathBuf) -> PathBuf {
    path::absolute(&path).unwrap_or(path)
}
