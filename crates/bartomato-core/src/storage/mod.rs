mod config;
pub mod database;

pub use config::{AppConfig, ConfigView, CONFIG_FILE};
pub use database::{Database, SessionRecord, DB_FILE};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `BARTOMATO_DATA_DIR` wins when set. Otherwise `~/.config/bartomato[-dev]/`
/// based on BARTOMATO_ENV; set BARTOMATO_ENV=dev to use the development
/// data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("BARTOMATO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BARTOMATO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("bartomato-dev")
            } else {
                base_dir.join("bartomato")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
