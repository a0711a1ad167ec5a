pub mod config;
pub mod stats;
pub mod timer;
pub mod vault;

use std::sync::Arc;

use bartomato_core::{App, SystemClock};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the app in the data directory (honours `BARTOMATO_DATA_DIR`).
pub fn open_app() -> Result<App, Box<dyn std::error::Error>> {
    Ok(App::open_default(Arc::new(SystemClock))?)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
