use clap::Subcommand;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.pomodoroDuration", "vault_path")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (empty clears `vault_path`)
        value: String,
    },
    /// List all config values
    List,
    /// Drop the timer override and fall back to the vault or defaults
    Reset,
    /// Print the active timer config as JSON
    Show,
}

pub fn run(action: ConfigAction) -> CliResult {
    let app = open_app()?;
    match action {
        ConfigAction::Get { key } => {
            println!("{}", app.config_get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            for (key, value) in app.config_list() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            let config = app.reset_config()?;
            print_json(&config)?;
        }
        ConfigAction::Show => {
            print_json(&app.get_config())?;
        }
    }
    Ok(())
}
