use clap::Subcommand;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum VaultAction {
    /// Use the vault at PATH and adopt its timer config
    Set {
        path: String,
    },
    /// Forget the configured vault
    Clear,
    /// Print the configured vault path
    Path,
    /// List projects
    Projects,
    /// List open tasks
    Tasks,
}

pub fn run(action: VaultAction) -> CliResult {
    let app = open_app()?;
    match action {
        VaultAction::Set { path } => {
            let config = app.set_vault_path(&path)?;
            print_json(&config)?;
        }
        VaultAction::Clear => {
            app.clear_vault_path()?;
            println!("ok");
        }
        VaultAction::Path => match app.get_vault_path() {
            Some(path) => println!("{path}"),
            None => return Err("vault not configured".into()),
        },
        VaultAction::Projects => print_json(&app.scan_projects()?)?,
        VaultAction::Tasks => print_json(&app.scan_tasks()?)?,
    }
    Ok(())
}
