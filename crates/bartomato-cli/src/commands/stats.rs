use clap::Subcommand;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
}

pub fn run(action: StatsAction) -> CliResult {
    let app = open_app()?;

    match action {
        StatsAction::Today => {
            app.flush_stats()?;
            print_json(&app.get_today_stats()?)?;
        }
    }
    Ok(())
}
