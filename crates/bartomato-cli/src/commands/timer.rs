use std::time::Duration;

use bartomato_core::display::{formatted_time, progress};
use bartomato_core::timer::DEFAULT_TICK_PERIOD;
use bartomato_core::{spawn_ticker, App, RunLabels, TimerPhase, TimerStatus};
use clap::{Args, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{open_app, print_json, CliResult};

#[derive(Args)]
pub struct LabelArgs {
    /// Task being worked on
    #[arg(long)]
    task: Option<String>,
    /// Project display name
    #[arg(long)]
    project: Option<String>,
    /// Vault-relative project README path
    #[arg(long)]
    project_path: Option<String>,
}

impl From<LabelArgs> for RunLabels {
    fn from(args: LabelArgs) -> Self {
        RunLabels {
            task: args.task,
            project: args.project,
            project_path: args.project_path,
        }
    }
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Start a pomodoro
    StartPomodoro(LabelArgs),
    /// Start an open-ended stopwatch
    StartStopwatch(LabelArgs),
    /// Pause the running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Discard the current run
    Stop,
    /// Complete the running pomodoro and start its break
    Complete,
    /// End the break early
    SkipBreak,
    /// End the break at its natural end
    CompleteBreak,
    /// Print the menu-bar title
    TrayTitle,
    /// Stream events as JSON lines until interrupted
    Watch {
        /// Tick period in milliseconds
        #[arg(long, default_value_t = DEFAULT_TICK_PERIOD.as_millis() as u64)]
        interval_ms: u64,
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView {
    #[serde(flatten)]
    status: TimerStatus,
    formatted_time: String,
    progress: f64,
}

impl From<TimerStatus> for StatusView {
    fn from(status: TimerStatus) -> Self {
        Self {
            formatted_time: formatted_time(&status),
            progress: progress(&status),
            status,
        }
    }
}

pub fn run(action: TimerAction) -> CliResult {
    let app = open_app()?;

    let status = match action {
        TimerAction::Status => app.get_timer_status(),
        TimerAction::StartPomodoro(labels) => app.start_pomodoro(labels.into())?,
        TimerAction::StartStopwatch(labels) => app.start_stopwatch(labels.into())?,
        TimerAction::Pause => app.pause_timer()?,
        TimerAction::Resume => app.resume_timer()?,
        TimerAction::Stop => app.stop_timer()?,
        TimerAction::Complete => app.complete_pomodoro()?,
        TimerAction::SkipBreak => app.skip_break()?,
        TimerAction::CompleteBreak => app.complete_break()?,
        TimerAction::TrayTitle => {
            println!("{}", app.get_tray_title());
            return Ok(());
        }
        TimerAction::Watch { interval_ms, count } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(watch(&app, Duration::from_millis(interval_ms.max(1)), count))?;
            app.save_engine()?;
            app.flush_stats()?;
            return Ok(());
        }
    };

    print_json(&StatusView::from(status))?;
    app.save_engine()?;
    app.flush_stats()?;
    Ok(())
}

async fn watch(app: &App, period: Duration, count: Option<usize>) -> CliResult {
    if app.engine().phase() == TimerPhase::Idle {
        return Err("timer is idle; nothing to watch".into());
    }

    let mut rx = app.subscribe();
    let ticker = spawn_ticker(app.engine().clone(), period);
    let mut seen = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                let line = serde_json::json!({
                    "event": event,
                    "status": StatusView::from(app.get_timer_status()),
                });
                println!("{line}");
                seen += 1;
                if count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "watch fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
    ticker.abort();
    Ok(())
}
