//! Completion accounting for "today".
//!
//! The engine only sees [`StatsAggregator`], a fire-and-forget sink. The
//! persistence side is [`StatsStore`]; [`StatsHandle`] bridges the two over a
//! channel so that a slow disk never stalls a timer command.

mod router;
mod worker;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::timer::TimerMode;

pub use router::StatsRouter;
pub use worker::StatsHandle;

/// One completed pomodoro or stopped stopwatch session, as reported by the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub id: String,
    pub mode: TimerMode,
    /// The configured pomodoro duration, or the whole minutes a stopwatch ran.
    pub duration_minutes: u32,
    /// Position of this pomodoro in the engine's count, starting at 1. Zero
    /// for stopwatch sessions.
    pub pomodoro_index: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub task: Option<String>,
    pub project: Option<String>,
    pub project_path: Option<String>,
}

impl CompletionRecord {
    /// Local calendar date the pomodoro was completed on.
    pub fn local_date(&self) -> NaiveDate {
        self.completed_at.with_timezone(&chrono::Local).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub total_minutes: u32,
    pub pomodoro_count: u32,
}

/// Engine-facing sink. Implementations must return promptly.
pub trait StatsAggregator: Send + Sync {
    fn record_completion(&self, record: CompletionRecord);
}

/// Durable storage behind the aggregator.
pub trait StatsStore: Send + Sync {
    fn record_completion(&self, record: &CompletionRecord) -> Result<(), CollaboratorError>;

    fn today_stats(&self, today: NaiveDate) -> Result<TodayStats, CollaboratorError>;
}

/// Today's local date.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
