use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Duration-bound and counted.
    #[default]
    Pomodoro,
    /// Open-ended, never counted.
    Stopwatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    ShortBreak,
    LongBreak,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::ShortBreak => "shortBreak",
            TimerPhase::LongBreak => "longBreak",
        }
    }

    pub fn is_break(self) -> bool {
        matches!(self, TimerPhase::ShortBreak | TimerPhase::LongBreak)
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    pub fn phase(self) -> TimerPhase {
        match self {
            BreakKind::Short => TimerPhase::ShortBreak,
            BreakKind::Long => TimerPhase::LongBreak,
        }
    }
}

/// What the current run is timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "segment", rename_all = "camelCase")]
pub enum Segment {
    Work { mode: TimerMode },
    Break { kind: BreakKind },
}

/// Every command the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    StartPomodoro,
    StartStopwatch,
    Pause,
    Resume,
    Stop,
    CompletePomodoro,
    SkipBreak,
    CompleteBreak,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::StartPomodoro => "startPomodoro",
            Command::StartStopwatch => "startStopwatch",
            Command::Pause => "pauseTimer",
            Command::Resume => "resumeTimer",
            Command::Stop => "stopTimer",
            Command::CompletePomodoro => "completePomodoro",
            Command::SkipBreak => "skipBreak",
            Command::CompleteBreak => "completeBreak",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional labels attached to a run when it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLabels {
    pub task: Option<String>,
    pub project: Option<String>,
    pub project_path: Option<String>,
}

/// Timestamps and labels of the run in progress. Exists only while the
/// timer is not idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub(crate) id: u64,
    pub(crate) segment: Segment,
    /// Allotted duration, captured when the run began. `None` for stopwatch.
    pub(crate) duration_secs: Option<u64>,
    #[serde(default)]
    pub(crate) labels: RunLabels,
    pub(crate) started_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) accumulated_pause_ms: u64,
    #[serde(default)]
    pub(crate) pause_started_at: Option<DateTime<Utc>>,
}

impl RunContext {
    pub(crate) fn new(
        id: u64,
        segment: Segment,
        duration_secs: Option<u64>,
        labels: RunLabels,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            segment,
            duration_secs,
            labels,
            started_at: now,
            accumulated_pause_ms: 0,
            pause_started_at: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn labels(&self) -> &RunLabels {
        &self.labels
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.duration_secs
    }

    pub fn phase(&self) -> TimerPhase {
        match self.segment {
            Segment::Work { .. } if self.pause_started_at.is_some() => TimerPhase::Paused,
            Segment::Work { .. } => TimerPhase::Running,
            Segment::Break { kind } => kind.phase(),
        }
    }

    /// Breaks always belong to a pomodoro cycle.
    pub fn mode(&self) -> TimerMode {
        match self.segment {
            Segment::Work { mode } => mode,
            Segment::Break { .. } => TimerMode::Pomodoro,
        }
    }

    /// `now - started_at - paused`, frozen at the pause instant while paused
    /// and never negative.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let until = self.pause_started_at.unwrap_or(now);
        let span = (until - self.started_at).num_milliseconds().max(0) as u64;
        span.saturating_sub(self.accumulated_pause_ms)
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.elapsed_ms(now) / 1000
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.duration_secs
            .map(|duration| duration.saturating_sub(self.elapsed_secs(now)))
    }

    pub fn overtime_secs(&self, now: DateTime<Utc>) -> u64 {
        self.duration_secs
            .map(|duration| self.elapsed_secs(now).saturating_sub(duration))
            .unwrap_or(0)
    }

    pub(crate) fn pause(&mut self, now: DateTime<Utc>) {
        self.pause_started_at = Some(now);
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.pause_started_at.take() {
            let paused_ms = (now - paused_at).num_milliseconds().max(0) as u64;
            self.accumulated_pause_ms = self.accumulated_pause_ms.saturating_add(paused_ms);
        }
    }
}

/// Snapshot of the timer derived on demand. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub mode: TimerMode,
    pub elapsed_secs: u64,
    pub remaining_secs: Option<u64>,
    pub overtime_secs: u64,
    pub pomodoro_count: u32,
    pub current_task: Option<String>,
    pub current_project: Option<String>,
    pub current_project_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pomodoro_run(now: DateTime<Utc>, secs: u64) -> RunContext {
        RunContext::new(
            1,
            Segment::Work {
                mode: TimerMode::Pomodoro,
            },
            Some(secs),
            RunLabels::default(),
            now,
        )
    }

    #[test]
    fn elapsed_freezes_while_paused() {
        let t0 = Utc::now();
        let mut run = pomodoro_run(t0, 1500);
        run.pause(t0 + Duration::seconds(100));
        assert_eq!(run.phase(), TimerPhase::Paused);
        assert_eq!(run.elapsed_secs(t0 + Duration::seconds(100)), 100);
        assert_eq!(run.elapsed_secs(t0 + Duration::seconds(4000)), 100);

        run.resume(t0 + Duration::seconds(4000));
        assert_eq!(run.phase(), TimerPhase::Running);
        assert_eq!(run.accumulated_pause_ms, 3_900_000);
        assert_eq!(run.elapsed_secs(t0 + Duration::seconds(4010)), 110);
    }

    #[test]
    fn elapsed_clamps_when_clock_goes_backwards() {
        let t0 = Utc::now();
        let run = pomodoro_run(t0, 1500);
        assert_eq!(run.elapsed_secs(t0 - Duration::seconds(30)), 0);
        assert_eq!(run.remaining_secs(t0 - Duration::seconds(30)), Some(1500));
    }

    #[test]
    fn overtime_starts_after_duration() {
        let t0 = Utc::now();
        let run = pomodoro_run(t0, 60);
        assert_eq!(run.remaining_secs(t0 + Duration::seconds(59)), Some(1));
        assert_eq!(run.overtime_secs(t0 + Duration::seconds(59)), 0);
        assert_eq!(run.remaining_secs(t0 + Duration::seconds(60)), Some(0));
        assert_eq!(run.overtime_secs(t0 + Duration::seconds(60)), 0);
        assert_eq!(run.overtime_secs(t0 + Duration::seconds(65)), 5);
    }

    #[test]
    fn break_segment_reports_pomodoro_mode() {
        let run = RunContext::new(
            2,
            Segment::Break {
                kind: BreakKind::Long,
            },
            Some(900),
            RunLabels::default(),
            Utc::now(),
        );
        assert_eq!(run.phase(), TimerPhase::LongBreak);
        assert_eq!(run.mode(), TimerMode::Pomodoro);
    }

    #[test]
    fn phase_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&TimerPhase::ShortBreak).unwrap(),
            "\"shortBreak\""
        );
        assert_eq!(TimerPhase::LongBreak.to_string(), "longBreak");
    }

    #[test]
    fn break_run_survives_json() {
        let run = RunContext::new(
            3,
            Segment::Break {
                kind: BreakKind::Short,
            },
            Some(300),
            RunLabels::default(),
            Utc::now(),
        );
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["segment"]["segment"], "break");
        assert_eq!(value["segment"]["kind"], "short");

        let back: RunContext = serde_json::from_value(value).unwrap();
        assert_eq!(back, run);
    }
}
