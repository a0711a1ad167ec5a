//! Timer engine implementation.
//!
//! The engine is a wall-clock-based state machine. It never counts down:
//! every elapsed, remaining and overtime value is derived from the run's
//! absolute start timestamp, its accumulated pause time and the injected
//! [`Clock`], so it stays correct across sleep, backgrounding and missed
//! ticks.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running (pomodoro) -> ShortBreak | LongBreak -> Idle
//! any non-Idle -> Idle (stop)
//! ```
//!
//! Commands are serialized behind a write lock; [`TimerEngine::status`] takes
//! a read lock and never mutates.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::break_policy::next_break;
use super::state::{
    BreakKind, Command, RunContext, RunLabels, Segment, TimerMode, TimerPhase, TimerStatus,
};
use crate::clock::Clock;
use crate::config::{ConfigStore, TimerConfig};
use crate::error::{CoreError, Result};
use crate::events::{Event, EventBroadcaster};
use crate::stats::{CompletionRecord, StatsAggregator};

/// Everything the engine owns. Serializable so a host process can persist
/// and restore a run; timestamps are absolute, so a restored run reports the
/// correct elapsed time no matter how long it sat on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    run: Option<RunContext>,
    /// Completed pomodoros. Only ever incremented.
    #[serde(default)]
    pomodoro_count: u32,
    /// Mode reported while idle.
    #[serde(default)]
    last_mode: TimerMode,
    #[serde(default)]
    next_run_id: u64,
}

/// A run whose duration-bound segment has reached its allotted time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionDue {
    pub run_id: u64,
    pub phase: TimerPhase,
}

impl EngineState {
    pub fn phase(&self) -> TimerPhase {
        self.run
            .as_ref()
            .map(RunContext::phase)
            .unwrap_or(TimerPhase::Idle)
    }

    pub fn pomodoro_count(&self) -> u32 {
        self.pomodoro_count
    }

    pub fn run(&self) -> Option<&RunContext> {
        self.run.as_ref()
    }

    pub fn status(&self, now: DateTime<Utc>) -> TimerStatus {
        match &self.run {
            None => TimerStatus {
                phase: TimerPhase::Idle,
                mode: self.last_mode,
                elapsed_secs: 0,
                remaining_secs: None,
                overtime_secs: 0,
                pomodoro_count: self.pomodoro_count,
                current_task: None,
                current_project: None,
                current_project_path: None,
            },
            Some(run) => TimerStatus {
                phase: run.phase(),
                mode: run.mode(),
                elapsed_secs: run.elapsed_secs(now),
                remaining_secs: run.remaining_secs(now),
                overtime_secs: run.overtime_secs(now),
                pomodoro_count: self.pomodoro_count,
                current_task: run.labels.task.clone(),
                current_project: run.labels.project.clone(),
                current_project_path: run.labels.project_path.clone(),
            },
        }
    }

    fn completion_due(&self, now: DateTime<Utc>) -> Option<CompletionDue> {
        let run = self.run.as_ref()?;
        let phase = run.phase();
        let bound = phase.is_break()
            || (phase == TimerPhase::Running && run.mode() == TimerMode::Pomodoro);
        let duration = run.duration_secs?;
        (bound && run.elapsed_secs(now) >= duration).then_some(CompletionDue {
            run_id: run.id,
            phase,
        })
    }

    fn allocate_run_id(&mut self) -> u64 {
        self.next_run_id = self.next_run_id.wrapping_add(1);
        self.next_run_id
    }

    fn start(
        &mut self,
        mode: TimerMode,
        labels: RunLabels,
        config: &TimerConfig,
        now: DateTime<Utc>,
    ) -> bool {
        if self.run.is_some() {
            return false;
        }
        let duration_secs = match mode {
            TimerMode::Pomodoro => Some(config.pomodoro_secs()),
            TimerMode::Stopwatch => None,
        };
        let id = self.allocate_run_id();
        self.run = Some(RunContext::new(
            id,
            Segment::Work { mode },
            duration_secs,
            labels,
            now,
        ));
        self.last_mode = mode;
        true
    }

    fn pause(&mut self, now: DateTime<Utc>) -> bool {
        match self.run.as_mut() {
            Some(run) if run.phase() == TimerPhase::Running => {
                run.pause(now);
                true
            }
            _ => false,
        }
    }

    fn resume(&mut self, now: DateTime<Utc>) -> bool {
        match self.run.as_mut() {
            Some(run) if run.phase() == TimerPhase::Paused => {
                run.resume(now);
                true
            }
            _ => false,
        }
    }

    /// Discard the run, returning it.
    fn stop(&mut self) -> Option<RunContext> {
        self.run.take()
    }

    /// Advance a running pomodoro into its break. Returns the record of the
    /// completed pomodoro, or `None` if the command is not legal.
    fn complete_pomodoro(
        &mut self,
        config: &TimerConfig,
        now: DateTime<Utc>,
    ) -> Option<CompletionRecord> {
        let legal = self.run.as_ref().is_some_and(|run| {
            run.phase() == TimerPhase::Running && run.mode() == TimerMode::Pomodoro
        });
        if !legal {
            return None;
        }

        self.pomodoro_count = self.pomodoro_count.saturating_add(1);
        let kind = next_break(self.pomodoro_count, config.long_break_interval);
        let break_secs = match kind {
            BreakKind::Short => config.short_break_secs(),
            BreakKind::Long => config.long_break_secs(),
        };
        let id = self.allocate_run_id();
        let finished = self.run.take()?;
        let record = CompletionRecord {
            id: Uuid::new_v4().to_string(),
            mode: TimerMode::Pomodoro,
            duration_minutes: finished
                .duration_secs
                .map(|secs| (secs / 60) as u32)
                .unwrap_or(config.pomodoro_duration),
            pomodoro_index: self.pomodoro_count,
            started_at: finished.started_at,
            completed_at: now,
            task: finished.labels.task.clone(),
            project: finished.labels.project.clone(),
            project_path: finished.labels.project_path.clone(),
        };
        self.run = Some(RunContext::new(
            id,
            Segment::Break { kind },
            Some(break_secs),
            finished.labels,
            now,
        ));
        Some(record)
    }

    fn finish_break(&mut self) -> bool {
        if self.phase().is_break() {
            self.run = None;
            true
        } else {
            false
        }
    }
}

/// Record for a stopped stopwatch run, if it lasted a whole minute.
fn stopwatch_session(run: &RunContext, now: DateTime<Utc>) -> Option<CompletionRecord> {
    if !matches!(
        run.segment,
        Segment::Work {
            mode: TimerMode::Stopwatch
        }
    ) {
        return None;
    }
    let minutes = u32::try_from(run.elapsed_secs(now) / 60).unwrap_or(u32::MAX);
    (minutes > 0).then(|| CompletionRecord {
        id: Uuid::new_v4().to_string(),
        mode: TimerMode::Stopwatch,
        duration_minutes: minutes,
        pomodoro_index: 0,
        started_at: run.started_at,
        completed_at: now,
        task: run.labels.task.clone(),
        project: run.labels.project.clone(),
        project_path: run.labels.project_path.clone(),
    })
}

/// Core timer engine.
///
/// One instance per process, shared behind an `Arc`. Collaborators are
/// injected so tests can drive the engine with a manual clock.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    config: Arc<ConfigStore>,
    stats: Arc<dyn StatsAggregator>,
    events: EventBroadcaster,
    state: RwLock<EngineState>,
}

impl TimerEngine {
    pub fn new(
        config: Arc<ConfigStore>,
        clock: Arc<dyn Clock>,
        stats: Arc<dyn StatsAggregator>,
    ) -> Self {
        Self {
            clock,
            config,
            stats,
            events: EventBroadcaster::default(),
            state: RwLock::new(EngineState::default()),
        }
    }

    /// Pick up where a previously persisted engine left off.
    pub fn with_state(self, state: EngineState) -> Self {
        *self.write_state() = state;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        let now = self.clock.now();
        self.read_state().status(now)
    }

    pub fn phase(&self) -> TimerPhase {
        self.read_state().phase()
    }

    pub fn pomodoro_count(&self) -> u32 {
        self.read_state().pomodoro_count
    }

    /// Reports the current run if its allotted time is used up and it has
    /// not been advanced yet. Paused runs and stopwatches never come due.
    pub fn completion_due(&self) -> Option<CompletionDue> {
        let now = self.clock.now();
        self.read_state().completion_due(now)
    }

    /// Copy of the internal state for persistence.
    pub fn snapshot(&self) -> EngineState {
        self.read_state().clone()
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_pomodoro(&self, labels: RunLabels) -> Result<TimerStatus> {
        let config = self.config.get();
        self.apply(Command::StartPomodoro, |state, now| {
            state.start(TimerMode::Pomodoro, labels, &config, now)
        })
    }

    pub fn start_stopwatch(&self, labels: RunLabels) -> Result<TimerStatus> {
        let config = self.config.get();
        self.apply(Command::StartStopwatch, |state, now| {
            state.start(TimerMode::Stopwatch, labels, &config, now)
        })
    }

    /// Running -> Paused. Breaks cannot be paused.
    pub fn pause(&self) -> Result<TimerStatus> {
        self.apply(Command::Pause, |state, now| state.pause(now))
    }

    pub fn resume(&self) -> Result<TimerStatus> {
        self.apply(Command::Resume, |state, now| state.resume(now))
    }

    /// Discard the run. Never counts as a completed pomodoro; a stopwatch
    /// that ran for at least a minute is recorded as a session.
    pub fn stop(&self) -> Result<TimerStatus> {
        let stats = Arc::clone(&self.stats);
        self.apply(Command::Stop, |state, now| match state.stop() {
            Some(run) => {
                if let Some(record) = stopwatch_session(&run, now) {
                    info!(
                        duration_minutes = record.duration_minutes,
                        "stopwatch session recorded"
                    );
                    stats.record_completion(record);
                }
                true
            }
            None => false,
        })
    }

    /// Accepted at any point of a running pomodoro, including before its
    /// duration is up.
    pub fn complete_pomodoro(&self) -> Result<TimerStatus> {
        let config = self.config.get();
        let stats = Arc::clone(&self.stats);
        self.apply(Command::CompletePomodoro, |state, now| {
            match state.complete_pomodoro(&config, now) {
                Some(record) => {
                    info!(
                        pomodoro_index = record.pomodoro_index,
                        duration_minutes = record.duration_minutes,
                        "pomodoro completed"
                    );
                    stats.record_completion(record);
                    true
                }
                None => false,
            }
        })
    }

    /// Break -> Idle, discarding what is left of the break.
    pub fn skip_break(&self) -> Result<TimerStatus> {
        self.apply(Command::SkipBreak, |state, _| state.finish_break())
    }

    /// Break -> Idle at the natural end of the break.
    pub fn complete_break(&self) -> Result<TimerStatus> {
        self.apply(Command::CompleteBreak, |state, _| state.finish_break())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run one command under the write lock. `transition` must leave the
    /// state untouched when it returns `false`.
    fn apply<F>(&self, command: Command, transition: F) -> Result<TimerStatus>
    where
        F: FnOnce(&mut EngineState, DateTime<Utc>) -> bool,
    {
        let mut state = self.write_state();
        let now = self.clock.now();
        let from = state.phase();

        if !transition(&mut state, now) {
            warn!(%command, phase = %from, "rejected timer command");
            return Err(CoreError::InvalidTransition {
                command,
                phase: from,
            });
        }

        let to = state.phase();
        debug!(%command, %from, %to, "timer transition");
        self.events.publish(Event::PhaseChanged {
            command,
            from,
            to,
            at: now,
        });
        Ok(state.status(now))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
