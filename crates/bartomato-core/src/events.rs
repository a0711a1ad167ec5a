use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::timer::{Command, TimerPhase};

/// Notifications published by the engine and its tick loop.
///
/// Payloads carry no timer state; subscribers re-query
/// [`crate::TimerEngine::status`] when one arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Periodic prompt to re-derive status. Only sent while not idle.
    TimerTick { at: DateTime<Utc> },
    /// A running pomodoro reached its allotted duration.
    PomodoroComplete { at: DateTime<Utc> },
    /// A break reached its allotted duration.
    BreakComplete { at: DateTime<Utc> },
    /// A command was accepted.
    PhaseChanged {
        command: Command,
        from: TimerPhase,
        to: TimerPhase,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimerTick { .. } => "timer-tick",
            Event::PomodoroComplete { .. } => "pomodoro-complete",
            Event::BreakComplete { .. } => "break-complete",
            Event::PhaseChanged { .. } => "phase-changed",
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerTick { at }
            | Event::PomodoroComplete { at }
            | Event::BreakComplete { at }
            | Event::PhaseChanged { at, .. } => *at,
        }
    }
}

/// Fan-out channel for [`Event`]s.
///
/// Publishing never blocks. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones and sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: Event) -> usize {
        // An error only means nobody is listening.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
