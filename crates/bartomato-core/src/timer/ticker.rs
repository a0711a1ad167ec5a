//! Periodic notification loop.
//!
//! The ticker only reads the engine. It prompts subscribers to re-query
//! status and announces when a duration-bound run reaches its end; which run
//! has already been announced is tracked here, never in the engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::engine::TimerEngine;
use super::state::TimerPhase;
use crate::events::Event;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct Ticker {
    engine: Arc<TimerEngine>,
    announced_run: Option<u64>,
}

impl Ticker {
    pub fn new(engine: Arc<TimerEngine>) -> Self {
        Self {
            engine,
            announced_run: None,
        }
    }

    /// Publish the events for one tick. Returns how many were published.
    pub fn tick(&mut self) -> usize {
        if self.engine.phase() == TimerPhase::Idle {
            return 0;
        }
        let at = self.engine.clock().now();
        let events = self.engine.events();
        events.publish(Event::TimerTick { at });
        let mut published = 1;

        if let Some(due) = self.engine.completion_due() {
            if self.announced_run != Some(due.run_id) {
                self.announced_run = Some(due.run_id);
                let event = if due.phase.is_break() {
                    Event::BreakComplete { at }
                } else {
                    Event::PomodoroComplete { at }
                };
                debug!(run_id = due.run_id, event = event.name(), "run reached its duration");
                events.publish(event);
                published += 1;
            }
        }
        published
    }

    /// Tick every `period` until the task is aborted.
    pub async fn run(mut self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick();
        }
    }
}

/// Spawn a [`Ticker`] for `engine` on the current tokio runtime.
pub fn spawn_ticker(engine: Arc<TimerEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(Ticker::new(engine).run(period))
}
