mod break_policy;
mod engine;
mod state;
mod ticker;

pub use break_policy::next_break;
pub use engine::{CompletionDue, EngineState, TimerEngine};
pub use state::{
    BreakKind, Command, RunContext, RunLabels, Segment, TimerMode, TimerPhase, TimerStatus,
};
pub use ticker::{spawn_ticker, Ticker, DEFAULT_TICK_PERIOD};
