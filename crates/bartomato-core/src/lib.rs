//! # Bar Tomato Core Library
//!
//! This library provides the core logic for the Bar Tomato menu-bar
//! Pomodoro timer and stopwatch. Hosts (the `bartomato` CLI, a tray shell)
//! are thin layers over the same [`App`] command surface.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Elapsed time is
//!   always derived from timestamps, never accumulated by ticks
//! - **Events**: A broadcast channel plus a tick loop that announces when a
//!   run reaches its allotted duration
//! - **Stats**: Fire-and-forget completion recording into SQLite, mirrored
//!   into the vault when one is configured
//! - **Vault**: Project and task scanning, the per-device records file and
//!   daily-note bookkeeping for an Obsidian vault
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`App`]: Command surface wiring the engine to its collaborators
//! - [`Database`]: Session and statistics persistence
//! - [`ConfigStore`]: The active timer configuration

pub mod app;
pub mod clock;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod vault;

pub use app::App;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigStore, TimerConfig};
pub use error::{CollaboratorError, ConfigError, CoreError};
pub use events::{Event, EventBroadcaster};
pub use stats::{
    CompletionRecord, StatsAggregator, StatsHandle, StatsRouter, StatsStore, TodayStats,
};
pub use storage::{AppConfig, Database};
pub use timer::{
    spawn_ticker, EngineState, RunLabels, TimerEngine, TimerMode, TimerPhase, TimerStatus,
};
pub use vault::{Project, Vault, VaultTask};
