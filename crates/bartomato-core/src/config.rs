//! Timer configuration and the store that guards it.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Durations and flags for one timer session. All durations are minutes.
///
/// Replaced as a whole; a run captures the durations it needs when it starts,
/// so swapping the config mid-run never changes an allotted duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    #[serde(default = "default_pomodoro_duration")]
    pub pomodoro_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break")]
    pub long_break_duration: u32,
    /// Completed pomodoros between long breaks.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default)]
    pub auto_start_break: bool,
    #[serde(default = "default_true")]
    pub pomodoro_sound: bool,
}

fn default_pomodoro_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pomodoro_duration: default_pomodoro_duration(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            long_break_interval: default_long_break_interval(),
            auto_start_break: false,
            pomodoro_sound: true,
        }
    }
}

impl TimerConfig {
    /// Reject zero durations and a zero long-break interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pomodoroDuration", self.pomodoro_duration),
            ("shortBreakDuration", self.short_break_duration),
            ("longBreakDuration", self.long_break_duration),
            ("longBreakInterval", self.long_break_interval),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be a positive integer"));
            }
        }
        Ok(())
    }

    pub fn pomodoro_secs(&self) -> u64 {
        minutes_to_secs(self.pomodoro_duration)
    }

    pub fn short_break_secs(&self) -> u64 {
        minutes_to_secs(self.short_break_duration)
    }

    pub fn long_break_secs(&self) -> u64 {
        minutes_to_secs(self.long_break_duration)
    }
}

fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes).saturating_mul(60)
}

/// Holds the one active [`TimerConfig`].
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<TimerConfig>,
}

impl ConfigStore {
    /// Create a store seeded with `config`, validating it first.
    pub fn new(config: TimerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current: RwLock::new(config),
        })
    }

    pub fn get(&self) -> TimerConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the config. On error the previous config is untouched.
    pub fn set(&self, config: TimerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.pomodoro_duration, 25);
        assert_eq!(cfg.short_break_duration, 5);
        assert_eq!(cfg.long_break_duration, 15);
        assert_eq!(cfg.long_break_interval, 4);
        assert!(!cfg.auto_start_break);
        assert!(cfg.pomodoro_sound);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let cfg: TimerConfig =
            serde_json::from_str(r#"{"pomodoroDuration": 50, "autoStartBreak": true}"#).unwrap();
        assert_eq!(cfg.pomodoro_duration, 50);
        assert!(cfg.auto_start_break);
        assert_eq!(cfg.short_break_duration, 5);
        assert_eq!(cfg.long_break_interval, 4);
    }

    #[test]
    fn rejected_set_keeps_previous_config() {
        let store = ConfigStore::default();
        let bad = TimerConfig {
            long_break_interval: 0,
            ..TimerConfig::default()
        };
        let err = store.set(bad).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "longBreakInterval"
        ));
        assert_eq!(store.get(), TimerConfig::default());
    }

    #[test]
    fn accepted_set_replaces_whole_config() {
        let store = ConfigStore::default();
        let next = TimerConfig {
            pomodoro_duration: 50,
            short_break_duration: 10,
            long_break_duration: 30,
            long_break_interval: 2,
            auto_start_break: true,
            pomodoro_sound: false,
        };
        store.set(next.clone()).unwrap();
        assert_eq!(store.get(), next);
    }

    #[test]
    fn new_rejects_zero_duration() {
        let bad = TimerConfig {
            short_break_duration: 0,
            ..TimerConfig::default()
        };
        assert!(ConfigStore::new(bad).is_err());
    }

    #[test]
    fn duration_helpers_convert_minutes() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.pomodoro_secs(), 1500);
        assert_eq!(cfg.short_break_secs(), 300);
        assert_eq!(cfg.long_break_secs(), 900);
    }
}
