//! TOML-based application settings.
//!
//! Stores:
//! - The vault path, if one has been chosen
//! - An explicit timer config override
//!
//! Settings are stored at `~/.config/bartomato/config.toml`. Without an
//! explicit override the timer config comes from the vault plugin, and
//! without a vault it falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TimerConfig;
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.toml";

/// Persisted application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<String>,
    /// Explicit timer override; wins over the vault plugin's values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerConfig>,
}

impl AppConfig {
    /// Load from `path`, returning defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: AppConfig = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(timer) = &cfg.timer {
            timer.validate()?;
        }
        Ok(cfg)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }
}

/// The effective settings as seen through dot-path keys such as
/// `vault_path` and `timer.pomodoroDuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigView {
    pub vault_path: Option<String>,
    pub timer: TimerConfig,
}

impl ConfigView {
    /// Get a value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by key. The existing value's type decides how `value` is parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        Ok(())
    }

    /// Every leaf key with its value, in key order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            collect_leaves(&json, String::new(), &mut out);
        }
        out.sort();
        out
    }
}

fn collect_leaves(value: &serde_json::Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                collect_leaves(v, key, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix, s.clone())),
        other => out.push((prefix, other.to_string())),
    }
}

fn get_json_value_by_path<'a>(
    root: &'a serde_json::Value,
    key: &str,
) -> Option<&'a serde_json::Value> {
    if key.is_empty() {
        return None;
    }

    let mut current = root;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn set_json_value_by_path(
    root: &mut serde_json::Value,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    let unknown = || ConfigError::UnknownKey(key.to_string());

    let mut parts = key.split('.').peekable();
    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => {
                    serde_json::Value::Bool(value.parse::<bool>().map_err(|_| {
                        ConfigError::invalid(key, format!("cannot parse '{value}' as bool"))
                    })?)
                }
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| {
                        ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                    })?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                }
                serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        current = current.get_mut(part).ok_or_else(unknown)?;
    }

    Err(unknown())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ConfigView {
        ConfigView {
            vault_path: None,
            timer: TimerConfig::default(),
        }
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = AppConfig {
            vault_path: Some("/notes".into()),
            timer: Some(TimerConfig {
                pomodoro_duration: 50,
                ..TimerConfig::default()
            }),
        };
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(toml_str.contains("pomodoroDuration = 50"));
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let cfg = AppConfig {
            vault_path: Some("/notes".into()),
            timer: None,
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[timer]\npomodoroDuration = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_reports_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "vault_path = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let v = view();
        assert_eq!(v.get("timer.pomodoroDuration").as_deref(), Some("25"));
        assert_eq!(v.get("timer.autoStartBreak").as_deref(), Some("false"));
        assert_eq!(v.get("vault_path").as_deref(), Some("null"));
        assert!(v.get("timer.missing").is_none());
        assert!(v.get("").is_none());
    }

    #[test]
    fn set_updates_number_and_bool() {
        let mut v = view();
        v.set("timer.longBreakInterval", "2").unwrap();
        v.set("timer.pomodoroSound", "false").unwrap();
        assert_eq!(v.timer.long_break_interval, 2);
        assert!(!v.timer.pomodoro_sound);
    }

    #[test]
    fn set_fills_an_unset_vault_path() {
        let mut v = view();
        v.set("vault_path", "/notes").unwrap();
        assert_eq!(v.vault_path.as_deref(), Some("/notes"));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut v = view();
        assert!(matches!(
            v.set("timer.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(v.set("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut v = view();
        assert!(v.set("timer.autoStartBreak", "not_a_bool").is_err());
        assert!(v.set("timer.pomodoroDuration", "-3").is_err());
        assert_eq!(v, view());
    }

    #[test]
    fn entries_lists_every_leaf() {
        let keys: Vec<String> = view().entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "timer.autoStartBreak",
                "timer.longBreakDuration",
                "timer.longBreakInterval",
                "timer.pomodoroDuration",
                "timer.pomodoroSound",
                "timer.shortBreakDuration",
                "vault_path",
            ]
        );
    }
}
