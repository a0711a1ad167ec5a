//! Read and write access to an Obsidian vault managed by the LifeOS plugin.
//!
//! A directory counts as a vault once `.obsidian/plugins/lifeos-pro` exists
//! inside it. Everything here is a collaborator of the timer: failures are
//! reported as [`CollaboratorError`] and never touch engine state.

mod daily_note;
mod projects;
mod records;
mod tasks;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TimerConfig;
use crate::error::CollaboratorError;

pub use daily_note::{
    check_pomodoro_habit, daily_note_path, update_project_section, update_project_time,
};
pub use records::{PomodoroRecord, RecordsFile, VaultRecorder};

pub const PLUGIN_ID: &str = "lifeos-pro";

pub(crate) const PROJECTS_DIR: &str = "1. 项目";
pub(crate) const PERIODIC_DIR: &str = "0. 周期笔记";
pub(crate) const AREAS_DIR: &str = "2. 领域";

/// A project folder under `1. 项目`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub display_name: String,
    /// Vault-relative, `/`-separated.
    pub path: String,
    /// Vault-relative README, or the folder itself when it has none.
    pub readme_path: String,
}

/// An open checkbox (`[ ]` or `[/]`) found in a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTask {
    pub text: String,
    pub file_path: String,
    /// 1-based.
    pub line_number: usize,
    /// `area/project` from a `#area/project` tag.
    pub project_tag: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Open the vault at `root`, failing unless the plugin directory exists.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CollaboratorError> {
        let root = root.into();
        if !Self::is_valid(&root) {
            return Err(CollaboratorError::InvalidVault {
                path: root,
                reason: format!("{PLUGIN_ID} plugin not found"),
            });
        }
        Ok(Self { root })
    }

    pub fn is_valid(root: &Path) -> bool {
        root.join(".obsidian").join("plugins").join(PLUGIN_ID).is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Last path component, `vault` when there is none.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string())
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.root.join(".obsidian").join("plugins").join(PLUGIN_ID)
    }

    /// Timer settings from the plugin's `data.json`.
    ///
    /// Missing or badly typed keys (or a missing file) fall back to
    /// defaults; unrelated plugin keys are ignored. Only unparseable JSON is
    /// an error.
    pub fn read_plugin_config(&self) -> Result<TimerConfig, CollaboratorError> {
        let path = self.plugin_dir().join("data.json");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TimerConfig::default())
            }
            Err(e) => return Err(CollaboratorError::vault_io(path, e)),
        };
        let json: serde_json::Value = serde_json::from_str(&content)
            .map_err(|source| CollaboratorError::Json { path, source })?;
        Ok(timer_config_from(&json))
    }

    /// `/`-separated path of `path` relative to the vault root.
    pub(crate) fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn timer_config_from(json: &serde_json::Value) -> TimerConfig {
    let defaults = TimerConfig::default();
    let minutes = |key: &str, default: u32| {
        json.get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    };
    let flag = |key: &str, default: bool| {
        json.get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(default)
    };
    TimerConfig {
        pomodoro_duration: minutes("pomodoroDuration", defaults.pomodoro_duration),
        short_break_duration: minutes("shortBreakDuration", defaults.short_break_duration),
        long_break_duration: minutes("longBreakDuration", defaults.long_break_duration),
        long_break_interval: minutes("longBreakInterval", defaults.long_break_interval),
        auto_start_break: flag("autoStartBreak", defaults.auto_start_break),
        pomodoro_sound: flag("pomodoroSound", defaults.pomodoro_sound),
    }
}

/// Write via a sibling `.tmp` file and a rename, creating parent directories.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CollaboratorError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::vault_io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes).map_err(|e| CollaboratorError::vault_io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| CollaboratorError::vault_io(path, e))
}
