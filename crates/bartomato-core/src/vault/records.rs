//! The plugin's per-device pomodoro records file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::daily_note::{check_pomodoro_habit, update_project_time};
use super::{write_atomic, Vault};
use crate::error::CollaboratorError;
use crate::stats::{CompletionRecord, StatsStore, TodayStats};
use crate::timer::TimerMode;

pub const RECORDS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroRecord {
    pub id: String,
    /// Local `YYYY-MM-DD`.
    pub date: String,
    /// Unix milliseconds.
    pub start_time: u64,
    pub end_time: u64,
    /// Minutes.
    pub duration: u32,
    pub mode: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_index: Option<u32>,
}

impl From<&CompletionRecord> for PomodoroRecord {
    fn from(record: &CompletionRecord) -> Self {
        let mode = match record.mode {
            TimerMode::Pomodoro => "pomodoro",
            TimerMode::Stopwatch => "stopwatch",
        };
        Self {
            id: record.id.clone(),
            date: record.local_date().format("%Y-%m-%d").to_string(),
            start_time: unix_millis(record.started_at),
            end_time: unix_millis(record.completed_at),
            duration: record.duration_minutes,
            mode: mode.to_string(),
            status: "completed".to_string(),
            project_path: record.project_path.clone(),
            task_text: record.task.clone(),
            pomodoro_index: (record.mode == TimerMode::Pomodoro)
                .then_some(record.pomodoro_index),
        }
    }
}

fn unix_millis(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsFile {
    pub version: u32,
    pub records: Vec<PomodoroRecord>,
}

impl Default for RecordsFile {
    fn default() -> Self {
        Self {
            version: RECORDS_VERSION,
            records: Vec::new(),
        }
    }
}

impl RecordsFile {
    /// Read `path`, or an empty file when it does not exist yet.
    pub fn read(path: &Path) -> Result<Self, CollaboratorError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(CollaboratorError::vault_io(path, e)),
        };
        serde_json::from_str(&content).map_err(|source| CollaboratorError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), CollaboratorError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|source| CollaboratorError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        write_atomic(path, content.as_bytes())
    }

    pub fn stats_for(&self, date: NaiveDate) -> TodayStats {
        let date = date.format("%Y-%m-%d").to_string();
        self.records
            .iter()
            .filter(|r| r.date == date)
            .fold(TodayStats::default(), |mut acc, r| {
                acc.total_minutes = acc.total_minutes.saturating_add(r.duration);
                if r.mode == "pomodoro" {
                    acc.pomodoro_count += 1;
                }
                acc
            })
    }
}

/// Mirrors completions into a vault for one device.
#[derive(Debug, Clone)]
pub struct VaultRecorder {
    vault: Vault,
    device_hash: String,
}

impl VaultRecorder {
    pub fn new(vault: Vault, device_hash: impl Into<String>) -> Self {
        Self {
            vault,
            device_hash: device_hash.into(),
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// `<plugin>/storage/pomodoro-records-{vault}.{device}.json`
    pub fn records_path(&self) -> PathBuf {
        self.vault.plugin_dir().join("storage").join(format!(
            "pomodoro-records-{}.{}.json",
            self.vault.name(),
            self.device_hash
        ))
    }

    pub fn read_records(&self) -> Result<RecordsFile, CollaboratorError> {
        RecordsFile::read(&self.records_path())
    }
}

impl StatsStore for VaultRecorder {
    /// Append the record, then update the daily note. Re-recording an id is a
    /// no-op; daily-note failures are logged and do not fail the record.
    fn record_completion(&self, record: &CompletionRecord) -> Result<(), CollaboratorError> {
        let path = self.records_path();
        let mut file = RecordsFile::read(&path)?;
        if file.records.iter().any(|r| r.id == record.id) {
            debug!(record_id = %record.id, "record already in vault");
            return Ok(());
        }
        file.records.push(PomodoroRecord::from(record));
        file.write(&path)?;

        let date = record.local_date();
        if let (Some(project_path), Some(project)) = (&record.project_path, &record.project) {
            if let Err(e) = update_project_time(
                &self.vault,
                date,
                project_path,
                project,
                record.duration_minutes,
            ) {
                warn!(error = %e, "failed to update project time in daily note");
            }
        }
        if let Err(e) = check_pomodoro_habit(&self.vault, date) {
            warn!(error = %e, "failed to tick pomodoro habit");
        }
        Ok(())
    }

    fn today_stats(&self, today: NaiveDate) -> Result<TodayStats, CollaboratorError> {
        Ok(self.read_records()?.stats_for(today))
    }
}
