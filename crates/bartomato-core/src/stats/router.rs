use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;
use tracing::warn;

use super::{CompletionRecord, StatsStore, TodayStats};
use crate::error::CollaboratorError;
use crate::storage::Database;
use crate::vault::VaultRecorder;

/// Writes every completion to the local database and mirrors it into the
/// vault when one is configured.
///
/// Today's totals always come from the database. A failing vault mirror is
/// logged and otherwise ignored.
pub struct StatsRouter {
    db: Database,
    vault: RwLock<Option<VaultRecorder>>,
}

impl StatsRouter {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            vault: RwLock::new(None),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn set_vault(&self, recorder: Option<VaultRecorder>) {
        *self.vault.write().unwrap_or_else(PoisonError::into_inner) = recorder;
    }

    pub fn has_vault(&self) -> bool {
        self.vault
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl StatsStore for StatsRouter {
    fn record_completion(&self, record: &CompletionRecord) -> Result<(), CollaboratorError> {
        self.db.record_completion(record)?;

        let vault = self.vault.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(recorder) = vault.as_ref() {
            if let Err(e) = recorder.record_completion(record) {
                warn!(record_id = %record.id, error = %e, "failed to mirror completion into vault");
            }
        }
        Ok(())
    }

    fn today_stats(&self, today: NaiveDate) -> Result<TodayStats, CollaboratorError> {
        self.db.today_stats(today)
    }
}
