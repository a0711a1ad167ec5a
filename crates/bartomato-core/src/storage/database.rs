//! SQLite-based session storage and today's totals.
//!
//! Provides persistent storage for:
//! - Completed pomodoros
//! - Today's statistics, by local calendar date
//! - Key-value store for application state (the persisted engine)

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::stats::{CompletionRecord, StatsStore, TodayStats};
use crate::timer::TimerMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub record_id: String,
    pub mode: String,
    pub task: Option<String>,
    pub project: Option<String>,
    pub project_path: Option<String>,
    pub duration_min: u32,
    pub pomodoro_index: u32,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

pub const DB_FILE: &str = "bartomato.db";

/// SQLite database for session storage.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database file at `path`, usually `data_dir()/bartomato.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CollaboratorError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CollaboratorError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id      TEXT NOT NULL UNIQUE,
                mode           TEXT NOT NULL,
                task           TEXT,
                project        TEXT,
                project_path   TEXT,
                duration_min   INTEGER NOT NULL,
                pomodoro_index INTEGER NOT NULL DEFAULT 0,
                date           TEXT NOT NULL,
                started_at     TEXT NOT NULL,
                completed_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
            CREATE INDEX IF NOT EXISTS idx_sessions_date_mode ON sessions(date, mode);",
        )?;
        Ok(())
    }

    /// Record a completed pomodoro. Re-recording the same record id is a no-op.
    pub fn record_session(&self, record: &CompletionRecord) -> Result<i64, rusqlite::Error> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO sessions
                (record_id, mode, task, project, project_path, duration_min,
                 pomodoro_index, date, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                mode_str(record.mode),
                record.task,
                record.project,
                record.project_path,
                record.duration_minutes,
                record.pomodoro_index,
                record.local_date().format("%Y-%m-%d").to_string(),
                record.started_at.to_rfc3339(),
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn stats_for_date(&self, date: NaiveDate) -> Result<TodayStats, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(SUM(duration_min), 0),
                    COALESCE(SUM(CASE WHEN mode = 'pomodoro' THEN 1 ELSE 0 END), 0)
             FROM sessions
             WHERE date = ?1",
        )?;
        let stats = stmt.query_row(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok(TodayStats {
                total_minutes: row.get(0)?,
                pomodoro_count: row.get(1)?,
            })
        })?;
        Ok(stats)
    }

    pub fn sessions_on(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, record_id, mode, task, project, project_path, duration_min,
                    pomodoro_index, date, started_at, completed_at
             FROM sessions
             WHERE date = ?1
             ORDER BY completed_at",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                record_id: row.get(1)?,
                mode: row.get(2)?,
                task: row.get(3)?,
                project: row.get(4)?,
                project_path: row.get(5)?,
                duration_min: row.get(6)?,
                pomodoro_index: row.get(7)?,
                date: parse_date(&row.get::<_, String>(8)?, 8)?,
                started_at: parse_timestamp(&row.get::<_, String>(9)?, 9)?,
                completed_at: parse_timestamp(&row.get::<_, String>(10)?, 10)?,
            })
        })?;
        let sessions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl StatsStore for Database {
    fn record_completion(&self, record: &CompletionRecord) -> Result<(), CollaboratorError> {
        self.record_session(record)?;
        Ok(())
    }

    fn today_stats(&self, today: NaiveDate) -> Result<TodayStats, CollaboratorError> {
        Ok(self.stats_for_date(today)?)
    }
}

fn mode_str(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Pomodoro => "pomodoro",
        TimerMode::Stopwatch => "stopwatch",
    }
}

fn parse_date(raw: &str, column: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(raw: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
