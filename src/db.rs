//! Database module for the VRA console
//!
//! Provides durable memory for the conversation and its insights.

mod schema;

pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored memory is corrupt ({key}): {source}")]
    Corrupt {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("Failed to encode memory: {0}")]
    Encode(serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Overwrite the stored snapshot.
    ///
    /// All keys are written in one transaction: either the new snapshot
    /// lands completely or the previous one is left untouched.
    pub fn save_snapshot(&self, messages: &[Message], insights: &[Insight]) -> DbResult<()> {
        let messages_json = serde_json::to_string(messages).map_err(DbError::Encode)?;
        let insights_json = serde_json::to_string(insights).map_err(DbError::Encode)?;
        let now = Utc::now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for (key, value) in [
            (KEY_MESSAGES, messages_json),
            (KEY_INSIGHTS, insights_json),
            (KEY_LAST_ACTIVE, now.timestamp_millis().to_string()),
        ] {
            tx.execute(
                "INSERT INTO memory (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read the stored snapshot.
    ///
    /// Returns `Ok(None)` when no messages were ever saved (or after a clear).
    /// A missing insights key reads as an empty list. Undecodable JSON is
    /// reported as [`DbError::Corrupt`]; this layer never repairs it.
    pub fn load_snapshot(&self) -> DbResult<Option<Snapshot>> {
        let Some(messages_raw) = self.get_raw(KEY_MESSAGES)? else {
            return Ok(None);
        };
        let insights_raw = self.get_raw(KEY_INSIGHTS)?;

        let messages: Vec<Message> =
            serde_json::from_str(&messages_raw).map_err(|source| DbError::Corrupt {
                key: KEY_MESSAGES,
                source,
            })?;
        let insights: Vec<Insight> = match insights_raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| DbError::Corrupt {
                key: KEY_INSIGHTS,
                source,
            })?,
            None => Vec::new(),
        };

        Ok(Some(Snapshot { messages, insights }))
    }

    /// Remove every memory key. Idempotent.
    pub fn clear(&self) -> DbResult<()> {
        let conn = self.conn();
        for key in ALL_KEYS {
            conn.execute("DELETE FROM memory WHERE key = ?1", params![key])?;
        }
        Ok(())
    }

    /// Last time a snapshot was written, in milliseconds since the epoch
    pub fn last_active(&self) -> DbResult<Option<i64>> {
        Ok(self
            .get_raw(KEY_LAST_ACTIVE)?
            .and_then(|raw| raw.parse().ok()))
    }

    fn get_raw(&self, key: &str) -> DbResult<Option<String>> {
        let conn = self.conn();
        let value = conn
            .query_row(
                "SELECT value FROM memory WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a raw value under a key, bypassing encoding (for testing)
    #[cfg(test)]
    pub fn put_raw(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO memory (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
