//! Durable key-value backends for the store document.
//!
//! The store serializes its whole state into one JSON document and writes it
//! under a single key on every mutation. [`SqliteStorage`] keeps the documents in
//! a small SQLite table; [`MemoryStorage`] keeps them in process and can be told to
//! fail, which is how the retry path is exercised in tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::StoreError;

/// A durable key-value document store.
pub trait Persistence {
    /// Reads the document stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the document stored under `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// SQLite-backed document storage.
///
/// Wraps a `rusqlite::Connection`, which is `Send` but not `Sync`; a storage
/// instance can be moved to another thread but not shared.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    /// Opens an in-memory database, destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            -- documents: one JSON document per key
            -- updated_at: ISO 8601 with milliseconds (e.g., '2024-01-15T10:30:00.000Z')
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Last write time of a key, as stored.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>, StoreError> {
        let updated = self
            .conn
            .query_row(
                "SELECT updated_at FROM documents WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated)
    }
}

impl Persistence for SqliteStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM documents WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn.execute(
            "
            INSERT INTO documents (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
            params![key, value, updated_at],
        )?;
        Ok(())
    }
}

/// In-process document storage.
///
/// Clones share the same entries, so a test can keep a handle after moving one
/// into a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    failures_left: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Raw document stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores a raw document, bypassing failure injection.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl Persistence for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable(format!(
                "injected failure writing {key}"
            )));
        }
        self.insert(key, value);
        Ok(())
    }
}
