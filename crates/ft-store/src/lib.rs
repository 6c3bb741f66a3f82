//! Storage layer for the focus timer.
//!
//! Holds activities, finalized sessions and the in-progress session in a single
//! JSON document, written through to a key-value [`Persistence`] backend on every
//! mutation.
//!
//! # Durability
//!
//! Memory is authoritative. When a write fails the change is kept in memory, the
//! failure is logged, and the write is retried with exponential backoff
//! ([`RetryPolicy`]) on later mutations or engine ticks. Any later successful
//! write clears the pending state because the whole document is rewritten.
//!
//! # Thread Safety
//!
//! [`SqliteStorage`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. A [`SessionStore`] is owned by one engine and mutated from one thread.

mod document;
mod persistence;
mod retry;
mod store;

use thiserror::Error;

pub use document::StoreDocument;
pub use persistence::{MemoryStorage, Persistence, SqliteStorage};
pub use retry::{PendingWrite, RetryPolicy};
pub use store::{STORE_KEY, SessionStore, activity_totals};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The stored document could not be encoded or decoded.
    #[error("invalid store document: {0}")]
    Document(#[from] serde_json::Error),
    /// The backend refused the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
