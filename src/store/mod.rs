//! Storage seams for the participant directory and the message log.
//!
//! Every operation round-trips to the backing store; callers keep no copy
//! between calls. Two backends are provided: [`crate::db::Database`] (SQLite)
//! and [`MemoryStore`].

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Message, Participant};

pub use memory::MemoryStore;

/// Storage error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Participant already exists: {0}")]
    Conflict(String),
    #[error("Participant not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Name -> liveness mapping of everyone currently in the room.
///
/// Timestamps are milliseconds since the Unix epoch and are supplied by the
/// caller so that the sweeper and tests control the clock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Insert `name` with `lastStatus = now_ms`.
    ///
    /// Fails with [`StoreError::Conflict`] if the name is already present.
    /// The insert is atomic in the store, so concurrent joins of the same
    /// name cannot both succeed.
    async fn upsert_if_absent(&self, name: &str, now_ms: i64) -> Result<Participant, StoreError>;

    /// Refresh the liveness of `name` and return the new `lastStatus`.
    ///
    /// The stored value always strictly increases, even if `now_ms` is not
    /// newer than what is already stored.
    async fn heartbeat(&self, name: &str, now_ms: i64) -> Result<i64, StoreError>;

    /// Look up a single participant
    async fn find(&self, name: &str) -> Result<Option<Participant>, StoreError>;

    /// Snapshot of every participant, no ordering guarantee
    async fn list_all(&self) -> Result<Vec<Participant>, StoreError>;

    /// Every participant whose `lastStatus` is strictly less than `threshold`
    async fn find_expired(&self, threshold: i64) -> Result<Vec<Participant>, StoreError>;

    /// Remove every participant whose `lastStatus` is strictly less than
    /// `threshold`, returning how many were removed. Idempotent.
    async fn delete_expired(&self, threshold: i64) -> Result<u64, StoreError>;
}

/// Append-only log of chat and status messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Append a message. Only transport faults can fail this.
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Every message sent by `participant`, addressed to it, or broadcast,
    /// in store (insertion) order.
    async fn query(&self, participant: &str) -> Result<Vec<Message>, StoreError>;
}
