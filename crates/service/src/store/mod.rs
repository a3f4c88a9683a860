//! Durable archive store seam and its implementations.
//!
//! The store is the source of truth; the cache layer sits in front of it.
//! Implementations are injected into the repository rather than reached
//! through process-wide state, so tests and deployments can swap backends
//! freely.

use async_trait::async_trait;
use thiserror::Error;

use progress_core::{PlayerArchive, PlayerId, Shard};

mod file;
mod memory;

pub use file::FileArchiveStore;
pub use memory::MemoryArchiveStore;

/// Errors surfaced by archive store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("archive store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted record at {path}: {detail}")]
    CorruptedRecord { path: String, detail: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent storage for player archives.
///
/// Records are soft-deleted, never physically removed, so `fetch` and
/// `load` differ: version checks on the save path need to see tombstones,
/// while every read path must not.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Fetch the record for a key, soft-deleted included.
    async fn fetch(&self, player: PlayerId, shard: Shard) -> Result<Option<PlayerArchive>>;

    /// Fetch the live record for a key.
    async fn load(&self, player: PlayerId, shard: Shard) -> Result<Option<PlayerArchive>> {
        Ok(self
            .fetch(player, shard)
            .await?
            .filter(|archive| !archive.is_deleted()))
    }

    /// Upsert a whole record, all or nothing.
    async fn put(&self, archive: &PlayerArchive) -> Result<()>;

    /// All live records in a shard, in ascending player-id order.
    ///
    /// The order is part of the contract: ranking uses it as the stable
    /// tie-break, so two scans of an unchanged shard must agree.
    async fn scan_shard(&self, shard: Shard) -> Result<Vec<PlayerArchive>>;

    /// Distinct shards holding at least one live record, ascending.
    async fn shards(&self) -> Result<Vec<Shard>>;

    /// Mark the live record for a key as deleted.
    ///
    /// Returns `false` when there is no live record to mark.
    async fn soft_delete(&self, player: PlayerId, shard: Shard, now_ms: i64) -> Result<bool>;
}
