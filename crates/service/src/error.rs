//! Unified error type surfaced by the service API.
//!
//! Wraps failures from the durable store, the key-value backend, and the
//! scheduler worker so callers can bubble them up with consistent context.

use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::kv::KvError;
pub use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Another writer holds the save lock for this player. Retriable.
    #[error("save already in progress for this player")]
    Busy,

    /// No live archive exists for the requested player.
    #[error("archive not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("service requires an archive store before building")]
    MissingStore,

    #[error("reward scheduler command channel closed")]
    SchedulerChannelClosed,

    #[error("reward scheduler reply channel closed")]
    SchedulerReplyClosed(#[source] oneshot::error::RecvError),

    #[error("reward scheduler join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

impl ArchiveError {
    /// Whether the caller can expect a retry to succeed once the current
    /// holder releases the save lock.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ArchiveError::Busy)
    }
}
