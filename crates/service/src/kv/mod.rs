//! Key-value backend seam shared by the cache layer and the lock manager.
//!
//! Deployments point this at a shared key-value service so cache entries and
//! lock ownership are visible across processes. [`MemoryKv`] is the
//! in-process implementation used by tests and single-node runs.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod memory;

pub use memory::MemoryKv;

/// Errors surfaced by key-value backends.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store lock was poisoned")]
    LockPoisoned,

    #[error("key-value backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, KvError>;

/// String key-value store with per-entry expiry.
///
/// Expired entries behave as absent everywhere, including
/// [`set_if_absent`](KvStore::set_if_absent).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Store `value` only if the key is currently absent, atomically.
    ///
    /// Returns `true` when this call created the entry. This is the
    /// primitive both lock acquisition and reward idempotency build on.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;
}
