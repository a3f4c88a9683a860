//! Distributed lock on top of the key-value seam.
//!
//! A lock is one key whose value is a random owner token and whose TTL
//! bounds how long a crashed holder can block others. Acquisition is a
//! single atomic set-if-absent; there is no lock server and no fencing
//! beyond the token check on release.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::warn;

use crate::error::{ArchiveError, Result};
use crate::kv::KvStore;

/// Delay between acquisition attempts while waiting for a held lock.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Acquires and releases keyed locks in the shared key-value store.
#[derive(Clone)]
pub struct LockManager {
    kv: Arc<dyn KvStore>,
}

impl LockManager {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Single acquisition attempt. Returns `None` when the lock is held.
    pub async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockGuard>> {
        let token = format!("{:032x}", rand::random::<u128>());
        if self.kv.set_if_absent(key, &token, ttl).await? {
            Ok(Some(LockGuard {
                kv: self.kv.clone(),
                key: key.to_owned(),
                token,
                released: false,
            }))
        } else {
            Ok(None)
        }
    }

    /// Acquire with a bounded wait, polling while the lock is held.
    ///
    /// At least one attempt is always made. Exhausting `wait` yields
    /// [`ArchiveError::Busy`].
    pub async fn acquire(&self, key: &str, ttl: Duration, wait: Duration) -> Result<LockGuard> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(guard) = self.try_acquire(key, ttl).await? {
                return Ok(guard);
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(ArchiveError::Busy);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Proof of lock ownership. Call [`release`](LockGuard::release) when done.
///
/// A guard dropped without release leaves the key to expire on its own,
/// which is the crash-recovery path; doing it on a live path just blocks
/// other writers for the rest of the TTL.
pub struct LockGuard {
    kv: Arc<dyn KvStore>,
    key: String,
    token: String,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock if this guard still owns it.
    ///
    /// The stored token is compared first so a guard that outlived its TTL
    /// cannot delete a lock someone else has since acquired.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match self.kv.get(&self.key).await? {
            Some(token) if token == self.token => {
                self.kv.delete(&self.key).await?;
            }
            Some(_) => {
                warn!(key = %self.key, "lock expired and was taken over before release");
            }
            None => {}
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(key = %self.key, "lock guard dropped without release, waiting out the TTL");
        }
    }
}
