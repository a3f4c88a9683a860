//! Typed JSON cache over the key-value seam.
//!
//! Caching policy: writers update the cache after every durable write, and
//! readers fall back to the store on a miss, so a reader never sees a value
//! older than the latest completed save for that key. Entries for other keys
//! may be stale up to their TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use progress_core::{Metric, PlayerId, Shard};

use crate::error::{ArchiveError, Result};
use crate::kv::KvStore;

/// Cache key for a player's archive.
pub fn archive_key(shard: Shard, player: PlayerId) -> String {
    format!("archive:{shard}:{player}")
}

/// Cache key for a computed leaderboard.
///
/// Windowed metrics carry the queried day so a cached list can never serve
/// a different day's window.
pub fn leaderboard_key(metric: Metric, shard: Shard, day: Option<NaiveDate>) -> String {
    match day {
        Some(day) => format!("leaderboard:{metric}:{shard}:{}", day.format("%Y-%m-%d")),
        None => format!("leaderboard:{metric}:{shard}"),
    }
}

/// JSON value cache shared by the repository and the query engine.
#[derive(Clone)]
pub struct CacheLayer {
    kv: Arc<dyn KvStore>,
}

impl CacheLayer {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Fetch and decode a cached value.
    ///
    /// A value that no longer decodes as `T` is treated as a miss so the
    /// caller repopulates it from the durable store. Stale encodings only
    /// appear across deploys and heal themselves within one TTL.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(key, %error, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Encode and store a value under `key` for `ttl`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
        self.kv.set(key, &raw, ttl).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.kv.delete(key).await?;
        Ok(())
    }
}
