//! Versioned save/load over the store, cache, and lock layers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use progress_core::{ArchiveDocument, PlayerArchive, PlayerId, SaveOutcome, Shard};

use crate::cache::{CacheLayer, archive_key};
use crate::config::ServiceConfig;
use crate::error::{ArchiveError, Result};
use crate::lock::{LockGuard, LockManager};
use crate::store::ArchiveStore;

fn save_lock_key(shard: Shard, player: PlayerId) -> String {
    format!("lock:archive:{shard}:{player}")
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Save, load, and soft-delete player archives.
///
/// Saves are last-writer-wins, gated on the client-supplied version: only a
/// strictly newer version overwrites the stored record, and concurrent saves
/// for the same key serialize through a short-TTL distributed lock. Loads
/// are cache-first with store fallback.
#[derive(Clone)]
pub struct ArchiveRepository {
    store: Arc<dyn ArchiveStore>,
    cache: CacheLayer,
    locks: LockManager,
    archive_ttl: Duration,
    lock_ttl: Duration,
    lock_wait: Duration,
}

impl ArchiveRepository {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        cache: CacheLayer,
        locks: LockManager,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            store,
            cache,
            locks,
            archive_ttl: config.archive_cache_ttl,
            lock_ttl: config.save_lock_ttl,
            lock_wait: config.save_lock_wait,
        }
    }

    /// Persist `document` under `version` for a player.
    ///
    /// Returns [`SaveOutcome::Skipped`] when the stored version is equal or
    /// newer; that is a success, the caller's state was simply stale. Fails
    /// with [`ArchiveError::Busy`] when another writer holds the key's lock
    /// past the configured wait.
    pub async fn save(
        &self,
        player: PlayerId,
        shard: Shard,
        version: u64,
        document: ArchiveDocument,
    ) -> Result<SaveOutcome> {
        let guard = self
            .locks
            .acquire(&save_lock_key(shard, player), self.lock_ttl, self.lock_wait)
            .await?;
        let outcome = self.save_locked(player, shard, version, document).await;
        release_quietly(guard).await;
        outcome
    }

    async fn save_locked(
        &self,
        player: PlayerId,
        shard: Shard,
        version: u64,
        document: ArchiveDocument,
    ) -> Result<SaveOutcome> {
        // Versioning looks at soft-deleted records too; a tombstone's
        // version still orders writes for its key.
        let stored = self.store.fetch(player, shard).await?;

        let (archive, outcome) = match stored {
            None => (
                PlayerArchive::new(player, shard, version, document, now_ms()),
                SaveOutcome::Created,
            ),
            Some(mut archive) => {
                if version <= archive.version {
                    debug!(
                        %player, %shard,
                        incoming = version,
                        stored = archive.version,
                        "skipping stale save"
                    );
                    return Ok(SaveOutcome::Skipped);
                }
                archive.overwrite(version, document, now_ms());
                (archive, SaveOutcome::Updated)
            }
        };

        self.store.put(&archive).await?;
        self.cache
            .put_json(&archive_key(shard, player), &archive, self.archive_ttl)
            .await?;

        info!(%player, %shard, version, ?outcome, "archive saved");
        Ok(outcome)
    }

    /// Load the latest live archive for a player, cache-first.
    pub async fn load(&self, player: PlayerId, shard: Shard) -> Result<PlayerArchive> {
        let key = archive_key(shard, player);

        if let Some(archive) = self.cache.get_json::<PlayerArchive>(&key).await?
            && !archive.is_deleted()
        {
            debug!(%player, %shard, "archive cache hit");
            return Ok(archive);
        }

        let Some(archive) = self.store.load(player, shard).await? else {
            return Err(ArchiveError::NotFound);
        };

        self.cache.put_json(&key, &archive, self.archive_ttl).await?;
        Ok(archive)
    }

    /// Soft-delete a player's archive and drop its cache entry.
    ///
    /// Returns `false` when there was no live archive. The record itself is
    /// kept; a later save with a newer version revives it.
    pub async fn delete(&self, player: PlayerId, shard: Shard) -> Result<bool> {
        let guard = self
            .locks
            .acquire(&save_lock_key(shard, player), self.lock_ttl, self.lock_wait)
            .await?;
        let result = self.delete_locked(player, shard).await;
        release_quietly(guard).await;
        result
    }

    async fn delete_locked(&self, player: PlayerId, shard: Shard) -> Result<bool> {
        let deleted = self.store.soft_delete(player, shard, now_ms()).await?;
        if deleted {
            self.cache.delete(&archive_key(shard, player)).await?;
            info!(%player, %shard, "archive soft-deleted");
        }
        Ok(deleted)
    }
}

/// Release a guard, logging instead of overriding the caller's result.
async fn release_quietly(guard: LockGuard) {
    let key = guard.key().to_owned();
    if let Err(error) = guard.release().await {
        warn!(key, %error, "failed to release save lock, waiting out the TTL");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvStore, MemoryKv};
    use crate::store::MemoryArchiveStore;
    use serde_json::json;

    fn repository() -> (Arc<MemoryArchiveStore>, Arc<MemoryKv>, ArchiveRepository) {
        let store = Arc::new(MemoryArchiveStore::new());
        let kv = Arc::new(MemoryKv::new());
        let config = ServiceConfig {
            save_lock_wait: Duration::from_millis(40),
            ..ServiceConfig::default()
        };
        let repo = ArchiveRepository::new(
            store.clone(),
            CacheLayer::new(kv.clone()),
            LockManager::new(kv.clone()),
            &config,
        );
        (store, kv, repo)
    }

    fn doc(gold: &str) -> ArchiveDocument {
        ArchiveDocument::new(json!({"gold": gold}))
    }

    #[tokio::test]
    async fn first_save_creates_then_newer_updates() {
        let (_, _, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        let first = repo.save(player, shard, 1, doc("100")).await.unwrap();
        assert_eq!(first, SaveOutcome::Created);

        let second = repo.save(player, shard, 2, doc("250")).await.unwrap();
        assert_eq!(second, SaveOutcome::Updated);

        let loaded = repo.load(player, shard).await.unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.document.integer_field(&["gold"]), Some(250));
    }

    #[tokio::test]
    async fn stale_and_equal_versions_are_skipped() {
        let (_, _, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        repo.save(player, shard, 3, doc("300")).await.unwrap();

        assert_eq!(
            repo.save(player, shard, 2, doc("200")).await.unwrap(),
            SaveOutcome::Skipped
        );
        assert_eq!(
            repo.save(player, shard, 3, doc("999")).await.unwrap(),
            SaveOutcome::Skipped
        );
        assert_eq!(
            repo.save(player, shard, 4, doc("400")).await.unwrap(),
            SaveOutcome::Updated
        );

        let loaded = repo.load(player, shard).await.unwrap();
        assert_eq!(loaded.version, 4);
        assert_eq!(loaded.document.integer_field(&["gold"]), Some(400));
    }

    #[tokio::test]
    async fn replaying_the_same_save_is_idempotent() {
        let (_, _, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        repo.save(player, shard, 5, doc("500")).await.unwrap();
        let before = repo.load(player, shard).await.unwrap();

        assert_eq!(
            repo.save(player, shard, 5, doc("500")).await.unwrap(),
            SaveOutcome::Skipped
        );
        let after = repo.load(player, shard).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn load_of_unknown_player_is_not_found() {
        let (_, _, repo) = repository();
        let missing = repo.load(PlayerId(404), Shard(1)).await;
        assert!(matches!(missing, Err(ArchiveError::NotFound)));
    }

    #[tokio::test]
    async fn load_falls_back_to_store_and_populates_cache() {
        let (store, kv, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        // Seed the store directly so the first load is a cache miss.
        let archive = PlayerArchive::new(player, shard, 1, doc("100"), 1_000);
        store.put(&archive).await.unwrap();

        assert!(kv.get(&archive_key(shard, player)).await.unwrap().is_none());
        let loaded = repo.load(player, shard).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert!(kv.get(&archive_key(shard, player)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn held_lock_makes_save_busy() {
        let (_, kv, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        let locks = LockManager::new(kv);
        let _held = locks
            .try_acquire(&save_lock_key(shard, player), Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        let denied = repo.save(player, shard, 1, doc("100")).await;
        assert!(matches!(denied, Err(ArchiveError::Busy)));
    }

    #[tokio::test]
    async fn save_releases_the_lock_for_the_next_writer() {
        let (_, _, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        repo.save(player, shard, 1, doc("100")).await.unwrap();
        let next = repo.save(player, shard, 2, doc("200")).await.unwrap();
        assert_eq!(next, SaveOutcome::Updated);
    }

    #[tokio::test]
    async fn delete_hides_the_archive_and_a_newer_save_revives_it() {
        let (_, _, repo) = repository();
        let player = PlayerId(1);
        let shard = Shard(1);

        repo.save(player, shard, 3, doc("300")).await.unwrap();
        assert!(repo.delete(player, shard).await.unwrap());
        assert!(matches!(
            repo.load(player, shard).await,
            Err(ArchiveError::NotFound)
        ));

        // The tombstone's version still gates writes.
        assert_eq!(
            repo.save(player, shard, 3, doc("301")).await.unwrap(),
            SaveOutcome::Skipped
        );
        assert!(matches!(
            repo.load(player, shard).await,
            Err(ArchiveError::NotFound)
        ));

        assert_eq!(
            repo.save(player, shard, 4, doc("400")).await.unwrap(),
            SaveOutcome::Updated
        );
        let revived = repo.load(player, shard).await.unwrap();
        assert_eq!(revived.version, 4);
        assert!(!revived.is_deleted());
    }

    #[tokio::test]
    async fn delete_of_missing_archive_is_false() {
        let (_, _, repo) = repository();
        assert!(!repo.delete(PlayerId(404), Shard(1)).await.unwrap());
    }
}
