//! In-memory ArchiveStore implementation for tests and local runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use progress_core::{PlayerArchive, PlayerId, Shard};

use crate::store::{ArchiveStore, Result, StoreError};

/// In-memory implementation of [`ArchiveStore`].
///
/// Keys are ordered, so shard scans come back in ascending player-id order
/// without extra sorting.
pub struct MemoryArchiveStore {
    records: RwLock<BTreeMap<(Shard, PlayerId), PlayerArchive>>,
}

impl MemoryArchiveStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryArchiveStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn fetch(&self, player: PlayerId, shard: Shard) -> Result<Option<PlayerArchive>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(&(shard, player)).cloned())
    }

    async fn put(&self, archive: &PlayerArchive) -> Result<()> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert((archive.shard, archive.player_id), archive.clone());
        Ok(())
    }

    async fn scan_shard(&self, shard: Shard) -> Result<Vec<PlayerArchive>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records
            .range((shard, PlayerId(u64::MIN))..=(shard, PlayerId(u64::MAX)))
            .map(|(_, archive)| archive)
            .filter(|archive| !archive.is_deleted())
            .cloned()
            .collect())
    }

    async fn shards(&self) -> Result<Vec<Shard>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut shards: Vec<Shard> = Vec::new();
        for ((shard, _), archive) in records.iter() {
            if !archive.is_deleted() && shards.last() != Some(shard) {
                shards.push(*shard);
            }
        }
        Ok(shards)
    }

    async fn soft_delete(&self, player: PlayerId, shard: Shard, now_ms: i64) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        match records.get_mut(&(shard, player)) {
            Some(archive) if !archive.is_deleted() => {
                archive.mark_deleted(now_ms);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::ArchiveDocument;
    use serde_json::json;

    fn archive(player: u64, shard: u32, version: u64) -> PlayerArchive {
        PlayerArchive::new(
            PlayerId(player),
            Shard(shard),
            version,
            ArchiveDocument::new(json!({"gold": player.to_string()})),
            1_000,
        )
    }

    #[tokio::test]
    async fn put_then_fetch_round_trips() {
        let store = MemoryArchiveStore::new();
        let a = archive(7, 1, 3);
        store.put(&a).await.unwrap();
        assert_eq!(store.fetch(PlayerId(7), Shard(1)).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn scan_returns_ascending_player_order() {
        let store = MemoryArchiveStore::new();
        for player in [30, 10, 20] {
            store.put(&archive(player, 1, 1)).await.unwrap();
        }
        store.put(&archive(5, 2, 1)).await.unwrap();

        let scanned = store.scan_shard(Shard(1)).await.unwrap();
        let ids: Vec<u64> = scanned.iter().map(|a| a.player_id.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn soft_delete_hides_from_load_and_scan_but_not_fetch() {
        let store = MemoryArchiveStore::new();
        store.put(&archive(7, 1, 3)).await.unwrap();

        assert!(store.soft_delete(PlayerId(7), Shard(1), 2_000).await.unwrap());
        assert!(store.load(PlayerId(7), Shard(1)).await.unwrap().is_none());
        assert!(store.scan_shard(Shard(1)).await.unwrap().is_empty());

        let fetched = store.fetch(PlayerId(7), Shard(1)).await.unwrap().unwrap();
        assert_eq!(fetched.deleted_at_ms, Some(2_000));
    }

    #[tokio::test]
    async fn soft_delete_is_false_for_missing_or_already_deleted() {
        let store = MemoryArchiveStore::new();
        assert!(!store.soft_delete(PlayerId(7), Shard(1), 2_000).await.unwrap());

        store.put(&archive(7, 1, 1)).await.unwrap();
        assert!(store.soft_delete(PlayerId(7), Shard(1), 2_000).await.unwrap());
        assert!(!store.soft_delete(PlayerId(7), Shard(1), 3_000).await.unwrap());
    }

    #[tokio::test]
    async fn shards_lists_live_shards_ascending() {
        let store = MemoryArchiveStore::new();
        store.put(&archive(1, 3, 1)).await.unwrap();
        store.put(&archive(2, 1, 1)).await.unwrap();
        store.put(&archive(3, 1, 1)).await.unwrap();
        store.put(&archive(4, 2, 1)).await.unwrap();
        store.soft_delete(PlayerId(4), Shard(2), 2_000).await.unwrap();

        assert_eq!(store.shards().await.unwrap(), vec![Shard(1), Shard(3)]);
    }
}
