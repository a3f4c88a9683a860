//! File-based ArchiveStore implementation.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use progress_core::{PlayerArchive, PlayerId, Shard};

use crate::store::{ArchiveStore, Result, StoreError};

/// File-based implementation of [`ArchiveStore`].
///
/// # File layout
///
/// One JSON file per record:
///
/// ```text
/// {base_dir}/shard_{shard}/player_{player}.json
/// ```
///
/// Writes go through a temp file plus atomic rename, so a crash mid-write
/// leaves the previous record intact.
pub struct FileArchiveStore {
    base_dir: PathBuf,
}

impl FileArchiveStore {
    /// Create a store rooted at `base_dir`, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn shard_dir(&self, shard: Shard) -> PathBuf {
        self.base_dir.join(format!("shard_{shard}"))
    }

    fn record_path(&self, player: PlayerId, shard: Shard) -> PathBuf {
        self.shard_dir(shard).join(format!("player_{player}.json"))
    }

    fn read_record(path: &Path) -> Result<PlayerArchive> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptedRecord {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Player ids present in a shard directory, ascending.
    fn shard_players(&self, shard: Shard) -> Result<Vec<PlayerId>> {
        let dir = self.shard_dir(shard);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut players = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(id_str) = filename
                    .strip_prefix("player_")
                    .and_then(|s| s.strip_suffix(".json"))
                && let Ok(id) = id_str.parse::<u64>()
            {
                players.push(PlayerId(id));
            }
        }

        players.sort_unstable();
        Ok(players)
    }
}

#[async_trait]
impl ArchiveStore for FileArchiveStore {
    async fn fetch(&self, player: PlayerId, shard: Shard) -> Result<Option<PlayerArchive>> {
        let path = self.record_path(player, shard);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Self::read_record(&path)?))
    }

    async fn put(&self, archive: &PlayerArchive) -> Result<()> {
        let path = self.record_path(archive.player_id, archive.shard);
        let temp_path = path.with_extension("json.tmp");
        fs::create_dir_all(self.shard_dir(archive.shard))?;

        let bytes = serde_json::to_vec(archive)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(
            player = %archive.player_id,
            shard = %archive.shard,
            version = archive.version,
            "saved archive to {}",
            path.display()
        );

        Ok(())
    }

    async fn scan_shard(&self, shard: Shard) -> Result<Vec<PlayerArchive>> {
        let mut archives = Vec::new();
        for player in self.shard_players(shard)? {
            let archive = Self::read_record(&self.record_path(player, shard))?;
            if !archive.is_deleted() {
                archives.push(archive);
            }
        }
        Ok(archives)
    }

    async fn shards(&self) -> Result<Vec<Shard>> {
        let mut shards = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir()
                && let Some(dirname) = path.file_name().and_then(|s| s.to_str())
                && let Some(shard_str) = dirname.strip_prefix("shard_")
                && let Ok(shard) = shard_str.parse::<u32>()
            {
                shards.push(Shard(shard));
            }
        }
        shards.sort_unstable();

        let mut live = Vec::new();
        for shard in shards {
            if !self.scan_shard(shard).await?.is_empty() {
                live.push(shard);
            }
        }
        Ok(live)
    }

    async fn soft_delete(&self, player: PlayerId, shard: Shard, now_ms: i64) -> Result<bool> {
        match self.fetch(player, shard).await? {
            Some(mut archive) if !archive.is_deleted() => {
                archive.mark_deleted(now_ms);
                self.put(&archive).await?;
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
    use tempfile::TempDir;

    fn archive(player: u64, shard: u32, version: u64) -> PlayerArchive {
        PlayerArchive::new(
            PlayerId(player),
            Shard(shard),
            version,
            ArchiveDocument::new(json!({"gold": "100", "name": "ember"})),
            1_000,
        )
    }

    #[tokio::test]
    async fn put_then_fetch_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        let a = archive(7, 1, 3);
        store.put(&a).await.unwrap();
        assert_eq!(store.fetch(PlayerId(7), Shard(1)).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn put_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        store.put(&archive(7, 1, 1)).await.unwrap();

        let shard_dir = dir.path().join("shard_1");
        let names: Vec<String> = fs::read_dir(&shard_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["player_7.json".to_owned()]);
    }

    #[tokio::test]
    async fn scan_returns_ascending_player_order() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        for player in [30, 10, 20] {
            store.put(&archive(player, 1, 1)).await.unwrap();
        }

        let ids: Vec<u64> = store
            .scan_shard(Shard(1))
            .await
            .unwrap()
            .iter()
            .map(|a| a.player_id.0)
            .collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn scan_of_unknown_shard_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        assert!(store.scan_shard(Shard(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_record_surfaces_with_its_path() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        let shard_dir = dir.path().join("shard_1");
        fs::create_dir_all(&shard_dir).unwrap();
        fs::write(shard_dir.join("player_7.json"), b"{ not json").unwrap();

        let err = store.fetch(PlayerId(7), Shard(1)).await.unwrap_err();
        match err {
            StoreError::CorruptedRecord { path, .. } => assert!(path.contains("player_7.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn soft_delete_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileArchiveStore::new(dir.path()).unwrap();
            store.put(&archive(7, 1, 1)).await.unwrap();
            assert!(store.soft_delete(PlayerId(7), Shard(1), 2_000).await.unwrap());
        }

        let reopened = FileArchiveStore::new(dir.path()).unwrap();
        assert!(reopened.load(PlayerId(7), Shard(1)).await.unwrap().is_none());
        let fetched = reopened.fetch(PlayerId(7), Shard(1)).await.unwrap().unwrap();
        assert_eq!(fetched.deleted_at_ms, Some(2_000));
    }

    #[tokio::test]
    async fn shards_skips_directories_without_live_records() {
        let dir = TempDir::new().unwrap();
        let store = FileArchiveStore::new(dir.path()).unwrap();
        store.put(&archive(1, 3, 1)).await.unwrap();
        store.put(&archive(2, 1, 1)).await.unwrap();
        store.put(&archive(3, 2, 1)).await.unwrap();
        store.soft_delete(PlayerId(3), Shard(2), 2_000).await.unwrap();

        assert_eq!(store.shards().await.unwrap(), vec![Shard(1), Shard(3)]);
    }
}
