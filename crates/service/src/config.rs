//! Service configuration structures and loaders.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use progress_core::Shard;

/// Tunables for caching, locking, and the reward scheduler.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// TTL for cached archives.
    pub archive_cache_ttl: Duration,
    /// TTL for cached leaderboards.
    pub leaderboard_cache_ttl: Duration,
    /// TTL of the per-player save lock; bounds how long a crashed writer
    /// blocks the key.
    pub save_lock_ttl: Duration,
    /// How long a save waits for a held lock before reporting busy.
    pub save_lock_wait: Duration,
    /// TTL of the per-shard reward idempotency lock.
    pub reward_lock_ttl: Duration,
    /// Timezone whose midnight triggers the reward pass and whose calendar
    /// days bound windowed metrics.
    pub reward_timezone: Tz,
    /// Shards the reward pass processes. Empty means discover from the store.
    pub reward_shards: Vec<Shard>,
    /// Leaderboard length, also the rewarded rank range.
    pub top_n: usize,
    /// Root directory for the file-backed store.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            archive_cache_ttl: Duration::from_secs(24 * 60 * 60),
            leaderboard_cache_ttl: Duration::from_secs(5 * 60),
            save_lock_ttl: Duration::from_secs(5),
            save_lock_wait: Duration::from_millis(500),
            reward_lock_ttl: Duration::from_secs(72 * 60 * 60),
            reward_timezone: chrono_tz::Asia::Shanghai,
            reward_shards: Vec::new(),
            top_n: 10,
            data_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ARCHIVE_CACHE_TTL_SECS` - Archive cache TTL (default: 86400)
    /// - `LEADERBOARD_CACHE_TTL_SECS` - Leaderboard cache TTL (default: 300)
    /// - `SAVE_LOCK_TTL_SECS` - Save lock TTL (default: 5)
    /// - `SAVE_LOCK_WAIT_MS` - Max wait for a contended save lock (default: 500)
    /// - `REWARD_LOCK_TTL_HOURS` - Reward idempotency lock TTL (default: 72)
    /// - `REWARD_TIMEZONE` - IANA timezone name (default: Asia/Shanghai)
    /// - `REWARD_SHARDS` - Comma-separated shard override (default: discover)
    /// - `TOP_N` - Leaderboard length (default: 10)
    /// - `DATA_DIR` - File store root (default: platform-specific)
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env::<u64>("ARCHIVE_CACHE_TTL_SECS") {
            config.archive_cache_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = read_env::<u64>("LEADERBOARD_CACHE_TTL_SECS") {
            config.leaderboard_cache_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = read_env::<u64>("SAVE_LOCK_TTL_SECS") {
            config.save_lock_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = read_env::<u64>("SAVE_LOCK_WAIT_MS") {
            config.save_lock_wait = Duration::from_millis(ms);
        }
        if let Some(hours) = read_env::<u64>("REWARD_LOCK_TTL_HOURS") {
            config.reward_lock_ttl = Duration::from_secs(hours.max(1) * 60 * 60);
        }
        if let Some(tz) = read_env::<Tz>("REWARD_TIMEZONE") {
            config.reward_timezone = tz;
        }
        if let Ok(list) = env::var("REWARD_SHARDS") {
            config.reward_shards = parse_shard_list(&list);
        }
        if let Some(n) = read_env::<usize>("TOP_N") {
            config.top_n = n.max(1);
        }
        config.data_dir = env::var("DATA_DIR").ok().map(PathBuf::from);

        config
    }

    /// Resolve the effective data directory for the file-backed store.
    ///
    /// Follows platform conventions:
    /// - Linux: `~/.local/share/progressd` (or `$XDG_DATA_HOME/progressd`)
    /// - macOS: `~/Library/Application Support/progressd`
    /// - Windows: `%APPDATA%\progressd`
    /// - Fallback: `./progress_data`
    pub fn data_dir_or_default(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "progressd")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("./progress_data"))
        })
    }
}

fn parse_shard_list(raw: &str) -> Vec<Shard> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .map(Shard)
        .collect()
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_constants() {
        let config = ServiceConfig::default();
        assert_eq!(config.archive_cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.leaderboard_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.save_lock_ttl, Duration::from_secs(5));
        assert_eq!(config.reward_lock_ttl, Duration::from_secs(259_200));
        assert_eq!(config.reward_timezone, chrono_tz::Asia::Shanghai);
        assert!(config.reward_shards.is_empty());
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn shard_lists_tolerate_spaces_and_junk() {
        assert_eq!(
            parse_shard_list("1, 2,junk, 5"),
            vec![Shard(1), Shard(2), Shard(5)]
        );
        assert!(parse_shard_list("").is_empty());
    }
}
