//! Leaderboard queries over archive documents.
//!
//! Both query shapes project values through the one registered
//! [`Metric::sample`] routine, so a player's rank and the top list can never
//! disagree about what counts as a valid value or which window it falls in.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use progress_core::{
    LeaderboardEntry, Metric, MetricRow, MetricSample, PlayerId, PlayerRank, Shard, display_name,
    rank_descending,
};

use crate::cache::{CacheLayer, leaderboard_key};
use crate::config::ServiceConfig;
use crate::day;
use crate::error::{ArchiveError, Result};
use crate::store::ArchiveStore;

/// Computes top-N lists and individual ranks for registered metrics.
#[derive(Clone)]
pub struct LeaderboardQueryEngine {
    store: Arc<dyn ArchiveStore>,
    cache: CacheLayer,
    timezone: Tz,
    cache_ttl: Duration,
    board_len: usize,
}

impl LeaderboardQueryEngine {
    pub fn new(store: Arc<dyn ArchiveStore>, cache: CacheLayer, config: &ServiceConfig) -> Self {
        Self {
            store,
            cache,
            timezone: config.reward_timezone,
            cache_ttl: config.leaderboard_cache_ttl,
            board_len: config.top_n,
        }
    }

    /// The shard's leaderboard at the configured length.
    ///
    /// Windowed metrics cover the current calendar day in the configured
    /// timezone. Ranks are dense, 1..=k, ties broken by scan order.
    pub async fn top(&self, metric: Metric, shard: Shard) -> Result<Vec<LeaderboardEntry>> {
        self.top_n(metric, shard, self.board_len).await
    }

    /// The shard's top `n` for a metric, cached for a few minutes.
    ///
    /// The cache holds the board at its configured length; shorter requests
    /// are served from it, longer ones are computed fresh.
    pub async fn top_n(
        &self,
        metric: Metric,
        shard: Shard,
        n: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let day = metric.is_windowed().then(|| day::current_day(self.timezone));
        self.top_inner(metric, shard, day, n).await
    }

    /// The shard's top-N for a metric over one specific calendar day.
    ///
    /// This is the reward pass's path: it ranks straight from the store,
    /// never through the leaderboard cache, so a save landing in the day's
    /// final moments still counts even when a client query cached the board
    /// minutes before midnight. For unwindowed metrics the day changes
    /// nothing.
    pub async fn top_for_day(
        &self,
        metric: Metric,
        shard: Shard,
        day: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>> {
        let day = metric.is_windowed().then_some(day);
        let rows = self.collect_rows(metric, shard, day).await?;
        Ok(rank_descending(rows, self.board_len))
    }

    async fn top_inner(
        &self,
        metric: Metric,
        shard: Shard,
        day: Option<NaiveDate>,
        n: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let key = leaderboard_key(metric, shard, day);

        if n <= self.board_len
            && let Some(mut entries) = self.cache.get_json::<Vec<LeaderboardEntry>>(&key).await?
        {
            debug!(%metric, %shard, "leaderboard cache hit");
            entries.truncate(n);
            return Ok(entries);
        }

        let rows = self.collect_rows(metric, shard, day).await?;
        let mut entries = rank_descending(rows, n.max(self.board_len));

        // An empty board usually means a shard still warming up; keep
        // recomputing it instead of pinning the emptiness for a TTL.
        if !entries.is_empty() {
            let board: Vec<LeaderboardEntry> =
                entries.iter().take(self.board_len).cloned().collect();
            self.cache.put_json(&key, &board, self.cache_ttl).await?;
        }

        entries.truncate(n);
        Ok(entries)
    }

    async fn collect_rows(
        &self,
        metric: Metric,
        shard: Shard,
        day: Option<NaiveDate>,
    ) -> Result<Vec<MetricRow>> {
        let window = day.map(|day| day::day_window_ms(self.timezone, day));

        let mut rows = Vec::new();
        for archive in self.store.scan_shard(shard).await? {
            let Some(sample) = metric.sample(&archive.document) else {
                continue;
            };
            if !sample_in(sample, window) {
                continue;
            }
            rows.push(MetricRow {
                player_id: archive.player_id,
                display_name: display_name(archive.document.display_name(), archive.player_id),
                value: sample.value,
            });
        }
        Ok(rows)
    }

    /// One player's value and rank for a metric: 1 plus the number of other
    /// players in the shard (and window) with a strictly greater value.
    /// Uncached.
    ///
    /// A player with no valid value for the metric has no rank; that reads
    /// as [`ArchiveError::NotFound`].
    pub async fn player_rank(
        &self,
        metric: Metric,
        shard: Shard,
        player: PlayerId,
    ) -> Result<PlayerRank> {
        let window = metric
            .is_windowed()
            .then(|| day::day_window_ms(self.timezone, day::current_day(self.timezone)));

        let archives = self.store.scan_shard(shard).await?;

        let own = archives
            .iter()
            .find(|archive| archive.player_id == player)
            .and_then(|archive| metric.sample(&archive.document))
            .filter(|sample| sample_in(*sample, window))
            .ok_or(ArchiveError::NotFound)?;

        let greater = archives
            .iter()
            .filter(|archive| archive.player_id != player)
            .filter_map(|archive| metric.sample(&archive.document))
            .filter(|sample| sample_in(*sample, window))
            .filter(|sample| sample.value > own.value)
            .count();

        Ok(PlayerRank {
            rank: greater as u32 + 1,
            value: own.value,
        })
    }
}

fn sample_in(sample: MetricSample, window: Option<(i64, i64)>) -> bool {
    match window {
        Some((start, end)) => sample.in_window(start, end),
        None => true,
    }
}
