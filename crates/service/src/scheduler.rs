//! Daily reward worker.
//!
//! Sleeps until the next local midnight in the configured timezone, then
//! grants diamond rewards for the calendar day that just ended: top-10 boss
//! damage per shard, once per (shard, day) no matter how many scheduler
//! instances race or how often the process restarts.
//!
//! # Idempotency
//!
//! Consuming the per-(shard, day) lock key *is* the "already processed"
//! marker. It is claimed before any ranking work, so a pass that fails
//! mid-shard does not run twice; the lock's TTL (72 h by default) outlives
//! any plausible crash-and-restart cycle for the same day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use progress_core::{Metric, RewardKind, RewardRecord, Shard, reward_for_rank, reward_reason};

use crate::config::ServiceConfig;
use crate::day;
use crate::error::Result;
use crate::kv::KvStore;
use crate::leaderboard::LeaderboardQueryEngine;
use crate::mail::MailSender;
use crate::store::ArchiveStore;

fn reward_lock_key(shard: Shard, day: NaiveDate) -> String {
    format!("reward:boss_damage:{shard}:{}", day::compact(day))
}

/// Commands that can be sent to the reward worker.
pub(crate) enum Command {
    /// Run a reward pass immediately, outside the midnight schedule.
    ///
    /// `day` defaults to yesterday. This is the operator's recovery path
    /// after an outage; shards whose lock was already consumed still skip.
    RunNow {
        day: Option<NaiveDate>,
        reply: oneshot::Sender<Result<RunReport>>,
    },

    /// Finish the in-flight pass, if any, then stop.
    Shutdown,
}

/// What one reward pass did.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The calendar day that was rewarded.
    pub day: NaiveDate,
    /// Shards whose lock was claimed and whose rewards were granted.
    pub shards_processed: usize,
    /// Shards already processed for this day by an earlier pass.
    pub shards_skipped: usize,
    /// Shards left for a later run after an error.
    pub shards_failed: usize,
    /// Reward records handed to mail across all shards.
    pub rewards_granted: usize,
}

impl RunReport {
    fn new(day: NaiveDate) -> Self {
        Self {
            day,
            shards_processed: 0,
            shards_skipped: 0,
            shards_failed: 0,
            rewards_granted: 0,
        }
    }
}

enum ShardOutcome {
    Granted(usize),
    AlreadyProcessed,
}

/// Background worker that grants the previous day's rewards at midnight.
pub(crate) struct RewardWorker {
    engine: LeaderboardQueryEngine,
    store: Arc<dyn ArchiveStore>,
    kv: Arc<dyn KvStore>,
    mail: Arc<dyn MailSender>,
    command_rx: mpsc::Receiver<Command>,
    timezone: Tz,
    lock_ttl: Duration,
    shard_override: Vec<Shard>,
}

impl RewardWorker {
    pub(crate) fn new(
        engine: LeaderboardQueryEngine,
        store: Arc<dyn ArchiveStore>,
        kv: Arc<dyn KvStore>,
        mail: Arc<dyn MailSender>,
        command_rx: mpsc::Receiver<Command>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            engine,
            store,
            kv,
            mail,
            command_rx,
            timezone: config.reward_timezone,
            lock_ttl: config.reward_lock_ttl,
            shard_override: config.reward_shards.clone(),
        }
    }

    /// Main worker loop.
    pub(crate) async fn run(mut self) {
        info!(timezone = %self.timezone, "reward scheduler started");

        loop {
            // The day currently in progress ends at the next midnight; that
            // is the day the wakeup will reward.
            let pending = day::current_day(self.timezone);
            let sleep_for = day::until_next_midnight(self.timezone, Utc::now());

            tokio::select! {
                _ = sleep(sleep_for) => {
                    match self.run_day(pending).await {
                        Ok(report) => info!(
                            day = %day::compact(report.day),
                            processed = report.shards_processed,
                            skipped = report.shards_skipped,
                            failed = report.shards_failed,
                            granted = report.rewards_granted,
                            "scheduled reward pass finished"
                        ),
                        Err(error) => error!(%error, "scheduled reward pass failed"),
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::RunNow { day, reply }) => {
                            let today = day::current_day(self.timezone);
                            let target = day
                                .or_else(|| day::previous_day(today))
                                .unwrap_or(today);
                            let _ = reply.send(self.run_day(target).await);
                        }
                        Some(Command::Shutdown) => {
                            info!("shutdown command received");
                            break;
                        }
                        None => {
                            debug!("command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("reward scheduler stopped");
    }

    /// Grant rewards for one calendar day across all shards.
    ///
    /// Shards are independent: one shard's failure is logged and counted,
    /// and the pass moves on to the next.
    async fn run_day(&self, day: NaiveDate) -> Result<RunReport> {
        let shards = if self.shard_override.is_empty() {
            self.store.shards().await?
        } else {
            self.shard_override.clone()
        };

        info!(
            day = %day::compact(day),
            shard_count = shards.len(),
            "reward pass started"
        );

        let mut report = RunReport::new(day);
        for shard in shards {
            match self.process_shard(shard, day).await {
                Ok(ShardOutcome::Granted(granted)) => {
                    report.shards_processed += 1;
                    report.rewards_granted += granted;
                }
                Ok(ShardOutcome::AlreadyProcessed) => {
                    report.shards_skipped += 1;
                }
                Err(error) => {
                    warn!(%shard, %error, "reward pass failed for shard, moving on");
                    report.shards_failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn process_shard(&self, shard: Shard, day: NaiveDate) -> Result<ShardOutcome> {
        let claimed = self
            .kv
            .set_if_absent(&reward_lock_key(shard, day), "locked", self.lock_ttl)
            .await?;
        if !claimed {
            debug!(%shard, day = %day::compact(day), "shard already processed for this day");
            return Ok(ShardOutcome::AlreadyProcessed);
        }

        let top = self
            .engine
            .top_for_day(Metric::BossDamage, shard, day)
            .await?;
        if top.is_empty() {
            debug!(%shard, day = %day::compact(day), "no eligible players");
            return Ok(ShardOutcome::Granted(0));
        }

        let mut granted = 0;
        for entry in &top {
            let amount = reward_for_rank(entry.rank);
            if amount == 0 {
                continue;
            }

            let record = RewardRecord {
                player_id: entry.player_id,
                shard,
                day: day::compact(day),
                rank: entry.rank,
                kind: RewardKind::Diamond,
                amount,
                reason: reward_reason(entry.rank),
            };

            // Delivery is fire-and-forget; a lost handoff costs one mail,
            // not the shard's whole pass.
            if let Err(error) = self.mail.create_reward_record(record).await {
                warn!(%shard, player = %entry.player_id, %error, "mail handoff failed");
                continue;
            }
            granted += 1;
        }

        info!(%shard, day = %day::compact(day), granted, "shard rewards granted");
        Ok(ShardOutcome::Granted(granted))
    }
}
