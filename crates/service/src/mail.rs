//! Asynchronous seam to the mail service that delivers rewards.
//!
//! The scheduler hands finished [`RewardRecord`]s over and moves on; inbox
//! storage, claiming, and attachment handling all live on the mail side.
//! Deployments plug in a real client, tests plug in [`RecordingMailSender`].

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use progress_core::RewardRecord;

/// Errors surfaced by mail implementations.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail recorder lock was poisoned")]
    LockPoisoned,

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, MailError>;

/// Trait for handing reward records to the mail service.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Queue one reward for delivery to its recipient's inbox.
    async fn create_reward_record(&self, record: RewardRecord) -> Result<()>;
}

/// Mail sender that keeps every record in memory.
/// Useful for tests asserting what the scheduler granted.
#[derive(Default)]
pub struct RecordingMailSender {
    records: Mutex<Vec<RewardRecord>>,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records received so far, in delivery order.
    pub fn records(&self) -> Vec<RewardRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn create_reward_record(&self, record: RewardRecord) -> Result<()> {
        let mut records = self.records.lock().map_err(|_| MailError::LockPoisoned)?;
        records.push(record);
        Ok(())
    }
}

/// Mail sender that only logs the handoff.
/// The daemon's default when no real mail service is wired up.
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn create_reward_record(&self, record: RewardRecord) -> Result<()> {
        info!(
            player = %record.player_id,
            shard = %record.shard,
            day = %record.day,
            rank = record.rank,
            kind = %record.kind,
            amount = record.amount,
            "reward record handed to mail"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::{PlayerId, RewardKind, Shard};

    fn record(player: u64, rank: u32, amount: u64) -> RewardRecord {
        RewardRecord {
            player_id: PlayerId(player),
            shard: Shard(1),
            day: "20240309".to_owned(),
            rank,
            kind: RewardKind::Diamond,
            amount,
            reason: progress_core::reward_reason(rank),
        }
    }

    #[tokio::test]
    async fn recorder_keeps_delivery_order() {
        let mail = RecordingMailSender::new();
        mail.create_reward_record(record(2, 1, 1200)).await.unwrap();
        mail.create_reward_record(record(5, 2, 1000)).await.unwrap();

        let records = mail.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].player_id, PlayerId(2));
        assert_eq!(records[1].player_id, PlayerId(5));
    }
}
