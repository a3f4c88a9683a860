//! Daily reward table and the record handed to mail delivery.

use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, Shard};

/// Currency granted by the daily reward pass.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RewardKind {
    Diamond,
}

/// Diamonds owed for a final daily rank.
///
/// Ranks beyond tenth place earn nothing.
pub fn reward_for_rank(rank: u32) -> u64 {
    match rank {
        1 => 1200,
        2 => 1000,
        3 => 800,
        4..=10 => 500,
        _ => 0,
    }
}

/// One reward grant, addressed and ready for mail delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub player_id: PlayerId,
    pub shard: Shard,
    /// The rewarded day, formatted `YYYYMMDD` in the scheduler's timezone.
    pub day: String,
    pub rank: u32,
    pub kind: RewardKind,
    pub amount: u64,
    /// Human-readable grant reason, shown as the mail body.
    pub reason: String,
}

/// The mail body for a daily boss-damage reward.
pub fn reward_reason(rank: u32) -> String {
    format!("You placed #{rank} in today's boss damage standings. Here is your reward.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn podium_amounts_match_the_table() {
        assert_eq!(reward_for_rank(1), 1200);
        assert_eq!(reward_for_rank(2), 1000);
        assert_eq!(reward_for_rank(3), 800);
    }

    #[test]
    fn ranks_four_through_ten_share_a_tier() {
        for rank in 4..=10 {
            assert_eq!(reward_for_rank(rank), 500, "rank {rank}");
        }
    }

    #[test]
    fn ranks_past_ten_earn_nothing() {
        assert_eq!(reward_for_rank(11), 0);
        assert_eq!(reward_for_rank(0), 0);
        assert_eq!(reward_for_rank(u32::MAX), 0);
    }

    #[test]
    fn reason_names_the_rank() {
        assert!(reward_reason(3).contains("#3"));
    }
}
