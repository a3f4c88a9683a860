//! Leaderboard entries and the ranking rule.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// One row of a computed leaderboard.
///
/// Carries the recipient id alongside the display name so the reward pass
/// can address mail from the same ranked list clients see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Dense rank starting at 1.
    pub rank: u32,
    pub player_id: PlayerId,
    /// `{name}#{player_id}`, with an empty name when the player never set one.
    pub display_name: String,
    pub value: u64,
}

/// A candidate row before ranking: who, shown as what, scoring how much.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricRow {
    pub player_id: PlayerId,
    pub display_name: String,
    pub value: u64,
}

/// One player's standing for a metric.
///
/// The rank is competition-style: 1 plus the number of players with a
/// strictly greater value, so tied players share a rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRank {
    pub rank: u32,
    pub value: u64,
}

/// Compose the public display name from an optional chosen name and the id.
pub fn display_name(name: Option<&str>, player_id: PlayerId) -> String {
    format!("{}#{}", name.unwrap_or(""), player_id)
}

/// Rank rows descending by value and assign dense ranks 1..=k.
///
/// The sort is stable, so rows with equal values keep their input order.
/// Callers that scan a store in a deterministic order therefore get a
/// deterministic leaderboard, ties included.
pub fn rank_descending(mut rows: Vec<MetricRow>, top_n: usize) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| b.value.cmp(&a.value));
    rows.into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i as u32 + 1,
            player_id: row.player_id,
            display_name: row.display_name,
            value: row.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, name: &str, value: u64) -> MetricRow {
        MetricRow {
            player_id: PlayerId(id),
            display_name: display_name(Some(name), PlayerId(id)),
            value,
        }
    }

    #[test]
    fn display_name_formats_with_and_without_name() {
        assert_eq!(display_name(Some("ember"), PlayerId(42)), "ember#42");
        assert_eq!(display_name(None, PlayerId(42)), "#42");
    }

    #[test]
    fn ranks_are_dense_and_descending() {
        let ranked = rank_descending(
            vec![row(1, "a", 500), row(2, "b", 9000), row(3, "c", 800)],
            10,
        );
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].value, 9000);
        assert_eq!(ranked[1].value, 800);
        assert_eq!(ranked[2].value, 500);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_descending(
            vec![row(1, "a", 500), row(2, "b", 9000), row(3, "c", 9000)],
            10,
        );
        assert_eq!(ranked[0].player_id, PlayerId(2));
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].player_id, PlayerId(3));
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].player_id, PlayerId(1));
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn top_n_truncates_after_sorting() {
        let ranked = rank_descending(
            vec![row(1, "a", 1), row(2, "b", 3), row(3, "c", 2)],
            2,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].value, 3);
        assert_eq!(ranked[1].value, 2);
    }

    #[test]
    fn empty_input_ranks_to_empty() {
        assert!(rank_descending(Vec::new(), 10).is_empty());
    }
}
