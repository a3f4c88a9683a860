//! Domain types for the player-progress subsystem.
//!
//! `progress-core` defines the canonical records (archives, metrics, reward
//! rules) and exposes pure APIs reused by the service layer and offline
//! tools. It performs no I/O and holds no clocks: callers supply timestamps,
//! which keeps every function here deterministic and directly testable.
pub mod archive;
pub mod document;
pub mod ids;
pub mod leaderboard;
pub mod metric;
pub mod reward;

pub use archive::{PlayerArchive, SaveOutcome};
pub use document::ArchiveDocument;
pub use ids::{PlayerId, Shard};
pub use leaderboard::{LeaderboardEntry, MetricRow, PlayerRank, display_name, rank_descending};
pub use metric::{Metric, MetricSample};
pub use reward::{RewardKind, RewardRecord, reward_for_rank, reward_reason};
