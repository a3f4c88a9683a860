//! Versioned player archive and the outcome of a save attempt.

use serde::{Deserialize, Serialize};

use crate::document::ArchiveDocument;
use crate::ids::{PlayerId, Shard};

/// A player's persisted progress record.
///
/// `version` is a client-supplied monotonic counter; the repository only
/// overwrites a stored archive when the incoming version is strictly
/// greater. Timestamps are epoch milliseconds assigned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerArchive {
    pub player_id: PlayerId,
    pub shard: Shard,
    pub version: u64,
    pub document: ArchiveDocument,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    /// Soft-delete marker. A deleted archive stays on disk for audit and
    /// is revived in place by the next successful overwrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at_ms: Option<i64>,
}

impl PlayerArchive {
    pub fn new(
        player_id: PlayerId,
        shard: Shard,
        version: u64,
        document: ArchiveDocument,
        now_ms: i64,
    ) -> Self {
        Self {
            player_id,
            shard,
            version,
            document,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            deleted_at_ms: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }

    /// Replace the document under a newer version, reviving the record if it
    /// was soft-deleted. Creation time is preserved.
    pub fn overwrite(&mut self, version: u64, document: ArchiveDocument, now_ms: i64) {
        self.version = version;
        self.document = document;
        self.updated_at_ms = now_ms;
        self.deleted_at_ms = None;
    }

    pub fn mark_deleted(&mut self, now_ms: i64) {
        self.deleted_at_ms = Some(now_ms);
        self.updated_at_ms = now_ms;
    }
}

/// What a save attempt did.
///
/// `Skipped` is a success, not an error: the caller's state was stale and
/// the stored archive already carries an equal or newer version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// No archive existed; one was created.
    Created,
    /// The incoming version was newer and the archive was overwritten.
    Updated,
    /// The stored version was equal or newer; nothing changed.
    Skipped,
}
