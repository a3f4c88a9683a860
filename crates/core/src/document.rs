//! Opaque player-state document with a narrow typed accessor surface.
//!
//! The document is a JSON blob owned by the game client: currency, chapter
//! progress, inventory, the last boss-fight result, and whatever else the
//! client chooses to persist. This subsystem stores and returns it unchanged.
//! Only the handful of fields named by registered metrics (plus the display
//! name) are ever interpreted, and only through the accessors below; the
//! rest of the document has no schema on the server side.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque per-player progress document.
///
/// Wraps a [`serde_json::Value`] so the raw blob round-trips through
/// save/load without loss. Accessors return `None` rather than erroring:
/// a malformed field means "no valid value here", never a request failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveDocument(Value);

impl ArchiveDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Consume the wrapper, returning the raw JSON value.
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Borrow the raw JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The player-chosen display name, if present and a string.
    pub fn display_name(&self) -> Option<&str> {
        self.field(&["name"]).and_then(Value::as_str)
    }

    /// Walk a path of object keys, returning the value at the end.
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.0;
        for key in path {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Project a non-negative integer at `path`.
    ///
    /// Valid forms are a JSON string of ASCII digits or a JSON non-negative
    /// integer. Floats, negatives, non-digit strings, and missing fields are
    /// all invalid and yield `None`: an invalid value is excluded from
    /// aggregates, never coerced to zero.
    pub fn integer_field(&self, path: &[&str]) -> Option<u64> {
        match self.field(path)? {
            Value::String(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                s.parse().ok()
            }
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Project an epoch-milliseconds timestamp at `path`.
    ///
    /// Accepts a JSON integer or a string parseable as `i64`. Timestamps are
    /// only used for windowing; a record without a parseable timestamp is
    /// excluded from windowed queries.
    pub fn timestamp_field(&self, path: &[&str]) -> Option<i64> {
        match self.field(path)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

impl From<Value> for ArchiveDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
