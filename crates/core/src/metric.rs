//! Declarative metric registry.
//!
//! Each leaderboard metric names the document field it ranks on and,
//! optionally, the timestamp field that scopes it to a time window. Adding
//! a metric means adding a variant here; the query engine, cache keys, and
//! scheduler all derive their behavior from this table.

use crate::document::ArchiveDocument;

/// A rankable metric projected from the archive document.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Metric {
    /// Currency balance, ranked all-time.
    Gold,
    /// Story progress, ranked all-time.
    Chapter,
    /// Damage dealt in the latest boss fight, ranked within a day window.
    #[strum(serialize = "damage")]
    BossDamage,
}

impl Metric {
    /// Every registered metric, in registry order.
    pub fn all() -> [Metric; 3] {
        [Metric::Gold, Metric::Chapter, Metric::BossDamage]
    }

    /// Document path holding the ranked value.
    pub fn value_path(self) -> &'static [&'static str] {
        match self {
            Metric::Gold => &["gold"],
            Metric::Chapter => &["chapter"],
            Metric::BossDamage => &["boss_last_result", "damage"],
        }
    }

    /// Document path holding the window timestamp, for windowed metrics.
    pub fn window_path(self) -> Option<&'static [&'static str]> {
        match self {
            Metric::Gold | Metric::Chapter => None,
            Metric::BossDamage => Some(&["boss_last_result", "updated_at"]),
        }
    }

    pub fn is_windowed(self) -> bool {
        self.window_path().is_some()
    }

    /// Project this metric from a document.
    ///
    /// Returns `None` when the value is missing or invalid, or when a
    /// windowed metric lacks a parseable timestamp. Callers apply the
    /// window bounds themselves; the sample only carries the raw reading.
    pub fn sample(self, document: &ArchiveDocument) -> Option<MetricSample> {
        let value = document.integer_field(self.value_path())?;
        let at_ms = match self.window_path() {
            Some(path) => Some(document.timestamp_field(path)?),
            None => None,
        };
        Some(MetricSample { value, at_ms })
    }
}

/// One valid metric reading from a single archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricSample {
    pub value: u64,
    /// When the reading was produced, for windowed metrics only.
    pub at_ms: Option<i64>,
}

impl MetricSample {
    /// Whether this sample falls inside `[start_ms, end_ms)`.
    ///
    /// Unwindowed samples are always in range.
    pub fn in_window(&self, start_ms: i64, end_ms: i64) -> bool {
        match self.at_ms {
            Some(at) => at >= start_ms && at < end_ms,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn names_round_trip_through_strum() {
        assert_eq!(Metric::Gold.to_string(), "gold");
        assert_eq!(Metric::Chapter.to_string(), "chapter");
        assert_eq!(Metric::BossDamage.to_string(), "damage");
        for metric in Metric::all() {
            assert_eq!(Metric::from_str(metric.as_ref()).unwrap(), metric);
        }
    }

    #[test]
    fn unwindowed_metric_samples_value_only() {
        let doc = ArchiveDocument::new(json!({"gold": "500"}));
        let sample = Metric::Gold.sample(&doc).unwrap();
        assert_eq!(sample.value, 500);
        assert_eq!(sample.at_ms, None);
    }

    #[test]
    fn windowed_metric_requires_timestamp() {
        let with_ts = ArchiveDocument::new(json!({
            "boss_last_result": {"damage": "9000", "updated_at": 1_700_000_000_000_i64}
        }));
        let sample = Metric::BossDamage.sample(&with_ts).unwrap();
        assert_eq!(sample.value, 9000);
        assert_eq!(sample.at_ms, Some(1_700_000_000_000));

        let without_ts = ArchiveDocument::new(json!({
            "boss_last_result": {"damage": "9000"}
        }));
        assert_eq!(Metric::BossDamage.sample(&without_ts), None);
    }

    #[test]
    fn invalid_value_yields_no_sample() {
        let doc = ArchiveDocument::new(json!({"gold": "12a"}));
        assert_eq!(Metric::Gold.sample(&doc), None);
    }

    #[test]
    fn window_bounds_are_inclusive_exclusive() {
        let sample = |at| MetricSample { value: 1, at_ms: Some(at) };
        assert!(sample(100).in_window(100, 200));
        assert!(!sample(99).in_window(100, 200));
        assert!(sample(199).in_window(100, 200));
        assert!(!sample(200).in_window(100, 200));
    }

    #[test]
    fn unwindowed_sample_ignores_bounds() {
        let sample = MetricSample { value: 1, at_ms: None };
        assert!(sample.in_window(100, 200));
    }
}
