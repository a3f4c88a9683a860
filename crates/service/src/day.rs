//! Calendar-day arithmetic in the configured timezone.
//!
//! Windowed metrics and the reward scheduler both work in whole calendar
//! days of one named timezone. A day's window is `[midnight, midnight+24h)`
//! in epoch milliseconds, inclusive start and exclusive end.

use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

const DAY_MS: i64 = 24 * 3_600 * 1_000;

/// Today's calendar date in `tz`.
pub fn current_day(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The calendar day before `day`. `None` only at the representable minimum.
pub fn previous_day(day: NaiveDate) -> Option<NaiveDate> {
    day.pred_opt()
}

/// `day` formatted `YYYYMMDD`, as used in reward lock keys.
pub fn compact(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// The window `[start, start + 24h)` for `day` in `tz`, epoch millis.
pub fn day_window_ms(tz: Tz, day: NaiveDate) -> (i64, i64) {
    let start = local_midnight(tz, day).timestamp_millis();
    (start, start + DAY_MS)
}

/// How long until the next local midnight in `tz` after `now`.
pub fn until_next_midnight(tz: Tz, now: DateTime<Utc>) -> Duration {
    let today = now.with_timezone(&tz).date_naive();
    let Some(tomorrow) = today.succ_opt() else {
        return Duration::from_secs(24 * 3_600);
    };
    let next_midnight = local_midnight(tz, tomorrow);
    (next_midnight.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Resolve local midnight of `day` in `tz`.
///
/// A timezone transition can skip or repeat midnight; the day then starts
/// at the first representable wall-clock instant (skipped) or the earlier
/// of the two (repeated).
fn local_midnight(tz: Tz, day: NaiveDate) -> DateTime<Tz> {
    let mut naive = day.and_time(NaiveTime::MIN);
    for _ in 0..8 {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => naive += TimeDelta::minutes(30),
        }
    }
    // The whole morning is unrepresentable (a zone skipped the entire day);
    // fall back to reading the wall-clock time as UTC.
    tz.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}
