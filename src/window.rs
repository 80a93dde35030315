//! Time primitives shared by frames, matching, and configuration.

use serde::{Deserialize, Serialize};

/// Milliseconds since UNIX epoch (UTC).
pub type TimestampMs = i64;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Maximum absolute time distance for a temporal match, in milliseconds.
///
/// A candidate at distance exactly equal to the window still matches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchWindow {
    ms: i64,
}

impl MatchWindow {
    #[inline]
    #[must_use]
    pub const fn from_ms(ms: i64) -> Self {
        Self { ms }
    }

    /// Build a window from a (possibly fractional) number of days, rounded to the
    /// nearest millisecond.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_days(days: f64) -> Self {
        Self { ms: (days * DAY_MS as f64).round() as i64 }
    }

    #[inline]
    #[must_use]
    pub const fn as_ms(self) -> i64 {
        self.ms
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, distance: i64) -> bool {
        distance.abs() <= self.ms
    }
}

impl Default for MatchWindow {
    /// Half a day.
    fn default() -> Self {
        Self::from_ms(DAY_MS / 2)
    }
}

/// A closed time range: [start, end].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: TimestampMs,
    pub end: TimestampMs,
}

impl Period {
    #[inline]
    #[must_use]
    pub fn new(start: TimestampMs, end: TimestampMs) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, ts: TimestampMs) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// A timestamped element (event-time semantics).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Timestamped<T> {
    pub ts: TimestampMs,
    pub value: T,
}

impl<T> Timestamped<T> {
    #[inline] pub fn new(ts: TimestampMs, value: T) -> Self { Self { ts, value } }
}

/// Timestamp of midnight UTC on the given day counted from the epoch.
#[inline]
#[must_use]
pub const fn day(n: i64) -> TimestampMs {
    n * DAY_MS
}
