//! Pre-built series for common testing scenarios.

use crate::frame::TimeSeriesFrame;
use crate::window::{DAY_MS, TimestampMs, Timestamped, day};

/// Points at midnight of days `0, 1, 2, ...`.
///
/// # Example
///
/// ```
/// use ironval::testing::daily;
///
/// let pts = daily(&[0.1, 0.2]);
/// assert_eq!(pts[1].ts, 86_400_000);
/// ```
#[must_use]
pub fn daily(values: &[f64]) -> Vec<Timestamped<f64>> {
    shifted_daily(values, 0)
}

/// Like [`daily`], every timestamp moved by `offset_ms`.
#[must_use]
pub fn shifted_daily(values: &[f64], offset_ms: TimestampMs) -> Vec<Timestamped<f64>> {
    (0_i64..)
        .zip(values)
        .map(|(d, &v)| Timestamped::new(day(d) + offset_ms, v))
        .collect()
}

/// One-column daily frame.
#[must_use]
pub fn daily_frame(column: &str, values: &[f64]) -> TimeSeriesFrame {
    TimeSeriesFrame::from_series(column, daily(values))
}

/// One-column daily frame shifted by a number of hours.
#[must_use]
pub fn daily_frame_shifted(column: &str, values: &[f64], hours: i64) -> TimeSeriesFrame {
    TimeSeriesFrame::from_series(column, shifted_daily(values, hours * DAY_MS / 24))
}

/// `gain * x + offset` for every `x`.
#[must_use]
pub fn linear(x: &[f64], gain: f64, offset: f64) -> Vec<f64> {
    x.iter().map(|v| gain * v + offset).collect()
}

/// Deterministic pseudo-random values uniform in `[-0.5, 0.5)`.
///
/// Same `seed`, same sequence, on every platform.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    // splitmix64
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            (z >> 11) as f64 / (1_u64 << 53) as f64 - 0.5
        })
        .collect()
}

/// A seasonal-looking soil moisture signal with `n` daily values in roughly `[0.1, 0.4]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn soil_moisture_signal(n: usize, seed: u64) -> Vec<f64> {
    noise(n, seed)
        .into_iter()
        .enumerate()
        .map(|(i, e)| 0.25 + 0.1 * (i as f64 * std::f64::consts::TAU / 365.0).sin() + 0.05 * e)
        .collect()
}
