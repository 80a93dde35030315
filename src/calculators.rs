//! Metric calculators: pure functions from an aligned frame to named metrics.
//!
//! Anything implementing [`MetricCalculator`] can be registered against a
//! [`MatchSpec`](crate::MatchSpec), including plain closures:
//!
//! ```
//! use ironval::{MatchedFrame, MetricMap};
//!
//! let count = |frame: &MatchedFrame| -> MetricMap {
//!     MetricMap::from([("rows".to_string(), vec![frame.len() as f64])])
//! };
//! # let _ = count;
//! ```
//!
//! Calculators receive frames with exactly `k` columns (reference first) and no missing
//! values. They must not keep state between calls and should report undefined statistics
//! as `NaN` rather than panicking on short inputs.

use crate::frame::MatchedFrame;
use ordered_float::NotNan;
use std::collections::BTreeMap;

/// Metric name to value(s).
pub type MetricMap = BTreeMap<String, Vec<f64>>;

pub trait MetricCalculator: Send + Sync {
    fn calculate(&self, frame: &MatchedFrame) -> MetricMap;
}

impl<F> MetricCalculator for F
where
    F: Fn(&MatchedFrame) -> MetricMap + Send + Sync,
{
    fn calculate(&self, frame: &MatchedFrame) -> MetricMap {
        self(frame)
    }
}

/// Pairwise agreement between the first two columns of a frame.
///
/// Emits `R` (Pearson), `rho` (Spearman), `BIAS` (mean of second minus first),
/// `RMSD`, `ubRMSD`, and `mse`, all computed with the first column as reference.
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicMetrics;

impl MetricCalculator for BasicMetrics {
    fn calculate(&self, frame: &MatchedFrame) -> MetricMap {
        let mut cols = frame.columns().map(|(_, v)| v);
        let (x, y) = match (cols.next(), cols.next()) {
            (Some(x), Some(y)) => (x, y),
            _ => (&[][..], &[][..]),
        };
        let bias = bias(x, y);
        let rmsd = rmsd(x, y);
        let ub = if rmsd.is_nan() {
            f64::NAN
        } else {
            (rmsd.powi(2) - bias.powi(2)).max(0.0).sqrt()
        };
        MetricMap::from([
            ("R".to_string(), vec![pearson_r(x, y)]),
            ("rho".to_string(), vec![spearman_rho(x, y)]),
            ("BIAS".to_string(), vec![bias]),
            ("RMSD".to_string(), vec![rmsd]),
            ("ubRMSD".to_string(), vec![ub]),
            ("mse".to_string(), vec![rmsd.powi(2)]),
        ])
    }
}

/// Pearson correlation; `NaN` for fewer than two observations or zero variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson_r(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Spearman rank correlation (average ranks for ties).
#[must_use]
pub fn spearman_rho(x: &[f64], y: &[f64]) -> f64 {
    pearson_r(&ranks(x), &ranks(y))
}

#[allow(clippy::cast_precision_loss)]
fn ranks(v: &[f64]) -> Vec<f64> {
    let mut order: Vec<(NotNan<f64>, usize)> = v
        .iter()
        .enumerate()
        .filter_map(|(i, &x)| NotNan::new(x).ok().map(|x| (x, i)))
        .collect();
    order.sort_unstable();
    let mut out = vec![f64::NAN; v.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && order[end + 1].0 == order[start].0 {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for item in &order[start..=end] {
            out[item.1] = rank;
        }
        start = end + 1;
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn bias(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return f64::NAN;
    }
    x.iter().zip(y).map(|(a, b)| b - a).sum::<f64>() / n as f64
}

#[allow(clippy::cast_precision_loss)]
fn rmsd(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return f64::NAN;
    }
    (x.iter().zip(y).map(|(a, b)| (b - a).powi(2)).sum::<f64>() / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_of_linear_relation_is_one() {
        let r = pearson_r(&[0.1, 0.2, 0.3, 0.4, 0.5], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn short_inputs_yield_nan() {
        assert!(pearson_r(&[1.0], &[2.0]).is_nan());
        assert!(pearson_r(&[1.0, 1.0], &[2.0, 3.0]).is_nan());
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0]), vec![1.5, 3.0, 1.5]);
    }

    #[test]
    fn basic_metrics_on_empty_frame_are_nan() {
        let m = BasicMetrics.calculate(&MatchedFrame::default());
        assert!(m.values().all(|v| v.len() == 1 && v[0].is_nan()));
    }
}
