//! Rescaling matched columns into the data space of a reference column.
//!
//! Every column not belonging to the scaling reference dataset is transformed so its
//! distribution approximates the reference column's. Each method has its own minimum
//! number of complete observations; below it, scaling fails with
//! [`Error::InsufficientData`] and the caller skips the combination.

use crate::error::{Error, Result};
use crate::frame::{ColumnKey, MatchedFrame};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentiles used by CDF matching unless configured otherwise.
pub const DEFAULT_PERCENTILES: [f64; 9] = [0.0, 5.0, 10.0, 30.0, 50.0, 70.0, 90.0, 95.0, 100.0];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    #[default]
    None,
    CdfMatch,
    MinMax,
    MeanStd,
    TripleCollocation,
}

impl ScalingMethod {
    /// Smallest number of complete observations the method can be fitted on.
    #[must_use]
    pub const fn min_obs(self) -> usize {
        match self {
            Self::None => 0,
            Self::MinMax | Self::MeanStd => 2,
            Self::CdfMatch | Self::TripleCollocation => 3,
        }
    }

    /// Smallest number of columns (reference included) the method needs.
    #[must_use]
    pub const fn min_columns(self) -> usize {
        match self {
            Self::TripleCollocation => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::CdfMatch => "cdf_match",
            Self::MinMax => "min_max",
            Self::MeanStd => "mean_std",
            Self::TripleCollocation => "triple_collocation",
        };
        f.write_str(s)
    }
}

/// Which method to use and which dataset defines the target data space.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingSpec {
    pub method: ScalingMethod,
    /// Scaling reference dataset; `None` means the temporal reference.
    pub reference: Option<String>,
    /// Column of the reference dataset; `None` means its first configured column.
    pub column: Option<String>,
    /// Percentiles for [`ScalingMethod::CdfMatch`]; empty means [`DEFAULT_PERCENTILES`].
    pub percentiles: Vec<f64>,
}

impl ScalingSpec {
    #[must_use]
    pub fn new(method: ScalingMethod) -> Self {
        Self { method, ..Self::default() }
    }

    #[must_use]
    pub fn with_reference(mut self, dataset: impl Into<String>) -> Self {
        self.reference = Some(dataset.into());
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// A scaler bound to a resolved reference column.
#[derive(Clone, Debug)]
pub struct Scaler {
    method: ScalingMethod,
    reference: ColumnKey,
    percentiles: Vec<f64>,
}

impl Scaler {
    #[must_use]
    pub fn new(method: ScalingMethod, reference: ColumnKey) -> Self {
        Self {
            method,
            reference,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }

    #[must_use]
    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        if !percentiles.is_empty() {
            self.percentiles = percentiles;
        }
        self
    }

    #[must_use]
    pub const fn method(&self) -> ScalingMethod {
        self.method
    }

    #[must_use]
    pub const fn reference(&self) -> &ColumnKey {
        &self.reference
    }

    /// Scale every column outside the reference dataset.
    ///
    /// Parameters are fitted on the rows where both the column and the reference are
    /// present; the transform is then applied to every non-missing value.
    ///
    /// # Errors
    /// - [`Error::Configuration`] if the reference column is not part of `frame`.
    /// - [`Error::InsufficientData`] if there are too few columns or observations.
    pub fn scale(&self, frame: &MatchedFrame) -> Result<MatchedFrame> {
        if self.method == ScalingMethod::None {
            return Ok(frame.clone());
        }
        let reference = frame.column(&self.reference).ok_or_else(|| {
            Error::config(format!("scaling reference column {} is not matched", self.reference))
        })?;
        if frame.n_columns() < self.method.min_columns() {
            return Err(Error::insufficient(
                format!("{} scaling columns", self.method),
                self.method.min_columns(),
                frame.n_columns(),
            ));
        }

        let targets: Vec<ColumnKey> = frame
            .keys()
            .filter(|k| k.dataset != self.reference.dataset)
            .cloned()
            .collect();

        let mut out = frame.clone();
        for key in &targets {
            let src = frame.column(key).unwrap_or_default();
            let scaled = match self.method {
                ScalingMethod::None => src.to_vec(),
                ScalingMethod::MinMax => min_max(src, reference, self.method)?,
                ScalingMethod::MeanStd => mean_std(src, reference, self.method)?,
                ScalingMethod::CdfMatch => cdf_match(src, reference, &self.percentiles)?,
                ScalingMethod::TripleCollocation => {
                    // Columns of one dataset share its errors, so the instrument must
                    // come from a third dataset.
                    let instrument = targets
                        .iter()
                        .find(|k| k.dataset != key.dataset)
                        .and_then(|k| frame.column(k))
                        .ok_or_else(|| {
                            Error::insufficient("triple collocation instrument datasets", 1, 0)
                        })?;
                    triple_collocation(src, reference, instrument)?
                }
            };
            if let Some(dst) = out.column_mut(key) {
                dst.copy_from_slice(&scaled);
            }
        }
        Ok(out)
    }
}

/// Values at positions where every series is present.
fn complete_pairs(series: &[&[f64]]) -> Vec<Vec<f64>> {
    let n = series.first().map_or(0, |s| s.len());
    let rows: Vec<usize> = (0..n)
        .filter(|&i| series.iter().all(|s| !s[i].is_nan()))
        .collect();
    series
        .iter()
        .map(|s| rows.iter().map(|&i| s[i]).collect())
        .collect()
}

fn require(method: &str, needed: usize, found: usize) -> Result<()> {
    if found < needed {
        Err(Error::insufficient(format!("{method} scaling"), needed, found))
    } else {
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population standard deviation.
#[allow(clippy::cast_precision_loss)]
fn std_dev(v: &[f64]) -> f64 {
    let m = mean(v);
    (v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64).sqrt()
}

#[allow(clippy::cast_precision_loss)]
fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / a.len() as f64
}

fn extent(v: &[f64]) -> (f64, f64) {
    v.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

fn linear(src: &[f64], slope: f64, intercept: f64) -> Vec<f64> {
    src.iter().map(|x| x.mul_add(slope, intercept)).collect()
}

fn min_max(src: &[f64], reference: &[f64], method: ScalingMethod) -> Result<Vec<f64>> {
    let pairs = complete_pairs(&[src, reference]);
    require("min_max", method.min_obs(), pairs[0].len())?;
    let (s_lo, s_hi) = extent(&pairs[0]);
    let (r_lo, r_hi) = extent(&pairs[1]);
    if s_hi == s_lo {
        return Err(Error::insufficient("min_max scaling (distinct values)", 2, 1));
    }
    let slope = (r_hi - r_lo) / (s_hi - s_lo);
    Ok(linear(src, slope, r_lo - s_lo * slope))
}

fn mean_std(src: &[f64], reference: &[f64], method: ScalingMethod) -> Result<Vec<f64>> {
    let pairs = complete_pairs(&[src, reference]);
    require("mean_std", method.min_obs(), pairs[0].len())?;
    let s_std = std_dev(&pairs[0]);
    if s_std == 0.0 {
        return Err(Error::insufficient("mean_std scaling (distinct values)", 2, 1));
    }
    let slope = std_dev(&pairs[1]) / s_std;
    Ok(linear(src, slope, mean(&pairs[1]) - mean(&pairs[0]) * slope))
}

/// Linear-interpolated percentile of sorted data (`p` in 0..=100).
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentile(sorted: &[NotNan<f64>], p: f64) -> f64 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo].into_inner() + (sorted[hi].into_inner() - sorted[lo].into_inner()) * frac
}

fn sorted_finite(v: &[f64]) -> Vec<NotNan<f64>> {
    let mut out: Vec<NotNan<f64>> = v.iter().filter_map(|&x| NotNan::new(x).ok()).collect();
    out.sort_unstable();
    out
}

/// Piecewise-linear mapping from source percentiles onto reference percentiles,
/// extrapolated linearly beyond the outermost segments.
fn cdf_match(src: &[f64], reference: &[f64], percentiles: &[f64]) -> Result<Vec<f64>> {
    let pairs = complete_pairs(&[src, reference]);
    require("cdf_match", ScalingMethod::CdfMatch.min_obs(), pairs[0].len())?;
    let s_sorted = sorted_finite(&pairs[0]);
    let r_sorted = sorted_finite(&pairs[1]);

    // Collapse flat stretches so the mapping stays a function.
    let mut knots: Vec<(f64, f64)> = Vec::with_capacity(percentiles.len());
    for &p in percentiles {
        let (x, y) = (percentile(&s_sorted, p), percentile(&r_sorted, p));
        match knots.last() {
            Some(&(last_x, _)) if x <= last_x => {}
            _ => knots.push((x, y)),
        }
    }
    if knots.len() < 2 {
        return Err(Error::insufficient("cdf_match scaling (distinct percentiles)", 2, knots.len()));
    }

    Ok(src.iter().map(|&x| if x.is_nan() { x } else { interpolate(&knots, x) }).collect())
}

fn interpolate(knots: &[(f64, f64)], x: f64) -> f64 {
    let seg = knots
        .windows(2)
        .position(|w| x <= w[1].0)
        .unwrap_or(knots.len() - 2);
    let ((x0, y0), (x1, y1)) = (knots[seg], knots[seg + 1]);
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Scale `src` by the covariance ratio with an independent third series, which cancels
/// the error terms of `src` and `reference` under the triple-collocation error model.
fn triple_collocation(src: &[f64], reference: &[f64], instrument: &[f64]) -> Result<Vec<f64>> {
    let cols = complete_pairs(&[src, reference, instrument]);
    require("triple_collocation", ScalingMethod::TripleCollocation.min_obs(), cols[0].len())?;
    let (s, r, z) = (&cols[0], &cols[1], &cols[2]);
    let denom = covariance(s, z);
    if denom == 0.0 || denom.is_nan() {
        return Err(Error::insufficient("triple_collocation scaling (covariance)", 1, 0));
    }
    let beta = covariance(r, z) / denom;
    Ok(linear(src, beta, mean(r) - mean(s) * beta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(cols: Vec<(&str, Vec<f64>)>) -> Result<MatchedFrame> {
        let n = cols.first().map_or(0, |c| c.1.len());
        let index = (0..n as i64).collect();
        MatchedFrame::new(
            index,
            cols.into_iter()
                .map(|(ds, v)| (ColumnKey::new(ds, "sm"), v))
                .collect(),
        )
    }

    fn keyed(cols: Vec<(&str, &str, Vec<f64>)>) -> Result<MatchedFrame> {
        let n = cols.first().map_or(0, |c| c.2.len());
        MatchedFrame::new(
            (0..n as i64).collect(),
            cols.into_iter()
                .map(|(ds, col, v)| (ColumnKey::new(ds, col), v))
                .collect(),
        )
    }

    #[test]
    fn none_is_identity() -> Result<()> {
        let f = matched(vec![("a", vec![1.0, 2.0]), ("b", vec![10.0, 30.0])])?;
        let s = Scaler::new(ScalingMethod::None, ColumnKey::new("a", "sm")).scale(&f)?;
        assert_eq!(s, f);
        Ok(())
    }

    #[test]
    fn reference_dataset_is_untouched() -> Result<()> {
        let f = matched(vec![("a", vec![1.0, 2.0, 4.0]), ("b", vec![10.0, 30.0, 20.0])])?;
        let s = Scaler::new(ScalingMethod::MeanStd, ColumnKey::new("a", "sm")).scale(&f)?;
        assert_eq!(s.column(&ColumnKey::new("a", "sm")), f.column(&ColumnKey::new("a", "sm")));
        Ok(())
    }

    #[test]
    fn cdf_match_of_identical_distribution_is_near_identity() -> Result<()> {
        let v: Vec<f64> = (0..50).map(f64::from).collect();
        let f = matched(vec![("a", v.clone()), ("b", v.clone())])?;
        let s = Scaler::new(ScalingMethod::CdfMatch, ColumnKey::new("a", "sm")).scale(&f)?;
        let out = s.column(&ColumnKey::new("b", "sm")).unwrap_or_default();
        for (a, b) in out.iter().zip(&v) {
            assert!((a - b).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn cdf_match_maps_onto_reference_percentiles() -> Result<()> {
        let a: Vec<f64> = (0..=20).map(f64::from).collect();
        let b: Vec<f64> = a.iter().map(|x| x * x * 10.0).collect();
        let f = matched(vec![("a", a.clone()), ("b", b)])?;
        let s = Scaler::new(ScalingMethod::CdfMatch, ColumnKey::new("a", "sm")).scale(&f)?;
        let out = sorted_finite(s.column(&ColumnKey::new("b", "sm")).unwrap_or_default());
        let reference = sorted_finite(&a);
        for p in DEFAULT_PERCENTILES {
            let (got, want) = (percentile(&out, p), percentile(&reference, p));
            assert!((got - want).abs() < 1e-9, "p{p}: {got} != {want}");
        }
        Ok(())
    }

    #[test]
    fn cdf_match_extrapolates_beyond_the_fitted_range() -> Result<()> {
        // The last two rows have no reference value, so they are mapped but not fitted.
        let mut a: Vec<f64> = (0..=20).map(f64::from).collect();
        let mut b: Vec<f64> = a.iter().map(|x| x * x * 10.0).collect();
        a.extend([f64::NAN, f64::NAN]);
        b.extend([6250.0, -10.0]);
        let f = matched(vec![("a", a), ("b", b)])?;
        let s = Scaler::new(ScalingMethod::CdfMatch, ColumnKey::new("a", "sm")).scale(&f)?;
        let out = s.column(&ColumnKey::new("b", "sm")).unwrap_or_default();
        // Outer segments: (3610, 19)..(4000, 20) and (0, 0)..(10, 1).
        assert!((out[21] - (20.0 + 2250.0 / 390.0)).abs() < 1e-9);
        assert!((out[22] + 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn cdf_match_uses_custom_percentiles() -> Result<()> {
        let a: Vec<f64> = (0..=20).map(f64::from).collect();
        let b: Vec<f64> = a.iter().map(|x| x * x * 10.0).collect();
        let f = matched(vec![("a", a), ("b", b)])?;
        let s = Scaler::new(ScalingMethod::CdfMatch, ColumnKey::new("a", "sm"))
            .with_percentiles(vec![0.0, 50.0, 100.0])
            .scale(&f)?;
        let out = s.column(&ColumnKey::new("b", "sm")).unwrap_or_default();
        // 250 lies on the (0, 0)..(1000, 10) segment.
        assert!((out[5] - 2.5).abs() < 1e-9);
        assert!((out[10] - 10.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn min_max_matches_reference_extent() -> Result<()> {
        let f = matched(vec![("a", vec![0.1, 0.4, 0.3, 0.2]), ("b", vec![12.0, -3.0, 7.0, 40.0])])?;
        let s = Scaler::new(ScalingMethod::MinMax, ColumnKey::new("a", "sm")).scale(&f)?;
        let (lo, hi) = extent(s.column(&ColumnKey::new("b", "sm")).unwrap_or_default());
        assert!((lo - 0.1).abs() < 1e-12);
        assert!((hi - 0.4).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn mean_std_matches_reference_moments() -> Result<()> {
        let a = vec![0.1, 0.4, 0.3, 0.2, 0.35];
        let f = matched(vec![("a", a.clone()), ("b", vec![12.0, -3.0, 7.0, 40.0, 5.0])])?;
        let s = Scaler::new(ScalingMethod::MeanStd, ColumnKey::new("a", "sm")).scale(&f)?;
        let b = s.column(&ColumnKey::new("b", "sm")).unwrap_or_default();
        assert!((mean(b) - mean(&a)).abs() < 1e-12);
        assert!((std_dev(b) - std_dev(&a)).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn too_few_observations_is_insufficient_data() -> Result<()> {
        let cases = [
            (ScalingMethod::CdfMatch, vec![0.1, 0.2, f64::NAN]),
            (ScalingMethod::MinMax, vec![0.1, f64::NAN, f64::NAN]),
            (ScalingMethod::MeanStd, vec![f64::NAN, f64::NAN, 0.3]),
        ];
        for (method, a) in cases {
            let f = matched(vec![("a", a), ("b", vec![1.0, 2.0, 3.0])])?;
            let err = Scaler::new(method, ColumnKey::new("a", "sm")).scale(&f).unwrap_err();
            assert!(matches!(err, Error::InsufficientData { .. }), "{method}");
        }
        Ok(())
    }

    #[test]
    fn triple_collocation_needs_three_columns() -> Result<()> {
        let f = matched(vec![("a", vec![1.0, 2.0, 3.0]), ("b", vec![2.0, 4.0, 6.0])])?;
        let err = Scaler::new(ScalingMethod::TripleCollocation, ColumnKey::new("a", "sm"))
            .scale(&f)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
        Ok(())
    }

    #[test]
    fn triple_collocation_recovers_linear_gain() -> Result<()> {
        let truth = [0.1, 0.4, 0.2, 0.5, 0.3, 0.25];
        let a: Vec<f64> = truth.to_vec();
        let b: Vec<f64> = truth.iter().map(|t| 2.0 * t + 1.0).collect();
        let c: Vec<f64> = truth.iter().map(|t| -0.5 * t + 3.0).collect();
        let f = matched(vec![("a", a.clone()), ("b", b), ("c", c)])?;
        let s = Scaler::new(ScalingMethod::TripleCollocation, ColumnKey::new("a", "sm")).scale(&f)?;
        let scaled_b = s.column(&ColumnKey::new("b", "sm")).unwrap_or_default();
        for (x, y) in scaled_b.iter().zip(&a) {
            assert!((x - y).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn triple_collocation_instrument_comes_from_another_dataset() -> Result<()> {
        let truth = [0.1, 0.4, 0.2, 0.5, 0.3, 0.25];
        let err = [0.02, -0.01, 0.03, 0.0, -0.02, 0.01];
        let a = truth.to_vec();
        let b: Vec<f64> = truth.iter().zip(&err).map(|(t, e)| 2.0 * t + 1.0 + e).collect();
        let c: Vec<f64> = truth.iter().map(|t| -0.5 * t + 3.0).collect();
        let scaler = Scaler::new(ScalingMethod::TripleCollocation, ColumnKey::new("a", "sm"));

        let with_sibling = keyed(vec![
            ("a", "sm", a.clone()),
            ("b", "sm", b.clone()),
            ("b", "err", err.to_vec()),
            ("c", "sm", c.clone()),
        ])?;
        let without = keyed(vec![("a", "sm", a), ("b", "sm", b), ("c", "sm", c)])?;

        let b_sm = ColumnKey::new("b", "sm");
        let scaled = scaler.scale(&with_sibling)?;
        let reference = scaler.scale(&without)?;
        assert_eq!(scaled.column(&b_sm), reference.column(&b_sm));
        let (lo, hi) = extent(scaled.column(&b_sm).unwrap_or_default());
        assert!(hi - lo > 0.1);
        Ok(())
    }

    #[test]
    fn triple_collocation_without_a_third_dataset_is_insufficient() -> Result<()> {
        let f = keyed(vec![
            ("a", "sm", vec![1.0, 2.0, 3.0, 4.0]),
            ("b", "sm", vec![2.0, 4.0, 7.0, 8.0]),
            ("b", "alt", vec![1.0, 3.0, 2.0, 5.0]),
        ])?;
        let err = Scaler::new(ScalingMethod::TripleCollocation, ColumnKey::new("a", "sm"))
            .scale(&f)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
        Ok(())
    }
}
