//! Assertion functions for metrics and frames.
//!
//! `NaN` compares equal to `NaN` in all of them: a missing metric is a legitimate
//! expected value.

use crate::frame::Frame;
use crate::results::{JobResults, ResultKey};
use std::borrow::Borrow;
use std::fmt::Debug;

/// Assert that two numbers agree within `tol`.
///
/// # Panics
///
/// Panics if exactly one value is `NaN` or they differ by more than `tol`.
///
/// # Example
///
/// ```
/// use ironval::testing::assert_close;
///
/// assert_close(0.1 + 0.2, 0.3, 1e-12);
/// assert_close(f64::NAN, f64::NAN, 0.0);
/// ```
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    if actual.is_nan() && expected.is_nan() {
        return;
    }
    assert!(
        (actual - expected).abs() <= tol,
        "Value mismatch:\n  Expected: {expected}\n  Actual: {actual}\n  Tolerance: {tol}"
    );
}

/// Assert that two slices agree element-wise within `tol`.
///
/// # Panics
///
/// Panics if lengths differ or any pair fails [`assert_close`].
pub fn assert_all_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if a.is_nan() && e.is_nan() {
            continue;
        }
        assert!(
            (a - e).abs() <= tol,
            "Mismatch at index {i}:\n  Expected: {e}\n  Actual: {a}\n  \
             Full expected: {expected:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Assert that a frame column holds the expected values.
///
/// # Panics
///
/// Panics if the column is absent or its values differ.
pub fn assert_column_close<K, Q>(frame: &Frame<K>, key: &Q, expected: &[f64], tol: f64)
where
    K: Borrow<Q>,
    Q: PartialEq + Debug + ?Sized,
{
    let Some(values) = frame.column(key) else {
        panic!("Column {key:?} not found");
    };
    assert_all_close(values, expected, tol);
}

/// Assert that `results` holds exactly the given keys.
///
/// # Panics
///
/// Panics listing both key sets if they differ.
pub fn assert_result_keys(results: &JobResults, expected: &[ResultKey]) {
    let mut want: Vec<&ResultKey> = expected.iter().collect();
    want.sort();
    let got: Vec<&ResultKey> = results.keys().collect();
    assert_eq!(
        got, want,
        "Result key mismatch:\n  Expected: {want:?}\n  Actual: {got:?}"
    );
}
