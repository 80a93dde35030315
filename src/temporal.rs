//! Nearest-neighbour temporal matching.
//!
//! Every reference timestamp is paired with the single closest timestamp of each other
//! frame, provided the distance is within the [`MatchWindow`]. Equidistant candidates
//! resolve to the earlier one. The output always has exactly the reference index; rows
//! without a partner hold `NaN` in that partner's columns.
//!
//! Groups larger than two are matched pairwise against the same reference index and
//! concatenated, so the result does not depend on the order of `others`.

use crate::frame::{Frame, MatchedFrame, TimeSeriesFrame};
use crate::window::{MatchWindow, TimestampMs};
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TemporalMatcher {
    window: MatchWindow,
    unique: bool,
}

impl TemporalMatcher {
    #[must_use]
    pub const fn new(window: MatchWindow) -> Self {
        Self { window, unique: false }
    }

    /// When set, a candidate timestamp is used at most once: only the reference row
    /// closest to it (earliest on ties) keeps the match.
    #[must_use]
    pub const fn unique_matches(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    #[must_use]
    pub const fn window(&self) -> MatchWindow {
        self.window
    }

    /// For each reference timestamp, the position of its partner in `other`.
    ///
    /// `other` must be sorted ascending.
    #[must_use]
    pub fn nearest(&self, reference: &[TimestampMs], other: &[TimestampMs]) -> Vec<Option<usize>> {
        let mut matches: Vec<Option<usize>> = reference
            .iter()
            .map(|&ts| {
                let after = other.partition_point(|&t| t < ts);
                let best = match (after.checked_sub(1), (after < other.len()).then_some(after)) {
                    (Some(b), Some(a)) => {
                        if ts - other[b] <= other[a] - ts { b } else { a }
                    }
                    (Some(b), None) => b,
                    (None, Some(a)) => a,
                    (None, None) => return None,
                };
                self.window.contains(other[best] - ts).then_some(best)
            })
            .collect();

        if self.unique {
            keep_closest(reference, other, &mut matches);
        }
        matches
    }

    /// Re-index `other` onto `reference` by nearest match.
    #[must_use]
    pub fn align<K: Clone>(&self, reference: &[TimestampMs], other: &Frame<K>) -> Frame<K> {
        let other: Cow<'_, Frame<K>> = if other.is_strictly_ascending() {
            Cow::Borrowed(other)
        } else {
            Cow::Owned(other.clone().into_sorted())
        };
        let positions = self.nearest(reference, other.index());
        let mut out = Frame::with_index(reference.to_vec());
        for (key, values) in other.columns() {
            let aligned = positions
                .iter()
                .map(|p| p.map_or(f64::NAN, |i| values[i]))
                .collect();
            out.push_column_unchecked(key.clone(), aligned);
        }
        out
    }

    /// Match `others` against the `reference` dataset.
    ///
    /// Columns are qualified by dataset name: reference columns first, then each other
    /// dataset in the order given.
    #[must_use]
    pub fn match_frames(
        &self,
        reference: (&str, &TimeSeriesFrame),
        others: &[(&str, &TimeSeriesFrame)],
    ) -> MatchedFrame {
        let (ref_name, ref_frame) = reference;
        let index = ref_frame.index();
        let mut out = ref_frame.clone().into_matched(ref_name);
        for (name, frame) in others {
            let aligned = self.align(index, *frame).into_matched(name);
            for (key, values) in aligned.columns() {
                out.push_column_unchecked(key.clone(), values.to_vec());
            }
        }
        out
    }
}

fn keep_closest(reference: &[TimestampMs], other: &[TimestampMs], matches: &mut [Option<usize>]) {
    let mut winner: HashMap<usize, (usize, i64)> = HashMap::new();
    for (row, m) in matches.iter().enumerate() {
        if let Some(j) = *m {
            let dist = (other[j] - reference[row]).abs();
            winner
                .entry(j)
                .and_modify(|w| {
                    if dist < w.1 {
                        *w = (row, dist);
                    }
                })
                .or_insert((row, dist));
        }
    }
    for (row, m) in matches.iter_mut().enumerate() {
        if let Some(j) = *m
            && winner.get(&j).is_some_and(|w| w.0 != row)
        {
            *m = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    fn frame(index: Vec<i64>, values: Vec<f64>) -> Result<TimeSeriesFrame> {
        TimeSeriesFrame::new(index, vec![("v".to_string(), values)])
    }

    #[test]
    fn ties_prefer_earlier_candidate() {
        let m = TemporalMatcher::new(MatchWindow::from_ms(1_000));
        for delta in 1..=1_000 {
            let pos = m.nearest(&[5_000], &[5_000 - delta, 5_000 + delta]);
            assert_eq!(pos, vec![Some(0)], "delta {delta}");
        }
    }

    #[test]
    fn outside_window_is_missing() -> Result<()> {
        let m = TemporalMatcher::new(MatchWindow::from_ms(10));
        let other = frame(vec![0, 100], vec![1.0, 2.0])?;
        let out = m.align(&[5, 50, 111], &other);
        let v = out.column("v").unwrap_or_default();
        assert_eq!(v[0], 1.0);
        assert!(v[1].is_nan());
        assert!(v[2].is_nan());
        Ok(())
    }

    #[test]
    fn unique_mode_keeps_closest_reference_row() {
        let m = TemporalMatcher::new(MatchWindow::from_ms(10)).unique_matches(true);
        let pos = m.nearest(&[0, 4, 9], &[5]);
        assert_eq!(pos, vec![None, Some(0), None]);
    }

    #[test]
    fn unsorted_other_is_sorted_before_matching() -> Result<()> {
        let m = TemporalMatcher::new(MatchWindow::from_ms(0));
        let other = frame(vec![3, 1, 2], vec![30.0, 10.0, 20.0])?;
        let out = m.align(&[1, 2, 3], &other);
        assert_eq!(out.column("v"), Some(&[10.0, 20.0, 30.0][..]));
        Ok(())
    }
}
