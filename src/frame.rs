//! Time-indexed column tables.
//!
//! A [`Frame<K>`] is a time index plus any number of equally long `f64` columns keyed
//! by `K`. Missing values are `NaN`. Two aliases cover the two shapes used throughout
//! the crate:
//!
//! - [`TimeSeriesFrame`]: columns keyed by variable name, as returned by a reader.
//! - [`MatchedFrame`]: columns keyed by [`ColumnKey`] (dataset + variable), as produced
//!   by temporal matching, so identical variable names from different datasets never
//!   collide.
//!
//! Frames are value objects: every transformation returns a new frame.

use crate::error::{Error, Result};
use crate::window::{Period, TimestampMs, Timestamped};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A column qualified by the dataset it came from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub dataset: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(dataset: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.column)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame<K> {
    index: Vec<TimestampMs>,
    columns: Vec<(K, Vec<f64>)>,
}

pub type TimeSeriesFrame = Frame<String>;
pub type MatchedFrame = Frame<ColumnKey>;

impl<K> Default for Frame<K> {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl<K> Frame<K> {
    /// A frame with the given index and no columns yet.
    #[must_use]
    pub fn with_index(index: Vec<TimestampMs>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Build a frame from an index and columns.
    ///
    /// # Errors
    /// Returns an error if any column length differs from the index length.
    pub fn new(index: Vec<TimestampMs>, columns: Vec<(K, Vec<f64>)>) -> Result<Self>
    where
        K: fmt::Display,
    {
        let mut frame = Self::with_index(index);
        for (key, values) in columns {
            frame = frame.with_column(key, values)?;
        }
        Ok(frame)
    }

    /// Append a column.
    ///
    /// # Errors
    /// Returns an error if `values` does not have one entry per index row.
    pub fn with_column(mut self, key: K, values: Vec<f64>) -> Result<Self>
    where
        K: fmt::Display,
    {
        if values.len() != self.index.len() {
            return Err(Error::Other(anyhow!(
                "column '{key}' has {} values for {} timestamps",
                values.len(),
                self.index.len()
            )));
        }
        self.columns.push((key, values));
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> &[TimestampMs] {
        &self.index
    }

    #[inline]
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.columns.iter().map(|(k, _)| k)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&K, &[f64])> {
        self.columns.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn column<Q>(&self, key: &Q) -> Option<&[f64]>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.columns
            .iter()
            .find(|(k, _)| k.borrow() == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn column_mut<Q>(&mut self, key: &Q) -> Option<&mut [f64]>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.columns
            .iter_mut()
            .find(|(k, _)| k.borrow() == key)
            .map(|(_, v)| v.as_mut_slice())
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.column(key).is_some()
    }

    /// True when the index is strictly increasing.
    #[must_use]
    pub fn is_strictly_ascending(&self) -> bool {
        self.index.windows(2).all(|w| w[0] < w[1])
    }

    /// True when the frame has no rows or no finite value in any column.
    #[must_use]
    pub fn is_all_missing(&self) -> bool {
        self.columns
            .iter()
            .all(|(_, v)| v.iter().all(|x| x.is_nan()))
    }

    /// Keep the rows where `keep[i]` is true.
    #[must_use]
    pub fn filter_rows(&self, keep: &[bool]) -> Self
    where
        K: Clone,
    {
        debug_assert_eq!(keep.len(), self.index.len());
        let pick = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(keep)
                .filter_map(|(x, k)| k.then_some(*x))
                .collect()
        };
        Self {
            index: pick_index(&self.index, keep),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), pick(v)))
                .collect(),
        }
    }

    /// Keep the rows whose timestamp lies inside `period`.
    #[must_use]
    pub fn restrict_to(&self, period: Period) -> Self
    where
        K: Clone,
    {
        let keep: Vec<bool> = self.index.iter().map(|t| period.contains(*t)).collect();
        self.filter_rows(&keep)
    }

    /// Drop every row that has a missing value in any column.
    #[must_use]
    pub fn drop_incomplete(&self) -> Self
    where
        K: Clone,
    {
        let keep: Vec<bool> = (0..self.len())
            .map(|i| self.columns.iter().all(|(_, v)| !v[i].is_nan()))
            .collect();
        self.filter_rows(&keep)
    }

    /// Drop every row where all columns picked by `among` are missing.
    ///
    /// Rows are kept when no column is picked.
    #[must_use]
    pub fn drop_all_missing(&self, among: impl Fn(&K) -> bool) -> Self
    where
        K: Clone,
    {
        let picked: Vec<&[f64]> = self
            .columns
            .iter()
            .filter(|(k, _)| among(k))
            .map(|(_, v)| v.as_slice())
            .collect();
        if picked.is_empty() {
            return self.clone();
        }
        let keep: Vec<bool> = (0..self.len())
            .map(|i| picked.iter().any(|v| !v[i].is_nan()))
            .collect();
        self.filter_rows(&keep)
    }

    /// Project onto `keys`, in the order given.
    ///
    /// # Errors
    /// Returns the first key that is not present.
    pub fn select<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> std::result::Result<Self, K>
    where
        K: Clone + PartialEq + 'a,
    {
        let mut columns = Vec::new();
        for key in keys {
            let values = self.column(key).ok_or_else(|| key.clone())?;
            columns.push((key.clone(), values.to_vec()));
        }
        Ok(Self {
            index: self.index.clone(),
            columns,
        })
    }

    /// Sort rows by time and drop repeated timestamps (first occurrence wins).
    #[must_use]
    pub fn into_sorted(self) -> Self {
        if self.is_strictly_ascending() {
            return self;
        }
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);
        order.dedup_by_key(|i| self.index[*i]);
        let index = order.iter().map(|&i| self.index[i]).collect();
        let columns = self
            .columns
            .into_iter()
            .map(|(k, v)| (k, order.iter().map(|&i| v[i]).collect()))
            .collect();
        Self { index, columns }
    }

    /// Re-key every column.
    pub fn map_keys<K2>(self, f: impl Fn(K) -> K2) -> Frame<K2> {
        Frame {
            index: self.index,
            columns: self.columns.into_iter().map(|(k, v)| (f(k), v)).collect(),
        }
    }

    pub(crate) fn push_column_unchecked(&mut self, key: K, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.index.len());
        self.columns.push((key, values));
    }
}

impl TimeSeriesFrame {
    /// Single-column frame from timestamped points (sorted on the way in).
    #[must_use]
    pub fn from_series(name: impl Into<String>, points: Vec<Timestamped<f64>>) -> Self {
        let (index, values): (Vec<_>, Vec<_>) = points.into_iter().map(|p| (p.ts, p.value)).unzip();
        let mut frame = Self::with_index(index);
        frame.push_column_unchecked(name.into(), values);
        frame.into_sorted()
    }

    /// Qualify every column with `dataset`.
    #[must_use]
    pub fn into_matched(self, dataset: &str) -> MatchedFrame {
        self.map_keys(|column| ColumnKey::new(dataset, column))
    }
}

fn pick_index(index: &[TimestampMs], keep: &[bool]) -> Vec<TimestampMs> {
    index
        .iter()
        .zip(keep)
        .filter_map(|(t, k)| k.then_some(*t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_dedups_index() -> Result<()> {
        let f = TimeSeriesFrame::new(
            vec![3, 1, 2, 1],
            vec![("v".to_string(), vec![30.0, 10.0, 20.0, 11.0])],
        )?
        .into_sorted();
        assert_eq!(f.index(), &[1, 2, 3]);
        assert_eq!(f.column("v"), Some(&[10.0, 20.0, 30.0][..]));
        Ok(())
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = TimeSeriesFrame::new(vec![1, 2], vec![("v".to_string(), vec![1.0])]);
        assert!(err.is_err());
    }

    #[test]
    fn drop_incomplete_removes_any_nan_row() -> Result<()> {
        let f = TimeSeriesFrame::new(
            vec![1, 2, 3],
            vec![
                ("a".to_string(), vec![1.0, f64::NAN, 3.0]),
                ("b".to_string(), vec![1.0, 2.0, f64::NAN]),
            ],
        )?;
        let d = f.drop_incomplete();
        assert_eq!(d.index(), &[1]);
        Ok(())
    }

    #[test]
    fn drop_all_missing_only_looks_at_picked_columns() -> Result<()> {
        let f = TimeSeriesFrame::new(
            vec![1, 2, 3, 4],
            vec![
                ("ref".to_string(), vec![1.0, 2.0, f64::NAN, 4.0]),
                ("x".to_string(), vec![1.0, f64::NAN, 3.0, f64::NAN]),
                ("y".to_string(), vec![f64::NAN, f64::NAN, 3.0, 4.0]),
            ],
        )?;
        let d = f.drop_all_missing(|k| k != "ref");
        assert_eq!(d.index(), &[1, 3, 4]);
        assert_eq!(f.drop_all_missing(|_| false), f);
        Ok(())
    }

    #[test]
    fn select_reports_missing_key() -> Result<()> {
        let f = TimeSeriesFrame::new(vec![1], vec![("a".to_string(), vec![1.0])])?;
        let missing = f.select(&["a".to_string(), "b".to_string()]).unwrap_err();
        assert_eq!(missing, "b");
        Ok(())
    }
}
