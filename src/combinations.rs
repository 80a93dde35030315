//! Enumeration of dataset subsets and column groups.
//!
//! A [`MatchSpec`] `(n, k)` asks for every subset of `n` datasets (temporal reference
//! included) to be matched together, and for every group of `k` columns from such a
//! matched frame to be handed to one metric calculator. Column groups always contain
//! exactly one column of the reference and at most one column per dataset.
//!
//! Enumeration is lexicographic over configuration order, so the same configuration
//! always produces the same sequence.

use crate::frame::{ColumnKey, MatchedFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporal matching group size `n` and metric input size `k`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchSpec {
    pub n: usize,
    pub k: usize,
}

impl MatchSpec {
    #[must_use]
    pub const fn new(n: usize, k: usize) -> Self {
        Self { n, k }
    }
}

impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.n, self.k)
    }
}

/// All size-`k` index combinations of `0..len`, lexicographic.
#[must_use]
pub fn index_combinations(len: usize, k: usize) -> Vec<Vec<usize>> {
    if k > len {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // rightmost position that can still advance
        let Some(i) = (0..k).rev().find(|&i| idx[i] < len - k + i) else {
            return out;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

fn cartesian<T: Clone>(lists: &[&[T]]) -> Vec<Vec<T>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |item| {
                    let mut next = prefix.clone();
                    next.push(item.clone());
                    next
                })
            })
            .collect()
    })
}

#[derive(Clone, Debug)]
pub struct CombinationBuilder {
    reference: String,
}

impl CombinationBuilder {
    pub fn new(reference: impl Into<String>) -> Self {
        Self { reference: reference.into() }
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Subsets of `n - 1` datasets from `others`, to be matched with the reference.
    #[must_use]
    pub fn dataset_subsets<'a>(&self, others: &[&'a str], n: usize) -> Vec<Vec<&'a str>> {
        if n == 0 {
            return Vec::new();
        }
        index_combinations(others.len(), n - 1)
            .into_iter()
            .map(|c| c.into_iter().map(|i| others[i]).collect())
            .collect()
    }

    /// Column groups of size `k` from a matched frame.
    ///
    /// Each group is one reference column followed by one column from each of `k - 1`
    /// other datasets, in frame order.
    #[must_use]
    pub fn column_groups(&self, frame: &MatchedFrame, k: usize) -> Vec<Vec<ColumnKey>> {
        if k == 0 {
            return Vec::new();
        }
        let mut reference: Vec<ColumnKey> = Vec::new();
        let mut others: Vec<(String, Vec<ColumnKey>)> = Vec::new();
        for key in frame.keys() {
            if key.dataset == self.reference {
                reference.push(key.clone());
            } else if let Some((_, cols)) = others.iter_mut().find(|(ds, _)| *ds == key.dataset) {
                cols.push(key.clone());
            } else {
                others.push((key.dataset.clone(), vec![key.clone()]));
            }
        }
        if reference.is_empty() {
            return Vec::new();
        }

        let mut groups = Vec::new();
        for combo in index_combinations(others.len(), k - 1) {
            let mut lists: Vec<&[ColumnKey]> = vec![reference.as_slice()];
            lists.extend(combo.iter().map(|&i| others[i].1.as_slice()));
            groups.extend(cartesian(&lists));
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn combinations_are_lexicographic() {
        assert_eq!(
            index_combinations(4, 2),
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(index_combinations(2, 0), vec![Vec::<usize>::new()]);
        assert!(index_combinations(2, 3).is_empty());
    }

    #[test]
    fn subsets_exclude_reference() {
        let b = CombinationBuilder::new("A");
        let subsets = b.dataset_subsets(&["B", "C", "D"], 3);
        assert_eq!(subsets, vec![vec!["B", "C"], vec!["B", "D"], vec!["C", "D"]]);
    }

    #[test]
    fn column_groups_pair_reference_with_each_dataset_column() -> Result<()> {
        let frame = MatchedFrame::new(
            vec![1],
            vec![
                (ColumnKey::new("A", "v"), vec![1.0]),
                (ColumnKey::new("B", "x"), vec![1.0]),
                (ColumnKey::new("B", "y"), vec![1.0]),
                (ColumnKey::new("C", "v"), vec![1.0]),
            ],
        )?;
        let groups = CombinationBuilder::new("A").column_groups(&frame, 2);
        let shown: Vec<String> = groups
            .iter()
            .map(|g| g.iter().map(ToString::to_string).collect::<Vec<_>>().join("|"))
            .collect();
        assert_eq!(shown, vec!["A.v|B.x", "A.v|B.y", "A.v|C.v"]);
        assert!(groups.iter().all(|g| g.len() == 2));

        let triples = CombinationBuilder::new("A").column_groups(&frame, 3);
        assert_eq!(triples.len(), 2);
        Ok(())
    }
}
