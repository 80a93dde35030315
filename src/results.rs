//! Result keys and records.

use crate::calculators::MetricMap;
use crate::dataset::Job;
use crate::frame::ColumnKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Names every record carries besides its metrics.
pub const RESERVED_FIELDS: [&str; 4] = ["gpi", "lon", "lat", "n_obs"];

/// The ordered (dataset, column) pairs a result was computed from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey(Vec<ColumnKey>);

impl ResultKey {
    #[must_use]
    pub fn new(pairs: Vec<ColumnKey>) -> Self {
        Self(pairs)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(pairs.into_iter().map(|(d, c)| ColumnKey::new(d, c)).collect())
    }

    #[must_use]
    pub fn pairs(&self) -> &[ColumnKey] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.dataset.as_str())
    }

    /// Output name derived only from the pairs, e.g. `A.v_with_B.v`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("_with_")
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|c| format!("('{}', '{}')", c.dataset, c.column))
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Metrics for one key at one job, plus the job location and the number of matched rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub gpi: u64,
    pub lon: f64,
    pub lat: f64,
    pub n_obs: usize,
    #[serde(flatten)]
    pub metrics: MetricMap,
}

impl ResultRecord {
    #[must_use]
    pub fn new(job: &Job, n_obs: usize, mut metrics: MetricMap) -> Self {
        for name in RESERVED_FIELDS {
            if metrics.remove(name).is_some() {
                warn!(metric = name, "calculator output shadows a reserved field; dropped");
            }
        }
        Self {
            gpi: job.gpi,
            lon: job.lon,
            lat: job.lat,
            n_obs,
            metrics,
        }
    }

    /// First value of a metric.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(|v| v.first().copied())
    }

    /// Uniform shape: every field as a numeric array.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_arrays(&self) -> BTreeMap<String, Vec<f64>> {
        let mut out = self.metrics.clone();
        out.insert("gpi".into(), vec![self.gpi as f64]);
        out.insert("lon".into(), vec![self.lon]);
        out.insert("lat".into(), vec![self.lat]);
        out.insert("n_obs".into(), vec![self.n_obs as f64]);
        out
    }
}

/// Everything a job produced, ordered by key.
pub type JobResults = BTreeMap<ResultKey, ResultRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_joins_pairs() {
        let key = ResultKey::from_pairs([("A", "v"), ("B", "sm")]);
        assert_eq!(key.file_stem(), "A.v_with_B.sm");
        assert_eq!(key.to_string(), "(('A', 'v'), ('B', 'sm'))");
    }

    #[test]
    fn reserved_metric_names_are_dropped() {
        let job = Job::new(7, 1.0, 2.0);
        let metrics = MetricMap::from([
            ("n_obs".to_string(), vec![99.0]),
            ("R".to_string(), vec![0.5]),
        ]);
        let rec = ResultRecord::new(&job, 3, metrics);
        assert_eq!(rec.n_obs, 3);
        assert_eq!(rec.to_arrays()["n_obs"], vec![3.0]);
        assert_eq!(rec.metric("R"), Some(0.5));
    }

    #[test]
    fn record_serializes_flat() -> anyhow::Result<()> {
        let metrics = MetricMap::from([("R".to_string(), vec![1.0])]);
        let rec = ResultRecord::new(&Job::new(1, 0.5, 0.25), 5, metrics);
        let json = serde_json::to_value(&rec)?;
        assert_eq!(json["R"], serde_json::json!([1.0]));
        assert_eq!(json["gpi"], serde_json::json!(1));
        let back: ResultRecord = serde_json::from_value(json)?;
        assert_eq!(back, rec);
        Ok(())
    }
}
