//! The per-job validation pipeline.
//!
//! A [`Validation`] is built once from datasets, masking datasets, settings, and metric
//! calculators, then [`Validation::calc`] is called once per job. Each job walks through
//! the stages of [`JobStage`]:
//!
//! 1. **Read** every dataset; datasets without data are marked unavailable.
//! 2. **Mask** the temporal reference with every masking dataset, then apply the period.
//! 3. **Match** each subset of available datasets required by a [`MatchSpec`] against the
//!    masked reference and drop rows no other dataset matched.
//! 4. **Scale** each matched subset into the scaling reference's data space.
//! 5. **Dispatch** every column group of size `k`, restricted to the rows where all of
//!    its columns are present, to the calculator registered for `(n, k)` and store the
//!    metrics under the group's [`ResultKey`].
//!
//! Subsets that are too short or cannot be scaled are skipped and simply produce no
//! keys. Any other failure aborts the job and no partial results are returned.
//!
//! # Example
//!
//! ```no_run
//! use ironval::*;
//! use ironval::testing::InMemoryReader;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ismn = InMemoryReader::new();
//! let ascat = InMemoryReader::new();
//!
//! let validation = Validation::builder()
//!     .dataset(DatasetSpec::new("ISMN", ismn, ["soil_moisture"]))
//!     .dataset(DatasetSpec::new("ASCAT", ascat, ["sm"]))
//!     .scaling(ScalingSpec::new(ScalingMethod::CdfMatch))
//!     .metric(2, 2, BasicMetrics)
//!     .build()?;
//!
//! let results = validation.calc(&Job::new(42, 16.37, 48.21))?;
//! for (key, record) in &results {
//!     println!("{key}: R = {:?}, n_obs = {}", record.metric("R"), record.n_obs);
//! }
//! # Ok(())
//! # }
//! ```

use crate::calculators::MetricCalculator;
use crate::combinations::{CombinationBuilder, MatchSpec};
use crate::config::ValidationConfig;
use crate::data_manager::{Availability, DataManager, JobData};
use crate::dataset::{DatasetSpec, Job};
use crate::error::{Error, Result};
use crate::frame::{ColumnKey, MatchedFrame, TimeSeriesFrame};
use crate::masking::Masker;
use crate::results::{JobResults, ResultKey, ResultRecord};
use crate::scaling::{ScalingMethod, ScalingSpec, Scaler};
use crate::temporal::TemporalMatcher;
use crate::window::Period;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// Stage a job is in; reported on failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobStage {
    Init,
    Read,
    Mask,
    Match,
    Scale,
    Dispatch,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Read => "read",
            Self::Mask => "mask",
            Self::Match => "match",
            Self::Scale => "scale",
            Self::Dispatch => "dispatch",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Collects datasets, settings, and calculators for a [`Validation`].
#[derive(Default)]
pub struct ValidationBuilder {
    config: ValidationConfig,
    datasets: Vec<DatasetSpec>,
    masking: Vec<DatasetSpec>,
    calculators: BTreeMap<MatchSpec, Arc<dyn MetricCalculator>>,
}

impl ValidationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all settings at once, including any made by earlier setter calls.
    ///
    /// Call this first and chain the individual setters after it to override single
    /// fields of a loaded configuration.
    #[must_use]
    pub fn config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn dataset(mut self, spec: DatasetSpec) -> Self {
        self.datasets.push(spec);
        self
    }

    #[must_use]
    pub fn masking_dataset(mut self, spec: DatasetSpec) -> Self {
        self.masking.push(spec);
        self
    }

    #[must_use]
    pub fn temporal_reference(mut self, name: impl Into<String>) -> Self {
        self.config.temporal_reference = Some(name.into());
        self
    }

    #[must_use]
    pub fn window_days(mut self, days: f64) -> Self {
        self.config.window_days = days;
        self
    }

    #[must_use]
    pub fn scaling(mut self, spec: ScalingSpec) -> Self {
        self.config.scaling = spec;
        self
    }

    #[must_use]
    pub fn period(mut self, period: Period) -> Self {
        self.config.period = Some((period.start, period.end));
        self
    }

    #[must_use]
    pub fn min_n_obs(mut self, n: usize) -> Self {
        self.config.min_n_obs = n;
        self
    }

    #[must_use]
    pub fn unique_matches(mut self, unique: bool) -> Self {
        self.config.unique_matches = unique;
        self
    }

    /// Register a calculator for `(n, k)`, replacing any earlier one.
    #[must_use]
    pub fn metric<C: MetricCalculator + 'static>(
        mut self,
        n: usize,
        k: usize,
        calculator: C,
    ) -> Self {
        self.calculators.insert(MatchSpec::new(n, k), Arc::new(calculator));
        self
    }

    /// Check the whole configuration and build the pipeline.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] describing the first problem found.
    pub fn build(self) -> Result<Validation> {
        let Self { config, datasets, masking, calculators } = self;
        let data = DataManager::new(datasets, masking)?;
        let n_datasets = data.datasets().len();

        let reference = match &config.temporal_reference {
            Some(name) => name.clone(),
            None => data.datasets()[0].name.clone(),
        };
        if data.dataset(&reference).is_none() {
            return Err(Error::config(format!("unknown temporal reference '{reference}'")));
        }
        if !config.window_days.is_finite() || config.window_days < 0.0 {
            return Err(Error::config(format!(
                "invalid matching window {} days",
                config.window_days
            )));
        }
        if let Some((start, end)) = config.period
            && start > end
        {
            return Err(Error::config(format!("period start {start} is after end {end}")));
        }

        if calculators.is_empty() {
            return Err(Error::config("no metric calculators registered"));
        }
        for spec in calculators.keys() {
            if spec.n < 2 || spec.n > n_datasets {
                return Err(Error::config(format!(
                    "match spec {spec}: n must be between 2 and {n_datasets}"
                )));
            }
            if spec.k == 0 || spec.k > spec.n {
                return Err(Error::config(format!("match spec {spec}: k must be between 1 and n")));
            }
        }

        let scaler = resolve_scaler(&config.scaling, &reference, &data, &calculators)?;
        let matcher = config.matcher();

        Ok(Validation {
            combos: CombinationBuilder::new(reference.clone()),
            reference,
            masker: Masker::new(matcher),
            matcher,
            scaler,
            period: config.period(),
            min_n_obs: config.min_n_obs.max(1),
            data,
            calculators,
        })
    }
}

fn resolve_scaler(
    spec: &ScalingSpec,
    temporal_reference: &str,
    data: &DataManager,
    calculators: &BTreeMap<MatchSpec, Arc<dyn MetricCalculator>>,
) -> Result<Scaler> {
    let dataset = spec.reference.as_deref().unwrap_or(temporal_reference);
    let Some(ds) = data.dataset(dataset) else {
        return Err(Error::config(format!("unknown scaling reference '{dataset}'")));
    };
    let column = match &spec.column {
        Some(c) if ds.columns.contains(c) => c.clone(),
        Some(c) => {
            return Err(Error::config(format!(
                "scaling reference '{dataset}' does not select column '{c}'"
            )));
        }
        None => ds.columns[0].clone(),
    };

    if spec.method != ScalingMethod::None {
        let n_datasets = data.datasets().len();
        if dataset != temporal_reference
            && let Some(partial) = calculators.keys().find(|s| s.n != n_datasets)
        {
            return Err(Error::config(format!(
                "scaling reference '{dataset}' is not part of every subset matched for {partial}"
            )));
        }
        let min_columns = spec.method.min_columns();
        if let Some(small) = calculators.keys().find(|s| s.n < min_columns) {
            return Err(Error::config(format!(
                "{} scaling needs at least {min_columns} datasets, {small} matches fewer",
                spec.method
            )));
        }
    }

    if !spec.percentiles.is_empty() {
        check_percentiles(&spec.percentiles)?;
    }

    let scaler = Scaler::new(spec.method, ColumnKey::new(dataset, column));
    Ok(scaler.with_percentiles(spec.percentiles.clone()))
}

/// CDF matching knots must be at least two strictly ascending percentiles in 0..=100.
fn check_percentiles(percentiles: &[f64]) -> Result<()> {
    if percentiles.len() < 2 {
        return Err(Error::config(format!(
            "scaling percentiles {percentiles:?}: at least two are needed"
        )));
    }
    if let Some(p) = percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
        return Err(Error::config(format!("scaling percentile {p} is outside 0..=100")));
    }
    if percentiles.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::config(format!(
            "scaling percentiles {percentiles:?} are not strictly ascending"
        )));
    }
    Ok(())
}

/// A configured validation run; cheap to share across worker threads.
pub struct Validation {
    data: DataManager,
    reference: String,
    masker: Masker,
    matcher: TemporalMatcher,
    scaler: Scaler,
    combos: CombinationBuilder,
    calculators: BTreeMap<MatchSpec, Arc<dyn MetricCalculator>>,
    period: Option<Period>,
    min_n_obs: usize,
}

impl Validation {
    #[must_use]
    pub fn builder() -> ValidationBuilder {
        ValidationBuilder::new()
    }

    #[must_use]
    pub fn temporal_reference(&self) -> &str {
        &self.reference
    }

    #[must_use]
    pub fn data_manager(&self) -> &DataManager {
        &self.data
    }

    pub fn match_specs(&self) -> impl Iterator<Item = &MatchSpec> {
        self.calculators.keys()
    }

    /// Convenience for `calc(&Job::new(gpi, lon, lat))`.
    ///
    /// # Errors
    /// See [`Validation::calc`].
    pub fn calc_at(&self, gpi: u64, lon: f64, lat: f64) -> Result<JobResults> {
        self.calc(&Job::new(gpi, lon, lat))
    }

    /// Validate one job.
    ///
    /// # Errors
    /// Reader failures (including [`Error::TransientRead`], returned unchanged), a
    /// missing or empty temporal reference, or a masking dataset lacking its column.
    pub fn calc(&self, job: &Job) -> Result<JobResults> {
        let span = info_span!("job", gpi = job.gpi, lon = job.lon, lat = job.lat);
        let _guard = span.enter();
        let mut stage = JobStage::Init;
        let out = self.run(job, &mut stage);
        match &out {
            Ok(results) => debug!(stage = %stage, results = results.len(), "job finished"),
            Err(e) => warn!(stage = %stage, error = %e, "job failed"),
        }
        out
    }

    fn run(&self, job: &Job, stage: &mut JobStage) -> Result<JobResults> {
        *stage = JobStage::Read;
        let mut data = self.data.read_all(job)?;
        let reference = match data.take(&self.reference) {
            Some(Availability::Available(frame)) => frame,
            Some(Availability::Missing(e)) => return Err(e),
            _ => {
                return Err(Error::ReferenceUnavailable {
                    dataset: self.reference.clone(),
                });
            }
        };
        // A mask that cannot be evaluated must not silently let flagged rows through.
        if let Some(pos) = data
            .masks
            .iter()
            .position(|(_, a)| matches!(a, Availability::Missing(_)))
            && let (_, Availability::Missing(e)) = data.masks.swap_remove(pos)
        {
            return Err(e);
        }

        *stage = JobStage::Mask;
        let mut reference = self.masker.apply(&reference, &data.mask_frames())?;
        if let Some(period) = self.period {
            reference = reference.restrict_to(period);
        }
        debug!(rows = reference.len(), "reference after masking");

        let others: Vec<&str> = data.available().collect();
        let mut prepared: HashMap<Vec<&str>, Option<MatchedFrame>> = HashMap::new();
        let mut results = JobResults::new();

        for (spec, calculator) in &self.calculators {
            for subset in self.combos.dataset_subsets(&others, spec.n) {
                let frame = match prepared.entry(subset) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        let frame = self.prepare(&reference, &data, e.key(), stage)?;
                        e.insert(frame)
                    }
                };
                let Some(frame) = frame.as_ref() else {
                    continue;
                };

                *stage = JobStage::Dispatch;
                for group in self.combos.column_groups(frame, spec.k) {
                    let key = ResultKey::new(group);
                    if results.contains_key(&key) {
                        continue;
                    }
                    let Ok(aligned) = frame.select(key.pairs()) else {
                        continue;
                    };
                    let aligned = aligned.drop_incomplete();
                    if aligned.len() < self.min_n_obs {
                        debug!(
                            %key,
                            rows = aligned.len(),
                            min = self.min_n_obs,
                            "too few complete rows, skipped"
                        );
                        continue;
                    }
                    let metrics = calculator.calculate(&aligned);
                    results.insert(key, ResultRecord::new(job, aligned.len(), metrics));
                }
            }
        }

        *stage = JobStage::Done;
        Ok(results)
    }

    /// Match and scale one subset; `None` when the subset yields no usable frame.
    fn prepare(
        &self,
        reference: &TimeSeriesFrame,
        data: &JobData,
        subset: &[&str],
        stage: &mut JobStage,
    ) -> Result<Option<MatchedFrame>> {
        *stage = JobStage::Match;
        let others: Vec<(&str, &TimeSeriesFrame)> = subset
            .iter()
            .filter_map(|name| data.frame(name).map(|f| (*name, f)))
            .collect();
        // Rows are only dropped here when no other dataset matched them; each column
        // group drops its own incomplete rows at dispatch.
        let matched = self
            .matcher
            .match_frames((self.reference.as_str(), reference), &others)
            .drop_all_missing(|k| k.dataset != self.reference);
        if matched.len() < self.min_n_obs {
            debug!(
                datasets = ?subset,
                rows = matched.len(),
                min = self.min_n_obs,
                "too few matches, skipped"
            );
            return Ok(None);
        }

        *stage = JobStage::Scale;
        match self.scaler.scale(&matched) {
            Ok(scaled) => Ok(Some(scaled)),
            Err(e) if e.is_combination_local() => {
                debug!(datasets = ?subset, error = %e, "scaling not possible, skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
