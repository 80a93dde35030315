//! Reading every configured dataset for one job.
//!
//! The manager asks each reader for the job location (grid point id when the reader
//! supports it, lon/lat otherwise), projects the result onto the configured columns and
//! normalises the index to strictly ascending time. A dataset with no usable data is
//! reported as unavailable rather than failing the job; so is a dataset lacking a
//! configured column, which only invalidates the combinations that need it. Reader
//! errors, transient or not, are returned as-is; retrying is the caller's decision.

use crate::dataset::{DatasetSpec, Job};
use crate::error::{Error, Result};
use crate::frame::TimeSeriesFrame;
use crate::reader::ReadRequest;
use std::collections::HashSet;
use tracing::{debug, warn};

/// What a dataset yielded for one job.
#[derive(Debug)]
pub enum Availability {
    Available(TimeSeriesFrame),
    /// The reader returned no rows or only missing values.
    NoData,
    /// A configured column was absent ([`Error::DataMissing`]).
    Missing(Error),
}

impl Availability {
    #[must_use]
    pub const fn frame(&self) -> Option<&TimeSeriesFrame> {
        match self {
            Self::Available(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// Frames read for one job, in configuration order.
#[derive(Debug, Default)]
pub struct JobData {
    pub datasets: Vec<(String, Availability)>,
    pub masks: Vec<(String, Availability)>,
}

impl JobData {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Availability> {
        self.datasets.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Remove a dataset from the job data, returning what it yielded.
    pub fn take(&mut self, name: &str) -> Option<Availability> {
        let pos = self.datasets.iter().position(|(n, _)| n == name)?;
        Some(self.datasets.remove(pos).1)
    }

    #[must_use]
    pub fn frame(&self, name: &str) -> Option<&TimeSeriesFrame> {
        self.get(name).and_then(Availability::frame)
    }

    /// Names of datasets with data, in configuration order.
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.datasets
            .iter()
            .filter(|(_, a)| a.is_available())
            .map(|(n, _)| n.as_str())
    }

    /// Frames of masking datasets that have data.
    #[must_use]
    pub fn mask_frames(&self) -> Vec<&TimeSeriesFrame> {
        self.masks.iter().filter_map(|(_, a)| a.frame()).collect()
    }
}

#[derive(Clone, Debug)]
pub struct DataManager {
    datasets: Vec<DatasetSpec>,
    masking: Vec<DatasetSpec>,
}

impl DataManager {
    /// # Errors
    /// Returns [`Error::Configuration`] for empty or duplicate names, empty column lists,
    /// or masking datasets that do not select exactly one column.
    pub fn new(datasets: Vec<DatasetSpec>, masking: Vec<DatasetSpec>) -> Result<Self> {
        if datasets.is_empty() {
            return Err(Error::config("at least one dataset is required"));
        }
        check_specs("dataset", &datasets)?;
        check_specs("masking dataset", &masking)?;
        if let Some(m) = masking.iter().find(|m| m.columns.len() != 1) {
            return Err(Error::config(format!(
                "masking dataset '{}' must select exactly one column, got {}",
                m.name,
                m.columns.len()
            )));
        }
        Ok(Self { datasets, masking })
    }

    #[must_use]
    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }

    #[must_use]
    pub fn masking(&self) -> &[DatasetSpec] {
        &self.masking
    }

    #[must_use]
    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Read one dataset for `job`.
    ///
    /// # Errors
    /// [`Error::DataMissing`] if a configured column is absent; reader errors unchanged.
    pub fn read(&self, spec: &DatasetSpec, job: &Job) -> Result<Availability> {
        let request = if spec.reader.read_by().gpi() {
            ReadRequest::Gpi(job.gpi)
        } else {
            ReadRequest::LonLat { lon: job.lon, lat: job.lat }
        };
        let raw = spec.reader.read(request, &spec.read_args)?;
        if raw.is_empty() {
            return Ok(Availability::NoData);
        }
        let frame = raw
            .select(&spec.columns)
            .map_err(|column| Error::DataMissing {
                dataset: spec.name.clone(),
                column,
            })?
            .into_sorted();
        if frame.is_empty() || frame.is_all_missing() {
            return Ok(Availability::NoData);
        }
        Ok(Availability::Available(frame))
    }

    /// Read every dataset and masking dataset for `job`.
    ///
    /// # Errors
    /// Any reader error other than [`Error::DataMissing`] aborts the read.
    pub fn read_all(&self, job: &Job) -> Result<JobData> {
        let read_group = |specs: &[DatasetSpec]| -> Result<Vec<(String, Availability)>> {
            let mut out = Vec::with_capacity(specs.len());
            for spec in specs {
                let availability = match self.read(spec, job) {
                    Ok(a) => a,
                    Err(e @ Error::DataMissing { .. }) => {
                        warn!(dataset = %spec.name, error = %e, "dataset unusable for this job");
                        Availability::Missing(e)
                    }
                    Err(e) => return Err(e),
                };
                match &availability {
                    Availability::Available(f) => {
                        debug!(dataset = %spec.name, rows = f.len(), "read dataset");
                    }
                    Availability::NoData => debug!(dataset = %spec.name, "no data"),
                    Availability::Missing(_) => {}
                }
                out.push((spec.name.clone(), availability));
            }
            Ok(out)
        };
        Ok(JobData {
            datasets: read_group(&self.datasets)?,
            masks: read_group(&self.masking)?,
        })
    }
}

fn check_specs(kind: &str, specs: &[DatasetSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if spec.name.is_empty() {
            return Err(Error::config(format!("{kind} with empty name")));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::config(format!("duplicate {kind} name '{}'", spec.name)));
        }
        if spec.columns.is_empty() {
            return Err(Error::config(format!("{kind} '{}' selects no columns", spec.name)));
        }
    }
    Ok(())
}
