//! # Ironval
//!
//! A **validation engine** for geophysical time series. Ironval compares gridded or
//! station datasets location by location: for every job (a grid point) it reads all
//! configured datasets, masks and temporally matches them against a reference, rescales
//! them into a common data space, and hands every requested combination of datasets to
//! user-supplied metric calculators.
//!
//! ## Key Features
//!
//! - **Pluggable readers** - anything implementing [`DatasetReader`] can be a dataset
//! - **Masking** - drop reference observations flagged by auxiliary datasets
//! - **Nearest-neighbour temporal matching** within a configurable window
//! - **Scaling** - CDF matching, min/max, mean/std, and triple collocation
//! - **Combination dispatch** - calculators registered per `(n, k)` [`MatchSpec`]
//! - **Sequential and parallel job execution** - see [`runner`]
//! - **Results output** - JSON Lines files per result key (feature `io-jsonl`)
//!
//! ## Quick Start
//!
//! ```
//! use ironval::*;
//! use ironval::testing::{InMemoryReader, daily_frame};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let insitu = InMemoryReader::new().with_gpi(7, daily_frame("sm", &[0.1, 0.2, 0.3, 0.25]));
//! let sat = InMemoryReader::new().with_gpi(7, daily_frame("sm", &[0.3, 0.5, 0.7, 0.6]));
//!
//! let validation = Validation::builder()
//!     .dataset(DatasetSpec::new("ISMN", insitu, ["sm"]))
//!     .dataset(DatasetSpec::new("SAT", sat, ["sm"]))
//!     .scaling(ScalingSpec::new(ScalingMethod::MeanStd))
//!     .metric(2, 2, BasicMetrics)
//!     .build()?;
//!
//! let results = validation.calc(&Job::new(7, 16.4, 48.2))?;
//! let record = &results[&ResultKey::from_pairs([("ISMN", "sm"), ("SAT", "sm")])];
//! assert_eq!(record.n_obs, 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Datasets and readers
//!
//! A [`DatasetSpec`] names a dataset, holds its reader and the columns to keep. Readers
//! return a [`TimeSeriesFrame`]: a time index plus `f64` columns with `NaN` as the
//! missing value. An empty frame means the dataset has no data for the job.
//!
//! ### The per-job pipeline
//!
//! [`Validation::calc`] runs one job through read, mask, match, scale and dispatch. The
//! result is a [`JobResults`] map from [`ResultKey`] (the ordered dataset/column pairs
//! of a combination) to a [`ResultRecord`] carrying the metrics, the job location and
//! the number of matched observations.
//!
//! ### Errors
//!
//! Every fallible operation returns [`Result`]. [`Error::TransientRead`] is the only
//! error worth retrying; the [`runner`] retries it once.
//!
//! ## Feature Flags
//!
//! - `io-jsonl` - JSON Lines results writer
//! - `io-csv` - per-grid-point CSV reader
//!
//! ## Module Overview
//!
//! - [`validation`] - the orchestrator and its builder
//! - [`data_manager`] - reading all datasets for a job
//! - [`masking`], [`temporal`], [`scaling`], [`combinations`] - the pipeline stages
//! - [`calculators`] - the metric calculator contract and basic metrics
//! - [`runner`] - running many jobs
//! - [`io`] - file readers and results writers
//! - [`testing`] - readers, fixtures and assertions for tests

pub mod calculators;
pub mod combinations;
pub mod config;
pub mod data_manager;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod io;
pub mod masking;
pub mod reader;
pub mod results;
pub mod runner;
pub mod scaling;
pub mod temporal;
pub mod testing;
pub mod validation;
pub mod window;

// General re-exports
pub use calculators::{BasicMetrics, MetricCalculator, MetricMap, pearson_r, spearman_rho};
pub use combinations::{CombinationBuilder, MatchSpec};
pub use config::ValidationConfig;
pub use data_manager::{Availability, DataManager, JobData};
pub use dataset::{DatasetSpec, Job};
pub use error::{Error, Result};
pub use frame::{ColumnKey, Frame, MatchedFrame, TimeSeriesFrame};
pub use io::ResultsSink;
pub use masking::{CompareOp, Masker, MaskingReader};
pub use reader::{DatasetReader, ReadArgs, ReadBy, ReadRequest};
pub use results::{JobResults, ResultKey, ResultRecord};
pub use runner::{ExecMode, JobOutcome, JobRunner, RetryPolicy, RunSummary};
pub use scaling::{Scaler, ScalingMethod, ScalingSpec};
pub use temporal::TemporalMatcher;
pub use validation::{JobStage, Validation, ValidationBuilder};
pub use window::{DAY_MS, MatchWindow, Period, TimestampMs, Timestamped, day};

// Gated re-exports
#[cfg(feature = "io-jsonl")]
pub use io::jsonl::JsonlResultsWriter;

#[cfg(feature = "io-csv")]
pub use io::csv::CsvReader;
