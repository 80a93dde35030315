//! Testing utilities for validation setups.
//!
//! This module provides what a study needs to exercise a [`Validation`](crate::Validation)
//! without real data files:
//!
//! - **Readers**: [`InMemoryReader`] serving prepared frames, [`FlakyReader`] failing
//!   transiently a fixed number of times, [`FnReader`] wrapping a closure
//! - **Fixtures**: daily series and deterministic noise for building frames
//! - **Assertions**: tolerance-aware comparisons for metrics and frames
//! - **Mock I/O**: temporary per-grid-point CSV directories (feature `io-csv`)
//!
//! # Quick Start
//!
//! ```
//! use ironval::*;
//! use ironval::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let a = InMemoryReader::new().with_gpi(1, daily_frame("v", &[1.0, 2.0, 3.0]));
//! let b = InMemoryReader::new().with_gpi(1, daily_frame("v", &[2.0, 4.0, 6.0]));
//!
//! let validation = Validation::builder()
//!     .dataset(DatasetSpec::new("A", a, ["v"]))
//!     .dataset(DatasetSpec::new("B", b, ["v"]))
//!     .metric(2, 2, BasicMetrics)
//!     .build()?;
//!
//! let results = validation.calc(&Job::new(1, 0.0, 0.0))?;
//! let record = &results[&ResultKey::from_pairs([("A", "v"), ("B", "v")])];
//! assert_close(record.metric("R").unwrap_or(f64::NAN), 1.0, 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod readers;

#[cfg(feature = "io-csv")]
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use readers::*;

#[cfg(feature = "io-csv")]
pub use mock_io::*;
