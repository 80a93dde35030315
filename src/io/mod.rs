//! File-backed readers and results consumers.
//!
//! Format code here works in `anyhow::Result` with path context on every failure and is
//! lifted into [`Error::Other`](crate::Error::Other) at the crate boundary.

use crate::error::Result;
use crate::results::JobResults;

/// Consumer of per-job results.
///
/// Writing the same job twice must leave the destination as if it had been written once.
pub trait ResultsSink {
    /// Persist one job's results, returning the number of records written.
    ///
    /// # Errors
    /// Any failure to reach or update the destination.
    fn write(&mut self, results: &JobResults) -> Result<usize>;

    /// Make everything written so far durable. Sinks that write through need not
    /// override this.
    ///
    /// # Errors
    /// Any failure to reach or update the destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects results in memory; handy for tests and small studies.
impl ResultsSink for Vec<JobResults> {
    fn write(&mut self, results: &JobResults) -> Result<usize> {
        self.push(results.clone());
        Ok(results.len())
    }
}

#[cfg_attr(docsrs, doc(cfg(feature = "io-jsonl")))]
#[cfg(feature = "io-jsonl")]
pub mod jsonl;

#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;
