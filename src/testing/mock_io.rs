//! Temporary on-disk datasets for testing file readers and writers.

use crate::frame::TimeSeriesFrame;
use crate::io::csv::{CsvReader, write_series_csv};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory of per-grid-point CSV files, deleted when dropped.
///
/// # Example
///
/// ```
/// use ironval::testing::{MockCsvDataset, daily_frame};
///
/// # fn main() -> anyhow::Result<()> {
/// let ds = MockCsvDataset::new()?;
/// ds.write(12, &daily_frame("sm", &[0.2, 0.3]))?;
/// assert!(ds.path().join("12.csv").exists());
/// # Ok(())
/// # }
/// ```
pub struct MockCsvDataset {
    temp_dir: TempDir,
}

impl MockCsvDataset {
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write the series for one grid point.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, gpi: u64, frame: &TimeSeriesFrame) -> anyhow::Result<PathBuf> {
        let path = self.path().join(format!("{gpi}.csv"));
        write_series_csv(&path, frame)?;
        Ok(path)
    }

    /// A reader over this directory.
    #[must_use]
    pub fn reader(&self) -> CsvReader {
        CsvReader::new(self.path())
    }
}
