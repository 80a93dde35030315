//! Dataset specifications and jobs.

use crate::reader::{DatasetReader, ReadArgs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A configured dataset: where to read it and which columns to keep.
///
/// Masking datasets use the same type; they must keep exactly one column.
#[derive(Clone)]
pub struct DatasetSpec {
    pub name: String,
    pub reader: Arc<dyn DatasetReader>,
    pub columns: Vec<String>,
    pub read_args: ReadArgs,
}

impl DatasetSpec {
    pub fn new<R, I, S>(name: impl Into<String>, reader: R, columns: I) -> Self
    where
        R: DatasetReader + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            reader: Arc::new(reader),
            columns: columns.into_iter().map(Into::into).collect(),
            read_args: ReadArgs::new(),
        }
    }

    /// Same as [`DatasetSpec::new`] for a reader that is already shared.
    pub fn shared<I, S>(name: impl Into<String>, reader: Arc<dyn DatasetReader>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            reader,
            columns: columns.into_iter().map(Into::into).collect(),
            read_args: ReadArgs::new(),
        }
    }

    /// Add one reader argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.read_args.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for DatasetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetSpec")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("read_args", &self.read_args)
            .finish_non_exhaustive()
    }
}

/// One spatial unit of work.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub gpi: u64,
    pub lon: f64,
    pub lat: f64,
}

impl Job {
    #[must_use]
    pub const fn new(gpi: u64, lon: f64, lat: f64) -> Self {
        Self { gpi, lon, lat }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpi {} ({}, {})", self.gpi, self.lon, self.lat)
    }
}
