//! The capability contract every dataset source implements.
//!
//! Readers are constructed once and shared read-only by every job, possibly from
//! several worker threads, hence the `Send + Sync` bound. A reader only needs to
//! support one request form and declares which through [`DatasetReader::read_by`].

use crate::error::Result;
use crate::frame::TimeSeriesFrame;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Extra reader arguments, passed through verbatim for every read.
pub type ReadArgs = BTreeMap<String, serde_json::Value>;

/// Request forms a reader accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadBy {
    Gpi,
    LonLat,
    Both,
}

impl ReadBy {
    #[must_use]
    pub const fn gpi(self) -> bool {
        matches!(self, Self::Gpi | Self::Both)
    }

    #[must_use]
    pub const fn lonlat(self) -> bool {
        matches!(self, Self::LonLat | Self::Both)
    }
}

/// A single read request for one job.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReadRequest {
    Gpi(u64),
    LonLat { lon: f64, lat: f64 },
}

pub trait DatasetReader: Send + Sync {
    /// Request forms this reader supports.
    fn read_by(&self) -> ReadBy {
        ReadBy::Gpi
    }

    /// Read the time series for one location.
    ///
    /// An empty frame (or one with only missing values) means "no data here" and is not
    /// an error. The returned frame may carry extra columns; callers project them away.
    ///
    /// # Errors
    /// Storage contention should be reported as
    /// [`Error::TransientRead`](crate::Error::TransientRead); anything else is treated
    /// as fatal for the job.
    fn read(&self, request: ReadRequest, args: &ReadArgs) -> Result<TimeSeriesFrame>;
}

impl<R: DatasetReader + ?Sized> DatasetReader for Arc<R> {
    fn read_by(&self) -> ReadBy {
        (**self).read_by()
    }

    fn read(&self, request: ReadRequest, args: &ReadArgs) -> Result<TimeSeriesFrame> {
        (**self).read(request, args)
    }
}

impl<R: DatasetReader + ?Sized> DatasetReader for Box<R> {
    fn read_by(&self) -> ReadBy {
        (**self).read_by()
    }

    fn read(&self, request: ReadRequest, args: &ReadArgs) -> Result<TimeSeriesFrame> {
        (**self).read(request, args)
    }
}
