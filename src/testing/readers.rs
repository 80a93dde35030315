//! Readers for tests.

use crate::error::{Error, Result};
use crate::frame::TimeSeriesFrame;
use crate::reader::{DatasetReader, ReadArgs, ReadBy, ReadRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves prepared frames by grid point id or by exact lon/lat.
///
/// Unknown locations read as an empty frame. Every call is counted.
#[derive(Debug)]
pub struct InMemoryReader {
    by_gpi: HashMap<u64, TimeSeriesFrame>,
    by_lonlat: HashMap<(u64, u64), TimeSeriesFrame>,
    read_by: ReadBy,
    reads: AtomicUsize,
}

impl Default for InMemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_gpi: HashMap::new(),
            by_lonlat: HashMap::new(),
            read_by: ReadBy::Gpi,
            reads: AtomicUsize::new(0),
        }
    }

    /// A reader that only answers lon/lat requests.
    #[must_use]
    pub fn by_lonlat() -> Self {
        Self {
            read_by: ReadBy::LonLat,
            ..Self::new()
        }
    }

    pub fn insert(&mut self, gpi: u64, frame: TimeSeriesFrame) {
        self.by_gpi.insert(gpi, frame);
    }

    #[must_use]
    pub fn with_gpi(mut self, gpi: u64, frame: TimeSeriesFrame) -> Self {
        self.insert(gpi, frame);
        self
    }

    #[must_use]
    pub fn with_lonlat(mut self, lon: f64, lat: f64, frame: TimeSeriesFrame) -> Self {
        self.by_lonlat.insert((lon.to_bits(), lat.to_bits()), frame);
        self
    }

    /// Number of reads served so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl DatasetReader for InMemoryReader {
    fn read_by(&self) -> ReadBy {
        self.read_by
    }

    fn read(&self, request: ReadRequest, _args: &ReadArgs) -> Result<TimeSeriesFrame> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let frame = match request {
            ReadRequest::Gpi(gpi) => self.by_gpi.get(&gpi),
            ReadRequest::LonLat { lon, lat } => self.by_lonlat.get(&(lon.to_bits(), lat.to_bits())),
        };
        Ok(frame.cloned().unwrap_or_default())
    }
}

/// Fails with [`Error::TransientRead`] for the first `failures` reads, then delegates.
#[derive(Debug)]
pub struct FlakyReader<R> {
    inner: R,
    name: String,
    remaining: AtomicUsize,
}

impl<R: DatasetReader> FlakyReader<R> {
    pub fn new(inner: R, name: impl Into<String>, failures: usize) -> Self {
        Self {
            inner,
            name: name.into(),
            remaining: AtomicUsize::new(failures),
        }
    }

    /// Failures still to come.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

impl<R: DatasetReader> DatasetReader for FlakyReader<R> {
    fn read_by(&self) -> ReadBy {
        self.inner.read_by()
    }

    fn read(&self, request: ReadRequest, args: &ReadArgs) -> Result<TimeSeriesFrame> {
        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::transient(&self.name, "storage busy"));
        }
        self.inner.read(request, args)
    }
}

/// A reader backed by a closure.
pub struct FnReader<F>(pub F);

impl<F> DatasetReader for FnReader<F>
where
    F: Fn(ReadRequest) -> Result<TimeSeriesFrame> + Send + Sync,
{
    fn read(&self, request: ReadRequest, _args: &ReadArgs) -> Result<TimeSeriesFrame> {
        (self.0)(request)
    }
}
