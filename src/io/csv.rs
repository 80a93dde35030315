//! A [`DatasetReader`] over a directory of per-grid-point CSV files.
//!
//! Layout: `<dir>/<gpi>.csv`, a header row, a `time` column in milliseconds since the
//! epoch and any number of numeric columns. Empty cells are missing values. A grid point
//! without a file has no data.

use crate::error::{Error, Result as CrateResult};
use crate::frame::TimeSeriesFrame;
use crate::reader::{DatasetReader, ReadArgs, ReadBy, ReadRequest};
use crate::window::TimestampMs;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const TIME_COLUMN: &str = "time";

#[derive(Clone, Debug)]
pub struct CsvReader {
    dir: PathBuf,
}

impl CsvReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, gpi: u64) -> PathBuf {
        self.dir.join(format!("{gpi}.csv"))
    }
}

impl DatasetReader for CsvReader {
    fn read_by(&self) -> ReadBy {
        ReadBy::Gpi
    }

    fn read(&self, request: ReadRequest, _args: &ReadArgs) -> CrateResult<TimeSeriesFrame> {
        let ReadRequest::Gpi(gpi) = request else {
            return Err(Error::Other(anyhow!(
                "{} is indexed by grid point only",
                self.dir.display()
            )));
        };
        let path = self.path_for(gpi);
        if !path.exists() {
            return Ok(TimeSeriesFrame::default());
        }
        Ok(read_series_csv(&path)?)
    }
}

/// Parse one time series CSV file.
///
/// # Errors
/// Returns an error if the file cannot be read, has no `time` column, or holds a cell
/// that is neither empty nor a number.
pub fn read_series_csv(path: impl AsRef<Path>) -> Result<TimeSeriesFrame> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(f);
    let headers = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .clone();
    let Some(time_idx) = headers.iter().position(|h| h == TIME_COLUMN) else {
        bail!("{} has no '{TIME_COLUMN}' column", path.display());
    };

    let names: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_idx)
        .map(|(i, h)| (i, h.to_string()))
        .collect();
    let mut index: Vec<TimestampMs> = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    let shown = path.display();
    for (row, rec) in rdr.records().enumerate() {
        let line = row + 1;
        let rec = rec.with_context(|| format!("parse CSV record #{line} in {shown}"))?;
        let ts = rec.get(time_idx).unwrap_or_default();
        index.push(
            ts.parse()
                .with_context(|| format!("bad time '{ts}' in record #{line} of {shown}"))?,
        );
        for ((col, name), out) in names.iter().zip(values.iter_mut()) {
            let cell = rec.get(*col).unwrap_or_default();
            let v = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse().with_context(|| {
                    format!("bad value '{cell}' for '{name}' in record #{line} of {shown}")
                })?
            };
            out.push(v);
        }
    }

    let columns = names.into_iter().map(|(_, n)| n).zip(values).collect();
    Ok(TimeSeriesFrame::new(index, columns)?)
}

/// Write a frame in the layout [`CsvReader`] reads. Missing values become empty cells.
///
/// # Errors
/// Returns an error if the file or its directory cannot be written.
pub fn write_series_csv(path: impl AsRef<Path>, frame: &TimeSeriesFrame) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    let mut header = vec![TIME_COLUMN.to_string()];
    header.extend(frame.keys().cloned());
    wtr.write_record(&header)?;
    for (row, ts) in frame.index().iter().enumerate() {
        let mut rec = vec![ts.to_string()];
        rec.extend(frame.columns().map(|(_, v)| {
            if v[row].is_nan() { String::new() } else { v[row].to_string() }
        }));
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_cells_are_missing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut f = File::create(dir.path().join("7.csv"))?;
        writeln!(f, "time,sm,flag")?;
        writeln!(f, "0,0.25,1")?;
        writeln!(f, "86400000,,0")?;
        drop(f);

        let reader = CsvReader::new(dir.path());
        let frame = reader.read(ReadRequest::Gpi(7), &ReadArgs::new())?;
        assert_eq!(frame.index(), &[0, 86_400_000]);
        let sm = frame.column("sm").ok_or_else(|| anyhow!("sm"))?;
        assert!((sm[0] - 0.25).abs() < 1e-12);
        assert!(sm[1].is_nan());
        assert_eq!(frame.column("flag"), Some(&[1.0, 0.0][..]));
        Ok(())
    }

    #[test]
    fn missing_file_has_no_data() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let frame = CsvReader::new(dir.path()).read(ReadRequest::Gpi(1), &ReadArgs::new())?;
        assert!(frame.is_empty());
        Ok(())
    }

    #[test]
    fn lonlat_requests_are_rejected() {
        let reader = CsvReader::new("/nonexistent");
        let res = reader.read(ReadRequest::LonLat { lon: 0.0, lat: 0.0 }, &ReadArgs::new());
        assert!(res.is_err());
    }

    #[test]
    fn missing_time_column_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("3.csv"), "t,sm\n0,1\n")?;
        assert!(read_series_csv(dir.path().join("3.csv")).is_err());
        Ok(())
    }
}
