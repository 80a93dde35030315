//! JSON Lines results output.
//!
//! One file per [`ResultKey`], named after [`ResultKey::file_stem`], holding one record
//! per line. Lines are kept sorted by grid point id and a grid point written again
//! replaces its previous line, so rerunning a job is idempotent.
//!
//! The writer loads each file the first time a key is written and upserts in memory;
//! [`ResultsSink::flush`] replaces every changed file atomically. Dropping the writer
//! flushes too, but only an explicit flush reports errors.
//!
//! Missing metric values (NaN) are written as JSON `null`.

use crate::error::Result as CrateResult;
use crate::io::ResultsSink;
use crate::results::{JobResults, ResultKey};
use anyhow::{Context, Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct JsonlResultsWriter {
    dir: PathBuf,
    files: BTreeMap<ResultKey, BTreeMap<u64, String>>,
    dirty: BTreeSet<ResultKey>,
}

impl JsonlResultsWriter {
    /// Write into `dir`, created on first flush.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a given key's records end up in.
    #[must_use]
    pub fn path_for(&self, key: &ResultKey) -> PathBuf {
        self.dir.join(format!("{}.jsonl", key.file_stem()))
    }

    /// Number of files with changes not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    fn lines_mut(&mut self, key: &ResultKey) -> Result<&mut BTreeMap<u64, String>> {
        if !self.files.contains_key(key) {
            let lines = read_lines_by_gpi(self.path_for(key))?;
            self.files.insert(key.clone(), lines);
        }
        self.files
            .get_mut(key)
            .ok_or_else(|| anyhow!("results for {key} were not loaded"))
    }

    fn persist(&self, key: &ResultKey) -> Result<()> {
        let path = self.path_for(key);
        let Some(lines) = self.files.get(key) else {
            return Ok(());
        };
        // Replace atomically so a crashed run never leaves a half-written file behind.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("create temp file in {}", self.dir.display()))?;
        for line in lines.values() {
            tmp.write_all(line.as_bytes())?;
            tmp.write_all(b"\n")?;
        }
        tmp.flush()?;
        tmp.persist(&path)
            .with_context(|| format!("replace {}", path.display()))?;
        debug!(key = %key, lines = lines.len(), path = %path.display(), "wrote results file");
        Ok(())
    }
}

impl ResultsSink for JsonlResultsWriter {
    fn write(&mut self, results: &JobResults) -> CrateResult<usize> {
        for (key, record) in results {
            let line = serde_json::to_string(record)
                .with_context(|| format!("serialize record for gpi {}", record.gpi))?;
            self.lines_mut(key)?.insert(record.gpi, line);
            self.dirty.insert(key.clone());
        }
        Ok(results.len())
    }

    fn flush(&mut self) -> CrateResult<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        create_dir_all(&self.dir).with_context(|| format!("mkdir -p {}", self.dir.display()))?;
        while let Some(key) = self.dirty.first().cloned() {
            self.persist(&key)?;
            self.dirty.remove(&key);
        }
        Ok(())
    }
}

impl Drop for JsonlResultsWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(dir = %self.dir.display(), error = %e, "results not flushed");
        }
    }
}

/// Read a results file into raw JSON lines keyed by grid point id.
///
/// A file that does not exist yet reads as empty.
///
/// # Errors
/// Returns an error if the file cannot be read or a line lacks a numeric `gpi`.
pub fn read_lines_by_gpi(path: impl AsRef<Path>) -> Result<BTreeMap<u64, String>> {
    let path = path.as_ref();
    let mut out = BTreeMap::new();
    if !path.exists() {
        return Ok(out);
    }
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("parse JSONL line {} in {}", i + 1, path.display()))?;
        let gpi = value
            .get("gpi")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("line {} in {} has no gpi", i + 1, path.display()))?;
        out.insert(gpi, line);
    }
    Ok(out)
}

/// Read a results file back as JSON objects, in grid point order.
///
/// # Errors
/// See [`read_lines_by_gpi`].
pub fn read_results(path: impl AsRef<Path>) -> Result<Vec<serde_json::Value>> {
    let path = path.as_ref();
    read_lines_by_gpi(path)?
        .into_values()
        .map(|line| {
            serde_json::from_str(&line).with_context(|| format!("parse {}", path.display()))
        })
        .collect()
}
