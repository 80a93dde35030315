//! Boolean masking of the temporal reference.
//!
//! A masking dataset is a single-column frame where a non-zero value means "exclude
//! this observation". [`MaskingReader`] turns any reader into one by comparing a source
//! column against a threshold. [`Masker`] matches each mask onto the reference index and
//! keeps a reference row only if no mask flags it. Rows without a matched mask value
//! count as not masked.

use crate::error::{Error, Result};
use crate::frame::TimeSeriesFrame;
use crate::reader::{DatasetReader, ReadArgs, ReadBy, ReadRequest};
use crate::temporal::TemporalMatcher;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by [`MaskingReader`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl CompareOp {
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            other => Err(Error::config(format!("unknown comparison operator '{other}'"))),
        }
    }
}

/// Wraps a reader and exposes `op(value, threshold)` as a single flag column.
///
/// Flags are `1.0` (exclude) or `0.0` (keep). Missing source values stay missing.
pub struct MaskingReader<R> {
    inner: R,
    column: String,
    op: CompareOp,
    threshold: f64,
    output: String,
}

impl<R: DatasetReader> MaskingReader<R> {
    pub fn new(inner: R, column: impl Into<String>, op: CompareOp, threshold: f64) -> Self {
        let column = column.into();
        Self {
            inner,
            output: column.clone(),
            column,
            op,
            threshold,
        }
    }

    /// Name of the emitted flag column (defaults to the source column name).
    #[must_use]
    pub fn output_column(mut self, name: impl Into<String>) -> Self {
        self.output = name.into();
        self
    }
}

impl<R: DatasetReader> DatasetReader for MaskingReader<R> {
    fn read_by(&self) -> ReadBy {
        self.inner.read_by()
    }

    fn read(&self, request: ReadRequest, args: &ReadArgs) -> Result<TimeSeriesFrame> {
        let frame = self.inner.read(request, args)?;
        if frame.is_empty() {
            return Ok(TimeSeriesFrame::default());
        }
        let values = frame.column(self.column.as_str()).ok_or_else(|| {
            Error::Other(anyhow!("masking source has no column '{}'", self.column))
        })?;
        let flags = values
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    f64::NAN
                } else if self.op.apply(v, self.threshold) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        TimeSeriesFrame::with_index(frame.index().to_vec()).with_column(self.output.clone(), flags)
    }
}

/// Applies masking datasets to the temporal reference.
#[derive(Copy, Clone, Debug, Default)]
pub struct Masker {
    matcher: TemporalMatcher,
}

impl Masker {
    #[must_use]
    pub const fn new(matcher: TemporalMatcher) -> Self {
        Self { matcher }
    }

    /// Drop every reference row flagged by any mask.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a mask frame does not have exactly one column.
    pub fn apply(
        &self,
        reference: &TimeSeriesFrame,
        masks: &[&TimeSeriesFrame],
    ) -> Result<TimeSeriesFrame> {
        if masks.is_empty() {
            return Ok(reference.clone());
        }
        let mut keep = vec![true; reference.len()];
        for mask in masks {
            if mask.n_columns() != 1 {
                return Err(Error::config(format!(
                    "masking frame must have exactly one column, found {}",
                    mask.n_columns()
                )));
            }
            let aligned = self.matcher.align(reference.index(), *mask);
            if let Some((_, flags)) = aligned.columns().next() {
                for (k, flag) in keep.iter_mut().zip(flags) {
                    if !flag.is_nan() && *flag != 0.0 {
                        *k = false;
                    }
                }
            }
        }
        Ok(reference.filter_rows(&keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::MatchWindow;

    fn reference() -> Result<TimeSeriesFrame> {
        TimeSeriesFrame::new(
            vec![10, 20, 30, 40],
            vec![("sm".to_string(), vec![0.1, 0.2, 0.3, 0.4])],
        )
    }

    #[test]
    fn no_masks_is_identity() -> Result<()> {
        let r = reference()?;
        let out = Masker::default().apply(&r, &[])?;
        assert_eq!(out, r);
        Ok(())
    }

    #[test]
    fn unmatched_rows_are_kept() -> Result<()> {
        let r = reference()?;
        let mask = TimeSeriesFrame::new(vec![20, 31], vec![("flag".to_string(), vec![1.0, 1.0])])?;
        let masker = Masker::new(TemporalMatcher::new(MatchWindow::from_ms(0)));
        let out = masker.apply(&r, &[&mask])?;
        assert_eq!(out.index(), &[10, 30, 40]);
        Ok(())
    }

    #[test]
    fn compare_op_parses_all_symbols() -> Result<()> {
        for s in ["<", "<=", ">", ">=", "==", "!="] {
            let op: CompareOp = s.parse()?;
            assert_eq!(op.to_string(), s);
        }
        assert!("=~".parse::<CompareOp>().is_err());
        Ok(())
    }
}
