//! Error taxonomy for validation runs.
//!
//! Errors fall into four classes with different blast radius:
//!
//! - [`Error::Configuration`] is raised while building a [`Validation`](crate::Validation)
//!   and never per job.
//! - [`Error::DataMissing`] and [`Error::InsufficientData`] drop the combinations that
//!   depend on the affected dataset or matched frame; the rest of the job proceeds.
//! - [`Error::TransientRead`] is propagated unmodified and is the only class that
//!   [`Error::is_transient`] reports as safe to retry (once, by the caller).
//! - Everything else aborts the job.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("dataset '{dataset}' has no column '{column}'")]
    DataMissing { dataset: String, column: String },

    #[error("insufficient data for {context}: need {needed}, found {found}")]
    InsufficientData {
        context: String,
        needed: usize,
        found: usize,
    },

    #[error("transient read failure in dataset '{dataset}': {message}")]
    TransientRead { dataset: String, message: String },

    #[error("temporal reference dataset '{dataset}' has no data for this job")]
    ReferenceUnavailable { dataset: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub fn insufficient<S: Into<String>>(context: S, needed: usize, found: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            needed,
            found,
        }
    }

    pub fn transient<D: Into<String>, M: Into<String>>(dataset: D, message: M) -> Self {
        Self::TransientRead {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// Whether resubmitting the job once may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientRead { .. })
    }

    /// Whether this error only invalidates the combinations depending on it.
    #[must_use]
    pub const fn is_combination_local(&self) -> bool {
        matches!(self, Self::DataMissing { .. } | Self::InsufficientData { .. })
    }
}
