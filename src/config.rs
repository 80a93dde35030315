//! Run settings that do not involve reader objects.
//!
//! Dataset specs and metric calculators are code and get registered on
//! [`ValidationBuilder`](crate::ValidationBuilder); everything else lives here so it
//! can be kept in a JSON file next to a study.
//!
//! ```no_run
//! use ironval::ValidationConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = ValidationConfig::from_json_file("study.json")?;
//! println!("matching within {} days", cfg.window_days);
//! # Ok(())
//! # }
//! ```

use crate::scaling::ScalingSpec;
use crate::temporal::TemporalMatcher;
use crate::window::{MatchWindow, Period, TimestampMs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Dataset whose timestamps everything is matched to. `None` means the first
    /// registered dataset.
    pub temporal_reference: Option<String>,
    /// Maximum distance of a temporal match, in days.
    pub window_days: f64,
    pub scaling: ScalingSpec,
    /// Only reference observations inside `[start, end]` (ms since epoch) are used.
    pub period: Option<(TimestampMs, TimestampMs)>,
    /// Matched subsets with fewer complete rows produce no results.
    pub min_n_obs: usize,
    /// Use each candidate timestamp for at most one reference row.
    pub unique_matches: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            temporal_reference: None,
            window_days: 0.5,
            scaling: ScalingSpec::default(),
            period: None,
            min_n_obs: 1,
            unique_matches: false,
        }
    }
}

impl ValidationConfig {
    /// Load settings from a JSON file; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    #[must_use]
    pub fn window(&self) -> MatchWindow {
        MatchWindow::from_days(self.window_days)
    }

    #[must_use]
    pub fn matcher(&self) -> TemporalMatcher {
        TemporalMatcher::new(self.window()).unique_matches(self.unique_matches)
    }

    #[must_use]
    pub fn period(&self) -> Option<Period> {
        self.period.map(|(start, end)| Period { start, end })
    }
}
