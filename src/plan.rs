//! Sweep plan files.
//!
//! A plan names a workload, the sampling interval and an ordered list of
//! categories:
//!
//! ```toml
//! workload = "alloc"
//! interval_ms = 10
//!
//! [[category]]
//! id = 1
//! repetitions = 3
//! params = [{ bytes = 1048576, hold_ms = 10 }]
//! ```
//!
//! JSON with the same shape is accepted for files ending in `.json`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use opprof_core::{Error, Result};
use opprof_profiler::{Category, CategoryId, ProfilerConfig, SweepPlan};
use serde::{Deserialize, Serialize};

use crate::workloads::{Workload, WorkloadParams};

const fn default_interval_ms() -> u64 {
    10
}

const fn default_repetitions() -> usize {
    1
}

/// Category identifiers may be written as numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCategoryId {
    Number(u32),
    Text(String),
}

impl From<&RawCategoryId> for CategoryId {
    fn from(raw: &RawCategoryId) -> Self {
        match raw {
            RawCategoryId::Number(n) => Self::from(*n),
            RawCategoryId::Text(s) => Self::from(s.as_str()),
        }
    }
}

/// One `[[category]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: RawCategoryId,

    #[serde(default = "default_repetitions")]
    pub repetitions: usize,

    pub params: Vec<WorkloadParams>,
}

/// A parsed plan file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlanFile {
    pub workload: Workload,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(rename = "category", default)]
    pub categories: Vec<CategoryEntry>,
}

impl SweepPlanFile {
    /// Load a plan from disk; `.json` files are parsed as JSON, anything else
    /// as TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileReadFailed` if the file cannot be read, or a parse
    /// error if its contents are malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse a TOML plan.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlParseFailed` on malformed input.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Parse a JSON plan.
    ///
    /// # Errors
    ///
    /// Returns `Error::JsonParseFailed` on malformed input.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(Into::into)
    }

    /// Sampling interval
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Profiler configuration for this plan.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the interval is out of range.
    pub fn config(&self) -> Result<ProfilerConfig> {
        ProfilerConfig::default().with_sampling_interval(self.interval())
    }

    /// Validate and convert to a runnable plan.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for empty or duplicate categories, empty
    /// parameter lists or zero repetitions.
    pub fn to_plan(&self) -> Result<SweepPlan<WorkloadParams>> {
        let categories = self
            .categories
            .iter()
            .map(|entry| {
                Category::new(
                    CategoryId::from(&entry.id),
                    entry.params.clone(),
                    entry.repetitions,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        SweepPlan::new(categories)
    }
}
