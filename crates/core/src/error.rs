//! Core error types for profiler operations.
//!
//! All errors are explicit and typed. Failures are annotated with the context
//! needed to reproduce them (trial index, category, parameter tuple) as they
//! travel outward, and are never replaced by default values.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for profiler operations.
#[derive(Debug, Error)]
pub enum Error {
    // Operation under measurement
    #[error("operation failed: {reason}")]
    Operation { reason: String },

    #[error("trial {trial} failed: {source}")]
    TrialFailed {
        trial: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("category '{category}' params {params} repetition {repetition} failed: {source}")]
    SweepFailed {
        category: String,
        params: String,
        repetition: usize,
        #[source]
        source: Box<Error>,
    },

    // Measurement infrastructure
    #[error("probe failed: {reason}")]
    ProbeFailed { reason: String },

    #[error("sampler failed: {reason}")]
    SamplerFailed { reason: String },

    // Configuration
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to write file '{path}': {reason}")]
    FileWriteFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },
}

impl Error {
    /// Create an operation failure.
    pub fn operation(reason: impl Into<String>) -> Self {
        Self::Operation {
            reason: reason.into(),
        }
    }

    /// Annotate an error with the index of the trial that produced it.
    #[must_use]
    pub fn in_trial(self, trial: usize) -> Self {
        Self::TrialFailed {
            trial,
            source: Box::new(self),
        }
    }

    /// Annotate an error with the sweep position that produced it.
    #[must_use]
    pub fn in_sweep(
        self,
        category: impl Into<String>,
        params: impl Into<String>,
        repetition: usize,
    ) -> Self {
        Self::SweepFailed {
            category: category.into(),
            params: params.into(),
            repetition,
            source: Box::new(self),
        }
    }

    /// Create a probe failure.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Create a sampler failure.
    pub fn sampler_failed(reason: impl Into<String>) -> Self {
        Self::SamplerFailed {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a file write error.
    pub fn file_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Whether this error, or any error it wraps, is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::InvalidConfig { .. } => true,
            Self::TrialFailed { source, .. } | Self::SweepFailed { source, .. } => {
                source.is_config_error()
            }
            _ => false,
        }
    }

    /// Index of the failing trial, if the error was annotated with one.
    #[must_use]
    pub fn trial_index(&self) -> Option<usize> {
        match self {
            Self::TrialFailed { trial, .. } => Some(*trial),
            Self::SweepFailed { source, .. } => source.trial_index(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::json_parse_failed(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::toml_parse_failed(err.to_string())
    }
}
