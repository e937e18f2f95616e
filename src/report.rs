//! Sweep results storage (JSON lines)

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use opprof_core::{Error, Result};
use opprof_profiler::CategoryResult;
use serde::{Deserialize, Serialize};

use crate::workloads::Workload;

/// One finalized category, stamped with when and what was swept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Timestamp when the record was written
    timestamp: DateTime<Utc>,

    /// Workload that was swept
    workload: Workload,

    /// Category averages
    #[serde(flatten)]
    result: CategoryResult,
}

impl ResultRecord {
    /// Stamp a category result with the current time
    #[must_use]
    pub fn new(workload: Workload, result: CategoryResult) -> Self {
        Self {
            timestamp: Utc::now(),
            workload,
            result,
        }
    }

    /// Get the timestamp
    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    /// Get the workload
    #[must_use]
    pub const fn workload(&self) -> Workload {
        self.workload
    }

    /// Get the category result
    #[must_use]
    pub const fn result(&self) -> &CategoryResult {
        &self.result
    }
}

/// Appends sweep results to a JSON-lines file
pub struct ResultsLog {
    output_path: PathBuf,
}

impl ResultsLog {
    /// Create a log writing to `output_path`
    #[must_use]
    pub const fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Path of the log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.output_path
    }

    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or serialization fails
    pub fn append(&self, record: &ResultRecord) -> Result<()> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append every record, opening the file once
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or serialization fails
    pub fn append_all(&self, records: &[ResultRecord]) -> Result<()> {
        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(|e| Error::file_write_failed(&self.output_path, e.to_string()))?;

        lines.iter().try_for_each(|line| {
            writeln!(file, "{line}")
                .map_err(|e| Error::file_write_failed(&self.output_path, e.to_string()))
        })
    }

    /// Read all records back; a missing file reads as empty
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not a record
    pub fn read_records(&self) -> Result<Vec<ResultRecord>> {
        if !self.output_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.output_path)
            .map_err(|e| Error::file_read_failed(&self.output_path, e.to_string()))?;

        BufReader::new(file)
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|line_result| {
                let line = line_result
                    .map_err(|e| Error::file_read_failed(&self.output_path, e.to_string()))?;
                serde_json::from_str(&line).map_err(Into::into)
            })
            .collect()
    }
}
