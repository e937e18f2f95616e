//! Resident memory probes

use opprof_core::{Error, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Capability to read a process's current resident memory.
///
/// Implementations are shared with the background sampling thread, hence
/// `Send + Sync`.
pub trait ProcessMemoryQuery: Send + Sync {
    /// Current resident set size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProbeFailed` if the process can no longer be queried.
    fn resident_bytes(&self) -> Result<u64>;
}

/// One resident-memory reading taken by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceObservation {
    /// Monotonic time since the sampler started
    pub timestamp: Duration,

    /// Resident set size in bytes
    pub resident_bytes: u64,
}

/// Memory fields from `/proc/self/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStatus {
    /// Resident Set Size (`VmRSS`) in kilobytes
    rss_kb: u64,
}

impl MemoryStatus {
    /// Create new memory status
    #[must_use]
    pub const fn new(rss_kb: u64) -> Self {
        Self { rss_kb }
    }

    /// Get RSS in kilobytes
    #[must_use]
    pub const fn rss_kb(&self) -> u64 {
        self.rss_kb
    }

    /// Get RSS in bytes
    #[must_use]
    pub const fn rss_bytes(&self) -> u64 {
        self.rss_kb.saturating_mul(1024)
    }

    /// Parse the status file contents
    ///
    /// # Errors
    ///
    /// Returns error if `VmRSS` is missing or a value cannot be parsed.
    pub fn parse(content: &str) -> Result<Self> {
        content
            .lines()
            .find_map(|line| line.strip_prefix("VmRSS:").map(|value| (value, line)))
            .ok_or_else(|| Error::probe_failed("VmRSS not found"))
            .and_then(|(value, line)| parse_kb(value, line))
            .map(Self::new)
    }
}

/// Parse a "   12345 kB" status value
fn parse_kb(value: &str, line: &str) -> Result<u64> {
    value
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::probe_failed(format!("missing value in line: {line}")))?
        .parse::<u64>()
        .map_err(|e| Error::probe_failed(format!("failed to parse value in '{line}': {e}")))
}

/// Memory probe reading this process's `/proc/self/status`
#[derive(Debug, Clone)]
pub struct ProcStatusMemory {
    status_path: PathBuf,
}

impl ProcStatusMemory {
    /// Probe the current process
    #[must_use]
    pub fn current() -> Self {
        Self::from_path("/proc/self/status")
    }

    /// Probe an explicit status file (testable)
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: path.into(),
        }
    }

    /// Read and parse the full status
    ///
    /// # Errors
    ///
    /// Returns `Error::ProbeFailed` if the file is gone or unparsable.
    pub fn status(&self) -> Result<MemoryStatus> {
        let content = fs::read_to_string(&self.status_path).map_err(|e| {
            Error::probe_failed(format!(
                "failed to open {}: {e}",
                self.status_path.display()
            ))
        })?;
        MemoryStatus::parse(&content)
    }
}

impl Default for ProcStatusMemory {
    fn default() -> Self {
        Self::current()
    }
}

impl ProcessMemoryQuery for ProcStatusMemory {
    fn resident_bytes(&self) -> Result<u64> {
        self.status().map(|s| s.rss_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_status() {
        let content = "Name:\ttest\nVmPeak:\t   9000 kB\nVmHWM:\t   3072 kB\nVmRSS:\t   1024 kB\nRssAnon:\t   512 kB\n";
        let status = MemoryStatus::parse(content);

        assert_eq!(status.ok(), Some(MemoryStatus::new(1024)));
    }

    #[test]
    fn test_parse_status_missing_rss() {
        let status = MemoryStatus::parse("Name:\tkthreadd\n");
        assert!(matches!(status, Err(Error::ProbeFailed { .. })));
    }

    #[test]
    fn test_parse_status_bad_value() {
        let status = MemoryStatus::parse("VmRSS:\t lots kB\n");
        assert!(matches!(status, Err(Error::ProbeFailed { .. })));
    }

    #[test]
    fn test_reads_status_file() {
        let Ok(mut file) = NamedTempFile::new() else {
            return;
        };
        let _ = write!(file, "VmHWM:\t 4096 kB\nVmRSS:\t 2048 kB\n");
        let _ = file.flush();

        let probe = ProcStatusMemory::from_path(file.path());
        assert_eq!(probe.resident_bytes().ok(), Some(2048 * 1024));
        assert_eq!(probe.status().ok().map(|s| s.rss_kb()), Some(2048));
    }

    #[test]
    fn test_vanished_process_fails() {
        let probe = ProcStatusMemory::from_path("/nonexistent/status");
        assert!(matches!(
            probe.resident_bytes(),
            Err(Error::ProbeFailed { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_process_has_rss() {
        let probe = ProcStatusMemory::current();
        assert!(probe.resident_bytes().is_ok_and(|rss| rss > 0));
    }
}
