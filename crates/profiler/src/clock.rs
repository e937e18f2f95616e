//! Wall-clock and CPU-time sources.
//!
//! Both are traits so the trial runner can be driven by deterministic fakes in
//! tests. The defaults are `Instant` for wall time and procfs for CPU time.

use opprof_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Kernel user-space tick rate used by `/proc/<pid>/stat` time fields.
const USER_HZ_MILLIS_PER_TICK: u64 = 10;

/// A monotonic, high-resolution wall clock.
pub trait MonotonicClock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// A clock reporting CPU time charged to the caller.
pub trait CpuClock: Send + Sync {
    /// CPU time consumed so far.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProbeFailed` if the time source cannot be read.
    fn cpu_time(&self) -> Result<Duration>;
}

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Where a [`ProcCpuClock`] reads CPU time from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuTimeSource {
    /// Calling thread's scheduler runtime in nanoseconds
    ThreadSchedstat(PathBuf),
    /// Process `utime + stime` in scheduler ticks
    ProcessStat(PathBuf),
}

/// CPU clock reading procfs.
///
/// The source is chosen once, at construction: the calling thread's
/// scheduler runtime from `/proc/thread-self/schedstat` (nanoseconds) when
/// that file is readable, otherwise process `utime + stime` from
/// `/proc/self/stat`, which only resolves to one scheduler tick (10ms).
/// Readings from one clock are therefore always in the same unit; a read
/// that fails later is an error, never a switch to the other source.
#[derive(Debug, Clone)]
pub struct ProcCpuClock {
    source: CpuTimeSource,
}

impl ProcCpuClock {
    /// Create a clock for the calling thread / current process.
    #[must_use]
    pub fn new() -> Self {
        Self::with_paths("/proc/thread-self/schedstat", "/proc/self/stat")
    }

    /// Create a clock choosing between explicit files (testable)
    #[must_use]
    pub fn with_paths(schedstat_path: impl Into<PathBuf>, stat_path: impl Into<PathBuf>) -> Self {
        let schedstat_path = schedstat_path.into();
        let usable = Self::read(&schedstat_path)
            .and_then(|content| parse_schedstat(&content))
            .is_ok();

        let source = if usable {
            CpuTimeSource::ThreadSchedstat(schedstat_path)
        } else {
            CpuTimeSource::ProcessStat(stat_path.into())
        };
        Self { source }
    }

    /// The source this clock reads
    #[must_use]
    pub const fn source(&self) -> &CpuTimeSource {
        &self.source
    }

    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .map_err(|e| Error::probe_failed(format!("failed to read {}: {e}", path.display())))
    }
}

impl Default for ProcCpuClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuClock for ProcCpuClock {
    fn cpu_time(&self) -> Result<Duration> {
        match &self.source {
            CpuTimeSource::ThreadSchedstat(path) => {
                Self::read(path).and_then(|content| parse_schedstat(&content))
            }
            CpuTimeSource::ProcessStat(path) => {
                Self::read(path).and_then(|content| parse_stat(&content))
            }
        }
    }
}

/// Parse the on-CPU nanoseconds from a schedstat line.
/// Format: "`run_ns` `wait_ns` `timeslices`"
fn parse_schedstat(content: &str) -> Result<Duration> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::probe_failed("schedstat is empty"))?
        .parse::<u64>()
        .map(Duration::from_nanos)
        .map_err(|e| Error::probe_failed(format!("invalid schedstat runtime: {e}")))
}

/// Parse `utime + stime` from a `/proc/<pid>/stat` line.
///
/// The command name in field 2 may contain spaces and parentheses, so fields
/// are counted from the last closing parenthesis.
fn parse_stat(content: &str) -> Result<Duration> {
    let rest = content
        .rfind(')')
        .and_then(|idx| content.get(idx.saturating_add(1)..))
        .ok_or_else(|| Error::probe_failed("malformed stat line"))?;

    // Field 3 (state) is the first token after the command name, so
    // utime (field 14) and stime (field 15) sit at offsets 11 and 12.
    let mut fields = rest.split_whitespace().skip(11);
    let mut next_ticks = |name: &str| -> Result<u64> {
        fields
            .next()
            .ok_or_else(|| Error::probe_failed(format!("stat is missing {name}")))?
            .parse::<u64>()
            .map_err(|e| Error::probe_failed(format!("invalid {name}: {e}")))
    };
    let utime = next_ticks("utime")?;
    let stime = next_ticks("stime")?;

    Ok(Duration::from_millis(
        utime
            .saturating_add(stime)
            .saturating_mul(USER_HZ_MILLIS_PER_TICK),
    ))
}
