//! # opprof-profiler
//!
//! Parameterized operation profiler.
//!
//! - [`run_trials`] times an operation over `n` sequential trials and reports
//!   mean and standard deviation of wall and CPU time.
//! - [`sample_resource_usage`] runs an operation once while a background
//!   thread samples this process's resident memory, returning the duration and
//!   the peak observed.
//! - [`run_sweep`] averages sampled runs per category of parameter tuples.
//!
//! Clocks and the memory probe are traits; [`Profiler`] lets tests and callers
//! substitute their own.
//!
//! There is no timeout: an operation that never returns blocks the caller
//! indefinitely.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clock;
mod config;
pub mod memory;
mod operation;
mod profiler;
pub mod sampler;
mod stats;
pub mod sweep;
pub mod trials;

pub use opprof_core::{Error, Result};

pub use clock::{CpuClock, CpuTimeSource, MonotonicClock, ProcCpuClock, SystemClock};
pub use config::{DEFAULT_SAMPLING_INTERVAL, DEFAULT_TRIALS, ProfilerConfig};
pub use memory::{MemoryStatus, ProcStatusMemory, ProcessMemoryQuery, ResourceObservation};
pub use operation::Operation;
pub use profiler::{Profiler, run_sweep, run_trials, sample_resource_usage};
pub use sampler::{MemorySampler, SampledRun, SamplerHandle, SamplerReport};
pub use stats::Summary;
pub use sweep::{
    Category, CategoryAccumulator, CategoryId, CategoryResult, SweepPlan, SweepRunner,
};
pub use trials::{TimingSample, TrialRunner, TrialStats};
