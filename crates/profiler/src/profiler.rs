//! Entry points tying the trial runner, sampler and sweep together

use crate::clock::{CpuClock, MonotonicClock, ProcCpuClock, SystemClock};
use crate::config::ProfilerConfig;
use crate::memory::{ProcStatusMemory, ProcessMemoryQuery};
use crate::operation::Operation;
use crate::sampler::{MemorySampler, SampledRun};
use crate::sweep::{CategoryResult, SweepPlan, SweepRunner};
use crate::trials::{TrialRunner, TrialStats};
use opprof_core::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Profiler with injectable clocks and memory probe
///
/// # Examples
///
/// ```no_run
/// # use opprof_profiler::{Profiler, ProfilerConfig, Result};
/// let profiler = Profiler::new(ProfilerConfig::default());
/// let stats = profiler.run_trials(&mut || -> Result<()> { Ok(()) }, 10)?;
/// println!("wall mean: {:.6}s", stats.wall.mean);
/// # Ok::<(), opprof_profiler::Error>(())
/// ```
#[derive(Clone)]
pub struct Profiler {
    config: ProfilerConfig,
    memory: Arc<dyn ProcessMemoryQuery>,
    wall_clock: Arc<dyn MonotonicClock>,
    cpu_clock: Arc<dyn CpuClock>,
}

impl Profiler {
    /// Create a profiler measuring the current process
    #[must_use]
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            config,
            memory: Arc::new(ProcStatusMemory::current()),
            wall_clock: Arc::new(SystemClock::new()),
            cpu_clock: Arc::new(ProcCpuClock::new()),
        }
    }

    /// Replace the memory probe
    #[must_use]
    pub fn with_memory_query(mut self, memory: Arc<dyn ProcessMemoryQuery>) -> Self {
        self.memory = memory;
        self
    }

    /// Replace the wall clock
    #[must_use]
    pub fn with_wall_clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.wall_clock = clock;
        self
    }

    /// Replace the CPU clock
    #[must_use]
    pub fn with_cpu_clock(mut self, clock: Arc<dyn CpuClock>) -> Self {
        self.cpu_clock = clock;
        self
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Run `trials` sequential trials of `operation`.
    ///
    /// # Errors
    ///
    /// See [`TrialRunner::run`].
    pub fn run_trials<O>(&self, operation: &mut O, trials: usize) -> Result<TrialStats>
    where
        O: Operation + ?Sized,
    {
        TrialRunner::new(self.wall_clock.as_ref(), self.cpu_clock.as_ref()).run(operation, trials)
    }

    /// Run the configured default number of trials.
    ///
    /// # Errors
    ///
    /// See [`TrialRunner::run`].
    pub fn run_default_trials<O>(&self, operation: &mut O) -> Result<TrialStats>
    where
        O: Operation + ?Sized,
    {
        self.run_trials(operation, self.config.trials())
    }

    /// Run `operation` once under the memory sampler at the configured interval.
    ///
    /// # Errors
    ///
    /// See [`MemorySampler::measure`].
    pub fn sample_resource_usage<O>(&self, operation: &mut O) -> Result<SampledRun>
    where
        O: Operation + ?Sized,
    {
        self.sample_resource_usage_every(operation, self.config.sampling_interval())
    }

    /// Run `operation` once under the memory sampler at an explicit interval.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an invalid interval, otherwise see
    /// [`MemorySampler::measure`].
    pub fn sample_resource_usage_every<O>(
        &self,
        operation: &mut O,
        interval: Duration,
    ) -> Result<SampledRun>
    where
        O: Operation + ?Sized,
    {
        self.sampler(interval)?
            .measure(self.wall_clock.as_ref(), operation)
    }

    /// Sweep every category of `plan`, building operations with `factory`.
    ///
    /// # Errors
    ///
    /// See [`SweepRunner::run`].
    pub fn run_sweep<P, O, F>(&self, plan: &SweepPlan<P>, factory: F) -> Result<Vec<CategoryResult>>
    where
        P: fmt::Debug,
        O: Operation,
        F: FnMut(&P) -> Result<O>,
    {
        let sampler = self.sampler(self.config.sampling_interval())?;
        SweepRunner::new(&sampler, self.wall_clock.as_ref()).run(plan, factory)
    }

    fn sampler(&self, interval: Duration) -> Result<MemorySampler> {
        MemorySampler::new(Arc::clone(&self.memory), interval)
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

/// Run `trials` trials of `operation` with the default clocks.
///
/// # Errors
///
/// See [`TrialRunner::run`].
pub fn run_trials<O>(operation: &mut O, trials: usize) -> Result<TrialStats>
where
    O: Operation + ?Sized,
{
    Profiler::default().run_trials(operation, trials)
}

/// Measure one run of `operation`, sampling this process's resident memory
/// every `interval`.
///
/// # Errors
///
/// See [`Profiler::sample_resource_usage_every`].
pub fn sample_resource_usage<O>(operation: &mut O, interval: Duration) -> Result<SampledRun>
where
    O: Operation + ?Sized,
{
    Profiler::default().sample_resource_usage_every(operation, interval)
}

/// Sweep `plan` with the default profiler.
///
/// # Errors
///
/// See [`SweepRunner::run`].
pub fn run_sweep<P, O, F>(plan: &SweepPlan<P>, factory: F) -> Result<Vec<CategoryResult>>
where
    P: fmt::Debug,
    O: Operation,
    F: FnMut(&P) -> Result<O>,
{
    Profiler::default().run_sweep(plan, factory)
}
