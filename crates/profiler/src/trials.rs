//! Trial runner: repeated sequential execution with wall and CPU timing.

use crate::clock::{CpuClock, MonotonicClock};
use crate::config::validate_trials;
use crate::operation::Operation;
use crate::stats::Summary;
use opprof_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Wall and CPU time of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    /// Elapsed monotonic wall time
    pub wall: Duration,

    /// CPU time charged while the trial ran
    pub cpu: Duration,
}

/// Reduced statistics from `n` trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    /// Wall-clock seconds
    pub wall: Summary,

    /// CPU seconds
    pub cpu: Summary,

    /// Number of trials the statistics were computed over
    pub trials: usize,
}

impl TrialStats {
    /// Reduce a complete sample set.
    ///
    /// Returns `None` when `samples` is empty.
    #[must_use]
    pub fn from_samples(samples: &[TimingSample]) -> Option<Self> {
        let wall: Vec<f64> = samples.iter().map(|s| s.wall.as_secs_f64()).collect();
        let cpu: Vec<f64> = samples.iter().map(|s| s.cpu.as_secs_f64()).collect();

        Some(Self {
            wall: Summary::from_samples(&wall)?,
            cpu: Summary::from_samples(&cpu)?,
            trials: samples.len(),
        })
    }

    /// Total wall seconds spent across all trials.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_wall_seconds(&self) -> f64 {
        self.wall.mean * self.trials as f64
    }

    /// Throughput in MiB/s for an operation processing `bytes` per trial.
    ///
    /// Returns `None` when the mean wall time is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput_mib_per_sec(&self, bytes: usize) -> Option<f64> {
        (self.wall.mean > 0.0).then(|| (bytes as f64 / BYTES_PER_MIB) / self.wall.mean)
    }
}

/// Runs an operation repeatedly and times each execution.
pub struct TrialRunner<'a> {
    wall_clock: &'a dyn MonotonicClock,
    cpu_clock: &'a dyn CpuClock,
}

impl<'a> TrialRunner<'a> {
    /// Create a runner over the given clocks
    #[must_use]
    pub const fn new(wall_clock: &'a dyn MonotonicClock, cpu_clock: &'a dyn CpuClock) -> Self {
        Self {
            wall_clock,
            cpu_clock,
        }
    }

    /// Execute and time one trial.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or `Error::ProbeFailed` if the CPU clock
    /// cannot be read.
    pub fn measure_trial<O>(&self, operation: &mut O) -> Result<TimingSample>
    where
        O: Operation + ?Sized,
    {
        let cpu_start = self.cpu_clock.cpu_time()?;
        let wall_start = self.wall_clock.now();

        operation.invoke()?;

        let wall_end = self.wall_clock.now();
        let cpu_end = self.cpu_clock.cpu_time()?;

        Ok(TimingSample {
            wall: wall_end.saturating_sub(wall_start),
            cpu: cpu_end.saturating_sub(cpu_start),
        })
    }

    /// Execute `trials` sequential trials and reduce them to statistics.
    ///
    /// The first failing trial aborts the run; its index is attached to the
    /// error and no partial statistics are produced.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `trials` is zero (before the
    /// operation runs), or `Error::TrialFailed` wrapping the first failure.
    pub fn run<O>(&self, operation: &mut O, trials: usize) -> Result<TrialStats>
    where
        O: Operation + ?Sized,
    {
        validate_trials(trials)?;

        let samples = (0..trials)
            .map(|trial| {
                self.measure_trial(operation)
                    .inspect(|sample| trace!(trial, wall = ?sample.wall, cpu = ?sample.cpu, "trial complete"))
                    .map_err(|e| e.in_trial(trial))
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = TrialStats::from_samples(&samples)
            .ok_or_else(|| Error::invalid_config("trial run produced no samples"))?;

        debug!(
            trials,
            wall_mean = stats.wall.mean,
            cpu_mean = stats.cpu.mean,
            "trial run complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    /// Clock that advances by a fixed step on every read
    struct SteppingClock {
        now: Mutex<Duration>,
        step: Duration,
    }

    impl SteppingClock {
        fn new(step: Duration) -> Self {
            Self {
                now: Mutex::new(Duration::ZERO),
                step,
            }
        }

        fn tick(&self) -> Duration {
            let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *now += self.step;
            *now
        }
    }

    impl MonotonicClock for SteppingClock {
        fn now(&self) -> Duration {
            self.tick()
        }
    }

    impl CpuClock for SteppingClock {
        fn cpu_time(&self) -> Result<Duration> {
            Ok(self.tick())
        }
    }

    fn noop() -> Result<()> {
        Ok(())
    }

    struct BrokenCpuClock;

    impl CpuClock for BrokenCpuClock {
        fn cpu_time(&self) -> Result<Duration> {
            Err(Error::probe_failed("no procfs"))
        }
    }

    #[test]
    fn test_single_trial_has_zero_std_dev() {
        let wall = SteppingClock::new(Duration::ZERO);
        let cpu = SteppingClock::new(Duration::ZERO);
        let runner = TrialRunner::new(&wall, &cpu);

        let stats = runner.run(&mut noop, 1);

        assert!(stats.is_ok());
        if let Ok(s) = stats {
            assert_eq!(s.trials, 1);
            assert!(s.wall.mean.abs() < f64::EPSILON);
            assert!(s.wall.std_dev.abs() < f64::EPSILON);
            assert!(s.cpu.std_dev.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_invokes_exactly_n_times() {
        let wall = SteppingClock::new(Duration::from_millis(1));
        let cpu = SteppingClock::new(Duration::from_millis(1));
        let runner = TrialRunner::new(&wall, &cpu);

        for n in [1usize, 2, 7, 50] {
            let calls = Cell::new(0usize);
            let stats = runner.run(
                &mut || -> Result<()> {
                    calls.set(calls.get() + 1);
                    Ok(())
                },
                n,
            );
            assert_eq!(calls.get(), n);
            assert_eq!(stats.ok().map(|s| s.trials), Some(n));
        }
    }

    #[test]
    fn test_stepping_clock_gives_exact_durations() {
        // Each wall read advances 5ms, so each trial spans one step.
        let wall = SteppingClock::new(Duration::from_millis(5));
        let cpu = SteppingClock::new(Duration::from_millis(2));
        let runner = TrialRunner::new(&wall, &cpu);

        let stats = runner.run(&mut noop, 4);
        assert!(stats.is_ok());
        let Ok(stats) = stats else {
            return;
        };

        assert!((stats.wall.mean - 0.005).abs() < 1e-12);
        assert!((stats.cpu.mean - 0.002).abs() < 1e-12);
        assert!(stats.wall.std_dev.abs() < 1e-12);
        assert!((stats.total_wall_seconds() - 0.020).abs() < 1e-12);
    }

    #[test]
    fn test_zero_trials_rejected_before_running() {
        let wall = SteppingClock::new(Duration::ZERO);
        let cpu = SteppingClock::new(Duration::ZERO);
        let runner = TrialRunner::new(&wall, &cpu);

        let calls = Cell::new(0usize);
        let result = runner.run(
            &mut || -> Result<()> {
                calls.set(calls.get() + 1);
                Ok(())
            },
            0,
        );

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_failure_on_second_trial_propagates() {
        let wall = SteppingClock::new(Duration::from_millis(1));
        let cpu = SteppingClock::new(Duration::from_millis(1));
        let runner = TrialRunner::new(&wall, &cpu);

        let calls = Cell::new(0usize);
        let result = runner.run(
            &mut || -> Result<()> {
                calls.set(calls.get() + 1);
                if calls.get() == 2 {
                    Err(Error::operation("invalid parameters"))
                } else {
                    Ok(())
                }
            },
            5,
        );

        assert_eq!(calls.get(), 2);
        assert!(matches!(result, Err(Error::TrialFailed { trial: 1, .. })));
    }

    #[test]
    fn test_cpu_clock_failure_propagates() {
        let wall = SteppingClock::new(Duration::from_millis(1));
        let runner = TrialRunner::new(&wall, &BrokenCpuClock);

        let result = runner.run(&mut noop, 3);
        assert!(result.is_err_and(|e| e.trial_index() == Some(0)));
    }

    #[test]
    fn test_throughput() {
        let stats = TrialStats {
            wall: Summary {
                mean: 0.5,
                std_dev: 0.0,
            },
            cpu: Summary {
                mean: 0.5,
                std_dev: 0.0,
            },
            trials: 5,
        };
        let mib_s = stats.throughput_mib_per_sec(1024 * 1024);
        assert!(mib_s.is_some_and(|v| (v - 2.0).abs() < 1e-12));

        let instant = TrialStats {
            wall: Summary {
                mean: 0.0,
                std_dev: 0.0,
            },
            ..stats
        };
        assert_eq!(instant.throughput_mib_per_sec(1024), None);
    }
}
