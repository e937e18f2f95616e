//! Configuration for the operation profiler

use opprof_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between resident-memory probes
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_millis(10);

/// Default number of trials for the trial runner
pub const DEFAULT_TRIALS: usize = 5;

/// Shortest accepted sampling interval
const MIN_SAMPLING_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted sampling interval
const MAX_SAMPLING_INTERVAL: Duration = Duration::from_secs(10);

/// Validated profiler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Interval between resident-memory probes
    sampling_interval: Duration,

    /// Trials per `run_trials` call when the caller does not pass a count
    trials: usize,
}

impl ProfilerConfig {
    /// Create a new profiler configuration with validation
    ///
    /// # Arguments
    ///
    /// * `sampling_interval` - Delay between memory probes (1ms..=10s)
    /// * `trials` - Default trial count (at least 1)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the interval is outside the accepted
    /// range or the trial count is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use opprof_profiler::ProfilerConfig;
    /// # use std::time::Duration;
    /// let config = ProfilerConfig::new(Duration::from_millis(10), 5);
    /// assert!(config.is_ok());
    /// ```
    pub fn new(sampling_interval: Duration, trials: usize) -> Result<Self> {
        validate_sampling_interval(sampling_interval)?;
        validate_trials(trials)?;

        Ok(Self {
            sampling_interval,
            trials,
        })
    }

    /// Replace the sampling interval, re-validating it
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the interval is out of range.
    pub fn with_sampling_interval(self, sampling_interval: Duration) -> Result<Self> {
        Self::new(sampling_interval, self.trials)
    }

    /// Replace the trial count, re-validating it
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `trials` is zero.
    pub fn with_trials(self, trials: usize) -> Result<Self> {
        Self::new(self.sampling_interval, trials)
    }

    /// Get the sampling interval
    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    /// Get the default trial count
    #[must_use]
    pub const fn trials(&self) -> usize {
        self.trials
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            trials: DEFAULT_TRIALS,
        }
    }
}

/// Validate a sampling interval
pub(crate) fn validate_sampling_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        Err(Error::invalid_config("sampling interval must be greater than 0"))
    } else if interval < MIN_SAMPLING_INTERVAL {
        Err(Error::invalid_config(format!(
            "sampling interval {interval:?} is shorter than the minimum {MIN_SAMPLING_INTERVAL:?}"
        )))
    } else if interval > MAX_SAMPLING_INTERVAL {
        Err(Error::invalid_config(format!(
            "sampling interval {interval:?} exceeds the maximum {MAX_SAMPLING_INTERVAL:?}"
        )))
    } else {
        Ok(())
    }
}

/// Validate a trial count
pub(crate) fn validate_trials(trials: usize) -> Result<()> {
    if trials == 0 {
        Err(Error::invalid_config("trial count must be at least 1"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ProfilerConfig::new(Duration::from_millis(10), 20);
        assert!(config.is_ok());
    }

    #[test]
    fn test_default_matches_constants() {
        let config = ProfilerConfig::default();
        assert_eq!(config.sampling_interval(), DEFAULT_SAMPLING_INTERVAL);
        assert_eq!(config.trials(), DEFAULT_TRIALS);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ProfilerConfig::new(Duration::ZERO, 5);
        assert!(matches!(config, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_sub_millisecond_interval_rejected() {
        let config = ProfilerConfig::new(Duration::from_micros(200), 5);
        assert!(matches!(config, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_interval_too_long() {
        let config = ProfilerConfig::new(Duration::from_secs(11), 5);
        assert!(matches!(config, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let config = ProfilerConfig::default().with_trials(0);
        assert!(matches!(config, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_with_sampling_interval() {
        let config = ProfilerConfig::default().with_sampling_interval(Duration::from_millis(50));
        assert_eq!(
            config.ok().map(|c| c.sampling_interval()),
            Some(Duration::from_millis(50))
        );
    }
}
