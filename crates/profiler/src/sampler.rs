//! Concurrent resident-memory sampling around a timed operation.
//!
//! A [`MemorySampler`] starts one background thread that probes resident
//! memory every interval and folds readings into a running maximum. The
//! maximum lives on the sampling thread's stack and only reaches the caller as
//! the thread's join result, so the peak can never be read before the thread
//! has stopped.
//!
//! Accuracy bound: an operation shorter than one interval may finish before
//! any probe lands, or between two probes, in which case the reported peak
//! understates the true peak (possibly 0 with no probes at all). This is not
//! corrected for.

use crate::clock::MonotonicClock;
use crate::config::validate_sampling_interval;
use crate::memory::{ProcessMemoryQuery, ResourceObservation};
use crate::operation::Operation;
use opprof_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Outcome of one sampled operation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledRun {
    /// Wall-clock duration of the operation
    pub duration: Duration,

    /// Highest resident size observed while the operation ran
    pub peak_resident_bytes: u64,

    /// Number of successful probes taken
    pub probes: u64,
}

/// What the sampling thread hands back when it is joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerReport {
    /// Highest resident size observed
    pub peak_resident_bytes: u64,

    /// Number of successful probes taken
    pub probes: u64,
}

impl SamplerReport {
    fn observe(&mut self, observation: ResourceObservation) {
        self.peak_resident_bytes = self.peak_resident_bytes.max(observation.resident_bytes);
        self.probes = self.probes.saturating_add(1);
    }
}

/// Factory for background sampling threads.
#[derive(Clone)]
pub struct MemorySampler {
    probe: Arc<dyn ProcessMemoryQuery>,
    interval: Duration,
}

impl MemorySampler {
    /// Create a sampler polling `probe` every `interval`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the interval is zero or out of range.
    pub fn new(probe: Arc<dyn ProcessMemoryQuery>, interval: Duration) -> Result<Self> {
        validate_sampling_interval(interval)?;
        Ok(Self { probe, interval })
    }

    /// Polling interval
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the sampling thread.
    ///
    /// # Errors
    ///
    /// Returns `Error::SamplerFailed` if the thread cannot be spawned.
    pub fn start(&self) -> Result<SamplerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let probe = Arc::clone(&self.probe);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("memory-sampler".to_string())
            .spawn(move || sample_loop(probe.as_ref(), interval, &stop_rx))
            .map_err(|e| Error::sampler_failed(format!("thread spawn: {e}")))?;

        debug!(?interval, "memory sampler started");

        Ok(SamplerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Run `operation` once while sampling, returning its duration and peak.
    ///
    /// The sampling thread is stopped and joined before this returns, on
    /// success and on failure alike.
    ///
    /// # Errors
    ///
    /// Returns the operation's error unchanged, or `Error::SamplerFailed` if
    /// the sampling thread could not be started or panicked.
    pub fn measure<O>(&self, clock: &dyn MonotonicClock, operation: &mut O) -> Result<SampledRun>
    where
        O: Operation + ?Sized,
    {
        let handle = self.start()?;

        let start = clock.now();
        let outcome = operation.invoke();
        let duration = clock.now().saturating_sub(start);

        let report = handle
            .stop()
            .inspect_error(|e| debug!("memory sampler did not stop cleanly: {e}"));

        outcome?;
        let report = report?;

        Ok(SampledRun {
            duration,
            peak_resident_bytes: report.peak_resident_bytes,
            probes: report.probes,
        })
    }
}

/// A running sampling thread.
///
/// Dropping the handle without calling [`SamplerHandle::stop`] still signals
/// and joins the thread.
pub struct SamplerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<SamplerReport>>,
}

impl SamplerHandle {
    /// Signal the sampling thread to stop and block until it has exited.
    ///
    /// # Errors
    ///
    /// Returns `Error::SamplerFailed` if the sampling thread panicked.
    pub fn stop(mut self) -> Result<SamplerReport> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<SamplerReport> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // A send error means the thread already exited on its own
            let _ = stop_tx.send(());
        }

        let thread = self
            .thread
            .take()
            .ok_or_else(|| Error::sampler_failed("sampler already stopped"))?;

        let report = thread
            .join()
            .map_err(|_| Error::sampler_failed("sampling thread panicked"))?;

        debug!(
            peak = report.peak_resident_bytes,
            probes = report.probes,
            "memory sampler stopped"
        );

        Ok(report)
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.shutdown();
        }
    }
}

/// Body of the sampling thread.
fn sample_loop(
    probe: &dyn ProcessMemoryQuery,
    interval: Duration,
    stop_rx: &Receiver<()>,
) -> SamplerReport {
    let origin = Instant::now();
    let mut report = SamplerReport::default();

    loop {
        if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }

        let Some(resident_bytes) = probe.resident_bytes().into_option_traced("memory sampler")
        else {
            break;
        };

        let observation = ResourceObservation {
            timestamp: origin.elapsed(),
            resident_bytes,
        };
        trace!(elapsed = ?observation.timestamp, resident_bytes, "memory probe");
        report.observe(observation);

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    report
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::clock::SystemClock;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Probe replaying a fixed script, then repeating the last value
    struct ScriptedMemory {
        readings: Vec<u64>,
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl ScriptedMemory {
        fn new(readings: Vec<u64>) -> Self {
            Self {
                readings,
                calls: AtomicUsize::new(0),
                fail_after: None,
            }
        }

        fn failing_after(readings: Vec<u64>, n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::new(readings)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ProcessMemoryQuery for ScriptedMemory {
        fn resident_bytes(&self) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|n| call >= n) {
                return Err(Error::probe_failed("process vanished"));
            }
            let idx = call.min(self.readings.len().saturating_sub(1));
            Ok(self.readings.get(idx).copied().unwrap_or(0))
        }
    }

    fn sampler(probe: Arc<dyn ProcessMemoryQuery>, millis: u64) -> MemorySampler {
        MemorySampler::new(probe, Duration::from_millis(millis))
            .expect("interval within accepted range")
    }

    #[test]
    fn test_zero_interval_rejected() {
        let probe = Arc::new(ScriptedMemory::new(vec![1]));
        let result = MemorySampler::new(probe, Duration::ZERO);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_peak_is_running_maximum() {
        let probe = Arc::new(ScriptedMemory::new(vec![5, 10, 3]));
        let sampler = sampler(probe.clone(), 1);

        let run = sampler.measure(&SystemClock::new(), &mut || -> Result<()> {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        });

        assert!(run.is_ok());
        if let Ok(run) = run {
            assert_eq!(run.peak_resident_bytes, 10);
            assert!(run.probes >= 3);
            assert!(run.duration >= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_memory_read_failure_stops_sampling_silently() {
        let probe = Arc::new(ScriptedMemory::failing_after(vec![7, 9], 2));
        let sampler = sampler(probe.clone(), 1);

        let run = sampler.measure(&SystemClock::new(), &mut || -> Result<()> {
            thread::sleep(Duration::from_millis(30));
            Ok(())
        });

        assert!(run.is_ok());
        if let Ok(run) = run {
            assert_eq!(run.peak_resident_bytes, 9);
            assert_eq!(run.probes, 2);
        }
        // Sampling ended at the first failed probe
        assert_eq!(probe.calls(), 3);
    }

    #[test]
    fn test_operation_failure_joins_sampler_first() {
        let probe = Arc::new(ScriptedMemory::new(vec![1]));
        let sampler = sampler(probe.clone(), 1);

        let result = sampler.measure(&SystemClock::new(), &mut || -> Result<()> {
            thread::sleep(Duration::from_millis(10));
            Err(Error::operation("bad key length"))
        });

        assert!(matches!(result, Err(Error::Operation { .. })));

        // No sampling thread survives the failed run
        let calls_after = probe.calls();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(probe.calls(), calls_after);
    }

    #[test]
    fn test_stop_handle_returns_report() {
        let probe = Arc::new(ScriptedMemory::new(vec![100, 200]));
        let sampler = sampler(probe, 1);

        let handle = sampler.start();
        assert!(handle.is_ok());
        let Ok(handle) = handle else {
            return;
        };
        thread::sleep(Duration::from_millis(20));
        let report = handle.stop();

        assert!(report.is_ok_and(|r| r.peak_resident_bytes == 200 && r.probes >= 2));
    }

    #[test]
    fn test_dropped_handle_joins_thread() {
        let probe = Arc::new(ScriptedMemory::new(vec![1]));
        let sampler = sampler(probe.clone(), 1);

        if let Ok(handle) = sampler.start() {
            thread::sleep(Duration::from_millis(5));
            drop(handle);
        }

        let calls_after = probe.calls();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(probe.calls(), calls_after);
    }

    #[test]
    fn test_fast_operation_may_understate_peak() {
        // A long interval and an instant operation: at most the initial probe lands.
        let probe = Arc::new(ScriptedMemory::new(vec![0, 1_000_000]));
        let sampler = sampler(probe, 1_000);

        let run = sampler.measure(&SystemClock::new(), &mut || -> Result<()> { Ok(()) });

        assert!(run.is_ok_and(|r| r.probes <= 1 && r.peak_resident_bytes == 0));
    }

    #[test]
    fn test_stop_is_not_delayed_by_long_interval() {
        let probe = Arc::new(ScriptedMemory::new(vec![1]));
        let sampler = sampler(probe, 5_000);

        let started = Instant::now();
        let run = sampler.measure(&SystemClock::new(), &mut || -> Result<()> {
            thread::sleep(Duration::from_millis(5));
            Ok(())
        });

        assert!(run.is_ok());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_concurrent_memory_readings_are_never_torn() {
        // Probe values are all multiples of a marker; any torn or racing read
        // of the peak would surface as a value outside that set.
        const MARKER: u64 = 4096;
        let counter = Arc::new(AtomicU64::new(1));

        struct Climbing(Arc<AtomicU64>);
        impl ProcessMemoryQuery for Climbing {
            fn resident_bytes(&self) -> Result<u64> {
                Ok(self.0.fetch_add(1, Ordering::SeqCst) * MARKER)
            }
        }

        let sampler = sampler(Arc::new(Climbing(counter.clone())), 1);
        for i in 0..50u64 {
            let run = sampler.measure(&SystemClock::new(), &mut || -> Result<()> {
                thread::sleep(Duration::from_micros(i * 97 % 3_000));
                Ok(())
            });
            assert!(run.is_ok_and(|r| r.peak_resident_bytes % MARKER == 0
                && r.peak_resident_bytes < counter.load(Ordering::SeqCst) * MARKER));
        }
    }
}
