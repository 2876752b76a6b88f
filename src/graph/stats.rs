//! Cycle-timing statistics for triggers and steps.
//!
//! Counters are atomics written by the trigger thread and read by anyone
//! (typically a UI polling loop) through the `snapshot` methods.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters owned by one trigger.
#[derive(Debug, Default)]
pub struct TriggerStats {
    cycles: AtomicU64,
    skipped: AtomicU64,
    overruns: AtomicU64,
    last_duration_ns: AtomicU64,
    max_duration_ns: AtomicU64,
    last_interval_ns: AtomicU64,
    last_delta_ns: AtomicU64,
}

impl TriggerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self, duration: Duration, delta: Duration) {
        let ns = duration_ns(duration);
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_duration_ns.store(ns, Ordering::Relaxed);
        self.max_duration_ns.fetch_max(ns, Ordering::Relaxed);
        self.last_delta_ns
            .store(duration_ns(delta), Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interval(&self, interval: Duration) {
        self.last_interval_ns
            .store(duration_ns(interval), Ordering::Relaxed);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TriggerStatsSnapshot {
        TriggerStatsSnapshot {
            cycles: self.cycles(),
            skipped_cycles: self.skipped(),
            overruns: self.overruns(),
            last_cycle: Duration::from_nanos(self.last_duration_ns.load(Ordering::Relaxed)),
            max_cycle: Duration::from_nanos(self.max_duration_ns.load(Ordering::Relaxed)),
            last_interval: Duration::from_nanos(self.last_interval_ns.load(Ordering::Relaxed)),
            last_delta: Duration::from_nanos(self.last_delta_ns.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of a trigger's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerStatsSnapshot {
    /// Completed propagation waves.
    pub cycles: u64,
    /// Waves dropped because the previous one had not finished.
    pub skipped_cycles: u64,
    /// Fixed-rate cycles that took longer than their interval.
    pub overruns: u64,
    /// Measured duration of the most recent wave.
    pub last_cycle: Duration,
    /// Longest wave so far.
    pub max_cycle: Duration,
    /// Wall-clock time between the two most recent fires.
    pub last_interval: Duration,
    /// Simulated time delta reported to steps on the last wave.
    pub last_delta: Duration,
}

impl TriggerStatsSnapshot {
    /// Effective firing rate derived from the last interval.
    pub fn effective_rate_hz(&self) -> f64 {
        let secs = self.last_interval.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

/// Live counters owned by one step.
#[derive(Debug, Default)]
pub struct StepStats {
    computes: AtomicU64,
    not_ready: AtomicU64,
    faults: AtomicU64,
    last_compute_ns: AtomicU64,
}

impl StepStats {
    pub(crate) fn record_compute(&self, duration: Duration) {
        self.computes.fetch_add(1, Ordering::Relaxed);
        self.last_compute_ns
            .store(duration_ns(duration), Ordering::Relaxed);
    }

    pub(crate) fn record_not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StepStatsSnapshot {
        StepStatsSnapshot {
            computes: self.computes.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            last_compute: Duration::from_nanos(self.last_compute_ns.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepStatsSnapshot {
    /// Compute calls that returned successfully.
    pub computes: u64,
    /// Cycles skipped because an input was not ready.
    pub not_ready: u64,
    pub faults: u64,
    pub last_compute: Duration,
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cycle_tracks_max() {
        let stats = TriggerStats::new();
        stats.record_cycle(Duration::from_millis(3), Duration::from_millis(10));
        stats.record_cycle(Duration::from_millis(1), Duration::from_millis(10));
        let snap = stats.snapshot();
        assert_eq!(snap.cycles, 2);
        assert_eq!(snap.last_cycle, Duration::from_millis(1));
        assert_eq!(snap.max_cycle, Duration::from_millis(3));
        assert_eq!(snap.last_delta, Duration::from_millis(10));
    }

    #[test]
    fn test_effective_rate() {
        let snap = TriggerStatsSnapshot {
            last_interval: Duration::from_millis(10),
            ..Default::default()
        };
        assert!((snap.effective_rate_hz() - 100.0).abs() < 1e-9);
        assert_eq!(TriggerStatsSnapshot::default().effective_rate_hz(), 0.0);
    }
}
