//! Loop modes: when a root trigger fires and what time step it reports.
//!
//! A [`LoopMode`] is a pure policy. Given how long the previous cycle took,
//! [`LoopMode::plan`] says how long to wait before the next firing and which
//! simulated time delta the steps should integrate over.

use std::fmt;
use std::time::Duration;

/// Delta reported on the very first fastest-possible cycle, before any
/// elapsed time has been measured.
pub const FIRST_CYCLE_DELTA: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Fire every `interval`; steps always see `interval` as their delta.
    FixedRate { interval: Duration },
    /// Fire back to back; steps see the measured wall-clock delta.
    FastestPossible,
    /// Fire once per external request; steps see `step` as their delta.
    SingleStep { step: Duration },
}

/// Output of the policy for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    /// Time to wait after the cycle just measured.
    pub sleep: Duration,
    /// Simulated delta to report on the next firing.
    pub delta: Duration,
    /// The measured cycle did not fit in the interval.
    pub overrun: bool,
}

impl LoopMode {
    pub fn fixed_rate(interval: Duration) -> Self {
        LoopMode::FixedRate { interval }
    }

    pub fn fixed_rate_hz(hz: u32) -> Self {
        LoopMode::FixedRate {
            interval: Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1))),
        }
    }

    pub fn single_step(step: Duration) -> Self {
        LoopMode::SingleStep { step }
    }

    /// Whether the trigger re-arms by itself.
    pub fn is_autonomous(&self) -> bool {
        !matches!(self, LoopMode::SingleStep { .. })
    }

    /// Plan the next cycle from the previous one's measured duration.
    ///
    /// `last_cycle` is `None` before the first firing.
    pub fn plan(&self, last_cycle: Option<Duration>) -> CyclePlan {
        match *self {
            LoopMode::FixedRate { interval } => {
                let elapsed = last_cycle.unwrap_or(Duration::ZERO);
                CyclePlan {
                    sleep: interval.saturating_sub(elapsed),
                    delta: interval,
                    overrun: elapsed > interval,
                }
            }
            LoopMode::FastestPossible => CyclePlan {
                sleep: Duration::ZERO,
                delta: last_cycle.unwrap_or(FIRST_CYCLE_DELTA),
                overrun: false,
            },
            LoopMode::SingleStep { step } => CyclePlan {
                sleep: Duration::ZERO,
                delta: step,
                overrun: false,
            },
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::FixedRate { interval } => write!(f, "fixed-rate ({:?})", interval),
            LoopMode::FastestPossible => write!(f, "fastest-possible"),
            LoopMode::SingleStep { step } => write!(f, "single-step ({:?})", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_rate_sleeps_remainder() {
        let mode = LoopMode::fixed_rate(Duration::from_millis(10));
        let plan = mode.plan(Some(Duration::from_millis(3)));
        assert_eq!(plan.sleep, Duration::from_millis(7));
        assert_eq!(plan.delta, Duration::from_millis(10));
        assert!(!plan.overrun);
    }

    #[test]
    fn test_fixed_rate_overrun_does_not_catch_up() {
        let mode = LoopMode::fixed_rate(Duration::from_millis(10));
        let plan = mode.plan(Some(Duration::from_millis(25)));
        assert_eq!(plan.sleep, Duration::ZERO);
        assert_eq!(plan.delta, Duration::from_millis(10));
        assert!(plan.overrun);
    }

    #[test]
    fn test_fastest_reports_measured_delta() {
        let mode = LoopMode::FastestPossible;
        assert_eq!(mode.plan(None).delta, FIRST_CYCLE_DELTA);
        let plan = mode.plan(Some(Duration::from_micros(250)));
        assert_eq!(plan.sleep, Duration::ZERO);
        assert_eq!(plan.delta, Duration::from_micros(250));
    }

    #[test]
    fn test_single_step_is_not_autonomous() {
        let mode = LoopMode::single_step(Duration::from_millis(5));
        assert!(!mode.is_autonomous());
        assert!(LoopMode::FastestPossible.is_autonomous());
        assert_eq!(mode.plan(Some(Duration::from_secs(1))).delta, Duration::from_millis(5));
    }

    #[test]
    fn test_fixed_rate_hz() {
        assert_eq!(
            LoopMode::fixed_rate_hz(100),
            LoopMode::fixed_rate(Duration::from_millis(10))
        );
        // Zero is clamped rather than dividing by zero
        assert_eq!(LoopMode::fixed_rate_hz(0), LoopMode::fixed_rate(Duration::from_secs(1)));
    }

    proptest! {
        #[test]
        fn prop_fixed_rate_delta_is_constant(interval_us in 1u64..1_000_000, elapsed_us in 0u64..2_000_000) {
            let interval = Duration::from_micros(interval_us);
            let elapsed = Duration::from_micros(elapsed_us);
            let plan = LoopMode::fixed_rate(interval).plan(Some(elapsed));
            prop_assert_eq!(plan.delta, interval);
            prop_assert_eq!(plan.sleep + elapsed.min(interval), interval);
            prop_assert_eq!(plan.overrun, elapsed > interval);
        }

        #[test]
        fn prop_fastest_never_sleeps(elapsed_us in 0u64..10_000_000) {
            let plan = LoopMode::FastestPossible.plan(Some(Duration::from_micros(elapsed_us)));
            prop_assert_eq!(plan.sleep, Duration::ZERO);
            prop_assert!(!plan.overrun);
        }
    }
}
