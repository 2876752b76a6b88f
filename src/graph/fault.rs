//! Fault reporting.
//!
//! Triggers and workers receive an explicit [`FaultSink`] at construction and
//! report compute faults, skipped cycles and overruns through it. Nothing in
//! the runtime is fatal: a sink only observes.

use crate::graph::id::{StepId, TriggerId};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// An event worth telling the graph owner about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Fault {
    /// A step's compute failed; the step is now Faulted.
    Compute {
        step: StepId,
        step_name: String,
        trigger: TriggerId,
        message: String,
    },
    /// `trigger()` was called while the previous wave was still running.
    SkippedCycle { trigger: TriggerId },
    /// A fixed-rate cycle took longer than its interval.
    Overrun {
        trigger: TriggerId,
        duration: Duration,
        interval: Duration,
    },
}

/// Receiver of runtime faults.
pub trait FaultSink: Send + Sync {
    fn report(&self, fault: Fault);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFaultSink;

impl FaultSink for NullFaultSink {
    fn report(&self, _fault: Fault) {}
}

/// Writes faults to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFaultSink;

impl FaultSink for LogFaultSink {
    fn report(&self, fault: Fault) {
        match fault {
            Fault::Compute {
                step,
                step_name,
                trigger,
                message,
            } => {
                tracing::error!("Step '{}' ({:?}) on {:?} faulted: {}", step_name, step, trigger, message);
            }
            Fault::SkippedCycle { trigger } => {
                tracing::warn!("{:?} skipped a cycle (previous wave still running)", trigger);
            }
            Fault::Overrun {
                trigger,
                duration,
                interval,
            } => {
                tracing::warn!("{:?} overran: cycle took {:?} (interval {:?})", trigger, duration, interval);
            }
        }
    }
}

/// Forwards faults over a bounded channel for a polling consumer.
///
/// Uses `try_send` so a slow consumer never stalls a trigger thread; faults
/// that do not fit are counted in [`dropped`](Self::dropped).
pub struct ChannelFaultSink {
    tx: Sender<Fault>,
    dropped: AtomicU64,
}

impl ChannelFaultSink {
    /// Create a sink and the receiver the consumer should drain.
    pub fn new(capacity: usize) -> (Self, Receiver<Fault>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FaultSink for ChannelFaultSink {
    fn report(&self, fault: Fault) {
        match self.tx.try_send(fault) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let count = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if count == 1 || count % 100 == 0 {
                    tracing::warn!("Fault queue full, {} faults dropped", count);
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
