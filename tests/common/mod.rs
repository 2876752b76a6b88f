//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use simflow::graph::{Fault, FaultSink, Network};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Fault sink that keeps every reported fault for inspection
#[derive(Default)]
pub struct RecordingFaultSink {
    faults: Mutex<Vec<Fault>>,
}

impl RecordingFaultSink {
    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Fault) -> bool) -> usize {
        self.faults.lock().unwrap().iter().filter(|f| predicate(f)).count()
    }
}

impl FaultSink for RecordingFaultSink {
    fn report(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }
}

/// A network reporting into a fresh recording sink
pub fn recording_network() -> (Network, Arc<RecordingFaultSink>) {
    let sink = Arc::new(RecordingFaultSink::default());
    (Network::new(sink.clone()), sink)
}
