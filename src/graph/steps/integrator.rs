//! IntegratorStep: forward-Euler integration of a scalar rate.
//!
//! `state += rate * dt` each cycle, where `dt` is the simulated delta the
//! firing trigger reports. Under a fixed-rate loop this makes the result
//! independent of wall-clock jitter.

use crate::graph::data::DataType;
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};

pub struct IntegratorStep {
    initial: f64,
    state: f64,
}

impl IntegratorStep {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            state: initial,
        }
    }

    pub fn state(&self) -> f64 {
        self.state
    }
}

impl Step for IntegratorStep {
    fn type_name(&self) -> &str {
        "integrator"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::input("rate", DataType::Scalar),
            SlotDescriptor::output("state", DataType::Scalar),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        let rate = ctx.scalar("rate")?;
        let next = self.state + rate * ctx.dt_secs();
        if !next.is_finite() {
            return Err(ComputeError::failed(format!(
                "integrator diverged (state {}, rate {})",
                self.state, rate
            )));
        }
        self.state = next;
        ctx.set_output("state", self.state)
    }

    fn on_start(&mut self) {
        self.state = self.initial;
    }

    fn reset(&mut self) {
        self.state = self.initial;
    }
}
