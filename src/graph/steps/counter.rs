//! CounterStep: counts its own cycles. Handy as a monotonic source.

use crate::graph::data::DataType;
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};

#[derive(Debug, Default)]
pub struct CounterStep {
    count: u64,
}

impl CounterStep {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for CounterStep {
    fn type_name(&self) -> &str {
        "counter"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("count", DataType::Scalar)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.count += 1;
        ctx.set_output("count", self.count as f64)
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}
