//! GainStep: multiplies its input by a constant factor.
//!
//! Works element-wise on scalars, matrices and records, so the declared slot
//! type picks which of those it can be connected to.

use crate::graph::data::DataType;
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};

pub struct GainStep {
    gain: f64,
    data_type: DataType,
}

impl GainStep {
    pub fn new(gain: f64) -> Self {
        Self::with_type(gain, DataType::Scalar)
    }

    pub fn with_type(gain: f64, data_type: DataType) -> Self {
        Self { gain, data_type }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl Step for GainStep {
    fn type_name(&self) -> &str {
        "gain"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::input("input", self.data_type),
            SlotDescriptor::output("output", self.data_type),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        let input = ctx
            .input("input")
            .ok_or_else(|| ComputeError::MissingInput("input".to_string()))?;
        let gain = self.gain;
        let output = input.map_numeric(|v| v * gain);
        ctx.set_output("output", output)
    }
}
