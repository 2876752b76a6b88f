//! ConstantStep: publishes a fixed value every cycle.

use crate::graph::data::{DataType, DataValue};
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};

pub struct ConstantStep {
    data_type: DataType,
    value: DataValue,
}

impl ConstantStep {
    pub fn new(data_type: DataType, value: DataValue) -> Self {
        Self { data_type, value }
    }

    pub fn scalar(value: f64) -> Self {
        Self::new(DataType::Scalar, DataValue::Scalar(value))
    }

    pub fn set_value(&mut self, value: DataValue) {
        self.value = value;
    }
}

impl Step for ConstantStep {
    fn type_name(&self) -> &str {
        "constant"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("value", self.data_type)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        ctx.set_output("value", self.value.clone())
    }
}
