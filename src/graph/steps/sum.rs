//! SumStep: adds two scalar inputs. `b` is optional and defaults to zero.

use crate::graph::data::DataType;
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};

#[derive(Debug, Default)]
pub struct SumStep;

impl SumStep {
    pub fn new() -> Self {
        Self
    }
}

impl Step for SumStep {
    fn type_name(&self) -> &str {
        "sum"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::input("a", DataType::Scalar),
            SlotDescriptor::optional_input("b", DataType::Scalar),
            SlotDescriptor::output("sum", DataType::Scalar),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        let a = ctx.scalar("a")?;
        let b = match ctx.input("b") {
            Some(_) => ctx.scalar("b")?,
            None => 0.0,
        };
        ctx.set_output("sum", a + b)
    }
}
