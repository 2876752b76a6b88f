//! FnStep: a step backed by a closure.
//!
//! Lets callers build one-off steps without a dedicated type, mostly for
//! tests and quick experiments.

use crate::graph::data::{DataType, DataValue};
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{CycleInfo, Step, StepContext};

type ComputeFn = dyn FnMut(&mut StepContext<'_>) -> Result<(), ComputeError> + Send;

pub struct FnStep {
    name: String,
    slots: Vec<SlotDescriptor>,
    func: Box<ComputeFn>,
}

impl FnStep {
    pub fn new(
        name: impl Into<String>,
        slots: Vec<SlotDescriptor>,
        func: impl FnMut(&mut StepContext<'_>) -> Result<(), ComputeError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            slots,
            func: Box::new(func),
        }
    }

    /// A source with a single scalar output named `value`.
    pub fn source(
        name: impl Into<String>,
        mut func: impl FnMut(&CycleInfo) -> Result<DataValue, ComputeError> + Send + 'static,
    ) -> Self {
        Self::new(
            name,
            vec![SlotDescriptor::output("value", DataType::Scalar)],
            move |ctx| {
                let value = func(ctx.cycle())?;
                ctx.set_output("value", value)
            },
        )
    }

    /// Scalar `input` to scalar `output` through `func(input, dt_secs)`.
    pub fn map(
        name: impl Into<String>,
        mut func: impl FnMut(f64, f64) -> Result<f64, ComputeError> + Send + 'static,
    ) -> Self {
        Self::new(
            name,
            vec![
                SlotDescriptor::input("input", DataType::Scalar),
                SlotDescriptor::output("output", DataType::Scalar),
            ],
            move |ctx| {
                let x = ctx.scalar("input")?;
                let y = func(x, ctx.dt_secs())?;
                ctx.set_output("output", y)
            },
        )
    }
}

impl Step for FnStep {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        self.slots.clone()
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        (self.func)(ctx)
    }
}
