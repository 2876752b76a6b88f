//! Step abstraction and the per-step runtime cell.
//!
//! A [`Step`] is the capability a computation node provides: declare slots,
//! compute from inputs. The network wraps every step in a [`StepCell`] that
//! owns the output data objects, the input bindings created by connections,
//! and the Idle/Computing/Faulted state machine.

use crate::graph::data::{DataObject, DataValue};
use crate::graph::error::{ComputeError, GraphError};
use crate::graph::fault::{Fault, FaultSink};
use crate::graph::id::{ConnectionId, StepId, TriggerId};
use crate::graph::slot::{find_duplicate, SlotDescriptor, SlotDirection};
use crate::graph::stats::StepStats;
use crate::graph::sync::{lock, read, write};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Capability implemented by every computation node.
pub trait Step: Send {
    /// Human-readable kind of step ("gain", "integrator", ...).
    fn type_name(&self) -> &str;

    /// Slots of this step. Called once when the step is added to a network.
    fn declare_slots(&self) -> Vec<SlotDescriptor>;

    /// Compute outputs from inputs for one cycle.
    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError>;

    /// Called when the owning root trigger's worker starts.
    fn on_start(&mut self) {}

    /// Called when the owning root trigger's worker stops.
    fn on_stop(&mut self) {}

    /// Called when a Faulted step is reset to Idle.
    fn reset(&mut self) {}
}

/// Runtime state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepState {
    Uninitialized,
    Idle,
    Computing,
    Faulted,
}

/// Timing of the wave a step is computed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleInfo {
    pub trigger: TriggerId,
    /// Simulated time step to integrate over.
    pub delta: Duration,
    /// Simulated time since the trigger started.
    pub time: Duration,
    /// Wave counter of the firing trigger.
    pub cycle: u64,
}

/// Result of one `on_trigger` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Computed,
    /// An input was missing or stale; outputs untouched.
    NotReady,
    /// Compute failed during this call; the step is now Faulted.
    Faulted,
    /// The step was already Faulted and was not computed.
    SkippedFaulted,
}

/// What a step sees during `compute`.
pub struct StepContext<'a> {
    inputs: &'a [SlotDescriptor],
    input_values: &'a [Option<DataValue>],
    outputs: &'a [SlotDescriptor],
    output_values: &'a mut [Option<DataValue>],
    cycle: &'a CycleInfo,
    not_ready: bool,
}

impl<'a> StepContext<'a> {
    pub fn new(
        inputs: &'a [SlotDescriptor],
        input_values: &'a [Option<DataValue>],
        outputs: &'a [SlotDescriptor],
        output_values: &'a mut [Option<DataValue>],
        cycle: &'a CycleInfo,
    ) -> Self {
        debug_assert_eq!(inputs.len(), input_values.len());
        debug_assert_eq!(outputs.len(), output_values.len());
        Self {
            inputs,
            input_values,
            outputs,
            output_values,
            cycle,
            not_ready: false,
        }
    }

    /// Value of an input, `None` if it is optional and unconnected.
    pub fn input(&self, name: &str) -> Option<&DataValue> {
        self.inputs
            .iter()
            .position(|s| s.name == name)
            .and_then(|i| self.input_values[i].as_ref())
    }

    /// Scalar value of an input.
    pub fn scalar(&self, name: &str) -> Result<f64, ComputeError> {
        let value = self
            .input(name)
            .ok_or_else(|| ComputeError::MissingInput(name.to_string()))?;
        value.as_scalar().ok_or_else(|| ComputeError::TypeMismatch {
            slot: name.to_string(),
            expected: crate::graph::data::DataType::Scalar,
            found: value.data_type(),
        })
    }

    /// Set an output for this cycle. The value is published when compute returns `Ok`.
    pub fn set_output(
        &mut self,
        name: &str,
        value: impl Into<DataValue>,
    ) -> Result<(), ComputeError> {
        let value = value.into();
        let index = self
            .outputs
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ComputeError::UnknownOutput(name.to_string()))?;
        let declared = self.outputs[index].data_type;
        if !declared.accepts(value.data_type()) {
            return Err(ComputeError::TypeMismatch {
                slot: name.to_string(),
                expected: declared,
                found: value.data_type(),
            });
        }
        self.output_values[index] = Some(value);
        Ok(())
    }

    /// Give up on this cycle without faulting, e.g. when a network sample is late.
    pub fn skip_cycle(&mut self) {
        self.not_ready = true;
    }

    pub fn cycle(&self) -> &CycleInfo {
        self.cycle
    }

    pub fn dt(&self) -> Duration {
        self.cycle.delta
    }

    pub fn dt_secs(&self) -> f64 {
        self.cycle.delta.as_secs_f64()
    }

    pub fn time(&self) -> Duration {
        self.cycle.time
    }
}

/// An input slot's binding to the upstream output object.
#[derive(Debug, Clone)]
pub(crate) struct InputBinding {
    pub connection: ConnectionId,
    pub source: Arc<DataObject>,
}

/// A step plus everything the runtime keeps about it.
pub struct StepCell {
    id: StepId,
    type_name: String,
    inputs: Vec<SlotDescriptor>,
    outputs: Vec<SlotDescriptor>,
    output_objects: Vec<Arc<DataObject>>,
    bindings: RwLock<Vec<Option<InputBinding>>>,
    outgoing: Mutex<Vec<ConnectionId>>,
    state: Mutex<StepState>,
    /// Running root triggers whose firings reach this step.
    activations: Mutex<usize>,
    behavior: Mutex<Box<dyn Step>>,
    stats: StepStats,
}

impl StepCell {
    /// Declare slots and allocate output objects.
    pub fn new(id: StepId, step: Box<dyn Step>) -> Result<Self, GraphError> {
        let type_name = step.type_name().to_string();
        let slots = step.declare_slots();
        if let Some(dup) = find_duplicate(&slots) {
            return Err(GraphError::DuplicateSlot {
                step: type_name,
                slot: dup.to_string(),
            });
        }

        let (inputs, outputs): (Vec<_>, Vec<_>) = slots.into_iter().partition(|s| s.is_input());
        let output_objects = outputs
            .iter()
            .map(|s| {
                Arc::new(DataObject::new(
                    s.name.clone(),
                    s.data_type,
                    s.data_type.default_value(),
                    Some(id),
                ))
            })
            .collect();
        let bindings = vec![None; inputs.len()];

        let cell = Self {
            id,
            type_name,
            inputs,
            outputs,
            output_objects,
            bindings: RwLock::new(bindings),
            outgoing: Mutex::new(Vec::new()),
            state: Mutex::new(StepState::Uninitialized),
            activations: Mutex::new(0),
            behavior: Mutex::new(step),
            stats: StepStats::default(),
        };
        *lock(&cell.state) = StepState::Idle;
        Ok(cell)
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn state(&self) -> StepState {
        *lock(&self.state)
    }

    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    pub fn inputs(&self) -> &[SlotDescriptor] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SlotDescriptor] {
        &self.outputs
    }

    pub(crate) fn slot_index(&self, name: &str, direction: SlotDirection) -> Option<usize> {
        let slots = match direction {
            SlotDirection::Input => &self.inputs,
            SlotDirection::Output => &self.outputs,
        };
        slots.iter().position(|s| s.name == name)
    }

    pub(crate) fn output_object(&self, index: usize) -> Option<&Arc<DataObject>> {
        self.output_objects.get(index)
    }

    /// Current output values, in declaration order.
    pub fn output_snapshot(&self) -> Vec<(String, DataValue)> {
        self.output_objects
            .iter()
            .map(|o| (o.name().to_string(), o.read()))
            .collect()
    }

    pub(crate) fn binding(&self, input: usize) -> Option<InputBinding> {
        read(&self.bindings).get(input).cloned().flatten()
    }

    pub(crate) fn bind_input(&self, input: usize, binding: InputBinding) {
        write(&self.bindings)[input] = Some(binding);
    }

    pub(crate) fn unbind_input(&self, connection: ConnectionId) {
        for slot in write(&self.bindings).iter_mut() {
            if slot.as_ref().is_some_and(|b| b.connection == connection) {
                *slot = None;
            }
        }
    }

    pub(crate) fn add_outgoing(&self, connection: ConnectionId) {
        lock(&self.outgoing).push(connection);
    }

    pub(crate) fn remove_outgoing(&self, connection: ConnectionId) {
        lock(&self.outgoing).retain(|&c| c != connection);
    }

    pub fn outgoing(&self) -> Vec<ConnectionId> {
        lock(&self.outgoing).clone()
    }

    /// A root trigger reaching this step started. The first one runs `on_start`.
    pub(crate) fn activate(&self, trigger: TriggerId, sink: &dyn FaultSink) {
        let mut active = lock(&self.activations);
        *active += 1;
        if *active == 1 {
            self.run_hook("on_start", trigger, sink, |step| step.on_start());
        }
    }

    /// A root trigger reaching this step stopped. The last one runs `on_stop`.
    pub(crate) fn deactivate(&self, trigger: TriggerId, sink: &dyn FaultSink) {
        let mut active = lock(&self.activations);
        if *active == 0 {
            return;
        }
        *active -= 1;
        if *active == 0 {
            self.run_hook("on_stop", trigger, sink, |step| step.on_stop());
        }
    }

    /// Run a lifecycle hook. A panic faults the step instead of unwinding
    /// into the trigger's thread.
    fn run_hook(
        &self,
        hook: &str,
        trigger: TriggerId,
        sink: &dyn FaultSink,
        f: impl FnOnce(&mut dyn Step),
    ) {
        let result = {
            let mut behavior = lock(&self.behavior);
            catch_unwind(AssertUnwindSafe(|| f(&mut **behavior)))
        };
        if let Err(payload) = result {
            *lock(&self.state) = StepState::Faulted;
            let message = format!("{} panicked: {}", hook, panic_message(payload.as_ref()));
            self.report_fault(trigger, ComputeError::Panicked(message), sink);
        }
    }

    /// Return a Faulted step to Idle. Returns whether it was Faulted and the
    /// step's own `reset` succeeded; a panicking `reset` leaves it Faulted.
    pub fn reset(&self, sink: &dyn FaultSink) -> bool {
        let mut state = lock(&self.state);
        if *state != StepState::Faulted {
            return false;
        }
        let result = {
            let mut behavior = lock(&self.behavior);
            catch_unwind(AssertUnwindSafe(|| behavior.reset()))
        };
        match result {
            Ok(()) => {
                *state = StepState::Idle;
                tracing::info!("Step {:?} ('{}') reset", self.id, self.type_name);
                true
            }
            Err(payload) => {
                drop(state);
                let message = format!("reset panicked: {}", panic_message(payload.as_ref()));
                self.report_fault(TriggerId::INVALID, ComputeError::Panicked(message), sink);
                false
            }
        }
    }

    fn report_fault(&self, trigger: TriggerId, error: ComputeError, sink: &dyn FaultSink) {
        self.stats.record_fault();
        tracing::debug!("Step {:?} ('{}') faulted: {}", self.id, self.type_name, error);
        sink.report(Fault::Compute {
            step: self.id,
            step_name: self.type_name.clone(),
            trigger,
            message: error.to_string(),
        });
    }

    /// Read inputs, compute, publish outputs. Faults are caught and reported.
    pub fn on_trigger(&self, cycle: &CycleInfo, sink: &dyn FaultSink) -> StepOutcome {
        if self.state() == StepState::Faulted {
            return StepOutcome::SkippedFaulted;
        }

        let mut input_values = Vec::with_capacity(self.inputs.len());
        {
            let bindings = read(&self.bindings);
            for (slot, binding) in self.inputs.iter().zip(bindings.iter()) {
                match binding {
                    Some(b) => input_values.push(Some(b.source.read())),
                    None if slot.mandatory => {
                        tracing::trace!(
                            "Step {:?} skipped: input '{}' unconnected",
                            self.id,
                            slot.name
                        );
                        self.stats.record_not_ready();
                        return StepOutcome::NotReady;
                    }
                    None => input_values.push(None),
                }
            }
        }

        *lock(&self.state) = StepState::Computing;
        let mut output_values = vec![None; self.outputs.len()];
        let started = Instant::now();
        let (result, not_ready) = {
            let mut behavior = lock(&self.behavior);
            let mut ctx = StepContext::new(
                &self.inputs,
                &input_values,
                &self.outputs,
                &mut output_values,
                cycle,
            );
            let result = catch_unwind(AssertUnwindSafe(|| behavior.compute(&mut ctx)));
            (result, ctx.not_ready)
        };

        let error = match result {
            Ok(Ok(())) if not_ready => {
                *lock(&self.state) = StepState::Idle;
                self.stats.record_not_ready();
                return StepOutcome::NotReady;
            }
            Ok(Ok(())) => {
                for (object, value) in self.output_objects.iter().zip(output_values) {
                    if let Some(value) = value {
                        object.write(value);
                    }
                }
                self.stats.record_compute(started.elapsed());
                *lock(&self.state) = StepState::Idle;
                return StepOutcome::Computed;
            }
            Ok(Err(e)) => e,
            Err(payload) => ComputeError::Panicked(panic_message(payload.as_ref())),
        };

        *lock(&self.state) = StepState::Faulted;
        self.report_fault(cycle.trigger, error, sink);
        StepOutcome::Faulted
    }
}

impl std::fmt::Debug for StepCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepCell")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
