//! Test steps and graph builders

use crossbeam_channel::{Receiver, Sender};
use simflow::graph::{
    ComputeError, DataType, LoopMode, Network, SlotDescriptor, Step, StepContext, StepId,
    TriggerId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared counter of `compute` calls
#[derive(Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Always fails; counts how often it was asked to compute
pub struct FaultyStep {
    pub calls: CallCount,
}

impl Step for FaultyStep {
    fn type_name(&self) -> &str {
        "faulty"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("out", DataType::Scalar)]
    }

    fn compute(&mut self, _ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.calls.bump();
        Err(ComputeError::failed("sensor exploded"))
    }
}

/// Emits the number of computes so far on output `x`
pub struct SourceStep {
    pub calls: CallCount,
}

impl Step for SourceStep {
    fn type_name(&self) -> &str {
        "source"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("x", DataType::Scalar)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.calls.bump();
        ctx.set_output("x", self.calls.get() as f64)
    }
}

/// `y = 10 * x`
pub struct ScaleStep {
    pub calls: CallCount,
}

impl Step for ScaleStep {
    fn type_name(&self) -> &str {
        "scale"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::input("x", DataType::Scalar),
            SlotDescriptor::output("y", DataType::Scalar),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.calls.bump();
        let x = ctx.scalar("x")?;
        ctx.set_output("y", 10.0 * x)
    }
}

/// Announces entry on `entered`, then blocks until `release` yields
pub struct GateStep {
    pub calls: CallCount,
    pub entered: Sender<()>,
    pub release: Receiver<()>,
}

impl Step for GateStep {
    fn type_name(&self) -> &str {
        "gate"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("out", DataType::Flag)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.calls.bump();
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(Duration::from_secs(5));
        ctx.set_output("out", true)
    }
}

/// Counts lifecycle hooks and computes; optional scalar inputs `a` and `b`
#[derive(Default)]
pub struct HookStep {
    pub starts: CallCount,
    pub stops: CallCount,
    pub calls: CallCount,
    pub panic_on_start: bool,
}

impl Step for HookStep {
    fn type_name(&self) -> &str {
        "hooks"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::optional_input("a", DataType::Scalar),
            SlotDescriptor::optional_input("b", DataType::Scalar),
            SlotDescriptor::output("out", DataType::Scalar),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        self.calls.bump();
        ctx.set_output("out", self.calls.get() as f64)
    }

    fn on_start(&mut self) {
        self.starts.bump();
        if self.panic_on_start {
            panic!("device refused to connect");
        }
    }

    fn on_stop(&mut self) {
        self.stops.bump();
    }
}

/// Source A -> scale B under one trigger
pub struct ChainGraph {
    pub network: Network,
    pub trigger: TriggerId,
    pub a: StepId,
    pub b: StepId,
    pub a_calls: CallCount,
    pub b_calls: CallCount,
}

/// Builder for the A -> B chain used by the timing scenarios
pub struct ChainBuilder {
    network: Network,
    mode: Option<LoopMode>,
}

impl ChainBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            mode: None,
        }
    }

    pub fn mode(mut self, mode: LoopMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn build(mut self) -> ChainGraph {
        let trigger = self.network.create_trigger("chain");
        if let Some(mode) = self.mode {
            self.network.set_loop_mode(trigger, mode).unwrap();
        }
        let a_calls = CallCount::default();
        let b_calls = CallCount::default();
        let a = self
            .network
            .add_step(SourceStep {
                calls: a_calls.clone(),
            })
            .unwrap();
        let b = self
            .network
            .add_step(ScaleStep {
                calls: b_calls.clone(),
            })
            .unwrap();
        self.network.attach(a, trigger).unwrap();
        self.network.attach(b, trigger).unwrap();
        self.network.add_connection(a, "x", b, "x").unwrap();
        ChainGraph {
            network: self.network,
            trigger,
            a,
            b,
            a_calls,
            b_calls,
        }
    }
}
