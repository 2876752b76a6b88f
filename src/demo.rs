//! The demo graph run by the `simflow` binary.
//!
//! ```text
//! [plant root] counter ──► gain ──┐
//!      │                          ▼
//!      └──wave──► [integrate] integrator ──► monitor  [other roots]
//! ```
//!
//! The first configured trigger drives the plant. The integrator listens on a
//! dependent trigger fired after the plant's listeners. Every further root
//! gets a monitor step that samples the integrator state on its own clock.

use crate::config::RuntimeConfig;
use crate::error::{Result, ResultExt, SimFlowError};
use crate::graph::steps::{CounterStep, FnStep, GainStep, IntegratorStep};
use crate::graph::{FaultSink, Network, StepId, TriggerId, TriggerStatsSnapshot};
use serde::Serialize;
use std::sync::Arc;

/// Gain applied to the counter before integration
pub const DEMO_GAIN: f64 = 0.5;

pub struct Demo {
    pub network: Network,
    /// Configured root triggers, in config order
    pub roots: Vec<TriggerId>,
    /// Dependent trigger the integrator listens on
    pub integrate: TriggerId,
    pub counter: StepId,
    pub gain: StepId,
    pub integrator: StepId,
    pub monitors: Vec<StepId>,
}

/// Build the demo network from configuration. Workers are not started.
pub fn build(config: &RuntimeConfig, sink: Arc<dyn FaultSink>) -> Result<Demo> {
    config.validate()?;
    if config.triggers.is_empty() {
        return Err(SimFlowError::Config(
            "the demo needs at least one trigger".to_string(),
        ));
    }

    let mut network = Network::new(sink).with_thread_prefix(config.thread_prefix.clone());

    let mut roots = Vec::with_capacity(config.triggers.len());
    for trigger in &config.triggers {
        let id = network.create_trigger(trigger.name.clone());
        network
            .set_loop_mode(id, trigger.loop_mode()?)
            .with_context(|| format!("Configuring trigger '{}'", trigger.name))?;
        roots.push(id);
    }
    let plant = roots[0];
    let integrate = network.create_trigger("integrate");

    let counter = network.add_step(CounterStep::new())?;
    let gain = network.add_step(GainStep::new(DEMO_GAIN))?;
    let integrator = network.add_step(IntegratorStep::new(0.0))?;
    network.attach(counter, plant)?;
    network.attach(gain, plant)?;
    network.attach(integrator, integrate)?;
    network
        .add_connection(counter, "count", gain, "input")
        .context("Wiring counter to gain")?;
    network
        .add_connection(gain, "output", integrator, "rate")
        .context("Wiring gain to integrator")?;

    let mut monitors = Vec::new();
    for &root in &roots[1..] {
        let monitor = network.add_step(FnStep::map("monitor", |x, _| Ok(x)))?;
        network.attach(monitor, root)?;
        network
            .add_connection(integrator, "state", monitor, "input")
            .context("Wiring monitor")?;
        monitors.push(monitor);
    }

    Ok(Demo {
        network,
        roots,
        integrate,
        counter,
        gain,
        integrator,
        monitors,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerReport {
    pub name: String,
    pub mode: Option<String>,
    pub stats: TriggerStatsSnapshot,
}

/// Summary printed by the binary after a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub triggers: Vec<TriggerReport>,
    pub integrator_state: f64,
    pub faults: usize,
    pub dropped_faults: u64,
}

impl Demo {
    pub fn report(&self, faults: usize, dropped_faults: u64) -> Result<RunReport> {
        let mut triggers = Vec::new();
        for id in self.network.trigger_ids() {
            triggers.push(TriggerReport {
                name: self.network.trigger_name(id)?.to_string(),
                mode: self.network.loop_mode(id)?.map(|m| m.to_string()),
                stats: self.network.trigger_stats(id)?,
            });
        }
        let integrator_state = self
            .network
            .step_output(self.integrator, "state")?
            .as_scalar()
            .unwrap_or(f64::NAN);
        Ok(RunReport {
            triggers,
            integrator_state,
            faults,
            dropped_faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DataValue, NullFaultSink};
    use std::time::Duration;

    #[test]
    fn test_build_default_demo() {
        let demo = build(&RuntimeConfig::default(), Arc::new(NullFaultSink)).unwrap();
        assert_eq!(demo.roots.len(), 2);
        assert_eq!(demo.monitors.len(), 1);
        assert_eq!(
            demo.network.trigger_wave(demo.roots[0]).unwrap(),
            vec![demo.integrate]
        );
    }

    #[test]
    fn test_manual_fire_integrates() {
        let demo = build(&RuntimeConfig::default(), Arc::new(NullFaultSink)).unwrap();
        let plant = demo.roots[0];
        demo.network.fire(plant, Duration::from_secs(1)).unwrap();
        demo.network.fire(plant, Duration::from_secs(1)).unwrap();
        // rate 0.5 then 1.0, dt = 1s
        assert_eq!(
            demo.network.step_output(demo.integrator, "state").unwrap(),
            DataValue::Scalar(1.5)
        );
        let report = demo.report(0, 0).unwrap();
        assert_eq!(report.triggers.len(), 3);
        assert_eq!(report.triggers[2].mode, None);
    }

    #[test]
    fn test_no_triggers_rejected() {
        let config = RuntimeConfig {
            triggers: Vec::new(),
            ..RuntimeConfig::default()
        };
        assert!(build(&config, Arc::new(NullFaultSink)).is_err());
    }
}
