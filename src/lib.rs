//! # SimFlow: threaded computation-graph runtime
//!
//! SimFlow runs dynamical-system simulations as a graph of computation steps.
//! Steps exchange typed data through connections; triggers decide when steps
//! compute, and root triggers pace themselves on dedicated worker threads.
//!
//! ## Architecture
//!
//! - **Graph** (`graph`): steps, connections, data objects, triggers, loop modes,
//!   worker threads and the [`Network`](graph::Network) that owns them all
//! - **Config** (`config`): TOML runtime configuration for the binary
//! - **Demo** (`demo`): the counter → gain → integrator graph the binary runs
//! - **Faults**: reported through an injected [`FaultSink`](graph::FaultSink)
//!
//! ## Example
//!
//! ```no_run
//! use simflow::graph::steps::{CounterStep, GainStep};
//! use simflow::graph::{LoopMode, Network};
//! use std::time::Duration;
//!
//! fn main() -> simflow::Result<()> {
//!     let mut network = Network::default();
//!     let clock = network.create_trigger("clock");
//!     network.set_loop_mode(clock, LoopMode::fixed_rate(Duration::from_millis(10)))?;
//!
//!     let counter = network.add_step(CounterStep::new())?;
//!     let gain = network.add_step(GainStep::new(2.0))?;
//!     network.attach(counter, clock)?;
//!     network.attach(gain, clock)?;
//!     network.add_connection(counter, "count", gain, "input")?;
//!
//!     network.start_all()?;
//!     std::thread::sleep(Duration::from_millis(100));
//!     network.stop_all(true);
//!
//!     println!("{:?}", network.step_outputs(gain)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod graph;

// Re-export commonly used types
pub use config::{LoopModeConfig, RuntimeConfig, TriggerConfig};
pub use error::{Result, ResultExt, SimFlowError};
pub use graph::{LoopMode, Network, Step, StepContext, StepId, TriggerId};
