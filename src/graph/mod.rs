//! Threaded computation-graph runtime.
//!
//! Steps compute typed outputs from typed inputs. Connections bind an output
//! slot of one step to an input slot of another and share the output's
//! [`DataObject`]. Triggers decide *when* steps compute: a root trigger owns a
//! worker thread and fires on its [`LoopMode`]; other triggers fire only
//! through propagation from upstream triggers.
//!
//! # Architecture
//!
//! ```text
//! [root trigger A] ──fires──► step1 ──► step2        (A's listeners)
//!        │
//!        └──wave──► [trigger B] ──fires──► step3     (B listens downstream of A)
//! ```
//!
//! # Design
//!
//! - **Network owns everything**: steps, connections and triggers are reached by id.
//! - **Structure is frozen while running**: edits return `GraphError::Running`.
//! - **Copy-on-read**: a step sees a snapshot of its inputs; writes never block readers for long.
//! - **No queued firings**: a busy trigger drops the firing and reports a skipped cycle.
//! - **Faults stay local**: a faulted step is skipped until reset; its siblings keep running.

pub mod connection;
pub mod data;
pub mod error;
pub mod fault;
pub mod id;
pub mod loop_mode;
pub mod network;
pub mod slot;
pub mod stats;
pub mod step;
pub mod steps;
pub mod transport;
pub mod trigger;
pub mod worker;

mod sync;

pub use connection::Connection;
pub use data::{DataObject, DataType, DataValue, Matrix};
pub use error::{ComputeError, GraphError, GraphResult, WorkerError};
pub use fault::{ChannelFaultSink, Fault, FaultSink, LogFaultSink, NullFaultSink};
pub use id::{ConnectionId, StepId, TriggerId};
pub use loop_mode::{CyclePlan, LoopMode, FIRST_CYCLE_DELTA};
pub use network::Network;
pub use slot::{SlotDescriptor, SlotDirection};
pub use stats::{StepStatsSnapshot, TriggerStatsSnapshot};
pub use step::{CycleInfo, Step, StepCell, StepContext, StepOutcome, StepState};
pub use transport::{loopback, LoopbackReader, LoopbackWriter, SampleReader, SampleWriter, TransportError};
pub use trigger::{LoopSignal, Trigger, TriggerOutcome, WaveSummary};
pub use worker::{CallFunctionWorker, LoopTask, LoopedWorker, StopToken, WorkerState};
