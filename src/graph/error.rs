//! Graph-specific error types.

use crate::graph::data::DataType;
use crate::graph::id::{ConnectionId, StepId, TriggerId};
use thiserror::Error;

/// Structural errors raised by graph edits. The graph is left unchanged.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown step {0:?}")]
    UnknownStep(StepId),

    #[error("Unknown trigger {0:?}")]
    UnknownTrigger(TriggerId),

    #[error("Unknown connection {0:?}")]
    UnknownConnection(ConnectionId),

    #[error("Step {step:?} has no {direction} slot '{slot}'")]
    UnknownSlot {
        step: StepId,
        slot: String,
        direction: &'static str,
    },

    #[error("Step '{step}' declares slot '{slot}' twice")]
    DuplicateSlot { step: String, slot: String },

    #[error("Type mismatch: output {source_type} cannot feed input '{slot}' of type {target_type}")]
    TypeMismatch {
        slot: String,
        source_type: DataType,
        target_type: DataType,
    },

    #[error("Input '{slot}' of step {step:?} is already connected")]
    AlreadyConnected { step: StepId, slot: String },

    #[error("Cannot connect step {0:?} to itself")]
    SelfConnection(StepId),

    #[error("Edit would make trigger {0:?} reachable from itself")]
    TriggerCycle(TriggerId),

    #[error("Graph cannot be edited while trigger {0:?} is running")]
    Running(TriggerId),

    #[error("Trigger {0:?} has no loop mode")]
    NotLooped(TriggerId),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Thread worker lifecycle errors.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single step's compute pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("{0}")]
    Failed(String),

    #[error("Input '{0}' has no value")]
    MissingInput(String),

    #[error("Slot '{slot}' expects {expected}, got {found}")]
    TypeMismatch {
        slot: String,
        expected: DataType,
        found: DataType,
    },

    #[error("No output slot named '{0}'")]
    UnknownOutput(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Compute panicked: {0}")]
    Panicked(String),
}

impl ComputeError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComputeError::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::TypeMismatch {
            slot: "x".to_string(),
            source_type: DataType::Matrix,
            target_type: DataType::Scalar,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch: output matrix cannot feed input 'x' of type scalar"
        );
    }

    #[test]
    fn test_worker_error_converts() {
        let err: GraphError = WorkerError::AlreadyRunning("loop".to_string()).into();
        assert!(err.to_string().contains("already running"));
    }
}
