//! Crate-level error handling.
//!
//! Graph operations return the narrower [`GraphError`]; this type gathers
//! those together with configuration and I/O failures for the outer layers.

use crate::graph::{GraphError, WorkerError};
use thiserror::Error;

/// Main error type for SimFlow operations
#[derive(Error, Debug)]
pub enum SimFlowError {
    /// Structural or lookup errors from the graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Worker thread lifecycle errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SimFlowError>,
    },
}

impl SimFlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SimFlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for SimFlow operations
pub type Result<T> = std::result::Result<T, SimFlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, GraphError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SimFlowError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SimFlowError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StepId;

    #[test]
    fn test_error_display() {
        let err = SimFlowError::Config("interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: interval must be positive"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = SimFlowError::Config("test".to_string());
        let with_ctx = err.with_context("Failed to load");
        assert!(with_ctx.to_string().starts_with("Failed to load: "));
    }

    #[test]
    fn test_graph_result_context() {
        let result: std::result::Result<(), GraphError> =
            Err(GraphError::UnknownStep(StepId(3)));
        let err = result.context("Wiring demo graph").unwrap_err();
        assert!(err.to_string().contains("Wiring demo graph"));
        assert!(matches!(
            err,
            SimFlowError::WithContext { ref source, .. }
                if matches!(**source, SimFlowError::Graph(GraphError::UnknownStep(_)))
        ));
    }
}
