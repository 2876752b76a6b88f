//! Directed edges from one step's output slot to another step's input slot.
//!
//! Creating a [`Connection`] validates it and registers it with both
//! endpoints; dropping it deregisters. The connection only holds weak
//! references, the network owns the steps.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{ConnectionId, StepId};
use crate::graph::slot::SlotDirection;
use crate::graph::step::{InputBinding, StepCell};
use std::sync::{Arc, Weak};

pub struct Connection {
    id: ConnectionId,
    source: StepId,
    source_slot: String,
    target: StepId,
    target_slot: String,
    source_cell: Weak<StepCell>,
    target_cell: Weak<StepCell>,
}

impl Connection {
    /// Validate and register a connection. On error nothing is registered.
    ///
    /// No data moves here; the target sees the source's value from the
    /// source's next compute onwards (or its initial value before that).
    pub fn new(
        id: ConnectionId,
        source: &Arc<StepCell>,
        source_slot: &str,
        target: &Arc<StepCell>,
        target_slot: &str,
    ) -> GraphResult<Self> {
        if source.id() == target.id() {
            return Err(GraphError::SelfConnection(source.id()));
        }

        let output = source
            .slot_index(source_slot, SlotDirection::Output)
            .ok_or_else(|| GraphError::UnknownSlot {
                step: source.id(),
                slot: source_slot.to_string(),
                direction: "output",
            })?;
        let input = target
            .slot_index(target_slot, SlotDirection::Input)
            .ok_or_else(|| GraphError::UnknownSlot {
                step: target.id(),
                slot: target_slot.to_string(),
                direction: "input",
            })?;

        let source_type = source.outputs()[output].data_type;
        let target_type = target.inputs()[input].data_type;
        if !target_type.accepts(source_type) {
            return Err(GraphError::TypeMismatch {
                slot: target_slot.to_string(),
                source_type,
                target_type,
            });
        }

        if target.binding(input).is_some() {
            return Err(GraphError::AlreadyConnected {
                step: target.id(),
                slot: target_slot.to_string(),
            });
        }

        let object = source
            .output_object(output)
            .cloned()
            .ok_or_else(|| GraphError::UnknownSlot {
                step: source.id(),
                slot: source_slot.to_string(),
                direction: "output",
            })?;
        target.bind_input(
            input,
            InputBinding {
                connection: id,
                source: object,
            },
        );
        source.add_outgoing(id);

        Ok(Self {
            id,
            source: source.id(),
            source_slot: source_slot.to_string(),
            target: target.id(),
            target_slot: target_slot.to_string(),
            source_cell: Arc::downgrade(source),
            target_cell: Arc::downgrade(target),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn source(&self) -> StepId {
        self.source
    }

    pub fn source_slot(&self) -> &str {
        &self.source_slot
    }

    pub fn target(&self) -> StepId {
        self.target
    }

    pub fn target_slot(&self) -> &str {
        &self.target_slot
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(source) = self.source_cell.upgrade() {
            source.remove_outgoing(self.id);
        }
        if let Some(target) = self.target_cell.upgrade() {
            target.unbind_input(self.id);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Connection({:?}: {:?}.{} -> {:?}.{})",
            self.id, self.source, self.source_slot, self.target, self.target_slot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::data::DataType;
    use crate::graph::steps::{ConstantStep, FnStep, GainStep, NetWriterStep};

    fn cell(id: u32, step: Box<dyn crate::graph::step::Step>) -> Arc<StepCell> {
        Arc::new(StepCell::new(StepId(id), step).unwrap())
    }

    #[test]
    fn test_connect_registers_both_ends() {
        let a = cell(0, Box::new(ConstantStep::scalar(2.0)));
        let b = cell(1, Box::new(GainStep::new(3.0)));
        let conn = Connection::new(ConnectionId(0), &a, "value", &b, "input").unwrap();
        assert_eq!(a.outgoing(), vec![ConnectionId(0)]);
        assert!(b.binding(0).is_some());

        drop(conn);
        assert!(a.outgoing().is_empty());
        assert!(b.binding(0).is_none());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let a = cell(0, Box::new(ConstantStep::new(DataType::Flag, true.into())));
        let b = cell(1, Box::new(GainStep::new(3.0)));
        let err = Connection::new(ConnectionId(0), &a, "value", &b, "input").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        assert!(a.outgoing().is_empty());
        assert!(b.binding(0).is_none());
    }

    #[test]
    fn test_any_source_only_feeds_any_input() {
        let any = cell(0, Box::new(ConstantStep::new(DataType::Any, 1.0.into())));
        let gain = cell(1, Box::new(GainStep::new(3.0)));
        let err = Connection::new(ConnectionId(0), &any, "value", &gain, "input").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        assert!(gain.binding(0).is_none());

        let (writer, _reader) = crate::graph::transport::loopback(4);
        let sink = cell(2, Box::new(NetWriterStep::new(Box::new(writer))));
        assert!(Connection::new(ConnectionId(1), &any, "value", &sink, "value").is_ok());
    }

    #[test]
    fn test_double_connect_rejected() {
        let a = cell(0, Box::new(ConstantStep::scalar(1.0)));
        let c = cell(2, Box::new(ConstantStep::scalar(2.0)));
        let b = cell(1, Box::new(GainStep::new(1.0)));
        let _first = Connection::new(ConnectionId(0), &a, "value", &b, "input").unwrap();
        let err = Connection::new(ConnectionId(1), &c, "value", &b, "input").unwrap_err();
        assert!(matches!(err, GraphError::AlreadyConnected { .. }));
        assert!(c.outgoing().is_empty());
    }

    #[test]
    fn test_self_and_unknown_slots_rejected() {
        let a = cell(0, Box::new(GainStep::new(1.0)));
        assert!(matches!(
            Connection::new(ConnectionId(0), &a, "output", &a, "input"),
            Err(GraphError::SelfConnection(_))
        ));
        let b = cell(1, Box::new(FnStep::source("src", |_| Ok(1.0.into()))));
        assert!(matches!(
            Connection::new(ConnectionId(0), &b, "nope", &a, "input"),
            Err(GraphError::UnknownSlot { .. })
        ));
    }
}
