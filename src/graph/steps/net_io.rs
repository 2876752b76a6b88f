//! Network-backed steps.
//!
//! [`NetReaderStep`] exposes the latest remote sample as an output; a late
//! or missing sample skips the cycle exactly like an unconnected input.
//! [`NetWriterStep`] publishes its input every cycle.

use crate::graph::data::DataType;
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};
use crate::graph::transport::{SampleReader, SampleWriter, TransportError};

pub struct NetReaderStep {
    reader: Box<dyn SampleReader>,
    data_type: DataType,
}

impl NetReaderStep {
    pub fn new(reader: Box<dyn SampleReader>, data_type: DataType) -> Self {
        Self { reader, data_type }
    }
}

impl Step for NetReaderStep {
    fn type_name(&self) -> &str {
        "net_reader"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::output("value", self.data_type)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        match self.reader.try_read() {
            Some((value, true)) => ctx.set_output("value", value),
            _ => {
                ctx.skip_cycle();
                Ok(())
            }
        }
    }
}

pub struct NetWriterStep {
    writer: Box<dyn SampleWriter>,
    dropped: u64,
}

impl NetWriterStep {
    pub fn new(writer: Box<dyn SampleWriter>) -> Self {
        Self { writer, dropped: 0 }
    }

    /// Samples not published because the transport was backed up.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Step for NetWriterStep {
    fn type_name(&self) -> &str {
        "net_writer"
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![SlotDescriptor::input("value", DataType::Any)]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        let value = ctx
            .input("value")
            .ok_or_else(|| ComputeError::MissingInput("value".to_string()))?;
        match self.writer.publish(value) {
            Ok(()) => Ok(()),
            Err(TransportError::Full) => {
                self.dropped += 1;
                tracing::debug!("Network writer backed up, {} samples dropped", self.dropped);
                Ok(())
            }
            Err(e) => Err(ComputeError::failed(format!("publish failed: {}", e))),
        }
    }
}
