//! Capabilities for network-backed inputs and outputs.
//!
//! The transport itself lives outside the runtime. Steps only see a reader
//! that returns the latest sample without blocking, and a writer that
//! publishes one. An in-process [`loopback`] pair is provided for tests and
//! demos.

use crate::graph::data::DataValue;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport disconnected")]
    Disconnected,

    #[error("Transport queue full")]
    Full,

    #[error("Transport error: {0}")]
    Other(String),
}

/// Non-blocking access to the latest received sample.
#[cfg_attr(test, mockall::automock)]
pub trait SampleReader: Send {
    /// Latest sample and whether it arrived since the previous call.
    /// `None` if nothing was ever received.
    fn try_read(&mut self) -> Option<(DataValue, bool)>;
}

/// Publishes samples to remote consumers.
#[cfg_attr(test, mockall::automock)]
pub trait SampleWriter: Send {
    fn publish(&mut self, value: &DataValue) -> Result<(), TransportError>;
}

/// Create a connected in-process writer/reader pair.
pub fn loopback(capacity: usize) -> (LoopbackWriter, LoopbackReader) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        LoopbackWriter { tx },
        LoopbackReader {
            rx,
            latest: None,
            disconnected: false,
        },
    )
}

pub struct LoopbackWriter {
    tx: Sender<DataValue>,
}

impl SampleWriter for LoopbackWriter {
    fn publish(&mut self, value: &DataValue) -> Result<(), TransportError> {
        self.tx.try_send(value.clone()).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }
}

pub struct LoopbackReader {
    rx: Receiver<DataValue>,
    latest: Option<DataValue>,
    disconnected: bool,
}

impl LoopbackReader {
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl SampleReader for LoopbackReader {
    fn try_read(&mut self) -> Option<(DataValue, bool)> {
        let mut fresh = false;
        loop {
            match self.rx.try_recv() {
                Ok(value) => {
                    self.latest = Some(value);
                    fresh = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        self.latest.clone().map(|v| (v, fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_keeps_latest() {
        let (mut writer, mut reader) = loopback(8);
        assert_eq!(reader.try_read(), None);

        writer.publish(&DataValue::Scalar(1.0)).unwrap();
        writer.publish(&DataValue::Scalar(2.0)).unwrap();
        assert_eq!(reader.try_read(), Some((DataValue::Scalar(2.0), true)));
        assert_eq!(reader.try_read(), Some((DataValue::Scalar(2.0), false)));
    }

    #[test]
    fn test_loopback_full_and_disconnected() {
        let (mut writer, reader) = loopback(1);
        writer.publish(&DataValue::Scalar(1.0)).unwrap();
        assert_eq!(
            writer.publish(&DataValue::Scalar(2.0)),
            Err(TransportError::Full)
        );
        drop(reader);
        assert_eq!(
            writer.publish(&DataValue::Scalar(3.0)),
            Err(TransportError::Disconnected)
        );
    }
}
