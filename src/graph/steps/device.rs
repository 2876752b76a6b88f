//! DeviceStep: a step whose compute talks to a hardware driver.
//!
//! The runtime treats devices like any other step. Timeouts and retries are
//! the step's own policy; once retries are exhausted the step faults and is
//! skipped until reset.

use crate::graph::data::{DataType, DataValue};
use crate::graph::error::ComputeError;
use crate::graph::slot::SlotDescriptor;
use crate::graph::step::{Step, StepContext};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Device timed out after {0:?}")]
    Timeout(Duration),

    #[error("Device not connected")]
    NotConnected,

    #[error("Device I/O error: {0}")]
    Io(String),
}

/// Driver capability consumed by [`DeviceStep`].
#[cfg_attr(test, mockall::automock)]
pub trait DeviceDriver: Send {
    fn read_state(&mut self, timeout: Duration) -> Result<DataValue, DeviceError>;

    fn send_command(&mut self, command: &DataValue, timeout: Duration) -> Result<(), DeviceError>;

    fn connect(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn disconnect(&mut self) {}
}

/// How hard a device step tries before faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Total attempts per operation, at least one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(100),
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }
}

impl RetryPolicy {
    fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut(Duration) -> Result<T, DeviceError>,
    ) -> Result<T, ComputeError> {
        let attempts = self.attempts.max(1);
        let mut last = DeviceError::NotConnected;
        for attempt in 1..=attempts {
            match op(self.timeout) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tracing::debug!("Device {} attempt {}/{} failed: {}", what, attempt, attempts, e);
                    last = e;
                    if attempt < attempts && !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                }
            }
        }
        Err(ComputeError::Device(format!(
            "{} failed after {} attempts: {}",
            what, attempts, last
        )))
    }
}

pub struct DeviceStep {
    name: String,
    driver: Box<dyn DeviceDriver>,
    policy: RetryPolicy,
    state_type: DataType,
}

impl DeviceStep {
    pub fn new(
        name: impl Into<String>,
        driver: Box<dyn DeviceDriver>,
        state_type: DataType,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            driver,
            policy,
            state_type,
        }
    }
}

impl Step for DeviceStep {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn declare_slots(&self) -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::optional_input("command", DataType::Any),
            SlotDescriptor::output("state", self.state_type),
        ]
    }

    fn compute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), ComputeError> {
        let driver = &mut self.driver;
        if let Some(command) = ctx.input("command") {
            self.policy
                .run("command", |timeout| driver.send_command(command, timeout))?;
        }
        let state = self
            .policy
            .run("read", |timeout| driver.read_state(timeout))?;
        ctx.set_output("state", state)
    }

    fn on_start(&mut self) {
        if let Err(e) = self.driver.connect() {
            tracing::warn!("Device '{}' failed to connect: {}", self.name, e);
        }
    }

    fn on_stop(&mut self) {
        self.driver.disconnect();
    }
}
