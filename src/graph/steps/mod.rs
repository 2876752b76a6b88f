//! Built-in step implementations.

pub mod constant;
pub mod counter;
pub mod device;
pub mod function;
pub mod gain;
pub mod integrator;
pub mod net_io;
pub mod sum;

pub use constant::ConstantStep;
pub use counter::CounterStep;
pub use device::{DeviceDriver, DeviceError, DeviceStep, RetryPolicy};
pub use function::FnStep;
pub use gain::GainStep;
pub use integrator::IntegratorStep;
pub use net_io::{NetReaderStep, NetWriterStep};
pub use sum::SumStep;
