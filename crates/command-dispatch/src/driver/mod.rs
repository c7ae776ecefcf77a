//! Protocol driver interface and built-in development drivers.

#![allow(missing_docs)]

mod loopback;
mod registry;

pub use loopback::LoopbackDriver;
pub use registry::{DriverRegistry, DriverSpec};

use crate::error::DriverError;
use crate::profile::ProtocolProperties;
use crate::request::CommandRequest;
use crate::value::{CommandValue, Value};

/// Device I/O for one protocol family.
///
/// Calls are synchronous and may block. Results from `read` are consumed
/// positionally against `requests`.
pub trait ProtocolDriver: Send + Sync {
    /// Read every requested resource from the device.
    fn read(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, DriverError>;

    /// Write `values` to the device; `values[i]` belongs to `requests[i]`.
    fn write(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        requests: &[CommandRequest],
        values: &[CommandValue],
    ) -> Result<(), DriverError>;
}

/// Accepts every write and reads back zero values.
#[derive(Debug, Default)]
pub struct SimulatedDriver;

impl ProtocolDriver for SimulatedDriver {
    fn read(
        &self,
        _device_name: &str,
        _protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, DriverError> {
        Ok(requests
            .iter()
            .map(|req| CommandValue::new(req.resource_name.clone(), Value::zero(req.value_type)))
            .collect())
    }

    fn write(
        &self,
        _device_name: &str,
        _protocols: &ProtocolProperties,
        _requests: &[CommandRequest],
        _values: &[CommandValue],
    ) -> Result<(), DriverError> {
        Ok(())
    }
}
