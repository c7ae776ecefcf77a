//! Loopback driver for development: reads return the last written value.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use smol_str::SmolStr;

use crate::driver::ProtocolDriver;
use crate::error::DriverError;
use crate::profile::ProtocolProperties;
use crate::request::CommandRequest;
use crate::value::{CommandValue, Value};

#[derive(Debug, Default)]
pub struct LoopbackDriver {
    last_values: Mutex<HashMap<(SmolStr, SmolStr), Value>>,
}

impl LoopbackDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written to `resource` on `device`.
    pub fn last_value(&self, device: &str, resource: &str) -> Option<Value> {
        self.last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(SmolStr::new(device), SmolStr::new(resource)))
            .cloned()
    }
}

impl ProtocolDriver for LoopbackDriver {
    fn read(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, DriverError> {
        let values = self
            .last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        requests
            .iter()
            .map(|req| {
                let key = (SmolStr::new(device_name), req.resource_name.clone());
                match values.get(&key) {
                    Some(value) if value.kind() == req.value_type => {
                        Ok(CommandValue::new(req.resource_name.clone(), value.clone()))
                    }
                    Some(value) => Err(DriverError::new(format!(
                        "loopback value for {} is {}, requested {}",
                        req.resource_name,
                        value.kind(),
                        req.value_type
                    ))),
                    None => Err(DriverError::new(format!(
                        "no value written to {device_name}/{}",
                        req.resource_name
                    ))),
                }
            })
            .collect()
    }

    fn write(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
        requests: &[CommandRequest],
        values: &[CommandValue],
    ) -> Result<(), DriverError> {
        if requests.len() != values.len() {
            return Err(DriverError::new(format!(
                "{} requests for {} values",
                requests.len(),
                values.len()
            )));
        }
        let mut last = self
            .last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for value in values {
            last.insert(
                (SmolStr::new(device_name), value.resource_name.clone()),
                value.value.clone(),
            );
        }
        Ok(())
    }
}
