//! Device service configuration loading.

#![allow(missing_docs)]

use std::path::Path;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::driver::{DriverRegistry, DriverSpec};
use crate::error::ConfigError;
use crate::profile::AdminState;

pub const DEFAULT_MAX_CMD_OPS: usize = 128;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: SmolStr,
    pub admin_state: AdminState,
    pub device: DeviceSettings,
    pub driver: DriverConfig,
}

/// Command processing limits and switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Upper bound on resource operations in one composite command.
    pub max_cmd_ops: usize,
    pub update_last_connected: bool,
    /// Apply `base`/`scale`/`offset` transforms around driver calls.
    pub data_transform: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            max_cmd_ops: DEFAULT_MAX_CMD_OPS,
            update_last_connected: false,
            data_transform: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub name: SmolStr,
    pub params: toml::Value,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: SmolStr::new("none"),
            params: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml = toml::from_str(text)?;
        raw.into_config()
    }

    /// Build the configured driver; `None` when the driver is `none`.
    pub fn build_driver(&self, registry: &DriverRegistry) -> Result<Option<DriverSpec>, ConfigError> {
        registry.build(&self.driver.name, &self.driver.params)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigToml {
    service: ServiceSection,
    device: Option<DeviceSection>,
    driver: Option<DriverSection>,
}

#[derive(Debug, Deserialize)]
struct ServiceSection {
    name: String,
    admin_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceSection {
    max_cmd_ops: Option<i64>,
    update_last_connected: Option<bool>,
    data_transform: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DriverSection {
    name: String,
    params: Option<toml::Value>,
}

impl ConfigToml {
    fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let name = self.service.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("service.name must not be empty".into()));
        }
        let admin_state = match self.service.admin_state.as_deref() {
            Some(text) => AdminState::parse(text).ok_or_else(|| {
                ConfigError::Invalid(format!("invalid service.admin_state '{text}'").into())
            })?,
            None => AdminState::Unlocked,
        };

        let defaults = DeviceSettings::default();
        let device = match self.device {
            Some(section) => {
                let max_cmd_ops = match section.max_cmd_ops {
                    Some(value) if value > 0 => usize::try_from(value).map_err(|_| {
                        ConfigError::Invalid(format!("device.max_cmd_ops {value} is too large").into())
                    })?,
                    Some(value) => {
                        return Err(ConfigError::Invalid(
                            format!("device.max_cmd_ops must be greater than zero, got {value}")
                                .into(),
                        ))
                    }
                    None => defaults.max_cmd_ops,
                };
                DeviceSettings {
                    max_cmd_ops,
                    update_last_connected: section
                        .update_last_connected
                        .unwrap_or(defaults.update_last_connected),
                    data_transform: section.data_transform.unwrap_or(defaults.data_transform),
                }
            }
            None => defaults,
        };

        let driver = match self.driver {
            Some(section) => {
                let driver_name = section.name.trim();
                if driver_name.is_empty() {
                    return Err(ConfigError::Invalid("driver.name must not be empty".into()));
                }
                let params = section
                    .params
                    .unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));
                if !params.is_table() {
                    return Err(ConfigError::Invalid("driver.params must be a table".into()));
                }
                DriverConfig {
                    name: SmolStr::new(driver_name),
                    params,
                }
            }
            None => DriverConfig::default(),
        };

        Ok(ServiceConfig {
            name: SmolStr::new(name),
            admin_state,
            device,
            driver,
        })
    }
}
