//! Device snapshots and the capability profiles they reference.

#![allow(missing_docs)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::value::ValueKind;

/// Opaque per-resource attributes, interpreted only by drivers.
pub type Attributes = IndexMap<SmolStr, serde_json::Value>;

/// Protocol name to connection properties, interpreted only by drivers.
pub type ProtocolProperties = IndexMap<SmolStr, IndexMap<SmolStr, SmolStr>>;

/// Device text to external text substitutions, in declared order.
pub type MappingTable = IndexMap<SmolStr, SmolStr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminState {
    #[default]
    Unlocked,
    Locked,
}

impl AdminState {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "unlocked" => Some(Self::Unlocked),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingState {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadWrite {
    #[serde(rename = "R")]
    ReadOnly,
    #[serde(rename = "W")]
    WriteOnly,
    #[default]
    #[serde(rename = "RW", alias = "WR")]
    ReadWrite,
}

impl ReadWrite {
    #[must_use]
    pub fn readable(self) -> bool {
        !matches!(self, Self::WriteOnly)
    }

    #[must_use]
    pub fn writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub name: SmolStr,
    #[serde(default)]
    pub admin_state: AdminState,
    #[serde(default)]
    pub operating_state: OperatingState,
    #[serde(default)]
    pub protocols: ProtocolProperties,
    pub profile_name: SmolStr,
}

impl Device {
    pub fn new(name: impl Into<SmolStr>, profile_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            admin_state: AdminState::Unlocked,
            operating_state: OperatingState::Up,
            protocols: ProtocolProperties::new(),
            profile_name: profile_name.into(),
        }
    }
}

/// Declared value properties of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    pub value_type: ValueKind,
    #[serde(default)]
    pub read_write: ReadWrite,
    #[serde(default)]
    pub default_value: Option<SmolStr>,
    #[serde(default)]
    pub scale: Option<SmolStr>,
    #[serde(default)]
    pub offset: Option<SmolStr>,
    #[serde(default)]
    pub base: Option<SmolStr>,
    #[serde(default)]
    pub media_type: Option<SmolStr>,
}

impl ResourceProperties {
    pub fn new(value_type: ValueKind, read_write: ReadWrite) -> Self {
        Self {
            value_type,
            read_write,
            default_value: None,
            scale: None,
            offset: None,
            base: None,
            media_type: None,
        }
    }

    /// Default text, treating an empty string as absent.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        non_empty(self.default_value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDeclaration {
    pub name: SmolStr,
    pub properties: ResourceProperties,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceDeclaration {
    pub fn new(name: impl Into<SmolStr>, value_type: ValueKind, read_write: ReadWrite) -> Self {
        Self {
            name: name.into(),
            properties: ResourceProperties::new(value_type, read_write),
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<SmolStr>) -> Self {
        self.properties.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn value_type(&self) -> ValueKind {
        self.properties.value_type
    }

    #[must_use]
    pub fn read_write(&self) -> ReadWrite {
        self.properties.read_write
    }
}

/// One constituent of a composite command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperation {
    pub device_resource: SmolStr,
    #[serde(default)]
    pub default_value: Option<SmolStr>,
    #[serde(default)]
    pub mappings: MappingTable,
}

impl ResourceOperation {
    pub fn new(device_resource: impl Into<SmolStr>) -> Self {
        Self {
            device_resource: device_resource.into(),
            default_value: None,
            mappings: MappingTable::new(),
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<SmolStr>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_mapping(mut self, device: impl Into<SmolStr>, external: impl Into<SmolStr>) -> Self {
        self.mappings.insert(device.into(), external.into());
        self
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        non_empty(self.default_value.as_deref())
    }
}

/// Composite command declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub name: SmolStr,
    #[serde(default)]
    pub read_write: ReadWrite,
    pub resource_operations: Vec<ResourceOperation>,
}

impl DeviceCommand {
    pub fn new(
        name: impl Into<SmolStr>,
        read_write: ReadWrite,
        resource_operations: Vec<ResourceOperation>,
    ) -> Self {
        Self {
            name: name.into(),
            read_write,
            resource_operations,
        }
    }

    pub fn operation(&self, resource: &str) -> Option<&ResourceOperation> {
        self.resource_operations
            .iter()
            .find(|op| op.device_resource == resource)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub name: SmolStr,
    #[serde(default)]
    pub device_resources: Vec<ResourceDeclaration>,
    #[serde(default)]
    pub device_commands: Vec<DeviceCommand>,
}

impl DeviceProfile {
    pub fn resource(&self, name: &str) -> Option<&ResourceDeclaration> {
        self.device_resources.iter().find(|dr| dr.name == name)
    }

    pub fn command(&self, name: &str) -> Option<&DeviceCommand> {
        self.device_commands.iter().find(|dc| dc.name == name)
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.is_empty())
}
