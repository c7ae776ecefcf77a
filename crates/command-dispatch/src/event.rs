//! Events produced by reads and the default driver result converter.

#![allow(missing_docs)]

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConvertError;
use crate::mapping::resolve_read;
use crate::profile::{Device, DeviceCommand, DeviceProfile};
use crate::request::CommandRequest;
use crate::transform::{NumericTransform, ValueTransform};
use crate::value::{CommandValue, Value, ValueKind};

/// One converted value inside an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub resource_name: SmolStr,
    pub value_type: ValueKind,
    pub origin: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Base64 payload of a binary reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<SmolStr>,
}

/// External representation of one read result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub device_name: SmolStr,
    pub profile_name: SmolStr,
    /// Resource or command name the read addressed.
    pub source_name: SmolStr,
    pub origin: i64,
    pub readings: Vec<Reading>,
}

/// What a read addressed, handed to the converter with the driver results.
#[derive(Debug, Clone, Copy)]
pub struct ReadSource<'a> {
    pub device: &'a Device,
    pub profile: &'a DeviceProfile,
    pub source_name: &'a str,
    /// Set when the read went through a composite command.
    pub command: Option<&'a DeviceCommand>,
    pub requests: &'a [CommandRequest],
}

/// Turns driver results into an [`Event`].
pub trait EventConverter: Send + Sync {
    fn convert(
        &self,
        source: &ReadSource<'_>,
        values: Vec<CommandValue>,
    ) -> Result<Event, ConvertError>;
}

/// Default converter: one reading per value, in request order.
pub struct ReadingConverter {
    transform: Arc<dyn ValueTransform>,
    data_transform: bool,
}

impl Default for ReadingConverter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ReadingConverter {
    #[must_use]
    pub fn new(data_transform: bool) -> Self {
        Self {
            transform: Arc::new(NumericTransform),
            data_transform,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transform = transform;
        self
    }

    fn reading(
        &self,
        source: &ReadSource<'_>,
        mut value: CommandValue,
        now: i64,
    ) -> Result<Reading, ConvertError> {
        let resource = source.profile.resource(&value.resource_name);
        if self.data_transform {
            if let Some(resource) = resource {
                self.transform
                    .transform_read(&mut value, &resource.properties)?;
            }
        }
        let origin = if value.origin != 0 { value.origin } else { now };

        if let Value::Binary(bytes) = &value.value {
            return Ok(Reading {
                resource_name: value.resource_name.clone(),
                value_type: ValueKind::Binary,
                origin,
                value: String::new(),
                binary_value: Some(BASE64_STANDARD.encode(bytes)),
                media_type: resource.and_then(|resource| resource.properties.media_type.clone()),
            });
        }

        let text = value.value.to_text();
        let mapped = source
            .command
            .and_then(|command| command.operation(&value.resource_name))
            .and_then(|operation| resolve_read(&operation.mappings, &text));
        let (value_type, text) = match mapped {
            Some(external) => (ValueKind::String, external.to_string()),
            None => (value.kind(), text),
        };
        Ok(Reading {
            resource_name: value.resource_name,
            value_type,
            origin,
            value: text,
            binary_value: None,
            media_type: None,
        })
    }
}

impl EventConverter for ReadingConverter {
    fn convert(
        &self,
        source: &ReadSource<'_>,
        values: Vec<CommandValue>,
    ) -> Result<Event, ConvertError> {
        if values.len() != source.requests.len() {
            return Err(ConvertError::ResultCount {
                expected: source.requests.len(),
                got: values.len(),
            });
        }
        let now = now_nanos();
        let readings = source
            .requests
            .iter()
            .zip(values)
            .map(|(request, value)| {
                if value.resource_name != request.resource_name {
                    return Err(ConvertError::ResourceMismatch {
                        expected: request.resource_name.clone(),
                        got: value.resource_name,
                    });
                }
                self.reading(source, value, now)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Event {
            device_name: source.device.name.clone(),
            profile_name: source.profile.name.clone(),
            source_name: source.source_name.into(),
            origin: now,
            readings,
        })
    }
}

/// Current wall-clock time in Unix nanoseconds.
#[must_use]
pub fn now_nanos() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(i64::MAX)
}
