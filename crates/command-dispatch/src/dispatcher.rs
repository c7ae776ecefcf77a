//! Command invocation entry point.
//!
//! An invocation names a device and either a composite command or a single
//! resource of the device's profile. Composite commands are resolved first.
//! Every failure aborts the invocation before the driver is called, except for
//! driver and conversion failures themselves. Side effects (last-connected
//! update, event publication) are scheduled only after a successful
//! invocation and never affect its result.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::cache::DeviceCache;
use crate::config::{DeviceSettings, ServiceConfig};
use crate::driver::ProtocolDriver;
use crate::effects::{BackgroundQueue, EventPublisher, MetadataClient, TaskSpawner};
use crate::error::{CommandError, EffectError};
use crate::event::{now_nanos, Event, EventConverter, ReadSource, ReadingConverter};
use crate::guard::{check_device, ServiceState};
use crate::mapping::resolve_write;
use crate::profile::{Device, DeviceCommand, DeviceProfile, ResourceDeclaration};
use crate::request::CommandRequest;
use crate::transform::{NumericTransform, ValueTransform};
use crate::value::{decode, CommandValue};

/// One read or write request against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Composite command or resource name.
    pub command: SmolStr,
    pub device_name: SmolStr,
    pub is_read: bool,
    pub correlation_id: SmolStr,
    /// Caller query string passed on to the driver verbatim.
    pub raw_query: Option<SmolStr>,
    pub send_event: bool,
    /// JSON object of resource name to value text; writes only.
    pub body: String,
}

impl CommandInvocation {
    pub fn read(device_name: impl Into<SmolStr>, command: impl Into<SmolStr>) -> Self {
        Self {
            command: command.into(),
            device_name: device_name.into(),
            is_read: true,
            correlation_id: SmolStr::default(),
            raw_query: None,
            send_event: false,
            body: String::new(),
        }
    }

    pub fn write(
        device_name: impl Into<SmolStr>,
        command: impl Into<SmolStr>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            is_read: false,
            body: body.into(),
            ..Self::read(device_name, command)
        }
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<SmolStr>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    #[must_use]
    pub fn with_raw_query(mut self, raw_query: impl Into<SmolStr>) -> Self {
        self.raw_query = Some(raw_query.into());
        self
    }

    #[must_use]
    pub fn with_send_event(mut self, send_event: bool) -> Self {
        self.send_event = send_event;
        self
    }
}

/// Resolved target of an invocation within one profile snapshot.
enum Target<'a> {
    Command(&'a DeviceCommand),
    Resource(&'a ResourceDeclaration),
}

/// Validates, marshals and dispatches device commands.
pub struct CommandDispatcher {
    service: ServiceState,
    settings: DeviceSettings,
    cache: Arc<dyn DeviceCache>,
    driver: Arc<dyn ProtocolDriver>,
    converter: Arc<dyn EventConverter>,
    transform: Arc<dyn ValueTransform>,
    metadata: Option<Arc<dyn MetadataClient>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    spawner: Arc<dyn TaskSpawner>,
}

pub struct CommandDispatcherBuilder {
    service: ServiceState,
    settings: DeviceSettings,
    cache: Arc<dyn DeviceCache>,
    driver: Arc<dyn ProtocolDriver>,
    converter: Option<Arc<dyn EventConverter>>,
    transform: Option<Arc<dyn ValueTransform>>,
    metadata: Option<Arc<dyn MetadataClient>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    spawner: Option<Arc<dyn TaskSpawner>>,
}

impl CommandDispatcherBuilder {
    #[must_use]
    pub fn service_state(mut self, service: ServiceState) -> Self {
        self.service = service;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: DeviceSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn EventConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn metadata_client(mut self, metadata: Arc<dyn MetadataClient>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Worker thread name used when no spawner is supplied.
    pub const EFFECTS_WORKER: &'static str = "command-effects";

    /// Finish the dispatcher. Without an explicit spawner, side effects go to
    /// a dedicated [`BackgroundQueue`] owned by the dispatcher.
    pub fn build(self) -> Result<CommandDispatcher, EffectError> {
        let spawner: Arc<dyn TaskSpawner> = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(BackgroundQueue::start(Self::EFFECTS_WORKER)?),
        };
        let transform = self
            .transform
            .unwrap_or_else(|| Arc::new(NumericTransform));
        let converter = self.converter.unwrap_or_else(|| {
            Arc::new(
                ReadingConverter::new(self.settings.data_transform)
                    .with_transform(transform.clone()),
            )
        });
        Ok(CommandDispatcher {
            service: self.service,
            settings: self.settings,
            cache: self.cache,
            driver: self.driver,
            converter,
            transform,
            metadata: self.metadata,
            publisher: self.publisher,
            spawner,
        })
    }
}

impl CommandDispatcher {
    pub fn builder(
        cache: Arc<dyn DeviceCache>,
        driver: Arc<dyn ProtocolDriver>,
    ) -> CommandDispatcherBuilder {
        CommandDispatcherBuilder {
            service: ServiceState::default(),
            settings: DeviceSettings::default(),
            cache,
            driver,
            converter: None,
            transform: None,
            metadata: None,
            publisher: None,
            spawner: None,
        }
    }

    /// Builder seeded with the service admin state and device settings of
    /// `config`.
    pub fn from_config(
        config: &ServiceConfig,
        cache: Arc<dyn DeviceCache>,
        driver: Arc<dyn ProtocolDriver>,
    ) -> CommandDispatcherBuilder {
        Self::builder(cache, driver)
            .service_state(ServiceState::new(config.admin_state))
            .settings(config.device)
    }

    #[must_use]
    pub fn service_state(&self) -> &ServiceState {
        &self.service
    }

    #[must_use]
    pub fn settings(&self) -> DeviceSettings {
        self.settings
    }

    /// Run one invocation. Reads return their event, writes return `None`.
    pub fn handle(&self, invocation: &CommandInvocation) -> Result<Option<Event>, CommandError> {
        let device = check_device(
            self.service.admin_state(),
            self.cache.as_ref(),
            &invocation.device_name,
        )?;
        let result = if invocation.is_read {
            self.read(&device, invocation).map(Some)
        } else {
            self.write(&device, invocation).map(|()| None)
        };
        if let Ok(event) = &result {
            self.after_success(&device, invocation, event.as_ref());
        }
        result
    }

    fn read(&self, device: &Device, invocation: &CommandInvocation) -> Result<Event, CommandError> {
        let profile = self.profile(device, &invocation.command)?;
        match resolve(&profile, &invocation.command)? {
            Target::Command(command) => self.read_command(device, &profile, command, invocation),
            Target::Resource(resource) => {
                self.read_resource(device, &profile, resource, invocation)
            }
        }
    }

    fn write(&self, device: &Device, invocation: &CommandInvocation) -> Result<(), CommandError> {
        let profile = self.profile(device, &invocation.command)?;
        match resolve(&profile, &invocation.command)? {
            Target::Command(command) => self.write_command(device, &profile, command, invocation),
            Target::Resource(resource) => self.write_resource(device, resource, invocation),
        }
    }

    /// Profile snapshot used for the whole invocation.
    fn profile(&self, device: &Device, name: &str) -> Result<Arc<DeviceProfile>, CommandError> {
        self.cache
            .profile(&device.profile_name)
            .ok_or_else(|| not_found(name))
    }

    fn read_resource(
        &self,
        device: &Device,
        profile: &DeviceProfile,
        resource: &ResourceDeclaration,
        invocation: &CommandInvocation,
    ) -> Result<Event, CommandError> {
        if !resource.read_write().readable() {
            return Err(CommandError::NotAllowed(
                format!("deviceResource {} is marked as write-only", resource.name).into(),
            ));
        }
        debug!(
            "read device resource {} correlation_id={}",
            resource.name, invocation.correlation_id
        );
        let requests = vec![CommandRequest::for_resource(
            resource,
            invocation.raw_query.as_deref(),
        )];
        let values = self
            .driver
            .read(&device.name, &device.protocols, &requests)
            .map_err(|err| {
                CommandError::server(
                    format!("error reading DeviceResource {} for {}", resource.name, device.name),
                    err,
                )
            })?;
        let source = ReadSource {
            device,
            profile,
            source_name: &resource.name,
            command: None,
            requests: &requests,
        };
        self.converter
            .convert(&source, values)
            .map_err(|err| CommandError::server("failed to convert CommandValue to Event", err))
    }

    fn read_command(
        &self,
        device: &Device,
        profile: &DeviceProfile,
        command: &DeviceCommand,
        invocation: &CommandInvocation,
    ) -> Result<Event, CommandError> {
        if !command.read_write.readable() {
            return Err(CommandError::NotAllowed(
                format!("deviceCommand {} is marked as write-only", command.name).into(),
            ));
        }
        self.check_max_ops("GET", device, command)?;
        debug!(
            "read device command {} correlation_id={}",
            command.name, invocation.correlation_id
        );
        let requests = command
            .resource_operations
            .iter()
            .map(|operation| {
                let resource = profile.resource(&operation.device_resource).ok_or_else(|| {
                    CommandError::ServerError(
                        format!(
                            "deviceResource {} in GET command {} for {} not defined",
                            operation.device_resource, command.name, device.name
                        )
                        .into(),
                    )
                })?;
                Ok(CommandRequest::for_resource(
                    resource,
                    invocation.raw_query.as_deref(),
                ))
            })
            .collect::<Result<Vec<_>, CommandError>>()?;
        let values = self
            .driver
            .read(&device.name, &device.protocols, &requests)
            .map_err(|err| {
                CommandError::server(
                    format!("error reading DeviceCommand {} for {}", command.name, device.name),
                    err,
                )
            })?;
        let source = ReadSource {
            device,
            profile,
            source_name: &command.name,
            command: Some(command),
            requests: &requests,
        };
        self.converter
            .convert(&source, values)
            .map_err(|err| CommandError::server("failed to convert CommandValue to Event", err))
    }

    fn write_resource(
        &self,
        device: &Device,
        resource: &ResourceDeclaration,
        invocation: &CommandInvocation,
    ) -> Result<(), CommandError> {
        if !resource.read_write().writable() {
            return Err(CommandError::NotAllowed(
                format!("deviceResource {} is marked as read-only", resource.name).into(),
            ));
        }
        debug!(
            "write device resource {} correlation_id={}",
            resource.name, invocation.correlation_id
        );
        let params = parse_params(&invocation.body)?;
        let text = params
            .get(resource.name.as_str())
            .map(String::as_str)
            .or_else(|| resource.properties.default_value())
            .ok_or_else(|| missing_value(resource))?;
        let mut value = decode(&resource.name, resource.value_type(), text)?;
        let request = CommandRequest::for_resource(resource, invocation.raw_query.as_deref());
        self.transform_write(&mut value, resource)?;
        self.driver
            .write(&device.name, &device.protocols, &[request], &[value])
            .map_err(|err| {
                CommandError::server(
                    format!("error writing DeviceResource {} for {}", resource.name, device.name),
                    err,
                )
            })
    }

    fn write_command(
        &self,
        device: &Device,
        profile: &DeviceProfile,
        command: &DeviceCommand,
        invocation: &CommandInvocation,
    ) -> Result<(), CommandError> {
        if !command.read_write.writable() {
            return Err(CommandError::NotAllowed(
                format!("deviceCommand {} is marked as read-only", command.name).into(),
            ));
        }
        self.check_max_ops("SET", device, command)?;
        debug!(
            "write device command {} correlation_id={}",
            command.name, invocation.correlation_id
        );
        let params = parse_params(&invocation.body)?;

        let mut staged = Vec::with_capacity(command.resource_operations.len());
        for operation in &command.resource_operations {
            let resource = profile.resource(&operation.device_resource).ok_or_else(|| {
                CommandError::ServerError(
                    format!(
                        "deviceResource {} in SET command {} for {} not defined",
                        operation.device_resource, command.name, device.name
                    )
                    .into(),
                )
            })?;
            if !resource.read_write().writable() {
                return Err(CommandError::NotAllowed(
                    format!(
                        "deviceResource {} in SET command {} is marked as read-only",
                        resource.name, command.name
                    )
                    .into(),
                ));
            }
            let text = params
                .get(operation.device_resource.as_str())
                .map(String::as_str)
                .or_else(|| operation.default_value())
                .or_else(|| resource.properties.default_value())
                .ok_or_else(|| missing_value(resource))?;
            let text = resolve_write(&operation.device_resource, &operation.mappings, text);
            let value = decode(&resource.name, resource.value_type(), text)?;
            staged.push((resource, value));
        }

        let mut requests = Vec::with_capacity(staged.len());
        let mut values = Vec::with_capacity(staged.len());
        for (resource, mut value) in staged {
            requests.push(CommandRequest::for_resource(
                resource,
                invocation.raw_query.as_deref(),
            ));
            self.transform_write(&mut value, resource)?;
            values.push(value);
        }
        self.driver
            .write(&device.name, &device.protocols, &requests, &values)
            .map_err(|err| {
                CommandError::server(
                    format!("error writing DeviceCommand {} for {}", command.name, device.name),
                    err,
                )
            })
    }

    fn check_max_ops(
        &self,
        method: &str,
        device: &Device,
        command: &DeviceCommand,
    ) -> Result<(), CommandError> {
        let max = self.settings.max_cmd_ops;
        if command.resource_operations.len() > max {
            return Err(CommandError::ServerError(
                format!(
                    "{method} command {} exceed device {} MaxCmdOps ({max})",
                    command.name, device.name
                )
                .into(),
            ));
        }
        Ok(())
    }

    fn transform_write(
        &self,
        value: &mut CommandValue,
        resource: &ResourceDeclaration,
    ) -> Result<(), CommandError> {
        if !self.settings.data_transform {
            return Ok(());
        }
        self.transform
            .transform_write(value, &resource.properties)
            .map_err(|err| CommandError::contract("failed to transform set parameter", err))
    }

    fn after_success(&self, device: &Device, invocation: &CommandInvocation, event: Option<&Event>) {
        if self.settings.update_last_connected {
            if let Some(metadata) = &self.metadata {
                let metadata = Arc::clone(metadata);
                let device_name = device.name.clone();
                let millis = now_nanos() / 1_000_000;
                self.spawner.spawn(
                    "update-last-connected",
                    Box::new(move || {
                        if let Err(err) = metadata.update_last_connected(&device_name, millis) {
                            warn!("failed to update last connected for {device_name}: {err}");
                        }
                    }),
                );
            }
        }
        if let (Some(event), true) = (event, invocation.send_event) {
            if let Some(publisher) = &self.publisher {
                let publisher = Arc::clone(publisher);
                let event = event.clone();
                let correlation_id = invocation.correlation_id.clone();
                self.spawner.spawn(
                    "send-event",
                    Box::new(move || {
                        if let Err(err) = publisher.publish(&event, &correlation_id) {
                            warn!(
                                "failed to publish event for {} correlation_id={correlation_id}: {err}",
                                event.device_name
                            );
                        }
                    }),
                );
            }
        }
    }
}

fn resolve<'a>(profile: &'a DeviceProfile, name: &str) -> Result<Target<'a>, CommandError> {
    if let Some(command) = profile.command(name) {
        return Ok(Target::Command(command));
    }
    profile
        .resource(name)
        .map(Target::Resource)
        .ok_or_else(|| not_found(name))
}

fn not_found(name: &str) -> CommandError {
    CommandError::EntityNotFound(format!("deviceResource {name} not found").into())
}

fn parse_params(body: &str) -> Result<HashMap<String, String>, CommandError> {
    let params: HashMap<String, String> = serde_json::from_str(body)
        .map_err(|err| CommandError::server("failed to parse SET command parameters", err))?;
    if params.is_empty() {
        return Err(CommandError::server(
            "failed to parse SET command parameters",
            "no parameters specified",
        ));
    }
    Ok(params)
}

fn missing_value(resource: &ResourceDeclaration) -> CommandError {
    CommandError::ServerError(
        format!(
            "deviceResource {} not found in request body and no default value defined",
            resource.name
        )
        .into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::driver::LoopbackDriver;
    use crate::effects::InlineSpawner;
    use crate::error::ErrorKind;
    use crate::profile::{ReadWrite, ResourceOperation};
    use crate::value::{Value, ValueKind};

    fn setup() -> (CommandDispatcher, Arc<LoopbackDriver>) {
        let cache = InMemoryCache::new();
        cache.add_profile(DeviceProfile {
            name: "Lamp".into(),
            device_resources: vec![
                ResourceDeclaration::new("Power", ValueKind::Bool, ReadWrite::ReadWrite),
                ResourceDeclaration::new("Brightness", ValueKind::Uint8, ReadWrite::ReadWrite)
                    .with_default("50"),
            ],
            device_commands: vec![DeviceCommand::new(
                "Light",
                ReadWrite::ReadWrite,
                vec![
                    ResourceOperation::new("Power")
                        .with_mapping("true", "ON")
                        .with_mapping("false", "OFF"),
                    ResourceOperation::new("Brightness"),
                ],
            )],
        });
        cache.add_device(Device::new("lamp-1", "Lamp"));
        let driver = Arc::new(LoopbackDriver::new());
        let dispatcher = CommandDispatcher::builder(Arc::new(cache), driver.clone())
            .spawner(Arc::new(InlineSpawner))
            .build()
            .expect("build dispatcher");
        (dispatcher, driver)
    }

    #[test]
    fn composite_write_then_read_round_trips_through_mapping() {
        let (dispatcher, driver) = setup();
        let written = dispatcher
            .handle(&CommandInvocation::write("lamp-1", "Light", r#"{"Power":"ON"}"#))
            .expect("write");
        assert!(written.is_none());
        assert_eq!(driver.last_value("lamp-1", "Power"), Some(Value::Bool(true)));
        assert_eq!(driver.last_value("lamp-1", "Brightness"), Some(Value::Uint8(50)));

        let event = dispatcher
            .handle(&CommandInvocation::read("lamp-1", "Light"))
            .expect("read")
            .expect("event");
        let values: Vec<_> = event.readings.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["ON", "50"]);
    }

    #[test]
    fn unknown_name_is_entity_not_found() {
        let (dispatcher, _) = setup();
        let err = dispatcher
            .handle(&CommandInvocation::read("lamp-1", "Color"))
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
        assert_eq!(err.message(), "deviceResource Color not found");
    }

    #[test]
    fn body_must_be_a_non_empty_string_map() {
        let (dispatcher, _) = setup();
        for body in ["", "{}", "[1]", r#"{"Power": true}"#] {
            let err = dispatcher
                .handle(&CommandInvocation::write("lamp-1", "Power", body))
                .expect_err("bad body");
            assert_eq!(err.kind(), ErrorKind::ServerError, "body {body:?}");
            assert!(err.message().starts_with("failed to parse SET command parameters"));
        }
    }
}
