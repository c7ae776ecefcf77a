#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use command_dispatch::config::DeviceSettings;
use command_dispatch::effects::{EventPublisher, InlineSpawner, MetadataClient};
use command_dispatch::error::{DriverError, EffectError};
use command_dispatch::profile::{
    AdminState, Device, DeviceCommand, DeviceProfile, OperatingState, ProtocolProperties,
    ReadWrite, ResourceDeclaration, ResourceOperation,
};
use command_dispatch::{
    CommandDispatcher, CommandRequest, CommandValue, Event, InMemoryCache, ProtocolDriver,
    ServiceState, Value, ValueKind,
};

#[derive(Default)]
pub struct DriverState {
    pub reads: Vec<Vec<CommandRequest>>,
    pub writes: Vec<(Vec<CommandRequest>, Vec<CommandValue>)>,
    /// Values returned for reads, by resource; unknown resources read zero.
    pub responses: HashMap<String, Value>,
    pub fail: Option<String>,
}

impl DriverState {
    pub fn calls(&self) -> usize {
        self.reads.len() + self.writes.len()
    }
}

pub struct RecordingDriver {
    pub state: Arc<Mutex<DriverState>>,
}

impl ProtocolDriver for RecordingDriver {
    fn read(
        &self,
        _device_name: &str,
        _protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, DriverError> {
        let mut state = self.state.lock().expect("driver state lock");
        state.reads.push(requests.to_vec());
        if let Some(message) = &state.fail {
            return Err(DriverError::new(message.as_str()));
        }
        Ok(requests
            .iter()
            .map(|req| {
                let value = state
                    .responses
                    .get(req.resource_name.as_str())
                    .cloned()
                    .unwrap_or_else(|| Value::zero(req.value_type));
                CommandValue::new(req.resource_name.clone(), value)
            })
            .collect())
    }

    fn write(
        &self,
        _device_name: &str,
        _protocols: &ProtocolProperties,
        requests: &[CommandRequest],
        values: &[CommandValue],
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock().expect("driver state lock");
        state.writes.push((requests.to_vec(), values.to_vec()));
        match &state.fail {
            Some(message) => Err(DriverError::new(message.as_str())),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(Event, String)>>,
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &Event, correlation_id: &str) -> Result<(), EffectError> {
        self.published
            .lock()
            .expect("publisher lock")
            .push((event.clone(), correlation_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetadata {
    pub connected: Mutex<Vec<(String, i64)>>,
}

impl MetadataClient for RecordingMetadata {
    fn update_last_connected(&self, device_name: &str, millis: i64) -> Result<(), EffectError> {
        self.connected
            .lock()
            .expect("metadata lock")
            .push((device_name.to_string(), millis));
        Ok(())
    }
}

pub struct Harness {
    pub dispatcher: CommandDispatcher,
    pub driver: Arc<Mutex<DriverState>>,
    pub publisher: Arc<RecordingPublisher>,
    pub metadata: Arc<RecordingMetadata>,
    pub service: ServiceState,
    pub cache: Arc<InMemoryCache>,
}

impl Harness {
    pub fn driver_calls(&self) -> usize {
        self.driver.lock().expect("driver state lock").calls()
    }

    pub fn last_write(&self) -> (Vec<CommandRequest>, Vec<CommandValue>) {
        self.driver
            .lock()
            .expect("driver state lock")
            .writes
            .last()
            .cloned()
            .expect("a driver write")
    }

    pub fn respond(&self, resource: &str, value: impl Into<Value>) {
        self.driver
            .lock()
            .expect("driver state lock")
            .responses
            .insert(resource.to_string(), value.into());
    }

    pub fn fail_driver(&self, message: &str) {
        self.driver.lock().expect("driver state lock").fail = Some(message.to_string());
    }
}

pub fn harness() -> Harness {
    harness_with(DeviceSettings::default())
}

pub fn harness_with(settings: DeviceSettings) -> Harness {
    let cache = Arc::new(thermostat_cache());
    let state = Arc::new(Mutex::new(DriverState::default()));
    let driver = Arc::new(RecordingDriver {
        state: state.clone(),
    });
    let publisher = Arc::new(RecordingPublisher::default());
    let metadata = Arc::new(RecordingMetadata::default());
    let service = ServiceState::new(AdminState::Unlocked);
    let dispatcher = CommandDispatcher::builder(cache.clone(), driver)
        .service_state(service.clone())
        .settings(settings)
        .event_publisher(publisher.clone())
        .metadata_client(metadata.clone())
        .spawner(Arc::new(InlineSpawner))
        .build()
        .expect("build dispatcher");
    Harness {
        dispatcher,
        driver: state,
        publisher,
        metadata,
        service,
        cache,
    }
}

pub fn thermostat_profile() -> DeviceProfile {
    let mut set_point = ResourceDeclaration::new("SetPoint", ValueKind::Int16, ReadWrite::ReadWrite);
    set_point.properties.scale = Some("0.5".into());

    DeviceProfile {
        name: "Thermostat".into(),
        device_resources: vec![
            ResourceDeclaration::new("Temperature", ValueKind::Float32, ReadWrite::ReadOnly)
                .with_attribute("register", serde_json::json!(30001)),
            set_point,
            ResourceDeclaration::new("Mode", ValueKind::String, ReadWrite::ReadWrite)
                .with_default("auto"),
            ResourceDeclaration::new("Alarm", ValueKind::Bool, ReadWrite::WriteOnly),
            ResourceDeclaration::new("Enabled", ValueKind::Bool, ReadWrite::ReadWrite),
            ResourceDeclaration::new("Levels", ValueKind::Uint8Array, ReadWrite::ReadWrite),
            ResourceDeclaration::new("Fan", ValueKind::Uint8, ReadWrite::ReadWrite),
        ],
        device_commands: vec![
            DeviceCommand::new(
                "Status",
                ReadWrite::ReadOnly,
                vec![
                    ResourceOperation::new("Temperature"),
                    ResourceOperation::new("Enabled")
                        .with_mapping("true", "ON")
                        .with_mapping("false", "OFF"),
                ],
            ),
            DeviceCommand::new(
                "Configure",
                ReadWrite::ReadWrite,
                vec![
                    ResourceOperation::new("Enabled")
                        .with_mapping("true", "ON")
                        .with_mapping("false", "OFF"),
                    ResourceOperation::new("Fan"),
                    ResourceOperation::new("Mode").with_default("eco"),
                ],
            ),
            DeviceCommand::new(
                "Arm",
                ReadWrite::WriteOnly,
                vec![ResourceOperation::new("Alarm")],
            ),
            DeviceCommand::new(
                "Protected",
                ReadWrite::ReadWrite,
                vec![ResourceOperation::new("Temperature")],
            ),
            DeviceCommand::new(
                "Broken",
                ReadWrite::ReadWrite,
                vec![ResourceOperation::new("Ghost")],
            ),
        ],
    }
}

pub fn thermostat_cache() -> InMemoryCache {
    let cache = InMemoryCache::new();
    cache.add_profile(thermostat_profile());
    cache.add_device(Device::new("thermo-1", "Thermostat"));

    let mut locked = Device::new("thermo-locked", "Thermostat");
    locked.admin_state = AdminState::Locked;
    cache.add_device(locked);

    let mut down = Device::new("thermo-down", "Thermostat");
    down.operating_state = OperatingState::Down;
    cache.add_device(down);

    cache.add_device(Device::new("orphan", "Missing"));
    cache
}
