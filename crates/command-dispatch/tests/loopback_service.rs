mod common;

use std::sync::Arc;

use command_dispatch::error::ErrorKind;
use command_dispatch::profile::AdminState;
use command_dispatch::{CommandDispatcher, CommandInvocation, DriverRegistry, ServiceConfig};

const CONFIG: &str = r#"
[service]
name = "device-thermostat"

[device]
max_cmd_ops = 8
update_last_connected = false
data_transform = true

[driver]
name = "loopback"
"#;

fn dispatcher(config: &ServiceConfig) -> CommandDispatcher {
    let driver = config
        .build_driver(&DriverRegistry::default_registry())
        .expect("build driver")
        .expect("configured driver");
    assert_eq!(driver.name, "loopback");
    CommandDispatcher::from_config(config, Arc::new(common::thermostat_cache()), driver.driver)
        .build()
        .expect("build dispatcher")
}

#[test]
fn configured_loopback_service_round_trips_values() {
    let config = ServiceConfig::from_toml_str(CONFIG).expect("config");
    let dispatcher = dispatcher(&config);
    assert_eq!(dispatcher.settings().max_cmd_ops, 8);

    dispatcher
        .handle(&CommandInvocation::write(
            "thermo-1",
            "Configure",
            r#"{"Enabled":"OFF","Fan":"2","Mode":"heat"}"#,
        ))
        .expect("write");

    let event = dispatcher
        .handle(&CommandInvocation::read("thermo-1", "Configure"))
        .expect("read")
        .expect("event");
    let values: Vec<_> = event
        .readings
        .iter()
        .map(|reading| reading.value.as_str())
        .collect();
    assert_eq!(values, vec!["OFF", "2", "heat"]);

    dispatcher
        .handle(&CommandInvocation::write("thermo-1", "SetPoint", r#"{"SetPoint":"21"}"#))
        .expect("write set point");
    let event = dispatcher
        .handle(&CommandInvocation::read("thermo-1", "SetPoint"))
        .expect("read set point")
        .expect("event");
    assert_eq!(event.readings[0].value, "21");
}

#[test]
fn locked_service_config_rejects_invocations() {
    let config = ServiceConfig::from_toml_str(&CONFIG.replace(
        "name = \"device-thermostat\"",
        "name = \"device-thermostat\"\nadmin_state = \"locked\"",
    ))
    .expect("config");
    assert_eq!(config.admin_state, AdminState::Locked);
    let dispatcher = dispatcher(&config);

    let err = dispatcher
        .handle(&CommandInvocation::read("thermo-1", "Fan"))
        .expect_err("locked");
    assert_eq!(err.kind(), ErrorKind::ServiceLocked);
    assert_eq!(err.message(), "service locked");

    dispatcher.service_state().set_admin_state(AdminState::Unlocked);
    let err = dispatcher
        .handle(&CommandInvocation::read("thermo-1", "Fan"))
        .expect_err("nothing written yet");
    assert_eq!(err.kind(), ErrorKind::ServerError);
}
