//! `command-dispatch` - device command marshaling and dispatch engine.
//!
//! A [`CommandDispatcher`] takes a named read or write against a device,
//! checks that the device may be used, resolves the name against the device's
//! profile, turns caller text into typed values and hands protocol-agnostic
//! requests to a [`ProtocolDriver`]. Read results come back as an [`Event`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Device and profile lookup.
pub mod cache;
/// Service configuration.
pub mod config;
/// Invocation entry point.
pub mod dispatcher;
/// Protocol drivers and the driver registry.
pub mod driver;
/// Side-effect capabilities and task spawners.
pub mod effects;
/// Invocation and component errors.
pub mod error;
/// Events and driver result conversion.
pub mod event;
/// Service and device eligibility checks.
pub mod guard;
/// Resource operation value mappings.
pub mod mapping;
/// Devices, resources and composite commands.
pub mod profile;
/// Driver request assembly.
pub mod request;
/// Numeric base/scale/offset transforms.
pub mod transform;
/// Value kinds and the text codec.
pub mod value;

pub use cache::{DeviceCache, InMemoryCache};
pub use config::{DeviceSettings, ServiceConfig};
pub use dispatcher::{CommandDispatcher, CommandInvocation};
pub use driver::{DriverRegistry, ProtocolDriver};
pub use error::{CommandError, ErrorKind};
pub use event::{Event, EventConverter, Reading, ReadingConverter};
pub use guard::ServiceState;
pub use request::CommandRequest;
pub use value::{decode, CommandValue, Value, ValueKind};
