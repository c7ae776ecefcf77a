//! Invocation errors and the component-local errors that feed them.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use crate::value::ValueKind;

/// Error kinds surfaced to the caller of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ServiceLocked,
    EntityNotFound,
    NotAllowed,
    ContractInvalid,
    ServerError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceLocked => "ServiceLocked",
            Self::EntityNotFound => "EntityDoesNotExist",
            Self::NotAllowed => "NotAllowed",
            Self::ContractInvalid => "ContractInvalid",
            Self::ServerError => "ServerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error a failed invocation reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Device service or device is not available for interaction.
    #[error("{0}")]
    ServiceLocked(SmolStr),

    /// Device, resource or command does not exist in the current profile.
    #[error("{0}")]
    EntityNotFound(SmolStr),

    /// Read of a write-only target or write of a read-only target.
    #[error("{0}")]
    NotAllowed(SmolStr),

    /// Value rejected by a declared transformation rule.
    #[error("{0}")]
    ContractInvalid(SmolStr),

    /// Profile inconsistency, malformed input, decode or driver failure.
    #[error("{0}")]
    ServerError(SmolStr),
}

impl CommandError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceLocked(_) => ErrorKind::ServiceLocked,
            Self::EntityNotFound(_) => ErrorKind::EntityNotFound,
            Self::NotAllowed(_) => ErrorKind::NotAllowed,
            Self::ContractInvalid(_) => ErrorKind::ContractInvalid,
            Self::ServerError(_) => ErrorKind::ServerError,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::ServiceLocked(msg)
            | Self::EntityNotFound(msg)
            | Self::NotAllowed(msg)
            | Self::ContractInvalid(msg)
            | Self::ServerError(msg) => msg.as_str(),
        }
    }

    pub(crate) fn server(context: impl fmt::Display, cause: impl fmt::Display) -> Self {
        Self::ServerError(format!("{context}: {cause}").into())
    }

    pub(crate) fn contract(context: impl fmt::Display, cause: impl fmt::Display) -> Self {
        Self::ContractInvalid(format!("{context}: {cause}").into())
    }
}

/// Failure to turn caller text into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("failed to convert set parameter '{text}' to value type {kind}")]
    Malformed { text: SmolStr, kind: ValueKind },

    #[error("set parameter '{text}' is out of range for value type {kind}")]
    OutOfRange { text: SmolStr, kind: ValueKind },

    #[error("failed to parse '{text}' to {kind}, decoded value is NaN")]
    NotANumber { text: SmolStr, kind: ValueKind },

    #[error("unrecognized value type {0}")]
    Unsupported(ValueKind),
}

impl From<DecodeError> for CommandError {
    fn from(value: DecodeError) -> Self {
        Self::server("failed to create CommandValue", value)
    }
}

/// Failure reported by a protocol driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DriverError(pub SmolStr);

impl DriverError {
    pub fn new(message: impl Into<SmolStr>) -> Self {
        Self(message.into())
    }
}

/// Failure applying a numeric transform to a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("invalid {property} '{text}' for resource '{resource}'")]
    InvalidProperty {
        resource: SmolStr,
        property: &'static str,
        text: SmolStr,
    },

    #[error("transformed value of '{resource}' is not finite")]
    NotFinite { resource: SmolStr },

    #[error("transformed value {value} overflows {kind} for resource '{resource}'")]
    Overflow {
        resource: SmolStr,
        kind: ValueKind,
        value: SmolStr,
    },
}

/// Failure converting driver results into an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("driver returned {got} values for {expected} requests")]
    ResultCount { expected: usize, got: usize },

    #[error("driver returned value for '{got}' where '{expected}' was requested")]
    ResourceMismatch { expected: SmolStr, got: SmolStr },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Failure of a post-dispatch side effect. Logged, never surfaced to the
/// caller of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(SmolStr),

    #[error("{0}")]
    Failed(SmolStr),
}

impl EffectError {
    pub fn failed(message: impl Into<SmolStr>) -> Self {
        Self::Failed(message.into())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config '{0}'")]
    Invalid(SmolStr),
}
