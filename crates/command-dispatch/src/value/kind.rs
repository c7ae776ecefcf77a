use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared value type of a device resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    String,

    Uint8,
    Uint16,
    Uint32,
    Uint64,

    Int8,
    Int16,
    Int32,
    Int64,

    Float32,
    Float64,

    BoolArray,
    Uint8Array,
    Uint16Array,
    Uint32Array,
    Uint64Array,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    Float32Array,
    Float64Array,

    Binary,
    Object,
}

impl ValueKind {
    pub const ALL: [Self; 25] = [
        Self::Bool,
        Self::String,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::BoolArray,
        Self::Uint8Array,
        Self::Uint16Array,
        Self::Uint32Array,
        Self::Uint64Array,
        Self::Int8Array,
        Self::Int16Array,
        Self::Int32Array,
        Self::Int64Array,
        Self::Float32Array,
        Self::Float64Array,
        Self::Binary,
        Self::Object,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::String => "String",
            Self::Uint8 => "Uint8",
            Self::Uint16 => "Uint16",
            Self::Uint32 => "Uint32",
            Self::Uint64 => "Uint64",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::BoolArray => "BoolArray",
            Self::Uint8Array => "Uint8Array",
            Self::Uint16Array => "Uint16Array",
            Self::Uint32Array => "Uint32Array",
            Self::Uint64Array => "Uint64Array",
            Self::Int8Array => "Int8Array",
            Self::Int16Array => "Int16Array",
            Self::Int32Array => "Int32Array",
            Self::Int64Array => "Int64Array",
            Self::Float32Array => "Float32Array",
            Self::Float64Array => "Float64Array",
            Self::Binary => "Binary",
            Self::Object => "Object",
        }
    }

    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::BoolArray
                | Self::Uint8Array
                | Self::Uint16Array
                | Self::Uint32Array
                | Self::Uint64Array
                | Self::Int8Array
                | Self::Int16Array
                | Self::Int32Array
                | Self::Int64Array
                | Self::Float32Array
                | Self::Float64Array
        )
    }

    /// Scalar integer and float kinds, the ones numeric transforms apply to.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Float32
                | Self::Float64
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown value type name in a profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value type '{0}'")]
pub struct UnknownValueKind(pub String);

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownValueKind(trimmed.to_string()))
    }
}
