//! Decoded values and the driver-facing command value wrapper.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use smol_str::SmolStr;

use super::ValueKind;

/// Typed payload; the variant is the value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    String(SmolStr),

    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),

    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    Float32(f32),
    Float64(f64),

    BoolArray(Vec<bool>),
    Uint8Array(Vec<u8>),
    Uint16Array(Vec<u16>),
    Uint32Array(Vec<u32>),
    Uint64Array(Vec<u64>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),

    Binary(Vec<u8>),
    Object(serde_json::Value),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
            Value::Uint8(_) => ValueKind::Uint8,
            Value::Uint16(_) => ValueKind::Uint16,
            Value::Uint32(_) => ValueKind::Uint32,
            Value::Uint64(_) => ValueKind::Uint64,
            Value::Int8(_) => ValueKind::Int8,
            Value::Int16(_) => ValueKind::Int16,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::BoolArray(_) => ValueKind::BoolArray,
            Value::Uint8Array(_) => ValueKind::Uint8Array,
            Value::Uint16Array(_) => ValueKind::Uint16Array,
            Value::Uint32Array(_) => ValueKind::Uint32Array,
            Value::Uint64Array(_) => ValueKind::Uint64Array,
            Value::Int8Array(_) => ValueKind::Int8Array,
            Value::Int16Array(_) => ValueKind::Int16Array,
            Value::Int32Array(_) => ValueKind::Int32Array,
            Value::Int64Array(_) => ValueKind::Int64Array,
            Value::Float32Array(_) => ValueKind::Float32Array,
            Value::Float64Array(_) => ValueKind::Float64Array,
            Value::Binary(_) => ValueKind::Binary,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Zero, false, or empty value of `kind`.
    #[must_use]
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::String => Value::String(SmolStr::default()),
            ValueKind::Uint8 => Value::Uint8(0),
            ValueKind::Uint16 => Value::Uint16(0),
            ValueKind::Uint32 => Value::Uint32(0),
            ValueKind::Uint64 => Value::Uint64(0),
            ValueKind::Int8 => Value::Int8(0),
            ValueKind::Int16 => Value::Int16(0),
            ValueKind::Int32 => Value::Int32(0),
            ValueKind::Int64 => Value::Int64(0),
            ValueKind::Float32 => Value::Float32(0.0),
            ValueKind::Float64 => Value::Float64(0.0),
            ValueKind::BoolArray => Value::BoolArray(Vec::new()),
            ValueKind::Uint8Array => Value::Uint8Array(Vec::new()),
            ValueKind::Uint16Array => Value::Uint16Array(Vec::new()),
            ValueKind::Uint32Array => Value::Uint32Array(Vec::new()),
            ValueKind::Uint64Array => Value::Uint64Array(Vec::new()),
            ValueKind::Int8Array => Value::Int8Array(Vec::new()),
            ValueKind::Int16Array => Value::Int16Array(Vec::new()),
            ValueKind::Int32Array => Value::Int32Array(Vec::new()),
            ValueKind::Int64Array => Value::Int64Array(Vec::new()),
            ValueKind::Float32Array => Value::Float32Array(Vec::new()),
            ValueKind::Float64Array => Value::Float64Array(Vec::new()),
            ValueKind::Binary => Value::Binary(Vec::new()),
            ValueKind::Object => Value::Object(serde_json::Value::Null),
        }
    }

    /// Numeric scalar as `f64`, for transforms.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Value::Uint8(v) => f64::from(*v),
            Value::Uint16(v) => f64::from(*v),
            Value::Uint32(v) => f64::from(*v),
            Value::Uint64(v) => *v as f64,
            Value::Int8(v) => f64::from(*v),
            Value::Int16(v) => f64::from(*v),
            Value::Int32(v) => f64::from(*v),
            Value::Int64(v) => *v as f64,
            Value::Float32(v) => f64::from(*v),
            Value::Float64(v) => *v,
            _ => return None,
        };
        Some(value)
    }

    /// Textual form used in readings. Floats use exponent notation, arrays
    /// and objects are JSON, binary is base64.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(v) => v.to_string(),
            Value::String(v) => v.to_string(),
            Value::Uint8(v) => v.to_string(),
            Value::Uint16(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => format!("{v:e}"),
            Value::Float64(v) => format!("{v:e}"),
            Value::BoolArray(v) => json_list(v),
            Value::Uint8Array(v) => json_list(v),
            Value::Uint16Array(v) => json_list(v),
            Value::Uint32Array(v) => json_list(v),
            Value::Uint64Array(v) => json_list(v),
            Value::Int8Array(v) => json_list(v),
            Value::Int16Array(v) => json_list(v),
            Value::Int32Array(v) => json_list(v),
            Value::Int64Array(v) => json_list(v),
            Value::Float32Array(v) => json_list(v),
            Value::Float64Array(v) => json_list(v),
            Value::Binary(v) => BASE64_STANDARD.encode(v),
            Value::Object(v) => v.to_string(),
        }
    }
}

fn json_list<T: serde::Serialize>(items: &[T]) -> String {
    // Non-finite floats have no JSON form and serialize as null.
    serde_json::to_string(items).unwrap_or_default()
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Uint8(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Uint16(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Uint32(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint64(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::Int8(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int16(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

/// A typed value bound to the resource it was read from or will be written to.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandValue {
    pub resource_name: SmolStr,
    pub value: Value,
    /// Nanosecond timestamp set by the driver; zero when unset.
    pub origin: i64,
}

impl CommandValue {
    pub fn new(resource_name: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        Self {
            resource_name: resource_name.into(),
            value: value.into(),
            origin: 0,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: i64) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}
