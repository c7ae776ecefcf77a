//! Numeric value transforms declared through resource `base`, `scale` and
//! `offset` properties.
//!
//! Reads apply `base^v`, then `* scale`, then `+ offset`. Writes apply the
//! inverse in reverse order. Results are narrowed back to the value's kind;
//! integers truncate toward zero and must fit their width.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::error::TransformError;
use crate::profile::ResourceProperties;
use crate::value::{CommandValue, Value, ValueKind};

/// Value transformation applied around driver calls.
pub trait ValueTransform: Send + Sync {
    /// Map an external value to its device form before a write.
    fn transform_write(
        &self,
        value: &mut CommandValue,
        properties: &ResourceProperties,
    ) -> Result<(), TransformError>;

    /// Map a device value to its external form after a read.
    fn transform_read(
        &self,
        value: &mut CommandValue,
        properties: &ResourceProperties,
    ) -> Result<(), TransformError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumericTransform;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Factors {
    base: Option<f64>,
    scale: Option<f64>,
    offset: Option<f64>,
}

impl Factors {
    fn parse(resource: &str, properties: &ResourceProperties) -> Result<Self, TransformError> {
        let base = factor(resource, "base", properties.base.as_ref(), 0.0)?;
        if let Some(base) = base {
            if base <= 0.0 || base == 1.0 {
                return Err(invalid(resource, "base", properties.base.as_ref()));
            }
        }
        let scale = factor(resource, "scale", properties.scale.as_ref(), 1.0)?;
        if scale == Some(0.0) {
            return Err(invalid(resource, "scale", properties.scale.as_ref()));
        }
        let offset = factor(resource, "offset", properties.offset.as_ref(), 0.0)?;
        Ok(Self {
            base,
            scale,
            offset,
        })
    }

    fn is_identity(&self) -> bool {
        self.base.is_none() && self.scale.is_none() && self.offset.is_none()
    }
}

fn invalid(resource: &str, property: &'static str, text: Option<&SmolStr>) -> TransformError {
    TransformError::InvalidProperty {
        resource: resource.into(),
        property,
        text: text.cloned().unwrap_or_default(),
    }
}

/// Parsed property, or `None` when unset or equal to `identity`.
fn factor(
    resource: &str,
    property: &'static str,
    text: Option<&SmolStr>,
    identity: f64,
) -> Result<Option<f64>, TransformError> {
    let Some(raw) = text.filter(|text| !text.trim().is_empty()) else {
        return Ok(None);
    };
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(resource, property, text))?;
    if !parsed.is_finite() {
        return Err(invalid(resource, property, text));
    }
    Ok((parsed != identity).then_some(parsed))
}

impl ValueTransform for NumericTransform {
    fn transform_write(
        &self,
        value: &mut CommandValue,
        properties: &ResourceProperties,
    ) -> Result<(), TransformError> {
        let Some(mut number) = value.value.as_f64() else {
            return Ok(());
        };
        let factors = Factors::parse(&value.resource_name, properties)?;
        if factors.is_identity() {
            return Ok(());
        }
        if let Some(offset) = factors.offset {
            number -= offset;
        }
        if let Some(scale) = factors.scale {
            number /= scale;
        }
        if let Some(base) = factors.base {
            number = number.log(base);
        }
        value.value = narrow(&value.resource_name, value.kind(), number)?;
        Ok(())
    }

    fn transform_read(
        &self,
        value: &mut CommandValue,
        properties: &ResourceProperties,
    ) -> Result<(), TransformError> {
        let Some(mut number) = value.value.as_f64() else {
            return Ok(());
        };
        let factors = Factors::parse(&value.resource_name, properties)?;
        if factors.is_identity() {
            return Ok(());
        }
        if let Some(base) = factors.base {
            number = base.powf(number);
        }
        if let Some(scale) = factors.scale {
            number *= scale;
        }
        if let Some(offset) = factors.offset {
            number += offset;
        }
        value.value = narrow(&value.resource_name, value.kind(), number)?;
        Ok(())
    }
}

/// `min <= v < max_exclusive`; the 64-bit bounds are powers of two and
/// exact in `f64`.
fn fits(number: f64, min: f64, max_exclusive: f64) -> bool {
    number >= min && number < max_exclusive
}

fn narrow(resource: &SmolStr, kind: ValueKind, number: f64) -> Result<Value, TransformError> {
    if !number.is_finite() {
        return Err(TransformError::NotFinite {
            resource: resource.clone(),
        });
    }
    let overflow = || TransformError::Overflow {
        resource: resource.clone(),
        kind,
        value: number.to_string().into(),
    };
    let whole = number.trunc();
    let value = match kind {
        ValueKind::Uint8 if fits(whole, 0.0, 256.0) => Value::Uint8(whole as u8),
        ValueKind::Uint16 if fits(whole, 0.0, 65_536.0) => Value::Uint16(whole as u16),
        ValueKind::Uint32 if fits(whole, 0.0, 4_294_967_296.0) => Value::Uint32(whole as u32),
        ValueKind::Uint64 if fits(whole, 0.0, u64::MAX as f64) => Value::Uint64(whole as u64),
        ValueKind::Int8 if fits(whole, -128.0, 128.0) => Value::Int8(whole as i8),
        ValueKind::Int16 if fits(whole, -32_768.0, 32_768.0) => Value::Int16(whole as i16),
        ValueKind::Int32 if fits(whole, -2_147_483_648.0, 2_147_483_648.0) => {
            Value::Int32(whole as i32)
        }
        ValueKind::Int64 if fits(whole, i64::MIN as f64, i64::MAX as f64) => {
            Value::Int64(whole as i64)
        }
        ValueKind::Float32 if (number as f32).is_finite() => Value::Float32(number as f32),
        ValueKind::Float64 => Value::Float64(number),
        _ => return Err(overflow()),
    };
    Ok(value)
}
