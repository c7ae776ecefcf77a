//! Text to typed value decoding for write parameters.
//!
//! Scalars parse from decimal text with hard width checks. Float kinds also
//! accept base64 of the big-endian IEEE bytes when the text is not decimal.
//! Bool, signed and float arrays use JSON list syntax; unsigned arrays use a
//! bracket-stripped comma list.

use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

use super::{CommandValue, Value, ValueKind};

/// Decode `text` as `kind` into a value for `resource`.
pub fn decode(resource: &str, kind: ValueKind, text: &str) -> Result<CommandValue, DecodeError> {
    let value = match kind {
        ValueKind::String => Value::String(text.into()),
        ValueKind::Bool => Value::Bool(parse_bool(text).ok_or_else(|| malformed(kind, text))?),

        ValueKind::Uint8 => Value::Uint8(parse_unsigned(kind, text)?),
        ValueKind::Uint16 => Value::Uint16(parse_unsigned(kind, text)?),
        ValueKind::Uint32 => Value::Uint32(parse_unsigned(kind, text)?),
        ValueKind::Uint64 => Value::Uint64(parse_unsigned(kind, text)?),

        ValueKind::Int8 => Value::Int8(parse_signed(kind, text)?),
        ValueKind::Int16 => Value::Int16(parse_signed(kind, text)?),
        ValueKind::Int32 => Value::Int32(parse_signed(kind, text)?),
        ValueKind::Int64 => Value::Int64(parse_signed(kind, text)?),

        ValueKind::Float32 => Value::Float32(decode_float32(text)?),
        ValueKind::Float64 => Value::Float64(decode_float64(text)?),

        ValueKind::BoolArray => Value::BoolArray(parse_json_list(kind, text)?),
        ValueKind::Int8Array => Value::Int8Array(parse_json_list(kind, text)?),
        ValueKind::Int16Array => Value::Int16Array(parse_json_list(kind, text)?),
        ValueKind::Int32Array => Value::Int32Array(parse_json_list(kind, text)?),
        ValueKind::Int64Array => Value::Int64Array(parse_json_list(kind, text)?),
        ValueKind::Float32Array => Value::Float32Array(parse_float32_list(text)?),
        ValueKind::Float64Array => Value::Float64Array(parse_json_list(kind, text)?),

        ValueKind::Uint8Array => Value::Uint8Array(parse_unsigned_list(kind, text)?),
        ValueKind::Uint16Array => Value::Uint16Array(parse_unsigned_list(kind, text)?),
        ValueKind::Uint32Array => Value::Uint32Array(parse_unsigned_list(kind, text)?),
        ValueKind::Uint64Array => Value::Uint64Array(parse_unsigned_list(kind, text)?),

        ValueKind::Binary | ValueKind::Object => return Err(DecodeError::Unsupported(kind)),
    };
    Ok(CommandValue::new(resource, value))
}

/// Canonical boolean spellings.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn malformed(kind: ValueKind, text: &str) -> DecodeError {
    DecodeError::Malformed {
        text: text.into(),
        kind,
    }
}

fn out_of_range(kind: ValueKind, text: &str) -> DecodeError {
    DecodeError::OutOfRange {
        text: text.into(),
        kind,
    }
}

fn parse_signed<T>(kind: ValueKind, text: &str) -> Result<T, DecodeError>
where
    T: FromStr<Err = ParseIntError>,
{
    text.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(kind, text),
        _ => malformed(kind, text),
    })
}

fn parse_unsigned<T>(kind: ValueKind, text: &str) -> Result<T, DecodeError>
where
    T: FromStr<Err = ParseIntError>,
{
    // Unsigned decimal text carries no sign at all.
    if text.starts_with('+') {
        return Err(malformed(kind, text));
    }
    parse_signed(kind, text)
}

fn parse_unsigned_list<T>(kind: ValueKind, text: &str) -> Result<Vec<T>, DecodeError>
where
    T: FromStr<Err = ParseIntError>,
{
    text.trim_matches(|ch: char| ch == '[' || ch == ']')
        .split(',')
        .map(|item| {
            parse_unsigned(kind, item.trim_matches(' ')).map_err(|err| match err {
                DecodeError::OutOfRange { .. } => out_of_range(kind, text),
                _ => malformed(kind, text),
            })
        })
        .collect()
}

/// JSON list text; `null` is an empty list.
fn parse_json_list<T: DeserializeOwned>(kind: ValueKind, text: &str) -> Result<Vec<T>, DecodeError> {
    serde_json::from_str::<Option<Vec<T>>>(text)
        .map(Option::unwrap_or_default)
        .map_err(|_| malformed(kind, text))
}

fn parse_float32_list(text: &str) -> Result<Vec<f32>, DecodeError> {
    let kind = ValueKind::Float32Array;
    let wide: Vec<f64> = parse_json_list(kind, text)?;
    wide.into_iter()
        .map(|value| {
            let narrow = value as f32;
            if narrow.is_infinite() && value.is_finite() {
                Err(out_of_range(kind, text))
            } else {
                Ok(narrow)
            }
        })
        .collect()
}

enum DecimalError {
    Range,
    Syntax,
}

/// Rust float parsing saturates to infinity; only explicit infinity
/// spellings may produce one.
fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text
        .strip_prefix('+')
        .or_else(|| text.strip_prefix('-'))
        .unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Hexadecimal float text such as `0x1.8p-1`. The binary exponent is
/// mandatory.
fn parse_hex_float(text: &str) -> Option<f64> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let body = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))?;
    let (mantissa, exponent) = body.split_once(['p', 'P'])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let mut value = 0.0_f64;
    for ch in whole.chars().chain(fraction.chars()) {
        value = value * 16.0 + f64::from(ch.to_digit(16)?);
    }
    let fraction_bits = i32::try_from(fraction.len()).ok()?.checked_mul(4)?;
    let magnitude = value * 2.0_f64.powi(exponent.checked_sub(fraction_bits)?);
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_decimal<T>(
    text: &str,
    from_hex: fn(f64) -> T,
    is_infinite: fn(&T) -> bool,
) -> Result<T, DecimalError>
where
    T: FromStr,
{
    let value = match text.parse::<T>() {
        Ok(value) => value,
        Err(_) => parse_hex_float(text)
            .map(from_hex)
            .ok_or(DecimalError::Syntax)?,
    };
    if is_infinite(&value) && !is_infinity_literal(text) {
        return Err(DecimalError::Range);
    }
    Ok(value)
}

fn decode_float32(text: &str) -> Result<f32, DecodeError> {
    let kind = ValueKind::Float32;
    match parse_decimal::<f32>(text, |wide| wide as f32, |value| value.is_infinite()) {
        Ok(value) => Ok(value),
        Err(DecimalError::Range) => Err(out_of_range(kind, text)),
        Err(DecimalError::Syntax) => {
            let bytes = decode_be_bytes::<4>(text).ok_or_else(|| malformed(kind, text))?;
            let value = f32::from_be_bytes(bytes);
            if value.is_nan() {
                return Err(DecodeError::NotANumber {
                    text: text.into(),
                    kind,
                });
            }
            Ok(value)
        }
    }
}

fn decode_float64(text: &str) -> Result<f64, DecodeError> {
    let kind = ValueKind::Float64;
    match parse_decimal::<f64>(text, |wide| wide, |value| value.is_infinite()) {
        Ok(value) => Ok(value),
        Err(DecimalError::Range) => Err(out_of_range(kind, text)),
        Err(DecimalError::Syntax) => {
            let bytes = decode_be_bytes::<8>(text).ok_or_else(|| malformed(kind, text))?;
            let value = f64::from_be_bytes(bytes);
            if value.is_nan() {
                return Err(DecodeError::NotANumber {
                    text: text.into(),
                    kind,
                });
            }
            Ok(value)
        }
    }
}

/// Base64 text to the leading `N` bytes of the payload.
fn decode_be_bytes<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = BASE64_STANDARD.decode(text).ok()?;
    bytes.get(..N)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(kind: ValueKind, text: &str) -> Value {
        decode("R", kind, text)
            .unwrap_or_else(|err| panic!("decode {kind} '{text}': {err}"))
            .value
    }

    fn b64(bytes: &[u8]) -> String {
        BASE64_STANDARD.encode(bytes)
    }

    #[test]
    fn canonical_scalars_round_trip() {
        assert_eq!(decoded(ValueKind::Bool, "true"), Value::Bool(true));
        assert_eq!(decoded(ValueKind::Bool, "F"), Value::Bool(false));
        assert_eq!(decoded(ValueKind::String, "any text"), Value::String("any text".into()));
        assert_eq!(decoded(ValueKind::Uint8, "255"), Value::Uint8(255));
        assert_eq!(decoded(ValueKind::Uint16, "65535"), Value::Uint16(65535));
        assert_eq!(decoded(ValueKind::Uint32, "4294967295"), Value::Uint32(u32::MAX));
        assert_eq!(
            decoded(ValueKind::Uint64, "18446744073709551615"),
            Value::Uint64(u64::MAX)
        );
        assert_eq!(decoded(ValueKind::Int8, "-128"), Value::Int8(i8::MIN));
        assert_eq!(decoded(ValueKind::Int16, "+300"), Value::Int16(300));
        assert_eq!(decoded(ValueKind::Int32, "-2147483648"), Value::Int32(i32::MIN));
        assert_eq!(
            decoded(ValueKind::Int64, "9223372036854775807"),
            Value::Int64(i64::MAX)
        );
        assert_eq!(decoded(ValueKind::Float32, "12.5"), Value::Float32(12.5));
        assert_eq!(decoded(ValueKind::Float64, "-1e-3"), Value::Float64(-1e-3));
    }

    #[test]
    fn integers_are_range_checked_per_width() {
        for (kind, text) in [
            (ValueKind::Uint8, "256"),
            (ValueKind::Uint16, "65536"),
            (ValueKind::Uint32, "4294967296"),
            (ValueKind::Uint64, "18446744073709551616"),
            (ValueKind::Int8, "128"),
            (ValueKind::Int16, "-32769"),
            (ValueKind::Int32, "2147483648"),
            (ValueKind::Int64, "-9223372036854775809"),
        ] {
            let err = decode("R", kind, text).expect_err("out of range");
            assert!(matches!(err, DecodeError::OutOfRange { .. }), "{kind} {text}: {err}");
        }
    }

    #[test]
    fn malformed_scalars_fail() {
        for (kind, text) in [
            (ValueKind::Bool, "yes"),
            (ValueKind::Uint8, "-1"),
            (ValueKind::Uint8, "+1"),
            (ValueKind::Uint16, "1.5"),
            (ValueKind::Int32, ""),
            (ValueKind::Int64, "12abc"),
        ] {
            let err = decode("R", kind, text).expect_err("malformed");
            assert!(matches!(err, DecodeError::Malformed { .. }), "{kind} {text}: {err}");
        }
    }

    #[test]
    fn float_overflow_fails_without_fallback() {
        let err = decode("R", ValueKind::Float32, "3.5e38").expect_err("f32 overflow");
        assert!(matches!(err, DecodeError::OutOfRange { .. }));
        let err = decode("R", ValueKind::Float64, "1e400").expect_err("f64 overflow");
        assert!(matches!(err, DecodeError::OutOfRange { .. }));
        assert_eq!(
            decoded(ValueKind::Float64, "-inf"),
            Value::Float64(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn float_binary_fallback_reads_big_endian_bytes() {
        let text = b64(&1.5_f32.to_be_bytes());
        assert_eq!(decoded(ValueKind::Float32, &text), Value::Float32(1.5));

        let text = b64(&(-273.15_f64).to_be_bytes());
        assert_eq!(decoded(ValueKind::Float64, &text), Value::Float64(-273.15));
    }

    #[test]
    fn float_binary_fallback_rejects_nan() {
        let text = b64(&f32::NAN.to_be_bytes());
        let err = decode("R", ValueKind::Float32, &text).expect_err("nan f32");
        assert!(matches!(err, DecodeError::NotANumber { .. }));

        let text = b64(&f64::NAN.to_be_bytes());
        let err = decode("R", ValueKind::Float64, &text).expect_err("nan f64");
        assert!(matches!(err, DecodeError::NotANumber { .. }));
    }

    #[test]
    fn float_fallback_failure_reports_decimal_error() {
        // Valid base64 but too short for a float64.
        let text = b64(&[1, 2, 3]);
        let err = decode("R", ValueKind::Float64, &text).expect_err("short payload");
        assert_eq!(
            err,
            DecodeError::Malformed {
                text: text.as_str().into(),
                kind: ValueKind::Float64
            }
        );
        let err = decode("R", ValueKind::Float32, "not-a-number!").expect_err("garbage");
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn unsigned_arrays_use_comma_lists() {
        assert_eq!(
            decoded(ValueKind::Uint8Array, "[1, 2, 3]"),
            Value::Uint8Array(vec![1, 2, 3])
        );
        assert_eq!(
            decoded(ValueKind::Uint32Array, "7,8"),
            Value::Uint32Array(vec![7, 8])
        );
        let err = decode("R", ValueKind::Uint8Array, "[1, 256, 3]").expect_err("element range");
        assert!(matches!(err, DecodeError::OutOfRange { .. }));
        assert!(decode("R", ValueKind::Uint16Array, "[1, x]").is_err());
    }

    #[test]
    fn structured_arrays_use_json_lists() {
        assert_eq!(
            decoded(ValueKind::BoolArray, "[true, false]"),
            Value::BoolArray(vec![true, false])
        );
        assert_eq!(
            decoded(ValueKind::Int16Array, "[-1, 2]"),
            Value::Int16Array(vec![-1, 2])
        );
        assert_eq!(
            decoded(ValueKind::Float64Array, "[1.25, -2]"),
            Value::Float64Array(vec![1.25, -2.0])
        );
        assert_eq!(
            decoded(ValueKind::Float32Array, "[0.5]"),
            Value::Float32Array(vec![0.5])
        );
        assert!(decode("R", ValueKind::Int8Array, "[1, 128]").is_err());
        assert!(decode("R", ValueKind::Float32Array, "[1e39]").is_err());
        assert!(decode("R", ValueKind::BoolArray, "true, false").is_err());
    }

    #[test]
    fn null_json_list_is_empty() {
        assert_eq!(decoded(ValueKind::Int8Array, "null"), Value::Int8Array(Vec::new()));
        assert_eq!(
            decoded(ValueKind::Float32Array, "null"),
            Value::Float32Array(Vec::new())
        );
        assert!(decode("R", ValueKind::Uint8Array, "null").is_err());
    }

    #[test]
    fn float_kinds_accept_hex_notation() {
        assert_eq!(decoded(ValueKind::Float64, "0x1p4"), Value::Float64(16.0));
        assert_eq!(decoded(ValueKind::Float64, "-0x1.8p-1"), Value::Float64(-0.75));
        assert_eq!(decoded(ValueKind::Float32, "0X.4P2"), Value::Float32(1.0));
        assert!(matches!(
            decode("R", ValueKind::Float32, "0x1p200"),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert!(decode("R", ValueKind::Float64, "0x10").is_err());
        assert!(decode("R", ValueKind::Float64, "0xp1").is_err());
    }

    #[test]
    fn binary_and_object_are_not_decodable() {
        assert_eq!(
            decode("R", ValueKind::Binary, "AAEC").expect_err("binary"),
            DecodeError::Unsupported(ValueKind::Binary)
        );
        assert!(decode("R", ValueKind::Object, "{}").is_err());
    }

    #[test]
    fn decoded_value_carries_resource_and_kind() {
        let value = decode("SwitchState", ValueKind::Bool, "1").expect("decode bool");
        assert_eq!(value.resource_name, "SwitchState");
        assert_eq!(value.kind(), ValueKind::Bool);
    }
}
