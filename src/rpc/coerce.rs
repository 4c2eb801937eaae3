//! Conversion of loosely typed JSON parameters into method arguments
//!
//! JSON numbers always decode as floats first; integer targets take the truncated
//! value. No other cross-kind conversion is attempted.

use serde_json::Value;

use crate::errors::CoercionError;
use crate::rpc::types::{Argument, FloatKind, IntKind, TypeDescriptor};

/// Splits the raw `params` member into positional values. `null` means no parameters.
pub fn decode_params(raw: Value) -> Result<Vec<Value>, CoercionError> {
    match raw {
        Value::Array(values) => Ok(values),
        Value::Null => Ok(Vec::new()),
        _ => Err(CoercionError::MalformedParams),
    }
}

/// Coerces every value to its declared target, stopping at the first mismatch.
pub fn coerce_params(
    values: &[Value],
    targets: &[TypeDescriptor],
) -> Result<Vec<Argument>, CoercionError> {
    if values.len() != targets.len() {
        return Err(CoercionError::WrongParamCount {
            expected: targets.len(),
            actual: values.len(),
        });
    }

    values
        .iter()
        .zip(targets)
        .enumerate()
        .map(|(index, (value, target))| coerce_value(value, target, index + 1))
        .collect()
}

/// Coerces one value. `position` is 1-indexed and only used for the error.
pub fn coerce_value(
    value: &Value,
    target: &TypeDescriptor,
    position: usize,
) -> Result<Argument, CoercionError> {
    let mismatch = CoercionError::TypeMismatch { position };

    if let TypeDescriptor::Object(object) = target {
        // serde struct visitors also accept sequences; only objects map to fields.
        if !value.is_object() {
            return Err(mismatch);
        }
        return (object.decode)(value)
            .map(Argument::Object)
            .map_err(|_| mismatch);
    }

    match (value, target) {
        (Value::String(text), TypeDescriptor::String) => Ok(Argument::Str(text.clone())),
        (Value::Bool(flag), TypeDescriptor::Bool) => Ok(Argument::Bool(*flag)),
        (Value::Number(number), TypeDescriptor::Float(kind)) => {
            let float = number.as_f64().ok_or(mismatch.clone())?;
            if *kind == FloatKind::F32 && float.abs() > f64::from(f32::MAX) {
                return Err(mismatch);
            }
            Ok(Argument::Float(float))
        }
        (Value::Number(number), TypeDescriptor::Integer(kind)) => {
            let float = number.as_f64().ok_or(mismatch.clone())?;
            truncate_to_integer(float, *kind).ok_or(mismatch)
        }
        _ => Err(mismatch),
    }
}

fn truncate_to_integer(value: f64, kind: IntKind) -> Option<Argument> {
    let truncated = value.trunc();
    let (min, max) = kind.bounds();
    // `max` rounds up to a power of two for the 64-bit kinds, hence the strict bound.
    let in_range = truncated >= min && (truncated < max || (truncated == max && max < 1e18));
    if !in_range {
        return None;
    }

    if kind.is_signed() {
        Some(Argument::Int(truncated as i64))
    } else {
        Some(Argument::Uint(truncated as u64))
    }
}
