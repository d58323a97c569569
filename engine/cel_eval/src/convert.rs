//! Type-conversion intrinsics.
//!
//! `int`, `uint`, `double`, `string`, `bytes`, `bool`, `type`, and `dyn`
//! are emitted as dedicated conversion nodes rather than calls. Dispatch
//! is an exhaustive (source tag, target) table; `type(x)` reflects the
//! runtime type and `dyn(x)` is the identity.

use crate::errors::{conversion_parse_error, invalid_conversion, overflow};
use crate::provider::TypeProvider;
use crate::value::Value;
use cel_ir::ExprId;

/// Target of a conversion intrinsic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConversionTarget {
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Bool,
    Type,
    Dyn,
}

impl ConversionTarget {
    /// Map an intrinsic function name to its target.
    pub fn from_function(function: &str) -> Option<ConversionTarget> {
        match function {
            "int" => Some(ConversionTarget::Int),
            "uint" => Some(ConversionTarget::Uint),
            "double" => Some(ConversionTarget::Double),
            "string" => Some(ConversionTarget::String),
            "bytes" => Some(ConversionTarget::Bytes),
            "bool" => Some(ConversionTarget::Bool),
            "type" => Some(ConversionTarget::Type),
            "dyn" => Some(ConversionTarget::Dyn),
            _ => None,
        }
    }

    /// The target's name, as written in source.
    pub const fn name(self) -> &'static str {
        match self {
            ConversionTarget::Int => "int",
            ConversionTarget::Uint => "uint",
            ConversionTarget::Double => "double",
            ConversionTarget::String => "string",
            ConversionTarget::Bytes => "bytes",
            ConversionTarget::Bool => "bool",
            ConversionTarget::Type => "type",
            ConversionTarget::Dyn => "dyn",
        }
    }

    /// Whether a constant already carrying the target tag makes the
    /// conversion a no-op. `type` is never a no-op (it reflects), and
    /// `dyn` is always one.
    pub fn is_noop_for(self, value: &Value) -> bool {
        match self {
            ConversionTarget::Int => matches!(value, Value::Int(_)),
            ConversionTarget::Uint => matches!(value, Value::Uint(_)),
            ConversionTarget::Double => matches!(value, Value::Double(_)),
            ConversionTarget::String => matches!(value, Value::String(_)),
            ConversionTarget::Bytes => matches!(value, Value::Bytes(_)),
            ConversionTarget::Bool => matches!(value, Value::Bool(_)),
            ConversionTarget::Type | ConversionTarget::Dyn => false,
        }
    }
}

/// Apply a conversion to a concrete value.
///
/// Callers have already filtered error and unknown operands.
pub(crate) fn evaluate_conversion(
    id: ExprId,
    target: ConversionTarget,
    value: Value,
    provider: &dyn TypeProvider,
) -> Value {
    match target {
        ConversionTarget::Dyn => value,
        ConversionTarget::Type => type_of(value, provider),
        ConversionTarget::Int => to_int(id, value),
        ConversionTarget::Uint => to_uint(id, value),
        ConversionTarget::Double => to_double(id, value),
        ConversionTarget::String => to_string(id, value),
        ConversionTarget::Bytes => to_bytes(id, value),
        ConversionTarget::Bool => to_bool(id, value),
    }
}

/// `type(x)`: reflect the runtime type as a value.
///
/// Struct type names pass through the provider so that reflection reports
/// the registered canonical name.
fn type_of(value: Value, provider: &dyn TypeProvider) -> Value {
    if let Value::Struct(s) = &value {
        if let Some(descriptor) = provider.find_struct_type(s.type_name()) {
            return Value::type_value(descriptor.name);
        }
    }
    Value::type_value(value.runtime_type_name().into_owned())
}

fn cannot(id: ExprId, value: &Value, target: ConversionTarget) -> Value {
    invalid_conversion(&value.runtime_type_name(), target.name(), id)
}

fn to_int(id: ExprId, value: Value) -> Value {
    match &value {
        Value::Int(_) => value,
        Value::Uint(u) => match i64::try_from(*u) {
            Ok(i) => Value::Int(i),
            Err(_) => overflow("uint-to-int conversion", id),
        },
        Value::Double(d) => double_to_integral(id, *d, i64::MIN as f64, i64::MAX as f64)
            .map_or_else(|e| e, |d| Value::Int(d as i64)),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => conversion_parse_error("int", s, id),
        },
        Value::Enum(e) => Value::Int(e.ordinal),
        _ => cannot(id, &value, ConversionTarget::Int),
    }
}

fn to_uint(id: ExprId, value: Value) -> Value {
    match &value {
        Value::Uint(_) => value,
        Value::Int(i) => match u64::try_from(*i) {
            Ok(u) => Value::Uint(u),
            Err(_) => overflow("int-to-uint conversion", id),
        },
        Value::Double(d) => double_to_integral(id, *d, 0.0, u64::MAX as f64)
            .map_or_else(|e| e, |d| Value::Uint(d as u64)),
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(u) => Value::Uint(u),
            Err(_) => conversion_parse_error("uint", s, id),
        },
        _ => cannot(id, &value, ConversionTarget::Uint),
    }
}

/// Range-check a double before truncating toward zero.
fn double_to_integral(id: ExprId, d: f64, min: f64, max: f64) -> Result<f64, Value> {
    if !d.is_finite() {
        return Err(overflow("double-to-integer conversion", id));
    }
    let truncated = d.trunc();
    if truncated < min || truncated > max {
        return Err(overflow("double-to-integer conversion", id));
    }
    Ok(truncated)
}

fn to_double(id: ExprId, value: Value) -> Value {
    match &value {
        Value::Double(_) => value,
        Value::Int(i) => Value::Double(*i as f64),
        Value::Uint(u) => Value::Double(*u as f64),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(d) => Value::Double(d),
            Err(_) => conversion_parse_error("double", s, id),
        },
        _ => cannot(id, &value, ConversionTarget::Double),
    }
}

fn to_string(id: ExprId, value: Value) -> Value {
    match &value {
        Value::String(_) => value,
        Value::Int(i) => Value::string(i.to_string()),
        Value::Uint(u) => Value::string(u.to_string()),
        Value::Double(d) => Value::string(d.to_string()),
        Value::Bool(b) => Value::string(b.to_string()),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::string(s.to_string()),
            Err(_) => conversion_parse_error("string", "<invalid utf-8 bytes>", id),
        },
        _ => cannot(id, &value, ConversionTarget::String),
    }
}

fn to_bytes(id: ExprId, value: Value) -> Value {
    match &value {
        Value::Bytes(_) => value,
        Value::String(s) => Value::bytes(s.as_bytes().to_vec()),
        _ => cannot(id, &value, ConversionTarget::Bytes),
    }
}

fn to_bool(id: ExprId, value: Value) -> Value {
    match &value {
        Value::Bool(_) => value,
        Value::String(s) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => conversion_parse_error("bool", s, id),
        },
        _ => cannot(id, &value, ConversionTarget::Bool),
    }
}
