//! Centralized error-value constructors.
//!
//! One function per error shape, returning the finished `Value::Error`.
//! Keeping construction here keeps messages consistent across the
//! attribute, operator, and conversion layers, and leaves one place to
//! touch if the wording ever changes.

use crate::value::{ErrorKind, ErrorValue, Value};
use cel_ir::ExprId;
use std::fmt::Display;

fn err(kind: ErrorKind, message: String, id: ExprId) -> Value {
    Value::error(ErrorValue::new(kind, message, id))
}

// Resolution Errors

pub fn undeclared_variable(name: &str, id: ExprId) -> Value {
    err(
        ErrorKind::UndeclaredVariable,
        format!("undeclared reference to '{name}'"),
        id,
    )
}

pub fn no_such_attribute(id: ExprId) -> Value {
    err(
        ErrorKind::Generic,
        "no candidate attributes to resolve".to_string(),
        id,
    )
}

// Member Access Errors

pub fn no_such_field(field: &str, id: ExprId) -> Value {
    err(ErrorKind::NoSuchField, format!("no such field: '{field}'"), id)
}

pub fn no_such_key(key: impl Display, id: ExprId) -> Value {
    err(ErrorKind::NoSuchKey, format!("no such key: {key}"), id)
}

pub fn field_selection_unsupported(type_name: &str, id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("type '{type_name}' does not support field selection"),
        id,
    )
}

// Indexing Errors

pub fn not_indexable(type_name: &str, id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("type '{type_name}' does not support indexing"),
        id,
    )
}

pub fn invalid_index(type_name: &str, id: ExprId) -> Value {
    err(
        ErrorKind::InvalidArgument,
        format!("invalid index type '{type_name}'"),
        id,
    )
}

pub fn index_out_of_range(index: impl Display, len: usize, id: ExprId) -> Value {
    err(
        ErrorKind::InvalidArgument,
        format!("index out of range: {index} vs size {len}"),
        id,
    )
}

// Type Errors

pub fn type_mismatch(expected: &str, got: &str, id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("expected {expected}, got '{got}'"),
        id,
    )
}

pub fn no_matching_overload(op: &str, operands: &[&str], id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("no matching overload for '{op}' applied to ({})", operands.join(", ")),
        id,
    )
}

pub fn invalid_conversion(from: &str, to: &str, id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("type conversion error from '{from}' to '{to}'"),
        id,
    )
}

pub fn conversion_parse_error(target: &str, text: &str, id: ExprId) -> Value {
    err(
        ErrorKind::InvalidArgument,
        format!("cannot parse '{text}' as {target}"),
        id,
    )
}

// Arithmetic Errors

pub fn overflow(operation: &str, id: ExprId) -> Value {
    err(ErrorKind::Overflow, format!("integer overflow in {operation}"), id)
}

pub fn divide_by_zero(id: ExprId) -> Value {
    err(ErrorKind::DivideByZero, "divide by zero".to_string(), id)
}

pub fn modulo_by_zero(id: ExprId) -> Value {
    err(ErrorKind::DivideByZero, "modulus by zero".to_string(), id)
}

// Aggregate Construction Errors

pub fn invalid_map_key(type_name: &str, id: ExprId) -> Value {
    err(
        ErrorKind::InvalidArgument,
        format!("type '{type_name}' is not a valid map key type"),
        id,
    )
}

pub fn duplicate_map_key(key: impl Display, id: ExprId) -> Value {
    err(
        ErrorKind::InvalidArgument,
        format!("duplicate map key: {key}"),
        id,
    )
}

pub fn expected_optional(got: &str, id: ExprId) -> Value {
    err(
        ErrorKind::TypeMismatch,
        format!("expected an optional at an optional entry, got '{got}'"),
        id,
    )
}

pub fn unknown_type(name: &str, id: ExprId) -> Value {
    err(ErrorKind::InvalidArgument, format!("unknown type '{name}'"), id)
}

// Dispatch Errors

pub fn unknown_overload(function: &str, id: ExprId) -> Value {
    err(
        ErrorKind::UnknownOverload,
        format!("no overload registered for function '{function}'"),
        id,
    )
}

// Miscellaneous

pub fn invalid_argument(message: impl Into<String>, id: ExprId) -> Value {
    err(ErrorKind::InvalidArgument, message.into(), id)
}

pub fn generic_error(message: impl Into<String>, id: ExprId) -> Value {
    err(ErrorKind::Generic, message.into(), id)
}
