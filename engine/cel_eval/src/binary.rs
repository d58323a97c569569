//! Binary operator evaluation.
//!
//! Direct enum-based dispatch: the operator and type sets are fixed, so
//! pattern matching is preferred over trait objects for exhaustiveness
//! checking. All integer arithmetic is checked; relational operators
//! observe CEL's cross-type numeric ordering with NaN comparing false.

use crate::errors::{divide_by_zero, modulo_by_zero, no_matching_overload, overflow};
use crate::value::{MapKey, Value};
use cel_ir::{BinaryOp, ExprId};
use std::cmp::Ordering;

/// Outcome of an ordering comparison between two values.
enum Comparison {
    Ordered(Ordering),
    /// At least one NaN: every relation is false.
    Unordered,
    /// The tags have no defined ordering: a type error.
    Incompatible,
}

/// Evaluate a binary operation over two concrete values.
///
/// Callers have already filtered error and unknown operands.
pub(crate) fn evaluate_binary(id: ExprId, op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(left.equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.equals(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            match compare_values(left, right) {
                Comparison::Ordered(ordering) => Value::Bool(match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::LtEq => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }),
                Comparison::Unordered => Value::Bool(false),
                Comparison::Incompatible => mismatch(id, op, left, right),
            }
        }
        BinaryOp::Add => eval_add(id, left, right),
        BinaryOp::Sub => eval_sub(id, left, right),
        BinaryOp::Mul => eval_mul(id, left, right),
        BinaryOp::Div => eval_div(id, left, right),
        BinaryOp::Mod => eval_mod(id, left, right),
        BinaryOp::In => eval_in(id, left, right),
    }
}

fn mismatch(id: ExprId, op: BinaryOp, left: &Value, right: &Value) -> Value {
    no_matching_overload(
        op.as_symbol(),
        &[&left.runtime_type_name(), &right.runtime_type_name()],
        id,
    )
}

/// Cross-type numeric (and string/bytes/bool) ordering.
fn compare_values(left: &Value, right: &Value) -> Comparison {
    let from_partial = |ordering: Option<Ordering>| match ordering {
        Some(o) => Comparison::Ordered(o),
        None => Comparison::Unordered,
    };
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Comparison::Ordered(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Comparison::Ordered(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => from_partial(a.partial_cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Comparison::Ordered(cmp_int_uint(*a, *b)),
        (Value::Uint(a), Value::Int(b)) => Comparison::Ordered(cmp_int_uint(*b, *a).reverse()),
        (Value::Int(a), Value::Double(b)) => from_partial((*a as f64).partial_cmp(b)),
        (Value::Double(a), Value::Int(b)) => from_partial(a.partial_cmp(&(*b as f64))),
        (Value::Uint(a), Value::Double(b)) => from_partial((*a as f64).partial_cmp(b)),
        (Value::Double(a), Value::Uint(b)) => from_partial(a.partial_cmp(&(*b as f64))),
        (Value::String(a), Value::String(b)) => Comparison::Ordered(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Comparison::Ordered(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Comparison::Ordered(a.cmp(b)),
        _ => Comparison::Incompatible,
    }
}

fn cmp_int_uint(i: i64, u: u64) -> Ordering {
    match u64::try_from(i) {
        Ok(iu) => iu.cmp(&u),
        Err(_) => Ordering::Less,
    }
}

fn eval_add(id: ExprId, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
            Some(v) => Value::Int(v),
            None => overflow("addition", id),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_add(*b) {
            Some(v) => Value::Uint(v),
            None => overflow("addition", id),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (Value::String(a), Value::String(b)) => {
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(b);
            Value::string(out)
        }
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            Value::bytes(out)
        }
        (Value::List(a), Value::List(b)) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend(a.iter().cloned());
            out.extend(b.iter().cloned());
            Value::list(out)
        }
        _ => mismatch(id, BinaryOp::Add, left, right),
    }
}

fn eval_sub(id: ExprId, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match a.checked_sub(*b) {
            Some(v) => Value::Int(v),
            None => overflow("subtraction", id),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_sub(*b) {
            Some(v) => Value::Uint(v),
            None => overflow("subtraction", id),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
        _ => mismatch(id, BinaryOp::Sub, left, right),
    }
}

fn eval_mul(id: ExprId, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match a.checked_mul(*b) {
            Some(v) => Value::Int(v),
            None => overflow("multiplication", id),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_mul(*b) {
            Some(v) => Value::Uint(v),
            None => overflow("multiplication", id),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
        _ => mismatch(id, BinaryOp::Mul, left, right),
    }
}

fn eval_div(id: ExprId, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                divide_by_zero(id)
            } else {
                match a.checked_div(*b) {
                    Some(v) => Value::Int(v),
                    None => overflow("division", id),
                }
            }
        }
        (Value::Uint(a), Value::Uint(b)) => {
            if *b == 0 {
                divide_by_zero(id)
            } else {
                Value::Uint(a / b)
            }
        }
        // IEEE-754 division: x/0.0 is ±inf or NaN, never an error.
        (Value::Double(a), Value::Double(b)) => Value::Double(a / b),
        _ => mismatch(id, BinaryOp::Div, left, right),
    }
}

fn eval_mod(id: ExprId, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                modulo_by_zero(id)
            } else {
                match a.checked_rem(*b) {
                    Some(v) => Value::Int(v),
                    None => overflow("remainder", id),
                }
            }
        }
        (Value::Uint(a), Value::Uint(b)) => {
            if *b == 0 {
                modulo_by_zero(id)
            } else {
                Value::Uint(a % b)
            }
        }
        _ => mismatch(id, BinaryOp::Mod, left, right),
    }
}

fn eval_in(id: ExprId, left: &Value, right: &Value) -> Value {
    match right {
        Value::List(items) => Value::Bool(items.iter().any(|item| item.equals(left))),
        Value::Map(m) => {
            let present = MapKey::for_lookup(left).is_some_and(|key| m.contains(&key));
            Value::Bool(present)
        }
        _ => mismatch(id, BinaryOp::In, left, right),
    }
}
