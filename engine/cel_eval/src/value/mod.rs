//! Runtime values for the CEL evaluator.
//!
//! `Value` is a tagged sum; every operation in the engine is an exhaustive
//! match over its tags. Heap payloads go through the `Heap<T>` wrapper,
//! whose constructor is private to this module, so external code builds heap
//! values through the factory methods on `Value`, so sharing semantics
//! cannot be bypassed.
//!
//! Errors and unknowns are ordinary values: they absorb any operation that
//! consumes them, and the evaluator checks for them before every use.

mod composite;
mod error_value;
mod heap;
mod map;
mod unknown;

use std::borrow::Cow;
use std::fmt;

pub use composite::{EnumValue, StructValue};
pub use error_value::{ErrorKind, ErrorValue};
pub use heap::Heap;
pub use map::{MapKey, MapValue};
pub use unknown::UnknownSet;

/// Runtime value in the CEL evaluator.
#[derive(Clone, PartialEq)]
pub enum Value {
    // Primitives (inline, no heap allocation)
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    /// The `null` value (distinct from an absent optional).
    Null,

    // Heap payloads (shared on clone)
    String(Heap<String>),
    Bytes(Heap<Vec<u8>>),
    List(Heap<Vec<Value>>),
    Map(Heap<MapValue>),
    Struct(Heap<StructValue>),
    Enum(Heap<EnumValue>),
    /// A first-class type reference, by runtime type name.
    Type(Heap<String>),

    // Optionals
    /// A present optional: `optional.of(v)`.
    Some(Heap<Value>),
    /// The absent optional: `optional.none()`.
    None,

    // Absorbing sentinels
    Error(Heap<ErrorValue>),
    Unknown(Heap<UnknownSet>),
}

impl Value {
    /// String value.
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Heap::new(s.into()))
    }

    /// Bytes value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Value {
        Value::Bytes(Heap::new(b.into()))
    }

    /// List value.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Heap::new(items))
    }

    /// Map value.
    pub fn map(map: MapValue) -> Value {
        Value::Map(Heap::new(map))
    }

    /// Struct value.
    pub fn struct_value(s: StructValue) -> Value {
        Value::Struct(Heap::new(s))
    }

    /// Enum value.
    pub fn enum_value(type_name: impl Into<String>, ordinal: i64) -> Value {
        Value::Enum(Heap::new(EnumValue::new(type_name, ordinal)))
    }

    /// Type value.
    pub fn type_value(name: impl Into<String>) -> Value {
        Value::Type(Heap::new(name.into()))
    }

    /// Present optional. `some(none)` collapses to `none`.
    pub fn some(value: Value) -> Value {
        match value {
            Value::None => Value::None,
            other => Value::Some(Heap::new(other)),
        }
    }

    /// Error value.
    pub fn error(error: ErrorValue) -> Value {
        Value::Error(Heap::new(error))
    }

    /// Unknown value.
    pub fn unknown(set: UnknownSet) -> Value {
        Value::Unknown(Heap::new(set))
    }

    /// Whether this is an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Whether this is an unknown.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    /// Whether this value absorbs any operation consuming it.
    #[inline]
    pub fn is_error_or_unknown(&self) -> bool {
        matches!(self, Value::Error(_) | Value::Unknown(_))
    }

    /// The runtime type name, as reported by `type(x)` and used in error
    /// messages.
    pub fn runtime_type_name(&self) -> Cow<'static, str> {
        match self {
            Value::Bool(_) => Cow::Borrowed("bool"),
            Value::Int(_) => Cow::Borrowed("int"),
            Value::Uint(_) => Cow::Borrowed("uint"),
            Value::Double(_) => Cow::Borrowed("double"),
            Value::Null => Cow::Borrowed("null_type"),
            Value::String(_) => Cow::Borrowed("string"),
            Value::Bytes(_) => Cow::Borrowed("bytes"),
            Value::List(_) => Cow::Borrowed("list"),
            Value::Map(_) => Cow::Borrowed("map"),
            Value::Struct(s) => Cow::Owned(s.type_name().to_string()),
            Value::Enum(e) => Cow::Owned(e.type_name.clone()),
            Value::Type(_) => Cow::Borrowed("type"),
            Value::Some(_) | Value::None => Cow::Borrowed("optional_type"),
            Value::Error(_) => Cow::Borrowed("error"),
            Value::Unknown(_) => Cow::Borrowed("unknown"),
        }
    }

    /// Deep CEL equality.
    ///
    /// Numerically equal `int`/`uint`/`double` values are equal across
    /// tags; `NaN` equals nothing, itself included. Mismatched tags are
    /// unequal, never an error. Optionals compare inner values.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::None, Value::None) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Int(_) | Value::Uint(_) | Value::Double(_), _)
                if numeric_pair(self, other) =>
            {
                numeric_equals(self, other)
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other_v| v.equals(other_v)))
            }
            (Value::Struct(a), Value::Struct(b)) => {
                a.type_name() == b.type_name()
                    && a.len() == b.len()
                    && a.field_names()
                        .all(|name| match (a.field(name), b.field(name)) {
                            (Option::Some(x), Option::Some(y)) => x.equals(y),
                            _ => false,
                        })
            }
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Some(a), Value::Some(b)) => a.equals(b),
            _ => false,
        }
    }
}

/// Whether both sides carry numeric tags.
fn numeric_pair(l: &Value, r: &Value) -> bool {
    matches!(l, Value::Int(_) | Value::Uint(_) | Value::Double(_))
        && matches!(r, Value::Int(_) | Value::Uint(_) | Value::Double(_))
}

/// Cross-tag numeric equality. Callers guarantee both tags are numeric.
fn numeric_equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Uint(a), Value::Uint(b)) => a == b,
        (Value::Double(a), Value::Double(b)) => a == b,
        (Value::Int(a), Value::Uint(b)) | (Value::Uint(b), Value::Int(a)) => {
            u64::try_from(*a).is_ok_and(|a| a == *b)
        }
        (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
            (*a as f64) == *b
        }
        (Value::Uint(a), Value::Double(b)) | (Value::Double(b), Value::Uint(a)) => {
            (*a as f64) == *b
        }
        _ => false,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Uint(u) => write!(f, "Uint({u})"),
            Value::Double(d) => write!(f, "Double({d})"),
            Value::Null => write!(f, "Null"),
            Value::String(s) => write!(f, "String({:?})", &**s),
            Value::Bytes(b) => write!(f, "Bytes({:?})", &**b),
            Value::List(items) => write!(f, "List({:?})", &**items),
            Value::Map(m) => {
                write!(f, "Map{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v:?}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => write!(f, "Struct({:?})", &**s),
            Value::Enum(e) => write!(f, "Enum({}, {})", e.type_name, e.ordinal),
            Value::Type(t) => write!(f, "Type({})", &**t),
            Value::Some(v) => write!(f, "Some({:?})", &**v),
            Value::None => write!(f, "None"),
            Value::Error(e) => write!(f, "Error({:?}: {})", e.kind, e.message),
            Value::Unknown(u) => write!(f, "Unknown({:?})", u.ids()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}u"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => {
                write!(f, "b'")?;
                for byte in b.iter() {
                    write!(f, "\\x{byte:02x}")?;
                }
                write!(f, "'")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => {
                write!(f, "{}{{", s.type_name())?;
                for (i, name) in s.field_names().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match s.field(name) {
                        Option::Some(v) => write!(f, "{name}: {v}")?,
                        Option::None => write!(f, "{name}: <unset>")?,
                    }
                }
                write!(f, "}}")
            }
            Value::Enum(e) => write!(f, "{}({})", e.type_name, e.ordinal),
            Value::Type(t) => write!(f, "{}", &**t),
            Value::Some(v) => write!(f, "optional.of({v})"),
            Value::None => write!(f, "optional.none()"),
            Value::Error(e) => write!(f, "error: {}", e.message),
            Value::Unknown(u) => write!(f, "unknown{:?}", u.ids()),
        }
    }
}
