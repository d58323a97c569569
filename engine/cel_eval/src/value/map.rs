//! Map values and map keys.
//!
//! CEL maps are keyed by values, but only the hashable tags (`bool`,
//! `int`, `uint`, `string`) may be keys. Numerically equal `int`/`uint`
//! keys must collide, so `uint` keys that fit in `i64` normalize to `int`
//! keys at construction. Iteration order is insertion order, the order
//! the map "reports", which comprehensions observe.

use super::{Heap, Value};
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// A hashable map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Heap<String>),
}

impl MapKey {
    /// String key.
    pub fn string(s: impl Into<String>) -> MapKey {
        MapKey::String(Heap::new(s.into()))
    }

    /// Convert a value into a key for map construction.
    ///
    /// Returns `None` for non-hashable tags; `double` is not a key type.
    /// `Uint` keys in `i64` range normalize to `Int` so numerically equal
    /// keys collide.
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::Uint(u) => match i64::try_from(*u) {
                Ok(i) => Some(MapKey::Int(i)),
                Err(_) => Some(MapKey::Uint(*u)),
            },
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    /// Convert a value into a key for lookup.
    ///
    /// Accepts everything `from_value` does, plus finite integral doubles
    /// (numeric key equality); anything else cannot match a stored key.
    pub fn for_lookup(value: &Value) -> Option<MapKey> {
        match value {
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                if *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    Some(MapKey::Int(*d as i64))
                } else {
                    None
                }
            }
            other => MapKey::from_value(other),
        }
    }

    /// The key as a value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::Uint(u) => Value::Uint(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::Int(i) => write!(f, "{i}"),
            MapKey::Uint(u) => write!(f, "{u}u"),
            MapKey::String(s) => write!(f, "'{s}'"),
        }
    }
}

/// The payload of a `Map` value.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct MapValue {
    entries: FxIndexMap<MapKey, Value>,
}

impl MapValue {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        MapValue {
            entries: FxIndexMap::with_capacity_and_hasher(capacity, BuildHasherDefault::default()),
        }
    }

    /// Insert an entry, returning the previous value for the key if any.
    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Whether the map contains the key.
    pub fn contains(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the value for a key.
    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }
}
