//! Struct and enum value payloads.

use super::Value;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// The payload of a `Struct` value: a named record with ordered fields.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    type_name: String,
    fields: FxIndexMap<String, Value>,
}

impl StructValue {
    /// Create an empty instance of the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        StructValue {
            type_name: type_name.into(),
            fields: FxIndexMap::default(),
        }
    }

    /// The runtime type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Whether the field is set.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Get a field's value.
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of set fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The payload of an `Enum` value: a typed ordinal.
///
/// Under the legacy-enum flag the planner never produces these; enum
/// constants and fields surface as plain `Int`s instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub ordinal: i64,
}

impl EnumValue {
    /// Create an enum value.
    pub fn new(type_name: impl Into<String>, ordinal: i64) -> Self {
        EnumValue {
            type_name: type_name.into(),
            ordinal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn struct_fields() {
        let mut s = StructValue::new("pkg.Point");
        s.set("x", Value::Int(1));
        s.set("y", Value::Int(2));
        assert_eq!(s.type_name(), "pkg.Point");
        assert!(s.has_field("x"));
        assert!(!s.has_field("z"));
        assert_eq!(s.field("y"), Some(&Value::Int(2)));
        let names: Vec<_> = s.field_names().collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}
