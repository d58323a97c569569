//! Type reflection.
//!
//! The planner and the struct-creation node reach struct/enum metadata
//! through `TypeProvider`; `TypeRegistry` is the stock implementation used
//! when no external reflection backend is wired in.

use crate::errors::{no_such_field, unknown_type};
use crate::value::{MapValue, StructValue, Value};
use cel_ir::{CelType, ExprId};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// A resolved struct type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructType {
    /// Fully-qualified type name.
    pub name: String,
}

/// A resolved enum type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    /// Fully-qualified type name.
    pub name: String,
}

/// Reflection over struct and enum types.
pub trait TypeProvider: Send + Sync {
    /// Resolve a fully-qualified struct type name.
    fn find_struct_type(&self, name: &str) -> Option<StructType>;

    /// The declared type of a struct field.
    fn find_struct_field_type(&self, type_name: &str, field: &str) -> Option<CelType>;

    /// The declared field names of a struct type, in declaration order.
    fn struct_field_names(&self, type_name: &str) -> Vec<String>;

    /// Resolve a fully-qualified enum type name.
    fn find_enum_type(&self, name: &str) -> Option<EnumType>;

    /// Construct a struct value from evaluated fields.
    ///
    /// Unknown type names and undeclared fields come back as error values
    /// carrying `id`; fields not supplied take their zero values.
    fn new_struct(&self, id: ExprId, type_name: &str, fields: Vec<(String, Value)>) -> Value;
}

/// A struct type registration.
#[derive(Clone, Debug)]
pub struct StructDescriptor {
    name: String,
    fields: FxIndexMap<String, CelType>,
}

impl StructDescriptor {
    /// Start a descriptor for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        StructDescriptor {
            name: name.into(),
            fields: FxIndexMap::default(),
        }
    }

    /// Declare a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: CelType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }
}

/// An enum type registration.
#[derive(Clone, Debug)]
pub struct EnumDescriptor {
    name: String,
    values: FxIndexMap<String, i64>,
}

impl EnumDescriptor {
    /// Start a descriptor for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        EnumDescriptor {
            name: name.into(),
            values: FxIndexMap::default(),
        }
    }

    /// Declare a named ordinal.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, ordinal: i64) -> Self {
        self.values.insert(name.into(), ordinal);
        self
    }
}

/// The zero value of a declared type, used for unset struct fields.
pub fn zero_value(ty: &CelType) -> Value {
    match ty {
        CelType::Int => Value::Int(0),
        CelType::Uint => Value::Uint(0),
        CelType::Double => Value::Double(0.0),
        CelType::Bool => Value::Bool(false),
        CelType::String => Value::string(""),
        CelType::Bytes => Value::bytes(Vec::new()),
        CelType::List(_) => Value::list(Vec::new()),
        CelType::Map(_, _) => Value::map(MapValue::new()),
        CelType::Opaque(name) => Value::enum_value(name.clone(), 0),
        CelType::Null | CelType::Dyn | CelType::Struct(_) | CelType::Type(_) => Value::Null,
    }
}

/// A registry-backed `TypeProvider`.
#[derive(Default, Debug)]
pub struct TypeRegistry {
    structs: FxHashMap<String, StructDescriptor>,
    enums: FxHashMap<String, EnumDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct type.
    pub fn register_struct(&mut self, descriptor: StructDescriptor) {
        self.structs.insert(descriptor.name.clone(), descriptor);
    }

    /// Register an enum type.
    pub fn register_enum(&mut self, descriptor: EnumDescriptor) {
        self.enums.insert(descriptor.name.clone(), descriptor);
    }

    /// The ordinal of a named enum value, if registered.
    pub fn find_enum_value(&self, enum_name: &str, value_name: &str) -> Option<i64> {
        self.enums.get(enum_name)?.values.get(value_name).copied()
    }
}

impl TypeProvider for TypeRegistry {
    fn find_struct_type(&self, name: &str) -> Option<StructType> {
        self.structs.get(name).map(|d| StructType {
            name: d.name.clone(),
        })
    }

    fn find_struct_field_type(&self, type_name: &str, field: &str) -> Option<CelType> {
        self.structs.get(type_name)?.fields.get(field).cloned()
    }

    fn struct_field_names(&self, type_name: &str) -> Vec<String> {
        self.structs
            .get(type_name)
            .map(|d| d.fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn find_enum_type(&self, name: &str) -> Option<EnumType> {
        self.enums.get(name).map(|d| EnumType {
            name: d.name.clone(),
        })
    }

    fn new_struct(&self, id: ExprId, type_name: &str, fields: Vec<(String, Value)>) -> Value {
        let Some(descriptor) = self.structs.get(type_name) else {
            return unknown_type(type_name, id);
        };
        let mut value = StructValue::new(descriptor.name.clone());
        for (field, field_value) in fields {
            if !descriptor.fields.contains_key(&field) {
                return no_such_field(&field, id);
            }
            value.set(field, field_value);
        }
        // Unset declared fields take their zero values.
        for (field, ty) in &descriptor.fields {
            if !value.has_field(field) {
                value.set(field.clone(), zero_value(ty));
            }
        }
        Value::struct_value(value)
    }
}
