//! Checker-side type kinds.
//!
//! `CelType` is the vocabulary of the optional type map the checker hands
//! the planner, and of the field types a `TypeProvider` reports. It is a
//! structural description, not a runtime value; the runtime counterpart
//! is the `Type` value variant, which carries only a name.

use crate::ExprId;
use rustc_hash::FxHashMap;

/// A checked expression type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CelType {
    Int,
    Uint,
    Double,
    Bool,
    String,
    Bytes,
    Null,
    Dyn,
    List(Box<CelType>),
    Map(Box<CelType>, Box<CelType>),
    /// A struct (message) type by fully-qualified name.
    Struct(String),
    /// A named opaque type; enums surface here.
    Opaque(String),
    /// The type of a type: `Type(T)`, or the bare `type` when unparameterized.
    Type(Option<Box<CelType>>),
}

impl CelType {
    /// Whether this is the `dyn` type.
    #[inline]
    pub fn is_dyn(&self) -> bool {
        matches!(self, CelType::Dyn)
    }

    /// The runtime type name this type reflects to.
    ///
    /// This is the name a `Type` value carries when an identifier resolves
    /// to a type constructor, and the name `type(x)` reports for values of
    /// this type.
    pub fn runtime_type_name(&self) -> &str {
        match self {
            CelType::Int => "int",
            CelType::Uint => "uint",
            CelType::Double => "double",
            CelType::Bool => "bool",
            CelType::String => "string",
            CelType::Bytes => "bytes",
            CelType::Null => "null_type",
            CelType::Dyn => "dyn",
            CelType::List(_) => "list",
            CelType::Map(_, _) => "map",
            CelType::Struct(name) | CelType::Opaque(name) => name,
            CelType::Type(_) => "type",
        }
    }
}

/// Checker output binding expression ids to types.
pub type TypeMap = FxHashMap<ExprId, CelType>;
