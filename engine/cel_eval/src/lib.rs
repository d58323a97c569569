//! CEL Eval - runtime values and the executable tree.
//!
//! This crate is the evaluation half of the engine:
//! - `Value`: the tagged sum of runtime values; errors and unknowns are
//!   absorbing values, never panics.
//! - `Attribute` / `Qualifier`: compiled variable-plus-selection paths.
//! - `Interpretable`: the planned, immutable executable tree.
//! - `Activation`, `Dispatcher`, `TypeProvider`: the seams to the host
//!   (variable bindings, function dispatch, type reflection), with
//!   registry-backed stock implementations.
//!
//! # Architecture
//!
//! Evaluation is single-threaded, synchronous, and total: for every tree
//! and activation, `eval` returns a `Value`. Short-circuiting is built
//! into `And`/`Or`/`Conditional`/`NotStrictlyFalse`; everything else
//! propagates the first error or unknown it observes.

mod activation;
mod attributes;
mod binary;
mod convert;
pub mod errors;
mod functions;
mod interpretable;
mod provider;
mod value;

pub use activation::{Activation, EmptyActivation, MapActivation, ScopedActivation};
pub use attributes::{
    AbsoluteAttribute, Attribute, ComputedQualifier, ConditionalAttribute, IndexQualifier,
    MaybeAttribute, Qualifier, RelativeAttribute, StringQualifier,
};
pub use convert::ConversionTarget;
pub use functions::{Dispatcher, FunctionRegistry};
pub use interpretable::{ComprehensionNode, Interpretable};
pub use provider::{
    zero_value, EnumDescriptor, EnumType, StructDescriptor, StructType, TypeProvider, TypeRegistry,
};
pub use value::{
    EnumValue, ErrorKind, ErrorValue, Heap, MapKey, MapValue, StructValue, UnknownSet, Value,
};
