//! CEL Plan - AST lowering and optimizer pipelines.
//!
//! This crate turns a (possibly type-checked) `cel_ir::Ast` into an
//! executable `cel_eval::Interpretable`:
//!
//! 1. **Pre-plan folding** (`const_fold`): constant calls and constant
//!    conditionals rewrite in the AST arena.
//! 2. **Planning** (`planner`): per-variant lowering with attribute
//!    fusion, operator mapping, overload selection, and
//!    container-qualified name resolution.
//! 3. **Post-plan folding** (`conversion_fold`): no-op type conversions
//!    drop out of the executable tree.
//!
//! `Program` wires the three stages behind one entry point.
//!
//! # Pipeline Position
//!
//! ```text
//! cel_ir → **cel_plan** → cel_eval
//! ```

mod const_fold;
mod container;
mod conversion_fold;
mod planner;
mod program;

pub use const_fold::{fold_constants, optimize_ast, AstPass, FoldConstantCalls, FoldConstantConditionals};
pub use container::Container;
pub use conversion_fold::{
    eliminate_noop_conversions, optimize_plan, NoopConversionElimination, PlanPass,
};
pub use planner::Planner;
pub use program::{PlannerOptions, Program};

#[cfg(test)]
mod tests;
