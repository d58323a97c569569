//! Function dispatch.
//!
//! The engine never calls user functions directly: planned `Call` nodes
//! hold a `Dispatcher`, and the planner consults it to decide whether a
//! dotted member-call target is really a namespace-qualified global
//! function. `FunctionRegistry` is the stock implementation.

use crate::errors::unknown_overload;
use crate::value::Value;
use cel_ir::ExprId;
use rustc_hash::FxHashMap;

/// Resolves a function name and overload id to an implementation.
pub trait Dispatcher: Send + Sync {
    /// The overload ids registered for a fully-qualified function name, in
    /// registration order.
    fn find_overloads(&self, function: &str) -> Vec<String>;

    /// Invoke a function.
    ///
    /// Arguments are pre-filtered: the evaluator never forwards error or
    /// unknown values. Failures come back as error values carrying `id`.
    fn dispatch(&self, id: ExprId, function: &str, overload_id: &str, args: &[Value]) -> Value;
}

type FunctionImpl = Box<dyn Fn(ExprId, &[Value]) -> Value + Send + Sync>;

/// A name- and overload-indexed function table.
pub struct FunctionRegistry {
    /// Implementation per overload id.
    overloads: FxHashMap<String, FunctionImpl>,
    /// Overload ids per function name, in registration order.
    functions: FxHashMap<String, Vec<String>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        FunctionRegistry {
            overloads: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }

    /// Register an overload of a function.
    ///
    /// Re-registering an overload id replaces the implementation but keeps
    /// the original position in the function's overload order (first
    /// registration wins ties at plan time).
    pub fn register(
        &mut self,
        function: &str,
        overload_id: &str,
        implementation: impl Fn(ExprId, &[Value]) -> Value + Send + Sync + 'static,
    ) {
        let ids = self.functions.entry(function.to_string()).or_default();
        if !ids.iter().any(|id| id == overload_id) {
            ids.push(overload_id.to_string());
        }
        self.overloads
            .insert(overload_id.to_string(), Box::new(implementation));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for FunctionRegistry {
    fn find_overloads(&self, function: &str) -> Vec<String> {
        self.functions.get(function).cloned().unwrap_or_default()
    }

    fn dispatch(&self, id: ExprId, function: &str, overload_id: &str, args: &[Value]) -> Value {
        if let Some(implementation) = self.overloads.get(overload_id) {
            return implementation(id, args);
        }
        // Unmatched overload id: fall back to the function's sole overload
        // if it has exactly one.
        if let Some(ids) = self.functions.get(function) {
            if let [only] = ids.as_slice() {
                if let Some(implementation) = self.overloads.get(only) {
                    return implementation(id, args);
                }
            }
        }
        unknown_overload(function, id)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .field("overloads", &self.overloads.len())
            .finish()
    }
}
