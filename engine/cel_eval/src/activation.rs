//! Binding environments for evaluation.
//!
//! An `Activation` resolves free variable names to values. Resolution is
//! the only operation: "unbound" (`None`) is distinct from a bound `null`.
//! Activations layer: an overlay consults its own bindings first and
//! falls back to a parent, which is how comprehension iteration variables
//! and block slots scope over the caller's bindings without copying them.

use crate::value::Value;
use rustc_hash::FxHashMap;

/// A binding environment from names to values.
///
/// Implementations must be consistent for the duration of one `eval` call;
/// the engine never mutates an activation.
pub trait Activation {
    /// Resolve a name, or report it unbound.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// The activation with no bindings.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// A map-backed activation.
#[derive(Clone, Debug, Default)]
pub struct MapActivation {
    bindings: FxHashMap<String, Value>,
}

impl MapActivation {
    /// Create an empty activation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }
}

impl FromIterator<(String, Value)> for MapActivation {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        MapActivation {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }
}

/// An overlay activation: its own bindings shadow a parent's.
pub struct ScopedActivation<'a> {
    parent: &'a dyn Activation,
    overlay: MapActivation,
}

impl<'a> ScopedActivation<'a> {
    /// Create an overlay over `parent`.
    pub fn new(parent: &'a dyn Activation) -> Self {
        ScopedActivation {
            parent,
            overlay: MapActivation::new(),
        }
    }

    /// Bind a name in the overlay.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.overlay.bind(name, value);
    }
}

impl Activation for ScopedActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.overlay.resolve(name).or_else(|| self.parent.resolve(name))
    }
}

/// Comprehension-loop overlay: binds the iteration variable(s) and the
/// accumulator over the caller's activation without allocating a map.
pub(crate) struct LoopActivation<'a> {
    pub parent: &'a dyn Activation,
    pub iter_var: &'a str,
    pub iter_value: Value,
    /// Second iteration variable for (key, value) / (index, element) forms.
    pub iter_var2: Option<(&'a str, Value)>,
    pub accu_var: &'a str,
    pub accu_value: Value,
}

impl Activation for LoopActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        if name == self.iter_var {
            return Some(self.iter_value.clone());
        }
        if let Some((var2, value2)) = &self.iter_var2 {
            if name == *var2 {
                return Some(value2.clone());
            }
        }
        if name == self.accu_var {
            return Some(self.accu_value.clone());
        }
        self.parent.resolve(name)
    }
}

/// Block-slot overlay: resolves `@index{i}` names against the slot values
/// bound so far. A slot referenced before its index is defined falls
/// through unresolved and surfaces as an undeclared-reference error.
pub(crate) struct SlotActivation<'a> {
    pub parent: &'a dyn Activation,
    pub slots: &'a [Value],
}

impl SlotActivation<'_> {
    const SLOT_PREFIX: &'static str = "@index";
}

impl Activation for SlotActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(index) = name.strip_prefix(Self::SLOT_PREFIX) {
            if let Ok(index) = index.parse::<usize>() {
                return self.slots.get(index).cloned();
            }
        }
        self.parent.resolve(name)
    }
}
