//! The executable tree.
//!
//! A planned expression is one closed enum of executable nodes. Every node
//! knows its source expression id and evaluates to a value against an
//! activation; evaluation is synchronous, total, and never panics. Errors
//! and unknowns travel as values.
//!
//! The tree is immutable after planning and `Send + Sync` (constants,
//! strings, and the dispatcher/provider handles are all shared), so one
//! planned tree can serve concurrent evaluations against distinct
//! activations.

use std::fmt;
use std::sync::Arc;

use cel_ir::{BinaryOp, CelType, ExprId};

use crate::activation::{Activation, LoopActivation, ScopedActivation, SlotActivation};
use crate::attributes::Attribute;
use crate::binary::evaluate_binary;
use crate::convert::{evaluate_conversion, ConversionTarget};
use crate::errors::{
    duplicate_map_key, expected_optional, invalid_map_key, no_matching_overload, overflow,
    type_mismatch,
};
use crate::functions::Dispatcher;
use crate::provider::TypeProvider;
use crate::value::{MapKey, MapValue, Value};

/// A planned, executable expression node.
#[derive(Clone)]
pub enum Interpretable {
    /// A constant value.
    Const { id: ExprId, value: Value },

    /// A compiled attribute path.
    Attr { id: ExprId, attr: Attribute },

    /// Logical NOT.
    Not {
        id: ExprId,
        operand: Box<Interpretable>,
    },

    /// Arithmetic negation.
    Neg {
        id: ExprId,
        operand: Box<Interpretable>,
    },

    /// The comprehension loop guard: false only for a strict `false`.
    NotStrictlyFalse {
        id: ExprId,
        operand: Box<Interpretable>,
    },

    /// Short-circuit conjunction with commutative absorption.
    And {
        id: ExprId,
        lhs: Box<Interpretable>,
        rhs: Box<Interpretable>,
    },

    /// Short-circuit disjunction with commutative absorption.
    Or {
        id: ExprId,
        lhs: Box<Interpretable>,
        rhs: Box<Interpretable>,
    },

    /// The ternary conditional.
    Conditional {
        id: ExprId,
        cond: Box<Interpretable>,
        truthy: Box<Interpretable>,
        falsy: Box<Interpretable>,
    },

    /// A strict binary operator.
    Binary {
        id: ExprId,
        op: BinaryOp,
        lhs: Box<Interpretable>,
        rhs: Box<Interpretable>,
    },

    /// A function call through the dispatcher.
    Call {
        id: ExprId,
        function: String,
        overload_id: String,
        args: Vec<Interpretable>,
        dispatcher: Arc<dyn Dispatcher>,
    },

    /// `cel.@block` slot bindings: slots bind as `@index{i}` names.
    Block {
        id: ExprId,
        slots: Vec<Interpretable>,
        result: Box<Interpretable>,
    },

    /// List construction.
    CreateList {
        id: ExprId,
        elements: Vec<Interpretable>,
        optional_indices: Vec<u32>,
    },

    /// Map construction. `keys` and `values` are parallel.
    CreateMap {
        id: ExprId,
        keys: Vec<Interpretable>,
        values: Vec<Interpretable>,
        optional_indices: Vec<u32>,
    },

    /// Struct construction through the provider. The field vectors are
    /// parallel; `field_types` holds the declared types where known.
    CreateStruct {
        id: ExprId,
        type_name: String,
        field_names: Vec<String>,
        field_values: Vec<Interpretable>,
        field_types: Vec<Option<CelType>>,
        optional_indices: Vec<u32>,
        provider: Arc<dyn TypeProvider>,
    },

    /// The macro-expanded `has(...)` presence test.
    HasField {
        id: ExprId,
        operand: Box<Interpretable>,
        field: String,
    },

    /// A comprehension loop.
    Comprehension {
        id: ExprId,
        node: Box<ComprehensionNode>,
    },

    /// A type-conversion intrinsic.
    Convert {
        id: ExprId,
        operand: Box<Interpretable>,
        target: ConversionTarget,
        provider: Arc<dyn TypeProvider>,
    },
}

/// The five planned sub-expressions and variable names of a comprehension.
#[derive(Clone, Debug)]
pub struct ComprehensionNode {
    pub iter_var: String,
    /// Second iteration variable: switches map iteration to (key, value)
    /// pairs and list iteration to (index, element) pairs.
    pub iter_var2: Option<String>,
    pub iter_range: Interpretable,
    pub accu_var: String,
    pub accu_init: Interpretable,
    pub loop_cond: Interpretable,
    pub loop_step: Interpretable,
    pub result: Interpretable,
}

impl Interpretable {
    /// Wrap an attribute, taking the attribute's id.
    pub fn attribute(attr: Attribute) -> Interpretable {
        Interpretable::Attr { id: attr.id(), attr }
    }

    /// A constant node.
    pub fn constant(id: ExprId, value: Value) -> Interpretable {
        Interpretable::Const { id, value }
    }

    /// The source expression this node was planned for.
    pub fn id(&self) -> ExprId {
        match self {
            Interpretable::Const { id, .. }
            | Interpretable::Attr { id, .. }
            | Interpretable::Not { id, .. }
            | Interpretable::Neg { id, .. }
            | Interpretable::NotStrictlyFalse { id, .. }
            | Interpretable::And { id, .. }
            | Interpretable::Or { id, .. }
            | Interpretable::Conditional { id, .. }
            | Interpretable::Binary { id, .. }
            | Interpretable::Call { id, .. }
            | Interpretable::Block { id, .. }
            | Interpretable::CreateList { id, .. }
            | Interpretable::CreateMap { id, .. }
            | Interpretable::CreateStruct { id, .. }
            | Interpretable::HasField { id, .. }
            | Interpretable::Comprehension { id, .. }
            | Interpretable::Convert { id, .. } => *id,
        }
    }

    /// Evaluate against an activation.
    pub fn eval(&self, activation: &dyn Activation) -> Value {
        match self {
            Interpretable::Const { value, .. } => value.clone(),
            Interpretable::Attr { attr, .. } => attr.resolve(activation),
            Interpretable::Not { id, operand } => eval_not(*id, operand, activation),
            Interpretable::Neg { id, operand } => eval_neg(*id, operand, activation),
            Interpretable::NotStrictlyFalse { operand, .. } => {
                eval_not_strictly_false(operand, activation)
            }
            Interpretable::And { id, lhs, rhs } => eval_and(*id, lhs, rhs, activation),
            Interpretable::Or { id, lhs, rhs } => eval_or(*id, lhs, rhs, activation),
            Interpretable::Conditional {
                id,
                cond,
                truthy,
                falsy,
            } => eval_conditional(*id, cond, truthy, falsy, activation),
            Interpretable::Binary { id, op, lhs, rhs } => {
                let left = lhs.eval(activation);
                if left.is_error_or_unknown() {
                    return left;
                }
                let right = rhs.eval(activation);
                if right.is_error_or_unknown() {
                    return right;
                }
                evaluate_binary(*id, *op, &left, &right)
            }
            Interpretable::Call {
                id,
                function,
                overload_id,
                args,
                dispatcher,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let value = arg.eval(activation);
                    if value.is_error_or_unknown() {
                        return value;
                    }
                    values.push(value);
                }
                dispatcher.dispatch(*id, function, overload_id, &values)
            }
            Interpretable::Block { slots, result, .. } => {
                let mut bound: Vec<Value> = Vec::with_capacity(slots.len());
                for slot in slots {
                    // Each slot sees the slots bound before it; a forward
                    // reference resolves to nothing and errors.
                    let value = slot.eval(&SlotActivation {
                        parent: activation,
                        slots: &bound,
                    });
                    bound.push(value);
                }
                result.eval(&SlotActivation {
                    parent: activation,
                    slots: &bound,
                })
            }
            Interpretable::CreateList {
                elements,
                optional_indices,
                ..
            } => eval_create_list(elements, optional_indices, activation),
            Interpretable::CreateMap {
                keys,
                values,
                optional_indices,
                ..
            } => eval_create_map(keys, values, optional_indices, activation),
            Interpretable::CreateStruct {
                id,
                type_name,
                field_names,
                field_values,
                field_types,
                optional_indices,
                provider,
            } => eval_create_struct(
                *id,
                type_name,
                field_names,
                field_values,
                field_types,
                optional_indices,
                provider.as_ref(),
                activation,
            ),
            Interpretable::HasField { id, operand, field } => {
                eval_has_field(*id, operand, field, activation)
            }
            Interpretable::Comprehension { node, .. } => eval_comprehension(node, activation),
            Interpretable::Convert {
                id,
                operand,
                target,
                provider,
            } => {
                let value = operand.eval(activation);
                if value.is_error_or_unknown() {
                    return value;
                }
                evaluate_conversion(*id, *target, value, provider.as_ref())
            }
        }
    }
}

fn eval_not(id: ExprId, operand: &Interpretable, activation: &dyn Activation) -> Value {
    match operand.eval(activation) {
        Value::Bool(b) => Value::Bool(!b),
        absorbing @ (Value::Error(_) | Value::Unknown(_)) => absorbing,
        other => type_mismatch("bool", &other.runtime_type_name(), id),
    }
}

fn eval_neg(id: ExprId, operand: &Interpretable, activation: &dyn Activation) -> Value {
    match operand.eval(activation) {
        Value::Int(i) => match i.checked_neg() {
            Some(v) => Value::Int(v),
            None => overflow("negation", id),
        },
        Value::Double(d) => Value::Double(-d),
        absorbing @ (Value::Error(_) | Value::Unknown(_)) => absorbing,
        other => no_matching_overload("-", &[&other.runtime_type_name()], id),
    }
}

/// False only for a strict `false`; errors and unknowns count as true so
/// a failing accumulator cannot suppress a comprehension's result step.
fn eval_not_strictly_false(operand: &Interpretable, activation: &dyn Activation) -> Value {
    match operand.eval(activation) {
        Value::Bool(false) => Value::Bool(false),
        _ => Value::Bool(true),
    }
}

/// Commutative conjunction: a strict `false` on either side wins over any
/// error or unknown on the other; unknowns then win over errors.
fn eval_and(
    id: ExprId,
    lhs: &Interpretable,
    rhs: &Interpretable,
    activation: &dyn Activation,
) -> Value {
    let left = lhs.eval(activation);
    if matches!(left, Value::Bool(false)) {
        return Value::Bool(false);
    }
    let right = rhs.eval(activation);
    if matches!(right, Value::Bool(false)) {
        return Value::Bool(false);
    }
    if matches!(left, Value::Bool(true)) && matches!(right, Value::Bool(true)) {
        return Value::Bool(true);
    }
    combine_non_bool(id, left, right)
}

/// Commutative disjunction: the dual of `eval_and` with `true` absorbing.
fn eval_or(
    id: ExprId,
    lhs: &Interpretable,
    rhs: &Interpretable,
    activation: &dyn Activation,
) -> Value {
    let left = lhs.eval(activation);
    if matches!(left, Value::Bool(true)) {
        return Value::Bool(true);
    }
    let right = rhs.eval(activation);
    if matches!(right, Value::Bool(true)) {
        return Value::Bool(true);
    }
    if matches!(left, Value::Bool(false)) && matches!(right, Value::Bool(false)) {
        return Value::Bool(false);
    }
    combine_non_bool(id, left, right)
}

/// Shared non-short-circuit tail of `&&`/`||`: prefer unknowns (merged when
/// both sides are unknown), then the first error, then a type mismatch.
fn combine_non_bool(id: ExprId, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Unknown(l), Value::Unknown(r)) => Value::unknown(l.merge(r)),
        (Value::Unknown(_), _) => left,
        (_, Value::Unknown(_)) => right,
        (Value::Error(_), _) => left,
        (_, Value::Error(_)) => right,
        (Value::Bool(_), other) | (other, Value::Bool(_)) => {
            type_mismatch("bool", &other.runtime_type_name(), id)
        }
        (other, _) => type_mismatch("bool", &other.runtime_type_name(), id),
    }
}

fn eval_conditional(
    id: ExprId,
    cond: &Interpretable,
    truthy: &Interpretable,
    falsy: &Interpretable,
    activation: &dyn Activation,
) -> Value {
    match cond.eval(activation) {
        error @ Value::Error(_) => error,
        Value::Unknown(cond_unknown) => {
            let truthy = truthy.eval(activation);
            let falsy = falsy.eval(activation);
            match (truthy, falsy) {
                (Value::Unknown(t), Value::Unknown(f)) => Value::unknown(t.merge(&f)),
                _ => Value::Unknown(cond_unknown),
            }
        }
        Value::Bool(true) => truthy.eval(activation),
        Value::Bool(false) => falsy.eval(activation),
        other => type_mismatch("bool", &other.runtime_type_name(), id),
    }
}

fn eval_create_list(
    elements: &[Interpretable],
    optional_indices: &[u32],
    activation: &dyn Activation,
) -> Value {
    let mut items = Vec::with_capacity(elements.len());
    for (i, element) in elements.iter().enumerate() {
        let value = element.eval(activation);
        if value.is_error_or_unknown() {
            return value;
        }
        if optional_indices.contains(&(i as u32)) {
            match value {
                Value::None => {}
                Value::Some(inner) => items.push((*inner).clone()),
                other => {
                    return expected_optional(&other.runtime_type_name(), element.id());
                }
            }
        } else {
            items.push(value);
        }
    }
    Value::list(items)
}

fn eval_create_map(
    keys: &[Interpretable],
    values: &[Interpretable],
    optional_indices: &[u32],
    activation: &dyn Activation,
) -> Value {
    let mut map = MapValue::with_capacity(keys.len());
    for (i, (key_node, value_node)) in keys.iter().zip(values.iter()).enumerate() {
        let key_value = key_node.eval(activation);
        if key_value.is_error_or_unknown() {
            return key_value;
        }
        let value = value_node.eval(activation);
        if value.is_error_or_unknown() {
            return value;
        }
        let value = if optional_indices.contains(&(i as u32)) {
            match value {
                Value::None => continue,
                Value::Some(inner) => (*inner).clone(),
                other => {
                    return expected_optional(&other.runtime_type_name(), value_node.id());
                }
            }
        } else {
            value
        };
        let Some(key) = MapKey::from_value(&key_value) else {
            return invalid_map_key(&key_value.runtime_type_name(), key_node.id());
        };
        if map.contains(&key) {
            return duplicate_map_key(&key, key_node.id());
        }
        map.insert(key, value);
    }
    Value::map(map)
}

#[expect(clippy::too_many_arguments, reason = "mirrors the node's parallel field vectors")]
fn eval_create_struct(
    id: ExprId,
    type_name: &str,
    field_names: &[String],
    field_values: &[Interpretable],
    field_types: &[Option<CelType>],
    optional_indices: &[u32],
    provider: &dyn TypeProvider,
    activation: &dyn Activation,
) -> Value {
    let mut fields = Vec::with_capacity(field_names.len());
    for (i, (name, node)) in field_names.iter().zip(field_values.iter()).enumerate() {
        let value = node.eval(activation);
        if value.is_error_or_unknown() {
            return value;
        }
        let value = if optional_indices.contains(&(i as u32)) {
            match value {
                Value::None => continue,
                Value::Some(inner) => (*inner).clone(),
                other => return expected_optional(&other.runtime_type_name(), node.id()),
            }
        } else {
            value
        };
        let value = match field_types.get(i).and_then(Option::as_ref) {
            Some(ty) => coerce_field(value, ty),
            None => value,
        };
        fields.push((name.clone(), value));
    }
    provider.new_struct(id, type_name, fields)
}

/// Coerce a field value toward its declared type.
///
/// Only the enum/int family converts (in both directions, recursively
/// through list elements and map values); every other combination is left
/// for the provider to accept or reject.
fn coerce_field(value: Value, ty: &CelType) -> Value {
    match (&value, ty) {
        (Value::Enum(e), CelType::Int) => Value::Int(e.ordinal),
        (Value::Int(i), CelType::Opaque(name)) => Value::enum_value(name.clone(), *i),
        (Value::List(items), CelType::List(element_ty)) => {
            let items = items
                .iter()
                .map(|item| coerce_field(item.clone(), element_ty))
                .collect();
            Value::list(items)
        }
        (Value::Map(m), CelType::Map(_, value_ty)) => {
            let mut out = MapValue::with_capacity(m.len());
            for (key, map_value) in m.iter() {
                out.insert(key.clone(), coerce_field(map_value.clone(), value_ty));
            }
            Value::map(out)
        }
        _ => value,
    }
}

fn eval_has_field(
    id: ExprId,
    operand: &Interpretable,
    field: &str,
    activation: &dyn Activation,
) -> Value {
    match operand.eval(activation) {
        Value::Struct(s) => Value::Bool(s.has_field(field)),
        Value::Map(m) => Value::Bool(m.contains(&MapKey::string(field))),
        Value::Some(_) => Value::Bool(true),
        Value::None | Value::Null => Value::Bool(false),
        absorbing @ (Value::Error(_) | Value::Unknown(_)) => absorbing,
        other => type_mismatch("map or message", &other.runtime_type_name(), id),
    }
}

fn eval_comprehension(node: &ComprehensionNode, activation: &dyn Activation) -> Value {
    let range = node.iter_range.eval(activation);
    if range.is_error_or_unknown() {
        return range;
    }

    // Materialize (primary, secondary) iteration pairs up front; values
    // clone by reference count.
    let two_var = node.iter_var2.is_some();
    let pairs: Vec<(Value, Option<Value>)> = match &range {
        Value::List(items) => {
            if two_var {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (Value::Int(i as i64), Some(item.clone())))
                    .collect()
            } else {
                items.iter().map(|item| (item.clone(), None)).collect()
            }
        }
        Value::Map(m) => {
            if two_var {
                m.iter()
                    .map(|(k, v)| (k.to_value(), Some(v.clone())))
                    .collect()
            } else {
                m.keys().map(|k| (k.to_value(), None)).collect()
            }
        }
        other => {
            return type_mismatch(
                "list or map",
                &other.runtime_type_name(),
                node.iter_range.id(),
            );
        }
    };

    let mut accu = node.accu_init.eval(activation);
    if accu.is_error_or_unknown() {
        return accu;
    }

    let mut iterations = 0usize;
    for (primary, secondary) in pairs {
        let overlay = LoopActivation {
            parent: activation,
            iter_var: &node.iter_var,
            iter_value: primary,
            iter_var2: node
                .iter_var2
                .as_deref()
                .zip(secondary),
            accu_var: &node.accu_var,
            accu_value: accu.clone(),
        };
        if matches!(node.loop_cond.eval(&overlay), Value::Bool(false)) {
            break;
        }
        accu = node.loop_step.eval(&overlay);
        iterations += 1;
        if accu.is_error_or_unknown() {
            return accu;
        }
    }
    tracing::trace!(iterations, iter_var = %node.iter_var, "comprehension loop finished");

    let mut final_scope = ScopedActivation::new(activation);
    final_scope.bind(node.accu_var.clone(), accu);
    node.result.eval(&final_scope)
}

impl fmt::Debug for Interpretable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpretable::Const { id, value } => {
                f.debug_struct("Const").field("id", id).field("value", value).finish()
            }
            Interpretable::Attr { id, attr } => {
                f.debug_struct("Attr").field("id", id).field("attr", attr).finish()
            }
            Interpretable::Not { id, operand } => {
                f.debug_struct("Not").field("id", id).field("operand", operand).finish()
            }
            Interpretable::Neg { id, operand } => {
                f.debug_struct("Neg").field("id", id).field("operand", operand).finish()
            }
            Interpretable::NotStrictlyFalse { id, operand } => f
                .debug_struct("NotStrictlyFalse")
                .field("id", id)
                .field("operand", operand)
                .finish(),
            Interpretable::And { id, lhs, rhs } => f
                .debug_struct("And")
                .field("id", id)
                .field("lhs", lhs)
                .field("rhs", rhs)
                .finish(),
            Interpretable::Or { id, lhs, rhs } => f
                .debug_struct("Or")
                .field("id", id)
                .field("lhs", lhs)
                .field("rhs", rhs)
                .finish(),
            Interpretable::Conditional {
                id,
                cond,
                truthy,
                falsy,
            } => f
                .debug_struct("Conditional")
                .field("id", id)
                .field("cond", cond)
                .field("truthy", truthy)
                .field("falsy", falsy)
                .finish(),
            Interpretable::Binary { id, op, lhs, rhs } => f
                .debug_struct("Binary")
                .field("id", id)
                .field("op", op)
                .field("lhs", lhs)
                .field("rhs", rhs)
                .finish(),
            Interpretable::Call {
                id,
                function,
                overload_id,
                args,
                ..
            } => f
                .debug_struct("Call")
                .field("id", id)
                .field("function", function)
                .field("overload_id", overload_id)
                .field("args", args)
                .finish(),
            Interpretable::Block { id, slots, result } => f
                .debug_struct("Block")
                .field("id", id)
                .field("slots", slots)
                .field("result", result)
                .finish(),
            Interpretable::CreateList {
                id,
                elements,
                optional_indices,
            } => f
                .debug_struct("CreateList")
                .field("id", id)
                .field("elements", elements)
                .field("optional_indices", optional_indices)
                .finish(),
            Interpretable::CreateMap {
                id,
                keys,
                values,
                optional_indices,
            } => f
                .debug_struct("CreateMap")
                .field("id", id)
                .field("keys", keys)
                .field("values", values)
                .field("optional_indices", optional_indices)
                .finish(),
            Interpretable::CreateStruct {
                id,
                type_name,
                field_names,
                field_values,
                field_types,
                optional_indices,
                ..
            } => f
                .debug_struct("CreateStruct")
                .field("id", id)
                .field("type_name", type_name)
                .field("field_names", field_names)
                .field("field_values", field_values)
                .field("field_types", field_types)
                .field("optional_indices", optional_indices)
                .finish(),
            Interpretable::HasField { id, operand, field } => f
                .debug_struct("HasField")
                .field("id", id)
                .field("operand", operand)
                .field("field", field)
                .finish(),
            Interpretable::Comprehension { id, node } => f
                .debug_struct("Comprehension")
                .field("id", id)
                .field("node", node)
                .finish(),
            Interpretable::Convert {
                id,
                operand,
                target,
                ..
            } => f
                .debug_struct("Convert")
                .field("id", id)
                .field("operand", operand)
                .field("target", target)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{EmptyActivation, MapActivation};
    use crate::value::UnknownSet;
    use cel_ir::operators;
    use pretty_assertions::assert_eq;

    fn id(n: u32) -> ExprId {
        ExprId::new(n)
    }

    fn konst(n: u32, value: Value) -> Interpretable {
        Interpretable::constant(id(n), value)
    }

    fn var(n: u32, name: &str) -> Interpretable {
        Interpretable::attribute(Attribute::absolute(id(n), name))
    }

    fn unknown(n: u32) -> Value {
        Value::unknown(UnknownSet::new(id(n)))
    }

    fn error_const(n: u32) -> Interpretable {
        konst(n, crate::errors::generic_error("boom", id(n)))
    }

    fn and(l: Interpretable, r: Interpretable) -> Interpretable {
        Interpretable::And {
            id: id(90),
            lhs: Box::new(l),
            rhs: Box::new(r),
        }
    }

    fn or(l: Interpretable, r: Interpretable) -> Interpretable {
        Interpretable::Or {
            id: id(91),
            lhs: Box::new(l),
            rhs: Box::new(r),
        }
    }

    // ── Logical operators ──────────────────────────────────────

    #[test]
    fn and_false_absorbs_errors() {
        let act = EmptyActivation;
        assert_eq!(
            and(konst(1, Value::Bool(false)), error_const(2)).eval(&act),
            Value::Bool(false)
        );
        assert_eq!(
            and(error_const(1), konst(2, Value::Bool(false))).eval(&act),
            Value::Bool(false)
        );
    }

    #[test]
    fn and_propagates_error_beside_true() {
        let act = EmptyActivation;
        assert!(and(error_const(1), konst(2, Value::Bool(true))).eval(&act).is_error());
        assert!(and(konst(1, Value::Bool(true)), error_const(2)).eval(&act).is_error());
    }

    #[test]
    fn and_unknown_wins_over_error() {
        let act = EmptyActivation;
        let result = and(error_const(1), konst(2, unknown(7))).eval(&act);
        assert_eq!(result, unknown(7));
    }

    #[test]
    fn and_merges_two_unknowns() {
        let act = EmptyActivation;
        let result = and(konst(1, unknown(7)), konst(2, unknown(8))).eval(&act);
        match result {
            Value::Unknown(u) => assert_eq!(u.ids(), &[id(7), id(8)]),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn or_true_absorbs_anything() {
        let act = EmptyActivation;
        assert_eq!(
            or(konst(1, Value::Bool(true)), error_const(2)).eval(&act),
            Value::Bool(true)
        );
        assert_eq!(
            or(error_const(1), konst(2, Value::Bool(true))).eval(&act),
            Value::Bool(true)
        );
        assert_eq!(
            or(konst(1, unknown(5)), konst(2, Value::Bool(true))).eval(&act),
            Value::Bool(true)
        );
    }

    #[test]
    fn or_false_false_is_false() {
        let act = EmptyActivation;
        assert_eq!(
            or(konst(1, Value::Bool(false)), konst(2, Value::Bool(false))).eval(&act),
            Value::Bool(false)
        );
    }

    #[test]
    fn logical_non_bool_operand_is_type_mismatch() {
        let act = EmptyActivation;
        let result = and(konst(1, Value::Bool(true)), konst(2, Value::Int(3))).eval(&act);
        match result {
            Value::Error(e) => assert!(e.message.contains("bool")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    // ── Conditional ────────────────────────────────────────────

    #[test]
    fn conditional_selects_branch_lazily() {
        let act = EmptyActivation;
        let node = Interpretable::Conditional {
            id: id(1),
            cond: Box::new(konst(2, Value::Bool(true))),
            truthy: Box::new(konst(3, Value::Int(1))),
            falsy: Box::new(error_const(4)),
        };
        assert_eq!(node.eval(&act), Value::Int(1));
    }

    #[test]
    fn conditional_unknown_cond_propagates_original_unknown() {
        let act = EmptyActivation;
        let node = Interpretable::Conditional {
            id: id(1),
            cond: Box::new(konst(2, unknown(2))),
            truthy: Box::new(konst(3, Value::Int(1))),
            falsy: Box::new(konst(4, Value::Int(1))),
        };
        assert_eq!(node.eval(&act), unknown(2));
    }

    #[test]
    fn conditional_unknown_cond_merges_unknown_branches() {
        let act = EmptyActivation;
        let node = Interpretable::Conditional {
            id: id(1),
            cond: Box::new(konst(2, unknown(2))),
            truthy: Box::new(konst(3, unknown(3))),
            falsy: Box::new(konst(4, unknown(4))),
        };
        match node.eval(&act) {
            Value::Unknown(u) => assert_eq!(u.ids(), &[id(3), id(4)]),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    // ── Unary operators ────────────────────────────────────────

    #[test]
    fn negation_checks_overflow() {
        let act = EmptyActivation;
        let node = Interpretable::Neg {
            id: id(1),
            operand: Box::new(konst(2, Value::Int(i64::MIN))),
        };
        assert!(node.eval(&act).is_error());

        let node = Interpretable::Neg {
            id: id(1),
            operand: Box::new(konst(2, Value::Double(2.5))),
        };
        assert_eq!(node.eval(&act), Value::Double(-2.5));
    }

    #[test]
    fn not_strictly_false_maps_errors_to_true() {
        let act = EmptyActivation;
        let guard = |inner: Interpretable| Interpretable::NotStrictlyFalse {
            id: id(1),
            operand: Box::new(inner),
        };
        assert_eq!(guard(error_const(2)).eval(&act), Value::Bool(true));
        assert_eq!(guard(konst(2, unknown(3))).eval(&act), Value::Bool(true));
        assert_eq!(guard(konst(2, Value::Bool(false))).eval(&act), Value::Bool(false));
        assert_eq!(guard(konst(2, Value::Int(9))).eval(&act), Value::Bool(true));
    }

    // ── Aggregates ─────────────────────────────────────────────

    #[test]
    fn create_list_with_optional_elements() {
        let act = EmptyActivation;
        let node = Interpretable::CreateList {
            id: id(1),
            elements: vec![
                konst(2, Value::Int(1)),
                konst(3, Value::some(Value::Int(2))),
                konst(4, Value::None),
            ],
            optional_indices: vec![1, 2],
        };
        assert_eq!(
            node.eval(&act),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn create_list_requires_optionals_at_marked_positions() {
        let act = EmptyActivation;
        let node = Interpretable::CreateList {
            id: id(1),
            elements: vec![konst(2, Value::Int(1))],
            optional_indices: vec![0],
        };
        assert!(node.eval(&act).is_error());
    }

    #[test]
    fn create_map_rejects_duplicate_and_bad_keys() {
        let act = EmptyActivation;
        let node = Interpretable::CreateMap {
            id: id(1),
            keys: vec![konst(2, Value::Int(1)), konst(3, Value::Uint(1))],
            values: vec![konst(4, Value::Int(10)), konst(5, Value::Int(20))],
            optional_indices: vec![],
        };
        // 1 and 1u are numerically equal keys.
        assert!(node.eval(&act).is_error());

        let node = Interpretable::CreateMap {
            id: id(1),
            keys: vec![konst(2, Value::Double(1.0))],
            values: vec![konst(3, Value::Int(10))],
            optional_indices: vec![],
        };
        assert!(node.eval(&act).is_error());
    }

    #[test]
    fn create_map_skips_absent_optional_entries() {
        let act = EmptyActivation;
        let node = Interpretable::CreateMap {
            id: id(1),
            keys: vec![konst(2, Value::string("a")), konst(3, Value::string("b"))],
            values: vec![konst(4, Value::some(Value::Int(1))), konst(5, Value::None)],
            optional_indices: vec![0, 1],
        };
        match node.eval(&act) {
            Value::Map(m) => {
                assert_eq!(m.len(), 1);
                assert_eq!(m.get(&MapKey::string("a")), Some(&Value::Int(1)));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    // ── Blocks ─────────────────────────────────────────────────

    #[test]
    fn block_slots_bind_in_order() {
        let act = EmptyActivation;
        // cel.@block([5, @index0 + 1], @index1)
        let node = Interpretable::Block {
            id: id(1),
            slots: vec![
                konst(2, Value::Int(5)),
                Interpretable::Binary {
                    id: id(3),
                    op: BinaryOp::Add,
                    lhs: Box::new(var(4, "@index0")),
                    rhs: Box::new(konst(5, Value::Int(1))),
                },
            ],
            result: Box::new(var(6, "@index1")),
        };
        assert_eq!(node.eval(&act), Value::Int(6));
    }

    #[test]
    fn block_forward_reference_is_an_error() {
        let act = EmptyActivation;
        let node = Interpretable::Block {
            id: id(1),
            slots: vec![var(2, "@index1"), konst(3, Value::Int(5))],
            result: Box::new(var(4, "@index0")),
        };
        assert!(node.eval(&act).is_error());
    }

    // ── has() ──────────────────────────────────────────────────

    #[test]
    fn has_field_across_types() {
        let act = EmptyActivation;
        let mut m = MapValue::new();
        m.insert(MapKey::string("k"), Value::Int(1));
        let has = |operand: Interpretable| Interpretable::HasField {
            id: id(1),
            operand: Box::new(operand),
            field: "k".to_string(),
        };
        assert_eq!(has(konst(2, Value::map(m))).eval(&act), Value::Bool(true));
        assert_eq!(has(konst(2, Value::Null)).eval(&act), Value::Bool(false));
        assert_eq!(
            has(konst(2, Value::some(Value::Int(1)))).eval(&act),
            Value::Bool(true)
        );
        assert_eq!(has(konst(2, Value::None)).eval(&act), Value::Bool(false));
        assert!(has(konst(2, Value::Int(3))).eval(&act).is_error());
    }

    // ── Comprehensions ─────────────────────────────────────────

    /// Build the macro expansion of `range.all(x, x > 0)`:
    /// accu starts true, the loop guard is `@not_strictly_false(accu)`,
    /// and the step is `accu && (x > 0)`.
    fn all_positive(range: Interpretable) -> Interpretable {
        let accu = "__result__";
        let step = and(
            var(20, accu),
            Interpretable::Binary {
                id: id(21),
                op: BinaryOp::Gt,
                lhs: Box::new(var(22, "x")),
                rhs: Box::new(konst(23, Value::Int(0))),
            },
        );
        Interpretable::Comprehension {
            id: id(10),
            node: Box::new(ComprehensionNode {
                iter_var: "x".to_string(),
                iter_var2: None,
                iter_range: range,
                accu_var: accu.to_string(),
                accu_init: konst(11, Value::Bool(true)),
                loop_cond: Interpretable::NotStrictlyFalse {
                    id: id(12),
                    operand: Box::new(var(13, accu)),
                },
                loop_step: step,
                result: var(14, accu),
            }),
        }
    }

    #[test]
    fn comprehension_all_true() {
        let act = EmptyActivation;
        let range = konst(2, Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        assert_eq!(all_positive(range).eval(&act), Value::Bool(true));
    }

    #[test]
    fn comprehension_all_false_stops_early() {
        // Track how often the loop step runs by iterating over a range
        // whose third element would error: `all` must stop at the first
        // false without touching it.
        let act = EmptyActivation;
        let range = konst(
            2,
            Value::list(vec![Value::Int(1), Value::Int(-2), Value::string("boom")]),
        );
        assert_eq!(all_positive(range).eval(&act), Value::Bool(false));
    }

    #[test]
    fn comprehension_empty_range_returns_accu_init() {
        let act = EmptyActivation;
        let range = konst(2, Value::list(vec![]));
        assert_eq!(all_positive(range).eval(&act), Value::Bool(true));
    }

    #[test]
    fn comprehension_map_iterates_keys_in_order() {
        let act = EmptyActivation;
        let mut m = MapValue::new();
        m.insert(MapKey::Int(3), Value::Int(30));
        m.insert(MapKey::Int(1), Value::Int(10));
        // range.map(k, k) as a comprehension: accu starts [], step appends.
        let accu = "__result__";
        let node = Interpretable::Comprehension {
            id: id(10),
            node: Box::new(ComprehensionNode {
                iter_var: "k".to_string(),
                iter_var2: None,
                iter_range: konst(2, Value::map(m)),
                accu_var: accu.to_string(),
                accu_init: konst(11, Value::list(vec![])),
                loop_cond: konst(12, Value::Bool(true)),
                loop_step: Interpretable::Binary {
                    id: id(13),
                    op: BinaryOp::Add,
                    lhs: Box::new(var(14, accu)),
                    rhs: Box::new(Interpretable::CreateList {
                        id: id(15),
                        elements: vec![var(16, "k")],
                        optional_indices: vec![],
                    }),
                },
                result: var(17, accu),
            }),
        };
        assert_eq!(
            node.eval(&act),
            Value::list(vec![Value::Int(3), Value::Int(1)])
        );
    }

    #[test]
    fn comprehension_two_var_map_iteration() {
        let act = EmptyActivation;
        let mut m = MapValue::new();
        m.insert(MapKey::string("a"), Value::Int(1));
        m.insert(MapKey::string("b"), Value::Int(2));
        // m.all(k, v, v > 0) over (key, value) pairs.
        let accu = "__result__";
        let step = and(
            var(20, accu),
            Interpretable::Binary {
                id: id(21),
                op: BinaryOp::Gt,
                lhs: Box::new(var(22, "v")),
                rhs: Box::new(konst(23, Value::Int(0))),
            },
        );
        let node = Interpretable::Comprehension {
            id: id(10),
            node: Box::new(ComprehensionNode {
                iter_var: "k".to_string(),
                iter_var2: Some("v".to_string()),
                iter_range: konst(2, Value::map(m)),
                accu_var: accu.to_string(),
                accu_init: konst(11, Value::Bool(true)),
                loop_cond: Interpretable::NotStrictlyFalse {
                    id: id(12),
                    operand: Box::new(var(13, accu)),
                },
                loop_step: step,
                result: var(14, accu),
            }),
        };
        assert_eq!(node.eval(&act), Value::Bool(true));
    }

    #[test]
    fn comprehension_non_iterable_range_errors() {
        let act = EmptyActivation;
        assert!(all_positive(konst(2, Value::Int(3))).eval(&act).is_error());
    }

    #[test]
    fn comprehension_step_error_propagates() {
        let act = EmptyActivation;
        // [1, "x"].all(x, x > 0): the comparison on "x" errors and the
        // error surfaces through the accumulator.
        let range = konst(2, Value::list(vec![Value::string("x")]));
        // step without the && guard so the error reaches accu directly
        let node = Interpretable::Comprehension {
            id: id(10),
            node: Box::new(ComprehensionNode {
                iter_var: "x".to_string(),
                iter_var2: None,
                iter_range: range,
                accu_var: "__result__".to_string(),
                accu_init: konst(11, Value::Bool(true)),
                loop_cond: konst(12, Value::Bool(true)),
                loop_step: Interpretable::Binary {
                    id: id(13),
                    op: BinaryOp::Gt,
                    lhs: Box::new(var(14, "x")),
                    rhs: Box::new(konst(15, Value::Int(0))),
                },
                result: var(16, "__result__"),
            }),
        };
        assert!(node.eval(&act).is_error());
    }

    // ── Attribute nodes over activations ───────────────────────

    #[test]
    fn attr_node_resolves_variables() {
        let mut act = MapActivation::new();
        act.bind("x", Value::Int(5));
        assert_eq!(var(1, "x").eval(&act), Value::Int(5));
        assert!(var(1, "y").eval(&act).is_error());
    }

    #[test]
    fn operators_lower_from_token_table() {
        // Guard against drift between the token table and BinaryOp.
        assert_eq!(BinaryOp::from_function(operators::ADD), Some(BinaryOp::Add));
    }
}
