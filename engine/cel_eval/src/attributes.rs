//! Attributes and qualifiers.
//!
//! An attribute is a compiled variable-plus-selection path: the root names
//! a variable (or a computed value), and each qualifier is one field or
//! index step. The planner fuses chains of selects and indexes into a
//! single attribute so that `x.a.b` is one variable lookup plus two cheap
//! qualifier steps, not three nested nodes.
//!
//! Both variant sets are closed enums with exhaustive dispatch; the
//! capability surface (`resolve`, `qualify`, `id`, `qualifiers`) is fixed.
//! Qualifier lists grow during planning only; wrapping an attribute into
//! an `Attr` node freezes it.

use smallvec::SmallVec;

use crate::activation::Activation;
use crate::errors::{
    field_selection_unsupported, index_out_of_range, invalid_argument, invalid_index,
    no_such_attribute, no_such_field, no_such_key, not_indexable, type_mismatch,
    undeclared_variable,
};
use crate::interpretable::Interpretable;
use crate::value::{MapKey, Value};
use cel_ir::ExprId;

type QualifierList = SmallVec<[Qualifier; 4]>;

/// A compiled variable-plus-selection path.
#[derive(Clone, Debug)]
pub enum Attribute {
    Absolute(AbsoluteAttribute),
    Relative(RelativeAttribute),
    Conditional(ConditionalAttribute),
    Maybe(MaybeAttribute),
}

/// An attribute rooted at a free variable.
#[derive(Clone, Debug)]
pub struct AbsoluteAttribute {
    id: ExprId,
    /// The dotted name, pre-split. Resolution tries the head segment as a
    /// variable first, then the joined name (bindings may contain dots),
    /// and treats trailing segments as synthesized field selections.
    name_path: SmallVec<[String; 2]>,
    qualifiers: QualifierList,
}

/// An attribute rooted at a computed value.
#[derive(Clone, Debug)]
pub struct RelativeAttribute {
    id: ExprId,
    operand: Box<Interpretable>,
    qualifiers: QualifierList,
}

/// A ternary over two attributes.
#[derive(Clone, Debug)]
pub struct ConditionalAttribute {
    id: ExprId,
    cond: Box<Interpretable>,
    truthy: Box<Attribute>,
    falsy: Box<Attribute>,
    /// Qualifiers appended after construction, mirrored into both
    /// branches; kept locally so `qualifiers()` reports what was added.
    qualifiers: QualifierList,
}

/// A disjunction of absolute candidates tried in order.
#[derive(Clone, Debug)]
pub struct MaybeAttribute {
    id: ExprId,
    candidates: Vec<AbsoluteAttribute>,
    /// Mirror of the qualifiers fanned out to every candidate.
    qualifiers: QualifierList,
}

impl Attribute {
    /// An absolute attribute for a dotted name.
    pub fn absolute(id: ExprId, name: &str) -> Attribute {
        Attribute::Absolute(AbsoluteAttribute::new(id, name))
    }

    /// A relative attribute over a computed operand.
    pub fn relative(id: ExprId, operand: Interpretable) -> Attribute {
        Attribute::Relative(RelativeAttribute {
            id,
            operand: Box::new(operand),
            qualifiers: QualifierList::new(),
        })
    }

    /// A conditional attribute over two branches.
    pub fn conditional(
        id: ExprId,
        cond: Interpretable,
        truthy: Attribute,
        falsy: Attribute,
    ) -> Attribute {
        Attribute::Conditional(ConditionalAttribute {
            id,
            cond: Box::new(cond),
            truthy: Box::new(truthy),
            falsy: Box::new(falsy),
            qualifiers: QualifierList::new(),
        })
    }

    /// A maybe attribute over candidate names, most-specific first.
    pub fn maybe(id: ExprId, candidates: impl IntoIterator<Item = String>) -> Attribute {
        Attribute::Maybe(MaybeAttribute {
            id,
            candidates: candidates
                .into_iter()
                .map(|name| AbsoluteAttribute::new(id, &name))
                .collect(),
            qualifiers: QualifierList::new(),
        })
    }

    /// The expression this attribute was planned for.
    pub fn id(&self) -> ExprId {
        match self {
            Attribute::Absolute(a) => a.id,
            Attribute::Relative(a) => a.id,
            Attribute::Conditional(a) => a.id,
            Attribute::Maybe(a) => a.id,
        }
    }

    /// Append a qualifier step.
    ///
    /// Conditional and maybe attributes fan the qualifier out to every
    /// branch/candidate and additionally record it locally.
    pub fn add_qualifier(&mut self, qualifier: Qualifier) {
        match self {
            Attribute::Absolute(a) => a.qualifiers.push(qualifier),
            Attribute::Relative(a) => a.qualifiers.push(qualifier),
            Attribute::Conditional(a) => {
                a.truthy.add_qualifier(qualifier.clone());
                a.falsy.add_qualifier(qualifier.clone());
                a.qualifiers.push(qualifier);
            }
            Attribute::Maybe(a) => {
                for candidate in &mut a.candidates {
                    candidate.qualifiers.push(qualifier.clone());
                }
                a.qualifiers.push(qualifier);
            }
        }
    }

    /// The qualifiers appended to this attribute.
    pub fn qualifiers(&self) -> &[Qualifier] {
        match self {
            Attribute::Absolute(a) => &a.qualifiers,
            Attribute::Relative(a) => &a.qualifiers,
            Attribute::Conditional(a) => &a.qualifiers,
            Attribute::Maybe(a) => &a.qualifiers,
        }
    }

    /// Resolve the attribute against an activation.
    pub fn resolve(&self, activation: &dyn Activation) -> Value {
        match self {
            Attribute::Absolute(a) => a.resolve(activation),
            Attribute::Relative(a) => a.resolve(activation),
            Attribute::Conditional(a) => a.resolve(activation),
            Attribute::Maybe(a) => a.resolve(activation),
        }
    }

    /// Rebuild the attribute with every embedded executable node passed
    /// through `f`.
    ///
    /// This is reconstruction for post-plan rewrite passes, not mutation:
    /// the qualifier lists and structure are preserved as-is.
    #[must_use]
    pub fn map_nodes(self, f: &mut dyn FnMut(Interpretable) -> Interpretable) -> Attribute {
        match self {
            Attribute::Absolute(a) => Attribute::Absolute(AbsoluteAttribute {
                id: a.id,
                name_path: a.name_path,
                qualifiers: map_qualifier_nodes(a.qualifiers, f),
            }),
            Attribute::Relative(a) => Attribute::Relative(RelativeAttribute {
                id: a.id,
                operand: Box::new(f(*a.operand)),
                qualifiers: map_qualifier_nodes(a.qualifiers, f),
            }),
            Attribute::Conditional(a) => Attribute::Conditional(ConditionalAttribute {
                id: a.id,
                cond: Box::new(f(*a.cond)),
                truthy: Box::new(a.truthy.map_nodes(f)),
                falsy: Box::new(a.falsy.map_nodes(f)),
                qualifiers: map_qualifier_nodes(a.qualifiers, f),
            }),
            Attribute::Maybe(a) => Attribute::Maybe(MaybeAttribute {
                id: a.id,
                candidates: a
                    .candidates
                    .into_iter()
                    .map(|candidate| AbsoluteAttribute {
                        id: candidate.id,
                        name_path: candidate.name_path,
                        qualifiers: map_qualifier_nodes(candidate.qualifiers, f),
                    })
                    .collect(),
                qualifiers: map_qualifier_nodes(a.qualifiers, f),
            }),
        }
    }
}

fn map_qualifier_nodes(
    qualifiers: QualifierList,
    f: &mut dyn FnMut(Interpretable) -> Interpretable,
) -> QualifierList {
    qualifiers
        .into_iter()
        .map(|qualifier| match qualifier {
            Qualifier::Computed(q) => Qualifier::Computed(ComputedQualifier {
                id: q.id,
                operand: Box::new(f(*q.operand)),
                optional: q.optional,
            }),
            other => other,
        })
        .collect()
}

impl AbsoluteAttribute {
    fn new(id: ExprId, name: &str) -> Self {
        AbsoluteAttribute {
            id,
            name_path: name.split('.').map(str::to_string).collect(),
            qualifiers: QualifierList::new(),
        }
    }

    /// The pre-split dotted name this attribute resolves.
    pub fn name_path(&self) -> &[String] {
        &self.name_path
    }

    fn resolve(&self, activation: &dyn Activation) -> Value {
        let Some(head) = self.name_path.first() else {
            return no_such_attribute(self.id);
        };
        if let Some(mut obj) = activation.resolve(head) {
            // Trailing path segments act as synthesized field selections.
            for segment in &self.name_path[1..] {
                if obj.is_error_or_unknown() {
                    return obj;
                }
                obj = qualify_string(obj, segment, false, self.id);
            }
            return apply_qualifiers(obj, &self.qualifiers, activation);
        }
        // A binding whose name itself contains dots.
        if self.name_path.len() > 1 {
            let joined = self.name_path.join(".");
            if let Some(obj) = activation.resolve(&joined) {
                return apply_qualifiers(obj, &self.qualifiers, activation);
            }
        }
        undeclared_variable(head, self.id)
    }
}

impl RelativeAttribute {
    fn resolve(&self, activation: &dyn Activation) -> Value {
        let obj = self.operand.eval(activation);
        if obj.is_error_or_unknown() {
            return obj;
        }
        apply_qualifiers(obj, &self.qualifiers, activation)
    }
}

impl ConditionalAttribute {
    fn resolve(&self, activation: &dyn Activation) -> Value {
        match self.cond.eval(activation) {
            cond @ Value::Error(_) => cond,
            Value::Unknown(cond_unknown) => {
                // Branch qualifiers already include the fanned-out ones, so
                // the local mirror is not re-applied here.
                let truthy = self.truthy.resolve(activation);
                let falsy = self.falsy.resolve(activation);
                match (truthy, falsy) {
                    (Value::Unknown(t), Value::Unknown(f)) => Value::unknown(t.merge(&f)),
                    _ => Value::Unknown(cond_unknown),
                }
            }
            Value::Bool(true) => self.truthy.resolve(activation),
            Value::Bool(false) => self.falsy.resolve(activation),
            other => type_mismatch("bool", &other.runtime_type_name(), self.id),
        }
    }
}

impl MaybeAttribute {
    fn resolve(&self, activation: &dyn Activation) -> Value {
        let mut last_error = None;
        for candidate in &self.candidates {
            let value = candidate.resolve(activation);
            if !value.is_error() {
                return value;
            }
            last_error = Some(value);
        }
        last_error.unwrap_or_else(|| no_such_attribute(self.id))
    }
}

/// One field or index step of an attribute path.
#[derive(Clone, Debug)]
pub enum Qualifier {
    String(StringQualifier),
    Index(IndexQualifier),
    Computed(ComputedQualifier),
}

/// Field-name access.
#[derive(Clone, Debug)]
pub struct StringQualifier {
    pub id: ExprId,
    pub field: String,
    pub optional: bool,
}

/// Static-index access.
#[derive(Clone, Debug)]
pub struct IndexQualifier {
    pub id: ExprId,
    pub index: Value,
    pub optional: bool,
}

/// Dynamic-index access: evaluates its operand, then indexes.
#[derive(Clone, Debug)]
pub struct ComputedQualifier {
    pub id: ExprId,
    pub operand: Box<Interpretable>,
    pub optional: bool,
}

impl Qualifier {
    /// The expression this qualifier was planned for.
    pub fn id(&self) -> ExprId {
        match self {
            Qualifier::String(q) => q.id,
            Qualifier::Index(q) => q.id,
            Qualifier::Computed(q) => q.id,
        }
    }

    /// Apply this qualifier step to a value.
    pub fn qualify(&self, activation: &dyn Activation, obj: Value) -> Value {
        match self {
            Qualifier::String(q) => qualify_string(obj, &q.field, q.optional, q.id),
            Qualifier::Index(q) => qualify_index(obj, &q.index, q.optional, q.id),
            Qualifier::Computed(q) => {
                let index = q.operand.eval(activation);
                qualify_index(obj, &index, q.optional, q.id)
            }
        }
    }
}

fn apply_qualifiers(
    mut obj: Value,
    qualifiers: &[Qualifier],
    activation: &dyn Activation,
) -> Value {
    for qualifier in qualifiers {
        if obj.is_error_or_unknown() {
            return obj;
        }
        obj = qualifier.qualify(activation, obj);
    }
    obj
}

/// Field selection with optional-aware semantics.
fn qualify_string(obj: Value, field: &str, optional: bool, id: ExprId) -> Value {
    let (obj, optional) = match obj {
        Value::Error(_) | Value::Unknown(_) => return obj,
        Value::None => return Value::None,
        Value::Some(inner) => ((*inner).clone(), true),
        other => (other, optional),
    };
    let selected = match &obj {
        Value::Struct(s) => match s.field(field) {
            Some(value) => value.clone(),
            None if optional => return Value::None,
            None => return no_such_field(field, id),
        },
        Value::Map(m) => match m.get(&MapKey::string(field)) {
            Some(value) => value.clone(),
            None if optional => return Value::None,
            None => return no_such_key(format_args!("'{field}'"), id),
        },
        other => return field_selection_unsupported(&other.runtime_type_name(), id),
    };
    if optional {
        Value::some(selected)
    } else {
        selected
    }
}

/// Index access with optional-aware semantics.
fn qualify_index(obj: Value, index: &Value, optional: bool, id: ExprId) -> Value {
    let (obj, optional) = match obj {
        Value::Error(_) | Value::Unknown(_) => return obj,
        Value::None => return Value::None,
        Value::Some(inner) => ((*inner).clone(), true),
        other => (other, optional),
    };
    if index.is_error_or_unknown() {
        return index.clone();
    }
    let selected = match &obj {
        Value::List(items) => match positional_index(index, items.len(), optional, id) {
            Ok(i) => items[i].clone(),
            Err(error) => return error,
        },
        Value::Map(m) => {
            let found = MapKey::for_lookup(index).and_then(|key| m.get(&key).cloned());
            match found {
                Some(value) => value,
                None if optional => return Value::None,
                None => return no_such_key(index, id),
            }
        }
        Value::String(s) => {
            let count = s.chars().count();
            match positional_index(index, count, optional, id) {
                // Indexing is by code point, yielding a one-character string.
                Ok(i) => match s.chars().nth(i) {
                    Some(c) => Value::string(c.to_string()),
                    None => return index_out_of_range(index, count, id),
                },
                Err(error) => return error,
            }
        }
        Value::Bytes(b) => match positional_index(index, b.len(), optional, id) {
            Ok(i) => Value::Uint(u64::from(b[i])),
            Err(error) => return error,
        },
        other => return not_indexable(&other.runtime_type_name(), id),
    };
    if optional {
        Value::some(selected)
    } else {
        selected
    }
}

/// Normalize an index value against a length.
///
/// `Int` passes through, `Uint` widens (values above `i64::MAX` are
/// invalid), finite integral `Double` narrows; anything else is an
/// invalid-argument error. Out-of-range indexes error, or become
/// `Optional.none()` under optional semantics.
fn positional_index(
    index: &Value,
    len: usize,
    optional: bool,
    id: ExprId,
) -> Result<usize, Value> {
    let i = match index {
        Value::Int(i) => *i,
        Value::Uint(u) => match i64::try_from(*u) {
            Ok(i) => i,
            Err(_) => return Err(invalid_argument(format!("index out of i64 range: {u}"), id)),
        },
        Value::Double(d) if d.is_finite() && d.fract() == 0.0 => *d as i64,
        Value::Double(d) => {
            return Err(invalid_argument(format!("invalid double index: {d}"), id));
        }
        other => return Err(invalid_index(&other.runtime_type_name(), id)),
    };
    if i < 0 || i as usize >= len {
        if optional {
            return Err(Value::None);
        }
        return Err(index_out_of_range(index, len, id));
    }
    Ok(i as usize)
}
