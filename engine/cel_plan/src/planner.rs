//! AST → executable tree lowering.
//!
//! The planner walks the expression arena and emits one executable node
//! per AST node, except where fusion applies: chained selects and indexes
//! collapse into a single attribute with a qualifier list, and namespaced
//! member calls collapse into qualified global calls.
//!
//! Planning never fails. Malformed input (invalid ids, bad operator
//! arity, unresolvable struct types) lowers to constant error nodes, so
//! the planned tree is always a total evaluation function.

use std::sync::Arc;

use cel_ir::{
    operators, Ast, BinaryOp, CelType, Constant, ExprId, ExprKind, Reference, StringInterner,
};

use cel_eval::errors::{generic_error, unknown_type};
use cel_eval::{
    Attribute, ComprehensionNode, ComputedQualifier, ConversionTarget, Dispatcher, IndexQualifier,
    Interpretable, Qualifier, StringQualifier, TypeProvider, Value,
};

use crate::container::Container;
use crate::program::PlannerOptions;

/// Plans one AST against a dispatcher, provider, and options.
pub struct Planner<'a> {
    ast: &'a Ast,
    interner: &'a StringInterner,
    dispatcher: Arc<dyn Dispatcher>,
    provider: Arc<dyn TypeProvider>,
    container: &'a Container,
    legacy_enums: bool,
}

impl<'a> Planner<'a> {
    /// Create a planner over a checked (or unchecked) AST.
    pub fn new(
        ast: &'a Ast,
        interner: &'a StringInterner,
        dispatcher: Arc<dyn Dispatcher>,
        provider: Arc<dyn TypeProvider>,
        options: &'a PlannerOptions,
    ) -> Self {
        Planner {
            ast,
            interner,
            dispatcher,
            provider,
            container: &options.container,
            legacy_enums: options.legacy_enums,
        }
    }

    /// Plan the AST's root expression.
    pub fn plan(&self) -> Interpretable {
        tracing::debug!(root = ?self.ast.root, container = self.container.name(), "planning expression");
        self.plan_expr(self.ast.root)
    }

    fn plan_expr(&self, id: ExprId) -> Interpretable {
        let Some(kind) = self.ast.arena.kind(id) else {
            return self.error_node(id, "invalid expression id");
        };
        match kind {
            ExprKind::Int(_)
            | ExprKind::Uint(_)
            | ExprKind::Double(_)
            | ExprKind::Bool(_)
            | ExprKind::String(_)
            | ExprKind::Bytes(_)
            | ExprKind::Null => Interpretable::constant(id, self.literal_value(kind)),

            ExprKind::Ident(name) => self.plan_ident(id, self.interner.lookup(name)),

            ExprKind::Select {
                operand,
                field,
                test_only,
                optional,
            } => self.plan_select(id, operand, self.interner.lookup(field), test_only, optional),

            ExprKind::Call {
                target,
                function,
                args,
            } => self.plan_call(id, target, self.interner.lookup(function), args),

            ExprKind::List {
                elements,
                optional_indices,
            } => Interpretable::CreateList {
                id,
                elements: self
                    .ast
                    .arena
                    .list(elements)
                    .iter()
                    .map(|element| self.plan_expr(*element))
                    .collect(),
                optional_indices: self.ast.arena.optional_indices(optional_indices).to_vec(),
            },

            ExprKind::Map { entries } => self.plan_map(id, entries),

            ExprKind::Struct { type_name, fields } => {
                self.plan_struct(id, self.interner.lookup(type_name), fields)
            }

            ExprKind::Comprehension {
                iter_var,
                iter_var2,
                iter_range,
                accu_var,
                accu_init,
                loop_cond,
                loop_step,
                result,
            } => Interpretable::Comprehension {
                id,
                node: Box::new(ComprehensionNode {
                    iter_var: self.interner.lookup(iter_var).to_string(),
                    iter_var2: (!iter_var2.is_empty())
                        .then(|| self.interner.lookup(iter_var2).to_string()),
                    iter_range: self.plan_expr(iter_range),
                    accu_var: self.interner.lookup(accu_var).to_string(),
                    accu_init: self.plan_expr(accu_init),
                    loop_cond: self.plan_expr(loop_cond),
                    loop_step: self.plan_expr(loop_step),
                    result: self.plan_expr(result),
                }),
            },
        }
    }

    // Identifiers and Selects

    fn plan_ident(&self, id: ExprId, name: &str) -> Interpretable {
        if let Some(node) = self.plan_reference_constant(id) {
            return node;
        }
        if let Some(Reference::Variable(variable)) = self.ast.reference(id) {
            if variable.name != name {
                return Interpretable::attribute(Attribute::absolute(id, &variable.name));
            }
        }
        if let Some(node) = self.plan_type_constant(id) {
            return node;
        }
        self.plan_name_attribute(id, name)
    }

    fn plan_select(
        &self,
        id: ExprId,
        operand: ExprId,
        field: &str,
        test_only: bool,
        optional: bool,
    ) -> Interpretable {
        if let Some(node) = self.plan_reference_constant(id) {
            return node;
        }
        if let Some(node) = self.plan_type_constant(id) {
            return node;
        }
        if !test_only && !optional {
            // Attribute folding: the checker's canonical name wins, and
            // without checker output a pure select chain folds to its
            // dotted name.
            if let Some(Reference::Variable(variable)) = self.ast.reference(id) {
                return Interpretable::attribute(Attribute::absolute(id, &variable.name));
            }
            if self.ast.references.is_none() {
                if let Some(dotted) = self.dotted_name(id) {
                    return self.plan_name_attribute(id, &dotted);
                }
            }
        }
        if test_only {
            return Interpretable::HasField {
                id,
                operand: Box::new(self.plan_expr(operand)),
                field: field.to_string(),
            };
        }
        let operand_node = self.plan_expr(operand);
        let mut attr = self.as_attribute(operand_node);
        attr.add_qualifier(Qualifier::String(StringQualifier {
            id,
            field: field.to_string(),
            optional,
        }));
        Interpretable::attribute(attr)
    }

    /// A constant or value-bound variable reference plans to a constant.
    fn plan_reference_constant(&self, id: ExprId) -> Option<Interpretable> {
        match self.ast.reference(id)? {
            Reference::Constant(constant) => Some(Interpretable::constant(
                id,
                self.constant_value(id, &constant.value, &constant.name),
            )),
            Reference::Variable(variable) => {
                let value = variable.value.as_ref()?;
                Some(Interpretable::constant(
                    id,
                    self.constant_value(id, value, &variable.name),
                ))
            }
            Reference::Function(_) => None,
        }
    }

    /// An expression typed `Type(T)` plans to the type value of `T`.
    fn plan_type_constant(&self, id: ExprId) -> Option<Interpretable> {
        let Some(CelType::Type(inner)) = self.ast.expr_type(id) else {
            return None;
        };
        let name = inner
            .as_ref()
            .map_or("type", |ty| ty.runtime_type_name());
        Some(Interpretable::constant(id, Value::type_value(name.to_string())))
    }

    /// Convert a checker constant, applying the numeric/enum rules.
    fn constant_value(&self, id: ExprId, constant: &Constant, ref_name: &str) -> Value {
        match constant {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Uint(u) => Value::Uint(*u),
            Constant::Double(d) => Value::Double(*d),
            Constant::String(s) => Value::string(s.clone()),
            Constant::Bytes(b) => Value::bytes(b.clone()),
            Constant::Int(n) => match self.ast.expr_type(id) {
                Some(CelType::Int | CelType::Uint) => Value::Int(*n),
                Some(CelType::Opaque(enum_name)) => self.enum_constant(enum_name, *n),
                _ => {
                    // A reference like pkg.Color.RED carries its enum type
                    // as the qualifier prefix of the canonical name.
                    match ref_name.rsplit_once('.') {
                        Some((prefix, _)) if self.provider.find_enum_type(prefix).is_some() => {
                            self.enum_constant(prefix, *n)
                        }
                        _ => Value::Int(*n),
                    }
                }
            },
        }
    }

    fn enum_constant(&self, enum_name: &str, ordinal: i64) -> Value {
        if self.legacy_enums {
            Value::Int(ordinal)
        } else {
            Value::enum_value(enum_name.to_string(), ordinal)
        }
    }

    /// Build an attribute for a (possibly dotted) name under the container.
    fn plan_name_attribute(&self, id: ExprId, name: &str) -> Interpretable {
        let mut candidates = self.container.candidates(name);
        let attr = if candidates.len() == 1 {
            Attribute::absolute(id, &candidates.remove(0))
        } else {
            Attribute::maybe(id, candidates)
        };
        Interpretable::attribute(attr)
    }

    /// Fold a pure ident/select chain into its dotted name.
    fn dotted_name(&self, id: ExprId) -> Option<String> {
        match self.ast.arena.kind(id)? {
            ExprKind::Ident(name) => Some(self.interner.lookup(name).to_string()),
            ExprKind::Select {
                operand,
                field,
                test_only: false,
                optional: false,
            } => {
                let mut base = self.dotted_name(operand)?;
                base.push('.');
                base.push_str(self.interner.lookup(field));
                Some(base)
            }
            _ => None,
        }
    }

    /// Reuse an operand's attribute for fusion, or root a relative one.
    fn as_attribute(&self, operand: Interpretable) -> Attribute {
        match operand {
            Interpretable::Attr { attr, .. } => attr,
            other => Attribute::relative(other.id(), other),
        }
    }

    // Calls

    fn plan_call(
        &self,
        id: ExprId,
        target: ExprId,
        function: &str,
        args: cel_ir::ExprRange,
    ) -> Interpretable {
        let arg_ids = self.ast.arena.list(args).to_vec();

        if function == operators::BLOCK {
            return self.plan_block(id, &arg_ids);
        }

        // Built-in operators lower to dedicated nodes.
        match (function, arg_ids.as_slice()) {
            (operators::LOGICAL_AND, [lhs, rhs]) => {
                return Interpretable::And {
                    id,
                    lhs: Box::new(self.plan_expr(*lhs)),
                    rhs: Box::new(self.plan_expr(*rhs)),
                };
            }
            (operators::LOGICAL_OR, [lhs, rhs]) => {
                return Interpretable::Or {
                    id,
                    lhs: Box::new(self.plan_expr(*lhs)),
                    rhs: Box::new(self.plan_expr(*rhs)),
                };
            }
            (operators::CONDITIONAL, [cond, truthy, falsy]) => {
                return Interpretable::Conditional {
                    id,
                    cond: Box::new(self.plan_expr(*cond)),
                    truthy: Box::new(self.plan_expr(*truthy)),
                    falsy: Box::new(self.plan_expr(*falsy)),
                };
            }
            (operators::LOGICAL_NOT, [operand]) => {
                return Interpretable::Not {
                    id,
                    operand: Box::new(self.plan_expr(*operand)),
                };
            }
            (operators::NEGATE, [operand]) => {
                return Interpretable::Neg {
                    id,
                    operand: Box::new(self.plan_expr(*operand)),
                };
            }
            (operators::NOT_STRICTLY_FALSE, [operand]) => {
                return Interpretable::NotStrictlyFalse {
                    id,
                    operand: Box::new(self.plan_expr(*operand)),
                };
            }
            (operators::INDEX, [operand, index]) => {
                return self.plan_index(id, *operand, *index, false);
            }
            (operators::OPT_INDEX, [operand, index]) => {
                return self.plan_index(id, *operand, *index, true);
            }
            _ => {}
        }

        if !target.is_valid() {
            if let Some(op) = BinaryOp::from_function(function) {
                if let [lhs, rhs] = arg_ids.as_slice() {
                    return Interpretable::Binary {
                        id,
                        op,
                        lhs: Box::new(self.plan_expr(*lhs)),
                        rhs: Box::new(self.plan_expr(*rhs)),
                    };
                }
            }
            // Conversion intrinsics: a single-argument int/uint/double/
            // string/bytes/bool/type/dyn call.
            if let [operand] = arg_ids.as_slice() {
                if let Some(conversion) = ConversionTarget::from_function(function) {
                    return Interpretable::Convert {
                        id,
                        operand: Box::new(self.plan_expr(*operand)),
                        target: conversion,
                        provider: Arc::clone(&self.provider),
                    };
                }
            }
        }

        // Member calls: a dotted target naming a registered qualified
        // function is really a namespace, not a receiver.
        let (function, planned_args, type_arg_ids) = if target.is_valid() {
            match self.qualified_function(target, function) {
                Some(qualified) => (
                    qualified,
                    arg_ids.iter().map(|arg| self.plan_expr(*arg)).collect(),
                    arg_ids.clone(),
                ),
                None => {
                    let mut nodes = Vec::with_capacity(arg_ids.len() + 1);
                    nodes.push(self.plan_expr(target));
                    nodes.extend(arg_ids.iter().map(|arg| self.plan_expr(*arg)));
                    let mut type_ids = Vec::with_capacity(arg_ids.len() + 1);
                    type_ids.push(target);
                    type_ids.extend_from_slice(&arg_ids);
                    (function.to_string(), nodes, type_ids)
                }
            }
        } else {
            (
                function.to_string(),
                arg_ids.iter().map(|arg| self.plan_expr(*arg)).collect::<Vec<_>>(),
                arg_ids.clone(),
            )
        };

        let overload_id = self.select_overload(id, &function, &type_arg_ids);
        Interpretable::Call {
            id,
            function,
            overload_id,
            args: planned_args,
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    /// The combined `target.function` name, when the target is a pure
    /// name chain and some container candidate of the combined form has
    /// overloads registered.
    fn qualified_function(&self, target: ExprId, function: &str) -> Option<String> {
        let qualifier = self.dotted_name(target)?;
        let combined = format!("{qualifier}.{function}");
        self.container
            .candidates(&combined)
            .into_iter()
            .find(|candidate| !self.dispatcher.find_overloads(candidate).is_empty())
    }

    /// Plan-time overload selection.
    ///
    /// A single checked overload wins; zero overloads (or no function
    /// reference at all) fall back to the arity-keyed id; several
    /// overloads tie-break to the first registered unless an argument is
    /// `dyn`, which defers to runtime dispatch via the fallback.
    fn select_overload(&self, id: ExprId, function: &str, arg_ids: &[ExprId]) -> String {
        let fallback = || format!("{function}_{}", arg_ids.len());
        let Some(Reference::Function(reference)) = self.ast.reference(id) else {
            return fallback();
        };
        match reference.overload_ids.as_slice() {
            [] => fallback(),
            [only] => only.clone(),
            [first, ..] => {
                let any_dyn = arg_ids.iter().any(|arg| {
                    matches!(self.ast.expr_type(*arg), Some(ty) if ty.is_dyn())
                });
                if any_dyn {
                    fallback()
                } else {
                    first.clone()
                }
            }
        }
    }

    /// Lower `_[_]` / `_[?_]` onto the operand's attribute.
    fn plan_index(
        &self,
        id: ExprId,
        operand: ExprId,
        index: ExprId,
        optional: bool,
    ) -> Interpretable {
        let operand_node = self.plan_expr(operand);
        let mut attr = self.as_attribute(operand_node);
        let qualifier = match self.ast.arena.kind(index) {
            Some(ExprKind::String(name)) => Qualifier::String(StringQualifier {
                id,
                field: self.interner.lookup(name).to_string(),
                optional,
            }),
            Some(kind) if kind.is_literal() => Qualifier::Index(IndexQualifier {
                id,
                index: self.literal_value(kind),
                optional,
            }),
            _ => Qualifier::Computed(ComputedQualifier {
                id,
                operand: Box::new(self.plan_expr(index)),
                optional,
            }),
        };
        attr.add_qualifier(qualifier);
        Interpretable::attribute(attr)
    }

    /// Lower `cel.@block(bindings, result)`.
    fn plan_block(&self, id: ExprId, arg_ids: &[ExprId]) -> Interpretable {
        let [bindings, result] = arg_ids else {
            return self.error_node(id, "cel.@block requires a binding list and a result");
        };
        let Some(ExprKind::List { elements, .. }) = self.ast.arena.kind(*bindings) else {
            return self.error_node(id, "cel.@block bindings must be a list literal");
        };
        let slot_ids = self.ast.arena.list(elements).to_vec();
        let result = self.plan_expr(*result);
        if slot_ids.is_empty() {
            return result;
        }
        Interpretable::Block {
            id,
            slots: slot_ids.iter().map(|slot| self.plan_expr(*slot)).collect(),
            result: Box::new(result),
        }
    }

    // Aggregates

    fn plan_map(&self, id: ExprId, entries: cel_ir::MapEntryRange) -> Interpretable {
        let entries = self.ast.arena.map_entries(entries).to_vec();
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        let mut optional_indices = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            keys.push(self.plan_expr(entry.key));
            values.push(self.plan_expr(entry.value));
            if entry.optional {
                optional_indices.push(i as u32);
            }
        }
        Interpretable::CreateMap {
            id,
            keys,
            values,
            optional_indices,
        }
    }

    fn plan_struct(
        &self,
        id: ExprId,
        type_name: &str,
        fields: cel_ir::FieldInitRange,
    ) -> Interpretable {
        // The checked type wins; otherwise search the container namespace.
        let resolved = match self.ast.expr_type(id) {
            Some(CelType::Struct(name)) => Some(name.clone()),
            _ => self
                .container
                .candidates(type_name)
                .into_iter()
                .find_map(|candidate| {
                    self.provider
                        .find_struct_type(&candidate)
                        .map(|ty| ty.name)
                }),
        };
        let Some(resolved) = resolved else {
            return Interpretable::constant(id, unknown_type(type_name, id));
        };

        let inits = self.ast.arena.field_inits(fields).to_vec();
        let mut field_names = Vec::with_capacity(inits.len());
        let mut field_values = Vec::with_capacity(inits.len());
        let mut field_types = Vec::with_capacity(inits.len());
        let mut optional_indices = Vec::new();
        for (i, init) in inits.iter().enumerate() {
            let field = self.interner.lookup(init.field).to_string();
            field_types.push(
                self.provider
                    .find_struct_field_type(&resolved, &field)
                    .map(|ty| self.declared_field_type(ty)),
            );
            field_names.push(field);
            field_values.push(self.plan_expr(init.value));
            if init.optional {
                optional_indices.push(i as u32);
            }
        }
        Interpretable::CreateStruct {
            id,
            type_name: resolved,
            field_names,
            field_values,
            field_types,
            optional_indices,
            provider: Arc::clone(&self.provider),
        }
    }

    /// Under the legacy-enum flag, enum-typed fields coerce to `int`,
    /// recursively through list elements and map values.
    fn declared_field_type(&self, ty: CelType) -> CelType {
        if !self.legacy_enums {
            return ty;
        }
        match ty {
            CelType::Opaque(name) if self.provider.find_enum_type(&name).is_some() => CelType::Int,
            CelType::List(element) => CelType::List(Box::new(self.declared_field_type(*element))),
            CelType::Map(key, value) => {
                CelType::Map(key, Box::new(self.declared_field_type(*value)))
            }
            other => other,
        }
    }

    // Helpers

    fn literal_value(&self, kind: ExprKind) -> Value {
        match kind {
            ExprKind::Int(i) => Value::Int(i),
            ExprKind::Uint(u) => Value::Uint(u),
            ExprKind::Double(bits) => Value::Double(f64::from_bits(bits)),
            ExprKind::Bool(b) => Value::Bool(b),
            ExprKind::String(name) => Value::string(self.interner.lookup(name).to_string()),
            ExprKind::Bytes(bytes) => Value::bytes(self.interner.lookup_bytes(bytes).to_vec()),
            _ => Value::Null,
        }
    }

    fn error_node(&self, id: ExprId, message: &str) -> Interpretable {
        Interpretable::constant(id, generic_error(message, id))
    }
}
