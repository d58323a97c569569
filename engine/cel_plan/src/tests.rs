//! End-to-end planning and evaluation scenarios.
//!
//! Each test builds a macro-expanded AST the way a front end would,
//! plans it through the full `Program` pipeline, and evaluates against a
//! plain map activation.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use cel_eval::{
    Attribute, Dispatcher, EmptyActivation, EnumDescriptor, ErrorKind, FunctionRegistry,
    Interpretable, MapActivation, MapKey, MapValue, StructDescriptor, TypeProvider, TypeRegistry,
    UnknownSet, Value,
};
use cel_ir::{
    operators, Ast, CelType, Constant, ExprArena, ExprId, ExprKind, FieldInit, MapEntry, Name,
    Reference, StringInterner,
};

use crate::{Container, PlannerOptions, Program};

// ── AST construction helpers ───────────────────────────────────

struct ExprBuilder {
    arena: ExprArena,
    interner: StringInterner,
    references: FxHashMap<ExprId, Reference>,
    types: FxHashMap<ExprId, CelType>,
}

impl ExprBuilder {
    fn new() -> Self {
        ExprBuilder {
            arena: ExprArena::new(),
            interner: StringInterner::new(),
            references: FxHashMap::default(),
            types: FxHashMap::default(),
        }
    }

    fn int(&mut self, value: i64) -> ExprId {
        self.arena.alloc(ExprKind::Int(value))
    }

    fn uint(&mut self, value: u64) -> ExprId {
        self.arena.alloc(ExprKind::Uint(value))
    }

    fn boolean(&mut self, value: bool) -> ExprId {
        self.arena.alloc(ExprKind::Bool(value))
    }

    fn string(&mut self, value: &str) -> ExprId {
        let name = self.interner.intern(value);
        self.arena.alloc(ExprKind::String(name))
    }

    fn ident(&mut self, name: &str) -> ExprId {
        let name: Name = self.interner.intern(name);
        self.arena.alloc(ExprKind::Ident(name))
    }

    fn select(&mut self, operand: ExprId, field: &str) -> ExprId {
        let field = self.interner.intern(field);
        self.arena.alloc(ExprKind::Select {
            operand,
            field,
            test_only: false,
            optional: false,
        })
    }

    fn test(&mut self, operand: ExprId, field: &str) -> ExprId {
        let field = self.interner.intern(field);
        self.arena.alloc(ExprKind::Select {
            operand,
            field,
            test_only: true,
            optional: false,
        })
    }

    fn global(&mut self, function: &str, args: &[ExprId]) -> ExprId {
        let function = self.interner.intern(function);
        let args = self.arena.alloc_list(args);
        self.arena.alloc(ExprKind::Call {
            target: ExprId::INVALID,
            function,
            args,
        })
    }

    fn member(&mut self, target: ExprId, function: &str, args: &[ExprId]) -> ExprId {
        let function = self.interner.intern(function);
        let args = self.arena.alloc_list(args);
        self.arena.alloc(ExprKind::Call {
            target,
            function,
            args,
        })
    }

    fn list(&mut self, elements: &[ExprId]) -> ExprId {
        let elements = self.arena.alloc_list(elements);
        self.arena.alloc(ExprKind::List {
            elements,
            optional_indices: cel_ir::IndexRange::EMPTY,
        })
    }

    fn map(&mut self, entries: &[(ExprId, ExprId)]) -> ExprId {
        let entries: Vec<MapEntry> = entries
            .iter()
            .map(|(key, value)| MapEntry {
                key: *key,
                value: *value,
                optional: false,
            })
            .collect();
        let entries = self.arena.alloc_map_entries(&entries);
        self.arena.alloc(ExprKind::Map { entries })
    }

    fn strukt(&mut self, type_name: &str, fields: &[(&str, ExprId)]) -> ExprId {
        let type_name = self.interner.intern(type_name);
        let inits: Vec<FieldInit> = fields
            .iter()
            .map(|(field, value)| FieldInit {
                field: self.interner.intern(field),
                value: *value,
                optional: false,
            })
            .collect();
        let fields = self.arena.alloc_field_inits(&inits);
        self.arena.alloc(ExprKind::Struct { type_name, fields })
    }

    #[expect(clippy::too_many_arguments, reason = "mirrors the AST variant")]
    fn comprehension(
        &mut self,
        iter_var: &str,
        iter_var2: Option<&str>,
        iter_range: ExprId,
        accu_var: &str,
        accu_init: ExprId,
        loop_cond: ExprId,
        loop_step: ExprId,
        result: ExprId,
    ) -> ExprId {
        let iter_var = self.interner.intern(iter_var);
        let iter_var2 = iter_var2.map_or(Name::EMPTY, |v| self.interner.intern(v));
        let accu_var = self.interner.intern(accu_var);
        self.arena.alloc(ExprKind::Comprehension {
            iter_var,
            iter_var2,
            iter_range,
            accu_var,
            accu_init,
            loop_cond,
            loop_step,
            result,
        })
    }

    fn reference(&mut self, id: ExprId, reference: Reference) {
        self.references.insert(id, reference);
    }

    fn typed(&mut self, id: ExprId, ty: CelType) {
        self.types.insert(id, ty);
    }

    fn into_ast(self, root: ExprId) -> (Ast, StringInterner) {
        let mut ast = Ast::new(self.arena, root);
        if !self.references.is_empty() {
            ast = ast.with_references(self.references);
        }
        if !self.types.is_empty() {
            ast = ast.with_types(self.types);
        }
        (ast, self.interner)
    }
}

fn plan_default(builder: ExprBuilder, root: ExprId) -> Program {
    plan_full(
        builder,
        root,
        PlannerOptions::default(),
        Arc::new(FunctionRegistry::new()),
        Arc::new(TypeRegistry::new()),
    )
}

fn plan_with_options(builder: ExprBuilder, root: ExprId, options: PlannerOptions) -> Program {
    plan_full(
        builder,
        root,
        options,
        Arc::new(FunctionRegistry::new()),
        Arc::new(TypeRegistry::new()),
    )
}

fn plan_full(
    builder: ExprBuilder,
    root: ExprId,
    options: PlannerOptions,
    dispatcher: Arc<dyn Dispatcher>,
    provider: Arc<dyn TypeProvider>,
) -> Program {
    let (mut ast, interner) = builder.into_ast(root);
    Program::plan(&mut ast, &interner, dispatcher, provider, &options)
}

/// The macro expansion of `range.all(x, x > 0)`.
fn all_positive(b: &mut ExprBuilder, range: ExprId) -> ExprId {
    let accu = "__result__";
    let accu_init = b.boolean(true);
    let guard_ref = b.ident(accu);
    let loop_cond = b.global(operators::NOT_STRICTLY_FALSE, &[guard_ref]);
    let step_accu = b.ident(accu);
    let x = b.ident("x");
    let zero = b.int(0);
    let predicate = b.global(operators::GREATER, &[x, zero]);
    let loop_step = b.global(operators::LOGICAL_AND, &[step_accu, predicate]);
    let result = b.ident(accu);
    b.comprehension("x", None, range, accu, accu_init, loop_cond, loop_step, result)
}

fn nested_activation() -> MapActivation {
    // x = {a: {b: 7}}
    let mut inner = MapValue::new();
    inner.insert(MapKey::string("b"), Value::Int(7));
    let mut outer = MapValue::new();
    outer.insert(MapKey::string("a"), Value::map(inner));
    let mut act = MapActivation::new();
    act.bind("x", Value::map(outer));
    act
}

// ── Scenario 1: arithmetic and comparison ──────────────────────

#[test]
fn one_plus_two_equals_three() {
    let mut b = ExprBuilder::new();
    let one = b.int(1);
    let two = b.int(2);
    let sum = b.global(operators::ADD, &[one, two]);
    let three = b.int(3);
    let root = b.global(operators::EQUALS, &[sum, three]);

    let program = plan_default(b, root);
    // Integer arithmetic is not pre-folded: the comparison's lhs must
    // still be the addition.
    match program.interpretable() {
        Interpretable::Binary { op, lhs, .. } => {
            assert_eq!(*op, cel_ir::BinaryOp::Eq);
            assert!(matches!(**lhs, Interpretable::Binary { .. }));
        }
        other => panic!("expected binary node, got {other:?}"),
    }
    assert_eq!(program.eval(&EmptyActivation), Value::Bool(true));
}

// ── Scenario 2: attribute fusion ───────────────────────────────

#[test]
fn select_chain_fuses_into_one_absolute_attribute() {
    let mut b = ExprBuilder::new();
    let x = b.ident("x");
    let xa = b.select(x, "a");
    let root = b.select(xa, "b");

    let program = plan_default(b, root);
    match program.interpretable() {
        Interpretable::Attr { attr: Attribute::Absolute(a), .. } => {
            assert_eq!(a.name_path(), ["x", "a", "b"]);
        }
        other => panic!("expected absolute attribute, got {other:?}"),
    }
    assert_eq!(program.eval(&nested_activation()), Value::Int(7));
}

#[test]
fn select_on_computed_operand_fuses_onto_relative_attribute() {
    // {"k": 1}.k
    let mut b = ExprBuilder::new();
    let key = b.string("k");
    let one = b.int(1);
    let map = b.map(&[(key, one)]);
    let root = b.select(map, "k");

    let program = plan_default(b, root);
    assert!(matches!(
        program.interpretable(),
        Interpretable::Attr { attr: Attribute::Relative(_), .. }
    ));
    assert_eq!(program.eval(&EmptyActivation), Value::Int(1));
}

#[test]
fn map_selection_missing_key_and_optional_index() {
    let mut b = ExprBuilder::new();
    let key = b.string("k");
    let one = b.int(1);
    let map = b.map(&[(key, one)]);
    let root = b.select(map, "missing");
    let program = plan_default(b, root);
    match program.eval(&EmptyActivation) {
        Value::Error(e) => assert_eq!(e.kind, ErrorKind::NoSuchKey),
        other => panic!("expected error, got {other:?}"),
    }

    let mut b = ExprBuilder::new();
    let key = b.string("k");
    let one = b.int(1);
    let map = b.map(&[(key, one)]);
    let missing = b.string("missing");
    let root = b.global(operators::OPT_INDEX, &[map, missing]);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::None);
}

// ── Scenario 3: list indexing ──────────────────────────────────

#[test]
fn list_indexing_in_and_out_of_range() {
    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [1, 2, 3].iter().map(|n| b.int(*n)).collect();
    let list = b.list(&elements);
    let index = b.int(1);
    let root = b.global(operators::INDEX, &[list, index]);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Int(2));

    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [1, 2, 3].iter().map(|n| b.int(*n)).collect();
    let list = b.list(&elements);
    let index = b.int(10);
    let root = b.global(operators::INDEX, &[list, index]);
    let program = plan_default(b, root);
    match program.eval(&EmptyActivation) {
        Value::Error(e) => {
            assert_eq!(e.kind, ErrorKind::InvalidArgument);
            // The error is attributed to the index expression.
            assert_eq!(e.id, root);
        }
        other => panic!("expected error, got {other:?}"),
    }

    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [1, 2, 3].iter().map(|n| b.int(*n)).collect();
    let list = b.list(&elements);
    let index = b.int(10);
    let root = b.global(operators::OPT_INDEX, &[list, index]);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::None);
}

#[test]
fn empty_list_indexing_errors() {
    let mut b = ExprBuilder::new();
    let list = b.list(&[]);
    let index = b.int(0);
    let root = b.global(operators::INDEX, &[list, index]);
    let program = plan_default(b, root);
    assert!(program.eval(&EmptyActivation).is_error());
}

#[test]
fn computed_index_plans_a_computed_qualifier() {
    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [10, 20].iter().map(|n| b.int(*n)).collect();
    let list = b.list(&elements);
    let index = b.ident("i");
    let root = b.global(operators::INDEX, &[list, index]);
    let program = plan_default(b, root);

    let mut act = MapActivation::new();
    act.bind("i", Value::Int(1));
    assert_eq!(program.eval(&act), Value::Int(20));
}

// ── Scenario 5: comprehensions ─────────────────────────────────

#[test]
fn all_comprehension_over_literal_list() {
    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [1, 2, 3].iter().map(|n| b.int(*n)).collect();
    let range = b.list(&elements);
    let root = all_positive(&mut b, range);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Bool(true));

    let mut b = ExprBuilder::new();
    let elements: Vec<ExprId> = [1, -2, 3].iter().map(|n| b.int(*n)).collect();
    let range = b.list(&elements);
    let root = all_positive(&mut b, range);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Bool(false));
}

#[test]
fn comprehension_on_empty_range_returns_init() {
    let mut b = ExprBuilder::new();
    let range = b.list(&[]);
    let root = all_positive(&mut b, range);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Bool(true));
}

// ── Scenario 6: unknowns through the conditional ───────────────

#[test]
fn unknown_condition_with_concrete_branches_propagates_original() {
    let mut b = ExprBuilder::new();
    let cond = b.ident("x");
    let one = b.int(1);
    let other_one = b.int(1);
    let root = b.global(operators::CONDITIONAL, &[cond, one, other_one]);
    // Disable folding: a constant-looking conditional over an unknown
    // condition must still evaluate three-valued.
    let program = plan_with_options(
        b,
        root,
        PlannerOptions::default().with_constant_folding(false),
    );

    let marker = ExprId::new(500);
    let mut act = MapActivation::new();
    act.bind("x", Value::unknown(UnknownSet::new(marker)));
    match program.eval(&act) {
        Value::Unknown(u) => assert_eq!(u.ids(), &[marker]),
        other => panic!("expected unknown, got {other:?}"),
    }
}

#[test]
fn unknown_branches_merge_when_both_unknown() {
    let mut b = ExprBuilder::new();
    let cond = b.ident("x");
    let t = b.ident("y");
    let f = b.ident("z");
    let root = b.global(operators::CONDITIONAL, &[cond, t, f]);
    let program = plan_default(b, root);

    let mut act = MapActivation::new();
    act.bind("x", Value::unknown(UnknownSet::new(ExprId::new(500))));
    act.bind("y", Value::unknown(UnknownSet::new(ExprId::new(501))));
    act.bind("z", Value::unknown(UnknownSet::new(ExprId::new(502))));
    match program.eval(&act) {
        Value::Unknown(u) => assert_eq!(u.ids(), &[ExprId::new(501), ExprId::new(502)]),
        other => panic!("expected unknown, got {other:?}"),
    }
}

// ── References and types ───────────────────────────────────────

#[test]
fn enum_constant_reference_plans_to_enum_value() {
    let mut provider = TypeRegistry::new();
    provider.register_enum(EnumDescriptor::new("pkg.Color").value("RED", 0).value("BLUE", 2));
    let provider: Arc<dyn TypeProvider> = Arc::new(provider);

    let mut b = ExprBuilder::new();
    let root = b.ident("BLUE");
    b.reference(
        root,
        Reference::bound_variable("pkg.Color.BLUE", Constant::Int(2)),
    );
    let program = plan_full(
        b,
        root,
        PlannerOptions::default(),
        Arc::new(FunctionRegistry::new()),
        Arc::clone(&provider),
    );
    assert_eq!(
        program.eval(&EmptyActivation),
        Value::enum_value("pkg.Color", 2)
    );

    // Legacy enums surface as plain ints.
    let mut b = ExprBuilder::new();
    let root = b.ident("BLUE");
    b.reference(
        root,
        Reference::bound_variable("pkg.Color.BLUE", Constant::Int(2)),
    );
    let program = plan_full(
        b,
        root,
        PlannerOptions::default().with_legacy_enums(true),
        Arc::new(FunctionRegistry::new()),
        provider,
    );
    assert_eq!(program.eval(&EmptyActivation), Value::Int(2));
}

#[test]
fn int_typed_constant_reference_stays_an_int() {
    let mut b = ExprBuilder::new();
    let root = b.ident("ANSWER");
    b.reference(root, Reference::constant("pkg.ANSWER", Constant::Int(42)));
    b.typed(root, CelType::Int);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Int(42));
}

#[test]
fn type_typed_ident_plans_to_a_type_value() {
    let mut b = ExprBuilder::new();
    let root = b.ident("int");
    b.typed(root, CelType::Type(Some(Box::new(CelType::Int))));
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::type_value("int"));
}

#[test]
fn canonical_reference_name_overrides_source_name() {
    let mut b = ExprBuilder::new();
    let root = b.ident("x");
    b.reference(root, Reference::variable("ns.x"));
    let program = plan_default(b, root);

    let mut act = MapActivation::new();
    act.bind("ns.x", Value::Int(9));
    assert_eq!(program.eval(&act), Value::Int(9));
}

// ── Container resolution ───────────────────────────────────────

#[test]
fn container_candidates_resolve_through_maybe_attribute() {
    let mut b = ExprBuilder::new();
    let root = b.ident("x");
    let options =
        PlannerOptions::default().with_container(Container::new("a.b"));
    let program = plan_with_options(b, root, options);

    match program.interpretable() {
        Interpretable::Attr { attr: Attribute::Maybe(_), .. } => {}
        other => panic!("expected maybe attribute, got {other:?}"),
    }

    // The mid-specific candidate a.x wins when a.b.x is unbound.
    let mut act = MapActivation::new();
    act.bind("a.x", Value::Int(5));
    act.bind("x", Value::Int(6));
    assert_eq!(program.eval(&act), Value::Int(5));

    // All candidates unbound: undeclared reference.
    match program.eval(&EmptyActivation) {
        Value::Error(e) => assert_eq!(e.kind, ErrorKind::UndeclaredVariable),
        other => panic!("expected error, got {other:?}"),
    }
}

// ── Calls, overloads, and conversions ──────────────────────────

fn size_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register("size", "size_string", |id, args| match args {
        [Value::String(s)] => Value::Int(s.chars().count() as i64),
        _ => cel_eval::errors::unknown_overload("size", id),
    });
    registry
}

#[test]
fn member_call_with_receiver_becomes_arg_zero() {
    let mut b = ExprBuilder::new();
    let target = b.ident("s");
    let root = b.member(target, "size", &[]);
    let program = plan_full(
        b,
        root,
        PlannerOptions::default(),
        Arc::new(size_registry()),
        Arc::new(TypeRegistry::new()),
    );

    let mut act = MapActivation::new();
    act.bind("s", Value::string("hello"));
    assert_eq!(program.eval(&act), Value::Int(5));
}

#[test]
fn member_call_on_namespace_becomes_qualified_global() {
    let mut registry = FunctionRegistry::new();
    registry.register("ns.answer", "ns_answer_0", |_, _| Value::Int(42));

    let mut b = ExprBuilder::new();
    let target = b.ident("ns");
    let root = b.member(target, "answer", &[]);
    let program = plan_full(
        b,
        root,
        PlannerOptions::default(),
        Arc::new(registry),
        Arc::new(TypeRegistry::new()),
    );

    match program.interpretable() {
        Interpretable::Call { function, args, .. } => {
            assert_eq!(function, "ns.answer");
            assert!(args.is_empty());
        }
        other => panic!("expected call node, got {other:?}"),
    }
    assert_eq!(program.eval(&EmptyActivation), Value::Int(42));
}

#[test]
fn overload_selection_tie_breaks_to_first_registered() {
    let mut b = ExprBuilder::new();
    let arg = b.int(1);
    let root = b.global("f", &[arg]);
    b.reference(
        root,
        Reference::function("f", vec!["f_int".to_string(), "f_uint".to_string()]),
    );
    let program = plan_default(b, root);
    match program.interpretable() {
        Interpretable::Call { overload_id, .. } => assert_eq!(overload_id, "f_int"),
        other => panic!("expected call node, got {other:?}"),
    }
}

#[test]
fn dyn_argument_defers_overload_selection_to_runtime() {
    let mut b = ExprBuilder::new();
    let arg = b.ident("x");
    b.typed(arg, CelType::Dyn);
    let root = b.global("f", &[arg]);
    b.reference(
        root,
        Reference::function("f", vec!["f_int".to_string(), "f_uint".to_string()]),
    );
    let program = plan_default(b, root);
    match program.interpretable() {
        Interpretable::Call { overload_id, .. } => assert_eq!(overload_id, "f_1"),
        other => panic!("expected call node, got {other:?}"),
    }
}

#[test]
fn single_checked_overload_is_used_directly() {
    let mut b = ExprBuilder::new();
    let arg = b.int(1);
    let root = b.global("f", &[arg]);
    b.reference(root, Reference::function("f", vec!["f_int".to_string()]));
    let program = plan_default(b, root);
    match program.interpretable() {
        Interpretable::Call { overload_id, .. } => assert_eq!(overload_id, "f_int"),
        other => panic!("expected call node, got {other:?}"),
    }
}

#[test]
fn conversion_intrinsics_plan_and_fold() {
    // int("42") stays a conversion and evaluates.
    let mut b = ExprBuilder::new();
    let text = b.string("42");
    let root = b.global("int", &[text]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Convert { .. }));
    assert_eq!(program.eval(&EmptyActivation), Value::Int(42));

    // int(1) folds away post-plan.
    let mut b = ExprBuilder::new();
    let one = b.int(1);
    let root = b.global("int", &[one]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Const { .. }));

    // dyn(x) disappears entirely.
    let mut b = ExprBuilder::new();
    let x = b.ident("x");
    let root = b.global("dyn", &[x]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Attr { .. }));

    // type(1) is preserved: it reflects at runtime.
    let mut b = ExprBuilder::new();
    let one = b.int(1);
    let root = b.global("type", &[one]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Convert { .. }));
    assert_eq!(program.eval(&EmptyActivation), Value::type_value("int"));
}

// ── has() ──────────────────────────────────────────────────────

#[test]
fn presence_test_plans_to_has_field() {
    let mut b = ExprBuilder::new();
    let x = b.ident("x");
    let root = b.test(x, "a");
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::HasField { .. }));
    assert_eq!(program.eval(&nested_activation()), Value::Bool(true));

    let mut b = ExprBuilder::new();
    let x = b.ident("x");
    let root = b.test(x, "zzz");
    let program = plan_default(b, root);
    assert_eq!(program.eval(&nested_activation()), Value::Bool(false));
}

// ── Blocks ─────────────────────────────────────────────────────

#[test]
fn block_plans_slots_and_result() {
    let mut b = ExprBuilder::new();
    let five = b.int(5);
    let slot0 = b.ident("@index0");
    let one = b.int(1);
    let incremented = b.global(operators::ADD, &[slot0, one]);
    let bindings = b.list(&[five, incremented]);
    let slot1 = b.ident("@index1");
    let root = b.global(operators::BLOCK, &[bindings, slot1]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Block { .. }));
    assert_eq!(program.eval(&EmptyActivation), Value::Int(6));
}

#[test]
fn block_with_empty_bindings_is_just_the_result() {
    let mut b = ExprBuilder::new();
    let bindings = b.list(&[]);
    let result = b.int(3);
    let root = b.global(operators::BLOCK, &[bindings, result]);
    let program = plan_default(b, root);
    assert!(matches!(program.interpretable(), Interpretable::Const { .. }));
    assert_eq!(program.eval(&EmptyActivation), Value::Int(3));
}

// ── Struct creation ────────────────────────────────────────────

#[test]
fn struct_creation_resolves_type_and_fills_defaults() {
    let mut provider = TypeRegistry::new();
    provider.register_struct(
        StructDescriptor::new("pkg.Point")
            .field("x", CelType::Int)
            .field("y", CelType::Int),
    );

    let mut b = ExprBuilder::new();
    let three = b.int(3);
    let root = b.strukt("Point", &[("x", three)]);
    let options =
        PlannerOptions::default().with_container(Container::new("pkg"));
    let program = plan_full(
        b,
        root,
        options,
        Arc::new(FunctionRegistry::new()),
        Arc::new(provider),
    );

    match program.eval(&EmptyActivation) {
        Value::Struct(s) => {
            assert_eq!(s.type_name(), "pkg.Point");
            assert_eq!(s.field("x"), Some(&Value::Int(3)));
            assert_eq!(s.field("y"), Some(&Value::Int(0)));
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn unknown_struct_type_plans_to_a_constant_error() {
    let mut b = ExprBuilder::new();
    let three = b.int(3);
    let root = b.strukt("Missing", &[("x", three)]);
    let program = plan_default(b, root);
    assert!(program.eval(&EmptyActivation).is_error());
}

// ── Planning properties ────────────────────────────────────────

#[test]
fn planning_is_deterministic() {
    let build = || {
        let mut b = ExprBuilder::new();
        let x = b.ident("x");
        let xa = b.select(x, "a");
        let one = b.int(1);
        let sum = b.global(operators::ADD, &[xa, one]);
        let two = b.int(2);
        let root = b.global(operators::LESS, &[sum, two]);
        plan_default(b, root)
    };
    let first = build();
    let second = build();
    assert_eq!(
        format!("{:?}", first.interpretable()),
        format!("{:?}", second.interpretable())
    );
}

#[test]
fn optimizer_pipelines_preserve_semantics() {
    let build = |options: PlannerOptions| {
        let mut b = ExprBuilder::new();
        let t = b.boolean(true);
        let not = b.global(operators::LOGICAL_NOT, &[t]);
        let one = b.int(1);
        let two = b.int(2);
        let pick = b.global(operators::CONDITIONAL, &[not, one, two]);
        let converted = b.global("int", &[pick]);
        let three = b.int(3);
        let root = b.global(operators::ADD, &[converted, three]);
        plan_with_options(b, root, options)
    };

    let optimized = build(PlannerOptions::default());
    let unoptimized = build(
        PlannerOptions::default()
            .with_constant_folding(false)
            .with_conversion_elimination(false),
    );
    let act = EmptyActivation;
    assert!(optimized.eval(&act).equals(&unoptimized.eval(&act)));
    assert_eq!(optimized.eval(&act), Value::Int(5));
}

#[test]
fn malformed_input_still_plans_to_a_total_function() {
    // A call with a dangling argument id plans to an error node rather
    // than failing the planner.
    let mut b = ExprBuilder::new();
    let root = b.global(operators::LOGICAL_NOT, &[ExprId::new(999)]);
    let program = plan_default(b, root);
    assert!(program.eval(&EmptyActivation).is_error());
}

#[test]
fn uint_and_heterogeneous_literals_evaluate() {
    let mut b = ExprBuilder::new();
    let u = b.uint(2);
    let i = b.int(2);
    let root = b.global(operators::EQUALS, &[u, i]);
    let program = plan_default(b, root);
    assert_eq!(program.eval(&EmptyActivation), Value::Bool(true));
}
