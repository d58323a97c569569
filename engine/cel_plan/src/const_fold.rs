//! Pre-plan constant folding on the AST.
//!
//! The pre-plan pipeline is an ordered list of passes applied
//! left-to-right; each pass traverses the tree bottom-up and rewrites one
//! node at a time, returning the input id when nothing changed. Folded
//! replacements are allocated in the same arena, so expression ids of
//! untouched nodes survive for error provenance.
//!
//! # Scope
//!
//! Deliberately small:
//! - `!true` / `!false`
//! - equality of two same-kind literals (nulls equal nulls)
//! - `+`/`-`/`*` of two double literals
//! - dead-branch elimination of a constant ternary, only when the chosen
//!   branch is itself a literal (anything larger would re-root subtrees
//!   and blur provenance)
//!
//! Integer and uint arithmetic is never folded: evaluation applies checked
//! arithmetic with error values, and folding would silently change where
//! an overflow surfaces.

use cel_ir::{operators, ExprArena, ExprId, ExprKind, StringInterner};

/// One pre-plan rewrite pass.
pub trait AstPass {
    /// Rewrite a single node, returning the input id when unchanged.
    fn rewrite(&self, arena: &mut ExprArena, interner: &StringInterner, id: ExprId) -> ExprId;
}

/// Apply passes left-to-right over the whole tree, returning the new root.
pub fn optimize_ast(
    arena: &mut ExprArena,
    interner: &StringInterner,
    root: ExprId,
    passes: &[&dyn AstPass],
) -> ExprId {
    let mut root = root;
    for pass in passes {
        root = apply_pass(arena, interner, root, *pass);
    }
    root
}

/// The default pre-plan pipeline.
pub fn fold_constants(arena: &mut ExprArena, interner: &StringInterner, root: ExprId) -> ExprId {
    optimize_ast(
        arena,
        interner,
        root,
        &[&FoldConstantCalls, &FoldConstantConditionals],
    )
}

/// Bottom-up application of one pass: children first, then the node.
fn apply_pass(
    arena: &mut ExprArena,
    interner: &StringInterner,
    id: ExprId,
    pass: &dyn AstPass,
) -> ExprId {
    let rebuilt = rebuild_children(arena, interner, id, pass);
    pass.rewrite(arena, interner, rebuilt)
}

/// Re-allocate a node whose children changed; keep the node otherwise.
fn rebuild_children(
    arena: &mut ExprArena,
    interner: &StringInterner,
    id: ExprId,
    pass: &dyn AstPass,
) -> ExprId {
    let Some(kind) = arena.kind(id) else {
        return id;
    };
    match kind {
        ExprKind::Int(_)
        | ExprKind::Uint(_)
        | ExprKind::Double(_)
        | ExprKind::Bool(_)
        | ExprKind::String(_)
        | ExprKind::Bytes(_)
        | ExprKind::Null
        | ExprKind::Ident(_) => id,

        ExprKind::Select {
            operand,
            field,
            test_only,
            optional,
        } => {
            let new_operand = apply_pass(arena, interner, operand, pass);
            if new_operand == operand {
                id
            } else {
                arena.alloc(ExprKind::Select {
                    operand: new_operand,
                    field,
                    test_only,
                    optional,
                })
            }
        }

        ExprKind::Call {
            target,
            function,
            args,
        } => {
            let new_target = if target.is_valid() {
                apply_pass(arena, interner, target, pass)
            } else {
                target
            };
            let arg_ids = arena.list(args).to_vec();
            let new_args: Vec<ExprId> = arg_ids
                .iter()
                .map(|arg| apply_pass(arena, interner, *arg, pass))
                .collect();
            if new_target == target && new_args == arg_ids {
                id
            } else {
                let new_range = arena.alloc_list(&new_args);
                arena.alloc(ExprKind::Call {
                    target: new_target,
                    function,
                    args: new_range,
                })
            }
        }

        ExprKind::List {
            elements,
            optional_indices,
        } => {
            let element_ids = arena.list(elements).to_vec();
            let new_elements: Vec<ExprId> = element_ids
                .iter()
                .map(|element| apply_pass(arena, interner, *element, pass))
                .collect();
            if new_elements == element_ids {
                id
            } else {
                let new_range = arena.alloc_list(&new_elements);
                arena.alloc(ExprKind::List {
                    elements: new_range,
                    optional_indices,
                })
            }
        }

        ExprKind::Map { entries } => {
            let old = arena.map_entries(entries).to_vec();
            let mut changed = false;
            let new_entries: Vec<cel_ir::MapEntry> = old
                .iter()
                .map(|entry| {
                    let key = apply_pass(arena, interner, entry.key, pass);
                    let value = apply_pass(arena, interner, entry.value, pass);
                    changed |= key != entry.key || value != entry.value;
                    cel_ir::MapEntry {
                        key,
                        value,
                        optional: entry.optional,
                    }
                })
                .collect();
            if changed {
                let new_range = arena.alloc_map_entries(&new_entries);
                arena.alloc(ExprKind::Map { entries: new_range })
            } else {
                id
            }
        }

        ExprKind::Struct { type_name, fields } => {
            let old = arena.field_inits(fields).to_vec();
            let mut changed = false;
            let new_fields: Vec<cel_ir::FieldInit> = old
                .iter()
                .map(|init| {
                    let value = apply_pass(arena, interner, init.value, pass);
                    changed |= value != init.value;
                    cel_ir::FieldInit {
                        field: init.field,
                        value,
                        optional: init.optional,
                    }
                })
                .collect();
            if changed {
                let new_range = arena.alloc_field_inits(&new_fields);
                arena.alloc(ExprKind::Struct {
                    type_name,
                    fields: new_range,
                })
            } else {
                id
            }
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
        } => {
            let new_iter_range = apply_pass(arena, interner, iter_range, pass);
            let new_accu_init = apply_pass(arena, interner, accu_init, pass);
            let new_loop_cond = apply_pass(arena, interner, loop_cond, pass);
            let new_loop_step = apply_pass(arena, interner, loop_step, pass);
            let new_result = apply_pass(arena, interner, result, pass);
            if new_iter_range == iter_range
                && new_accu_init == accu_init
                && new_loop_cond == loop_cond
                && new_loop_step == loop_step
                && new_result == result
            {
                id
            } else {
                arena.alloc(ExprKind::Comprehension {
                    iter_var,
                    iter_var2,
                    iter_range: new_iter_range,
                    accu_var,
                    accu_init: new_accu_init,
                    loop_cond: new_loop_cond,
                    loop_step: new_loop_step,
                    result: new_result,
                })
            }
        }
    }
}

// Constant Call Folding

/// Folds `!bool`, same-kind literal equality, and double arithmetic.
pub struct FoldConstantCalls;

impl AstPass for FoldConstantCalls {
    fn rewrite(&self, arena: &mut ExprArena, interner: &StringInterner, id: ExprId) -> ExprId {
        let Some(ExprKind::Call {
            target,
            function,
            args,
        }) = arena.kind(id)
        else {
            return id;
        };
        if target.is_valid() {
            return id;
        }
        let function = interner.lookup(function);
        let arg_ids = arena.list(args).to_vec();
        match (function, arg_ids.as_slice()) {
            (operators::LOGICAL_NOT, [operand]) => match arena.kind(*operand) {
                Some(ExprKind::Bool(b)) => arena.alloc(ExprKind::Bool(!b)),
                _ => id,
            },
            (operators::EQUALS | operators::NOT_EQUALS, [lhs, rhs]) => {
                let (Some(lhs), Some(rhs)) = (arena.kind(*lhs), arena.kind(*rhs)) else {
                    return id;
                };
                match literal_equality(lhs, rhs) {
                    Some(equal) => {
                        let negated = function == operators::NOT_EQUALS;
                        arena.alloc(ExprKind::Bool(equal != negated))
                    }
                    None => id,
                }
            }
            (
                operators::ADD | operators::SUBTRACT | operators::MULTIPLY,
                [lhs, rhs],
            ) => {
                let (Some(ExprKind::Double(a)), Some(ExprKind::Double(b))) =
                    (arena.kind(*lhs), arena.kind(*rhs))
                else {
                    return id;
                };
                let (a, b) = (f64::from_bits(a), f64::from_bits(b));
                let folded = match function {
                    operators::ADD => a + b,
                    operators::SUBTRACT => a - b,
                    _ => a * b,
                };
                arena.alloc(ExprKind::Double(folded.to_bits()))
            }
            _ => id,
        }
    }
}

/// Equality of two literals of the same kind; `None` when the operands are
/// not both literals of one kind (mixed kinds are left to evaluation, which
/// knows the cross-type numeric rules).
fn literal_equality(lhs: ExprKind, rhs: ExprKind) -> Option<bool> {
    match (lhs, rhs) {
        (ExprKind::Int(a), ExprKind::Int(b)) => Some(a == b),
        (ExprKind::Uint(a), ExprKind::Uint(b)) => Some(a == b),
        // Bit-stored doubles compare as doubles, so NaN != NaN holds.
        (ExprKind::Double(a), ExprKind::Double(b)) => {
            Some(f64::from_bits(a) == f64::from_bits(b))
        }
        (ExprKind::Bool(a), ExprKind::Bool(b)) => Some(a == b),
        // Interned handles are equal exactly when the contents are.
        (ExprKind::String(a), ExprKind::String(b)) => Some(a == b),
        (ExprKind::Bytes(a), ExprKind::Bytes(b)) => Some(a == b),
        (ExprKind::Null, ExprKind::Null) => Some(true),
        _ => None,
    }
}

// Constant Conditional Folding

/// Replaces `true ? A : B` with `A` (and `false ? A : B` with `B`), but
/// only when the chosen branch is itself a literal, preserving ids
/// everywhere else.
pub struct FoldConstantConditionals;

impl AstPass for FoldConstantConditionals {
    fn rewrite(&self, arena: &mut ExprArena, interner: &StringInterner, id: ExprId) -> ExprId {
        let Some(ExprKind::Call {
            target,
            function,
            args,
        }) = arena.kind(id)
        else {
            return id;
        };
        if target.is_valid() || interner.lookup(function) != operators::CONDITIONAL {
            return id;
        }
        let [cond, truthy, falsy] = arena.list(args) else {
            return id;
        };
        let (cond, truthy, falsy) = (*cond, *truthy, *falsy);
        let chosen = match arena.kind(cond) {
            Some(ExprKind::Bool(true)) => truthy,
            Some(ExprKind::Bool(false)) => falsy,
            _ => return id,
        };
        match arena.kind(chosen) {
            Some(kind) if kind.is_literal() => chosen,
            _ => id,
        }
    }
}
