//! Post-plan no-op conversion elimination.
//!
//! The post-plan pipeline mirrors the pre-plan one: an ordered list of
//! passes, each rewriting the executable tree bottom-up and returning the
//! input node when nothing applies.
//!
//! The one stock pass removes conversions that cannot change their
//! operand: `dyn(x)` is always the identity, and a primitive conversion
//! over a constant already carrying the target tag is one too. `type(x)`
//! is never removed: it materializes a reflective value.

use cel_eval::Interpretable;

/// One post-plan rewrite pass.
pub trait PlanPass {
    /// Rewrite a single node, returning it unchanged when nothing applies.
    fn rewrite(&self, node: Interpretable) -> Interpretable;
}

/// Apply passes left-to-right over the whole tree, returning the new root.
pub fn optimize_plan(root: Interpretable, passes: &[&dyn PlanPass]) -> Interpretable {
    let mut root = root;
    for pass in passes {
        root = apply_plan_pass(root, *pass);
    }
    root
}

/// The default post-plan pipeline.
pub fn eliminate_noop_conversions(root: Interpretable) -> Interpretable {
    optimize_plan(root, &[&NoopConversionElimination])
}

/// Bottom-up application of one pass: children first, then the node.
fn apply_plan_pass(node: Interpretable, pass: &dyn PlanPass) -> Interpretable {
    let node = rebuild_children(node, pass);
    pass.rewrite(node)
}

fn rebuild_children(node: Interpretable, pass: &dyn PlanPass) -> Interpretable {
    let rewrite = |child: Box<Interpretable>| Box::new(apply_plan_pass(*child, pass));
    let rewrite_all = |children: Vec<Interpretable>| {
        children
            .into_iter()
            .map(|child| apply_plan_pass(child, pass))
            .collect()
    };
    match node {
        Interpretable::Const { .. } => node,
        Interpretable::Attr { id, attr } => Interpretable::Attr {
            id,
            attr: attr.map_nodes(&mut |child| apply_plan_pass(child, pass)),
        },
        Interpretable::Not { id, operand } => Interpretable::Not {
            id,
            operand: rewrite(operand),
        },
        Interpretable::Neg { id, operand } => Interpretable::Neg {
            id,
            operand: rewrite(operand),
        },
        Interpretable::NotStrictlyFalse { id, operand } => Interpretable::NotStrictlyFalse {
            id,
            operand: rewrite(operand),
        },
        Interpretable::And { id, lhs, rhs } => Interpretable::And {
            id,
            lhs: rewrite(lhs),
            rhs: rewrite(rhs),
        },
        Interpretable::Or { id, lhs, rhs } => Interpretable::Or {
            id,
            lhs: rewrite(lhs),
            rhs: rewrite(rhs),
        },
        Interpretable::Conditional {
            id,
            cond,
            truthy,
            falsy,
        } => Interpretable::Conditional {
            id,
            cond: rewrite(cond),
            truthy: rewrite(truthy),
            falsy: rewrite(falsy),
        },
        Interpretable::Binary { id, op, lhs, rhs } => Interpretable::Binary {
            id,
            op,
            lhs: rewrite(lhs),
            rhs: rewrite(rhs),
        },
        Interpretable::Call {
            id,
            function,
            overload_id,
            args,
            dispatcher,
        } => Interpretable::Call {
            id,
            function,
            overload_id,
            args: rewrite_all(args),
            dispatcher,
        },
        Interpretable::Block { id, slots, result } => Interpretable::Block {
            id,
            slots: rewrite_all(slots),
            result: rewrite(result),
        },
        Interpretable::CreateList {
            id,
            elements,
            optional_indices,
        } => Interpretable::CreateList {
            id,
            elements: rewrite_all(elements),
            optional_indices,
        },
        Interpretable::CreateMap {
            id,
            keys,
            values,
            optional_indices,
        } => Interpretable::CreateMap {
            id,
            keys: rewrite_all(keys),
            values: rewrite_all(values),
            optional_indices,
        },
        Interpretable::CreateStruct {
            id,
            type_name,
            field_names,
            field_values,
            field_types,
            optional_indices,
            provider,
        } => Interpretable::CreateStruct {
            id,
            type_name,
            field_names,
            field_values: rewrite_all(field_values),
            field_types,
            optional_indices,
            provider,
        },
        Interpretable::HasField { id, operand, field } => Interpretable::HasField {
            id,
            operand: rewrite(operand),
            field,
        },
        Interpretable::Comprehension { id, node } => {
            let mut node = *node;
            node.iter_range = apply_plan_pass(node.iter_range, pass);
            node.accu_init = apply_plan_pass(node.accu_init, pass);
            node.loop_cond = apply_plan_pass(node.loop_cond, pass);
            node.loop_step = apply_plan_pass(node.loop_step, pass);
            node.result = apply_plan_pass(node.result, pass);
            Interpretable::Comprehension {
                id,
                node: Box::new(node),
            }
        }
        Interpretable::Convert {
            id,
            operand,
            target,
            provider,
        } => Interpretable::Convert {
            id,
            operand: rewrite(operand),
            target,
            provider,
        },
    }
}

/// Removes `dyn(x)` and primitive conversions of constants that already
/// carry the target tag.
pub struct NoopConversionElimination;

impl PlanPass for NoopConversionElimination {
    fn rewrite(&self, node: Interpretable) -> Interpretable {
        let Interpretable::Convert {
            id,
            operand,
            target,
            provider,
        } = node
        else {
            return node;
        };
        if target == cel_eval::ConversionTarget::Dyn {
            return *operand;
        }
        if let Interpretable::Const { value, .. } = operand.as_ref() {
            if target.is_noop_for(value) {
                return *operand;
            }
        }
        Interpretable::Convert {
            id,
            operand,
            target,
            provider,
        }
    }
}
