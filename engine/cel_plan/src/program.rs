//! Planner options and the planned-program facade.

use std::sync::Arc;

use cel_eval::{Activation, Dispatcher, Interpretable, TypeProvider, Value};
use cel_ir::{Ast, StringInterner};

use crate::const_fold::fold_constants;
use crate::container::Container;
use crate::conversion_fold::eliminate_noop_conversions;
use crate::planner::Planner;

/// Configuration for planning.
#[derive(Clone, Debug)]
pub struct PlannerOptions {
    /// The namespace expressions are planned in.
    pub container: Container,
    /// Surface enum constants and enum-typed fields as plain `int`s.
    pub legacy_enums: bool,
    /// Run the pre-plan constant-folding pipeline.
    pub constant_folding: bool,
    /// Run the post-plan conversion-elimination pipeline.
    pub conversion_elimination: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        PlannerOptions {
            container: Container::root(),
            legacy_enums: false,
            constant_folding: true,
            conversion_elimination: true,
        }
    }
}

impl PlannerOptions {
    /// Set the container.
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Toggle legacy enum semantics.
    #[must_use]
    pub fn with_legacy_enums(mut self, legacy: bool) -> Self {
        self.legacy_enums = legacy;
        self
    }

    /// Toggle the pre-plan constant-folding pipeline.
    #[must_use]
    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.constant_folding = enabled;
        self
    }

    /// Toggle the post-plan conversion-elimination pipeline.
    #[must_use]
    pub fn with_conversion_elimination(mut self, enabled: bool) -> Self {
        self.conversion_elimination = enabled;
        self
    }
}

/// A planned expression, ready for repeated evaluation.
///
/// The tree inside is immutable and shared-state free; one program may be
/// evaluated concurrently against distinct activations.
#[derive(Debug)]
pub struct Program {
    root: Interpretable,
}

impl Program {
    /// Run the full pipeline: pre-plan folding, planning, post-plan
    /// conversion elimination.
    ///
    /// Takes the AST mutably because pre-plan folding allocates rewritten
    /// nodes into the arena and moves the root.
    pub fn plan(
        ast: &mut Ast,
        interner: &StringInterner,
        dispatcher: Arc<dyn Dispatcher>,
        provider: Arc<dyn TypeProvider>,
        options: &PlannerOptions,
    ) -> Program {
        if options.constant_folding {
            ast.root = fold_constants(&mut ast.arena, interner, ast.root);
        }
        let planner = Planner::new(
            ast,
            interner,
            Arc::clone(&dispatcher),
            Arc::clone(&provider),
            options,
        );
        let mut root = planner.plan();
        if options.conversion_elimination {
            root = eliminate_noop_conversions(root);
        }
        tracing::debug!(root = ?root.id(), "program planned");
        Program { root }
    }

    /// Evaluate against an activation.
    pub fn eval(&self, activation: &dyn Activation) -> Value {
        self.root.eval(activation)
    }

    /// The planned tree.
    pub fn interpretable(&self) -> &Interpretable {
        &self.root
    }
}
