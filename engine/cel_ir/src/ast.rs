//! Expression variants for the flat AST.
//!
//! The AST is the macro-expanded, possibly type-checked input handed to the
//! planner. All children are arena indices, not boxes; list-shaped children
//! live in the arena's side tables behind compact ranges, which keeps
//! `ExprKind` `Copy`.
//!
//! There are no source spans here: parsing is a front-end concern, and the
//! `ExprId` alone is the provenance every downstream error carries.

use crate::{BytesId, ExprId, ExprRange, FieldInitRange, IndexRange, MapEntryRange, Name};

/// Expression variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Integer literal: `42`, `-7`.
    Int(i64),

    /// Unsigned literal: `42u`.
    Uint(u64),

    /// Double literal, stored as bits for `Hash`/`Eq`.
    Double(u64),

    /// Boolean literal.
    Bool(bool),

    /// String literal (interned).
    String(Name),

    /// Bytes literal (pooled).
    Bytes(BytesId),

    /// The `null` literal.
    Null,

    /// Variable or constant reference.
    Ident(Name),

    /// Field selection: `operand.field`, `has(operand.field)`,
    /// `operand.?field`.
    Select {
        operand: ExprId,
        field: Name,
        /// True for the macro-expanded `has(...)` presence test.
        test_only: bool,
        /// True for optional selection (`.?`).
        optional: bool,
    },

    /// Function or operator call.
    ///
    /// `target` is `ExprId::INVALID` for global calls; member calls carry
    /// the receiver here until the planner decides whether the dotted
    /// target is really a namespace qualifier.
    Call {
        target: ExprId,
        function: Name,
        args: ExprRange,
    },

    /// List literal, with the positions marked optional (`[?x]`) recorded
    /// as indices into the arena's index table.
    List {
        elements: ExprRange,
        optional_indices: IndexRange,
    },

    /// Map literal.
    Map { entries: MapEntryRange },

    /// Struct literal: `Type{field: value}`.
    Struct {
        type_name: Name,
        fields: FieldInitRange,
    },

    /// Macro-expanded comprehension (`all`, `exists`, `exists_one`, `map`,
    /// `filter`).
    ///
    /// `iter_var2` is `Name::EMPTY` when absent; when set, map ranges
    /// iterate (key, value) pairs and list ranges (index, element) pairs.
    Comprehension {
        iter_var: Name,
        iter_var2: Name,
        iter_range: ExprId,
        accu_var: Name,
        accu_init: ExprId,
        loop_cond: ExprId,
        loop_step: ExprId,
        result: ExprId,
    },
}

impl ExprKind {
    /// Whether this variant is a literal.
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            ExprKind::Int(_)
                | ExprKind::Uint(_)
                | ExprKind::Double(_)
                | ExprKind::Bool(_)
                | ExprKind::String(_)
                | ExprKind::Bytes(_)
                | ExprKind::Null
        )
    }
}

/// One `key: value` entry of a map literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MapEntry {
    pub key: ExprId,
    pub value: ExprId,
    /// True for `?key: value` entries.
    pub optional: bool,
}

/// One `field: value` initializer of a struct literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldInit {
    pub field: Name,
    pub value: ExprId,
    /// True for `?field: value` initializers.
    pub optional: bool,
}
