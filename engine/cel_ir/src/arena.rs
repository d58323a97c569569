//! Arena allocation for the flat AST.
//!
//! Contiguous storage for all expressions plus side tables for child
//! lists, map entries, field initializers, and optional-element indices.
//! Allocation helpers cover every AST shape so checkers and macro
//! expanders (and tests) can produce planner input without a parser.
//!
//! # Capacity Limits
//! - Max expressions: 4 billion (`u32::MAX`)
//! - Max list/range length: 65,535 (`u16::MAX`)
//!
//! These limits are enforced at runtime with clear panic messages.

use rustc_hash::FxHashMap;

use crate::{
    CelType, ExprId, ExprKind, ExprRange, FieldInit, FieldInitRange, IndexRange, MapEntry,
    MapEntryRange, Reference,
};

/// Panic helper for capacity overflow (cold path, never inlined).
#[cold]
#[inline(never)]
fn panic_capacity_exceeded(value: usize, context: &str, max: u64) -> ! {
    panic!("arena capacity exceeded: {context} has {value} elements, max is {max}")
}

/// Convert usize to u32, panicking with a clear message on overflow.
#[inline]
fn to_u32(value: usize, context: &str) -> u32 {
    u32::try_from(value)
        .unwrap_or_else(|_| panic_capacity_exceeded(value, context, u64::from(u32::MAX)))
}

/// Convert usize to u16, panicking with a clear message on overflow.
#[inline]
fn to_u16(value: usize, context: &str) -> u16 {
    u16::try_from(value)
        .unwrap_or_else(|_| panic_capacity_exceeded(value, context, u64::from(u16::MAX)))
}

/// Contiguous storage for all expressions of one AST.
#[derive(Clone, Default, Debug)]
pub struct ExprArena {
    /// All expressions (indexed by `ExprId`).
    exprs: Vec<ExprKind>,

    /// Flattened expression lists (call args, list elements, block slots).
    expr_lists: Vec<ExprId>,

    /// Map-literal entries.
    map_entries: Vec<MapEntry>,

    /// Struct-literal field initializers.
    field_inits: Vec<FieldInit>,

    /// Optional-element indices for list and map literals.
    optional_indices: Vec<u32>,
}

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated expressions.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Whether no expressions have been allocated.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Allocate an expression, returning its id.
    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let id = to_u32(self.exprs.len(), "expressions");
        self.exprs.push(kind);
        ExprId::new(id)
    }

    /// Get the expression for an id.
    ///
    /// Returns `None` for `ExprId::INVALID` (and any out-of-bounds id),
    /// letting the planner degrade malformed input to an error node
    /// instead of panicking.
    #[inline]
    pub fn kind(&self, id: ExprId) -> Option<ExprKind> {
        self.exprs.get(id.index()).copied()
    }

    /// Allocate a child list, returning its range.
    pub fn alloc_list(&mut self, children: &[ExprId]) -> ExprRange {
        let start = to_u32(self.expr_lists.len(), "expression lists");
        let len = to_u16(children.len(), "expression list");
        self.expr_lists.extend_from_slice(children);
        ExprRange::new(start, len)
    }

    /// The child ids of a list range.
    #[inline]
    pub fn list(&self, range: ExprRange) -> &[ExprId] {
        let (start, end) = range.bounds();
        &self.expr_lists[start..end]
    }

    /// Allocate map-literal entries, returning their range.
    pub fn alloc_map_entries(&mut self, entries: &[MapEntry]) -> MapEntryRange {
        let start = to_u32(self.map_entries.len(), "map entries");
        let len = to_u16(entries.len(), "map entry list");
        self.map_entries.extend_from_slice(entries);
        MapEntryRange::new(start, len)
    }

    /// The entries of a map range.
    #[inline]
    pub fn map_entries(&self, range: MapEntryRange) -> &[MapEntry] {
        let (start, end) = range.bounds();
        &self.map_entries[start..end]
    }

    /// Allocate struct-literal field initializers, returning their range.
    pub fn alloc_field_inits(&mut self, fields: &[FieldInit]) -> FieldInitRange {
        let start = to_u32(self.field_inits.len(), "field initializers");
        let len = to_u16(fields.len(), "field initializer list");
        self.field_inits.extend_from_slice(fields);
        FieldInitRange::new(start, len)
    }

    /// The field initializers of a struct range.
    #[inline]
    pub fn field_inits(&self, range: FieldInitRange) -> &[FieldInit] {
        let (start, end) = range.bounds();
        &self.field_inits[start..end]
    }

    /// Allocate optional-element indices, returning their range.
    pub fn alloc_optional_indices(&mut self, indices: &[u32]) -> IndexRange {
        let start = to_u32(self.optional_indices.len(), "optional indices");
        let len = to_u16(indices.len(), "optional index list");
        self.optional_indices.extend_from_slice(indices);
        IndexRange::new(start, len)
    }

    /// The optional-element indices of a range.
    #[inline]
    pub fn optional_indices(&self, range: IndexRange) -> &[u32] {
        let (start, end) = range.bounds();
        &self.optional_indices[start..end]
    }
}

/// A complete planner input: the arena, its root, and the optional
/// checker-output maps.
///
/// Both maps are genuinely optional: `None` means "unchecked input", and
/// the planner falls back to purely syntactic resolution (select-chain
/// folding, arity-keyed overload ids) in that case.
#[derive(Debug, Default)]
pub struct Ast {
    pub arena: ExprArena,
    pub root: ExprId,
    /// Checker output: resolved names, overloads, and constants by id.
    pub references: Option<FxHashMap<ExprId, Reference>>,
    /// Checker output: expression types by id.
    pub types: Option<FxHashMap<ExprId, CelType>>,
}

impl Ast {
    /// Create an unchecked AST from an arena and root.
    pub fn new(arena: ExprArena, root: ExprId) -> Self {
        Ast {
            arena,
            root,
            references: None,
            types: None,
        }
    }

    /// Attach a reference map.
    #[must_use]
    pub fn with_references(mut self, references: FxHashMap<ExprId, Reference>) -> Self {
        self.references = Some(references);
        self
    }

    /// Attach a type map.
    #[must_use]
    pub fn with_types(mut self, types: FxHashMap<ExprId, CelType>) -> Self {
        self.types = Some(types);
        self
    }

    /// The reference recorded for an expression, if any.
    pub fn reference(&self, id: ExprId) -> Option<&Reference> {
        self.references.as_ref()?.get(&id)
    }

    /// The type recorded for an expression, if any.
    pub fn expr_type(&self, id: ExprId) -> Option<&CelType> {
        self.types.as_ref()?.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn alloc_round_trip() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Int(1));
        let b = arena.alloc(ExprKind::Bool(true));
        assert_eq!(arena.kind(a), Some(ExprKind::Int(1)));
        assert_eq!(arena.kind(b), Some(ExprKind::Bool(true)));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn invalid_id_yields_none() {
        let arena = ExprArena::new();
        assert_eq!(arena.kind(ExprId::INVALID), None);
        assert_eq!(arena.kind(ExprId::new(99)), None);
    }

    #[test]
    fn side_tables_round_trip() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(ExprKind::Int(1));
        let b = arena.alloc(ExprKind::Int(2));
        let range = arena.alloc_list(&[a, b]);
        assert_eq!(arena.list(range), &[a, b]);

        let entries = [MapEntry {
            key: a,
            value: b,
            optional: false,
        }];
        let entry_range = arena.alloc_map_entries(&entries);
        assert_eq!(arena.map_entries(entry_range), &entries);

        let idx_range = arena.alloc_optional_indices(&[0, 2]);
        assert_eq!(arena.optional_indices(idx_range), &[0, 2]);
    }
}
