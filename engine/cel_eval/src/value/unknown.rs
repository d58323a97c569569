//! Unknown-value id sets.
//!
//! An unknown is the three-valued sentinel carrying the ids of the
//! expressions whose value has not been supplied. Sets are kept sorted
//! and deduplicated so that merge is a linear union and equality is a
//! slice compare.

use cel_ir::ExprId;

/// The id set carried by an `Unknown` value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnknownSet {
    ids: Vec<ExprId>,
}

impl UnknownSet {
    /// A set of one expression id.
    pub fn new(id: ExprId) -> Self {
        UnknownSet { ids: vec![id] }
    }

    /// Build a set from arbitrary ids, sorting and deduplicating.
    pub fn from_ids(ids: impl IntoIterator<Item = ExprId>) -> Self {
        let mut ids: Vec<ExprId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        UnknownSet { ids }
    }

    /// The ids in ascending order.
    pub fn ids(&self) -> &[ExprId] {
        &self.ids
    }

    /// Whether the set tracks the given id.
    pub fn contains(&self, id: ExprId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Set union.
    pub fn merge(&self, other: &UnknownSet) -> UnknownSet {
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        ids.sort_unstable();
        ids.dedup();
        UnknownSet { ids }
    }
}
