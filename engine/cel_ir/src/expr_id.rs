//! Expression IDs and ranges for the flat AST.
//!
//! - `ExprId(u32)` instead of `Box<Expr>`: children are indices into the
//!   arena, equality is an integer compare, and the id doubles as the
//!   provenance carried by every planned node and error value.
//! - Range types address the arena's side tables (`ExprRange` for child
//!   lists, `MapEntryRange`/`FieldInitRange` for aggregate literals,
//!   `IndexRange` for optional-element indices) at 8 bytes each.

use std::fmt;

/// Index into the expression arena.
///
/// Assigned once when the expression is allocated and never reassigned;
/// planned nodes and error values carry it for provenance.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Invalid expression ID (sentinel value).
    pub const INVALID: ExprId = ExprId(u32::MAX);

    /// Create a new `ExprId`.
    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    /// Get the index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a valid ID.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ExprId({})", self.0)
        } else {
            write!(f, "ExprId::INVALID")
        }
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::INVALID
    }
}

macro_rules! side_table_range {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
        pub struct $name {
            pub start: u32,
            pub len: u16,
        }

        impl $name {
            /// Empty range.
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            /// Create a new range.
            #[inline]
            pub const fn new(start: u32, len: u16) -> Self {
                $name { start, len }
            }

            /// Check if the range is empty.
            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            /// Get the number of elements.
            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }

            /// The half-open `usize` bounds of this range.
            #[inline]
            pub const fn bounds(&self) -> (usize, usize) {
                let start = self.start as usize;
                (start, start + self.len as usize)
            }
        }
    };
}

side_table_range! {
    /// Range of expressions in the arena's flattened child lists.
    ///
    /// Used for call arguments, list elements, and block bindings.
    ExprRange
}

side_table_range! {
    /// Range of map-literal entries in the arena's entry table.
    MapEntryRange
}

side_table_range! {
    /// Range of struct-literal field initializers in the arena's field table.
    FieldInitRange
}

side_table_range! {
    /// Range of optional-element indices in the arena's index table.
    ///
    /// A list or map literal records which of its positions used the `?`
    /// marker as indices into this table.
    IndexRange
}
