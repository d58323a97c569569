//! String interner and bytes pool for identifier and literal storage.
//!
//! Interning keeps `ExprKind` `Copy`: identifiers, field names, and string
//! literals are 4-byte `Name`s, bytes literals are 4-byte `BytesId`s.
//! Interning happens only while an AST is being built, so the interner
//! takes `&mut self` for writes and plain `&self` for lookups; there is
//! no shared-mutation window once planning starts.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Interned string handle.
///
/// Equality is an integer compare; two `Name`s are equal exactly when the
/// strings they intern are equal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    ///
    /// Used as an "absent" sentinel where an optional name would otherwise
    /// widen a `Copy` variant (e.g. a comprehension without a second
    /// iteration variable).
    pub const EMPTY: Name = Name(0);

    /// Check whether this is the empty-string sentinel.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interned bytes-literal handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BytesId(u32);

/// Panic helper for pool overflow (cold path, never inlined).
#[cold]
#[inline(never)]
fn panic_pool_exceeded(context: &str, count: usize) -> ! {
    panic!("interner capacity exceeded: {context} has {count} entries, max is {}", u32::MAX)
}

#[inline]
fn to_u32(value: usize, context: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic_pool_exceeded(context, value))
}

/// String interner with a deduplicating bytes pool.
///
/// Handles are stable for the interner's lifetime. Both pools deduplicate,
/// so handle equality is content equality.
pub struct StringInterner {
    strings: Vec<Arc<str>>,
    string_ids: FxHashMap<Arc<str>, u32>,
    bytes: Vec<Arc<[u8]>>,
    bytes_ids: FxHashMap<Arc<[u8]>, u32>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at `Name::EMPTY`.
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let mut string_ids = FxHashMap::default();
        string_ids.insert(Arc::clone(&empty), 0);
        StringInterner {
            strings: vec![empty],
            string_ids,
            bytes: Vec::new(),
            bytes_ids: FxHashMap::default(),
        }
    }

    /// Intern a string, returning its stable handle.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&id) = self.string_ids.get(s) {
            return Name(id);
        }
        let id = to_u32(self.strings.len(), "string pool");
        let entry: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&entry));
        self.string_ids.insert(entry, id);
        Name(id)
    }

    /// Look up the string for a handle.
    #[inline]
    pub fn lookup(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }

    /// Intern a bytes literal, returning its stable handle.
    pub fn intern_bytes(&mut self, b: &[u8]) -> BytesId {
        if let Some(&id) = self.bytes_ids.get(b) {
            return BytesId(id);
        }
        let id = to_u32(self.bytes.len(), "bytes pool");
        let entry: Arc<[u8]> = Arc::from(b);
        self.bytes.push(Arc::clone(&entry));
        self.bytes_ids.insert(entry, id);
        BytesId(id)
    }

    /// Look up the contents of a bytes literal.
    #[inline]
    pub fn lookup_bytes(&self, id: BytesId) -> &[u8] {
        &self.bytes[id.0 as usize]
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringInterner")
            .field("strings", &self.strings.len())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
