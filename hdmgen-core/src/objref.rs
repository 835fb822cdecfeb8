//! Object references and the base record shared by every entity.
//!
//! Every object in a generated store (or the reference model) is addressed by
//! an [`ObjRef`]: the concrete type tag plus a dense per-type index. The
//! [`ObjectHeader`] carries the fields every entity inherits from the root of
//! the hierarchy: provenance, parent link and the generic child list.

use std::fmt;

/// Reference to an object: concrete type tag plus per-type storage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// Type tag of the concrete entity.
    pub tag: u32,
    /// Zero-based index into the per-type storage.
    pub index: u32,
}

impl ObjRef {
    /// Creates a new object reference.
    #[must_use]
    pub const fn new(tag: u32, index: u32) -> Self {
        Self { tag, index }
    }

    /// Returns the one-based index used on the wire, where zero means null.
    #[must_use]
    pub const fn wire_index(&self) -> u32 {
        self.index + 1
    }

    /// Rebuilds a reference from a wire pair, returning `None` for the null index.
    #[must_use]
    pub const fn from_wire(tag: u32, wire_index: u32) -> Option<Self> {
        if wire_index == 0 {
            None
        } else {
            Some(Self::new(tag, wire_index - 1))
        }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.tag, self.index)
    }
}

/// Base record inherited by every entity.
///
/// Provenance fields (`id`, `file`, the source span) never take part in
/// structural comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Internal object id.
    pub id: u32,
    /// Owning object, if any.
    pub parent: Option<ObjRef>,
    /// Source file.
    pub file: String,
    /// First line of the source span.
    pub start_line: u32,
    /// First column of the source span.
    pub start_column: u16,
    /// Last line of the source span.
    pub end_line: u32,
    /// Last column of the source span.
    pub end_column: u16,
    /// Generic child list kept in sync with collector buckets.
    pub children: Vec<ObjRef>,
}

impl ObjectHeader {
    /// Creates a header with the given internal id.
    #[must_use]
    pub fn with_id(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Sets the source span.
    pub fn set_span(&mut self, start: (u32, u16), end: (u32, u16)) {
        self.start_line = start.0;
        self.start_column = start.1;
        self.end_line = end.0;
        self.end_column = end.1;
    }
}
