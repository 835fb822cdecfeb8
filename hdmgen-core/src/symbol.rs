//! Symbol interning.
//!
//! Text and value content is stored once in a [`SymbolTable`] and referred to
//! by [`SymbolId`] everywhere else. Id zero is reserved for "no symbol", so
//! an empty string never occupies a slot.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Identifier of an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// The reserved id for the empty symbol.
    pub const NONE: Self = Self(0);

    /// Returns true if this is the reserved empty id.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// Deduplicating symbol table: write once, refer by id thereafter.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<String>,
    index: HashMap<String, SymbolId>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning its id. Empty text maps to [`SymbolId::NONE`].
    pub fn intern(&mut self, text: &str) -> SymbolId {
        if text.is_empty() {
            return SymbolId::NONE;
        }
        if let Some(&id) = self.index.get(text) {
            return id;
        }
        self.symbols.push(text.to_string());
        let id = SymbolId(self.symbols.len() as u32);
        self.index.insert(text.to_string(), id);
        id
    }

    /// Looks up an existing symbol without interning it.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<SymbolId> {
        if text.is_empty() {
            return Some(SymbolId::NONE);
        }
        self.index.get(text).copied()
    }

    /// Resolves an id back to its text.
    ///
    /// # Errors
    /// Returns `Error::UnknownSymbol` if the id was never issued.
    pub fn resolve(&self, id: SymbolId) -> Result<&str> {
        if id.is_none() {
            return Ok("");
        }
        self.symbols
            .get(id.0 as usize - 1)
            .map(String::as_str)
            .ok_or(Error::UnknownSymbol { id: id.0 })
    }

    /// Returns the number of interned symbols (excluding the empty symbol).
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates symbols in id order, starting at id 1.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32 + 1), s.as_str()))
    }
}
