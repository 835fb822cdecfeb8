//! Error types for hdmgen core operations.

use thiserror::Error;

/// Core error type for archive and object-reference operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer is too short for the requested read.
    #[error("buffer too short: required {required} bytes, available {available} bytes")]
    BufferTooShort {
        /// Required size in bytes.
        required: usize,
        /// Available size in bytes.
        available: usize,
    },

    /// Archive does not start with the expected magic number.
    #[error("bad archive magic: expected {expected:#010x}, actual {actual:#010x}")]
    BadMagic {
        /// Expected magic value.
        expected: u32,
        /// Magic value found.
        actual: u32,
    },

    /// Archive version is not supported by this reader.
    #[error("unsupported archive version {version}, supported {supported}")]
    UnsupportedVersion {
        /// Version found in the archive.
        version: u16,
        /// Version understood by this reader.
        supported: u16,
    },

    /// A declared element count cannot fit in the unread input.
    #[error("declared count {count} exceeds input: {available} bytes left, at least {min_size} bytes per element")]
    CountTooLarge {
        /// Declared element count.
        count: u64,
        /// Smallest encoded size of one element.
        min_size: usize,
        /// Unread bytes when the count was checked.
        available: usize,
    },

    /// A type tag does not name a concrete entity.
    #[error("unknown type tag {tag}")]
    UnknownTypeTag {
        /// Offending tag.
        tag: u32,
    },

    /// A per-type object index is outside the allocated storage.
    #[error("object index {index} out of range for type tag {tag} ({count} objects)")]
    IndexOutOfRange {
        /// Type tag of the reference.
        tag: u32,
        /// Offending index.
        index: u32,
        /// Number of objects of that type.
        count: u32,
    },

    /// A symbol id does not exist in the symbol table.
    #[error("unknown symbol id {id}")]
    UnknownSymbol {
        /// Offending symbol id.
        id: u32,
    },

    /// Invalid UTF-8 encoding in a symbol.
    #[error("invalid UTF-8 in symbol {id}")]
    InvalidUtf8 {
        /// Symbol id whose bytes were not valid UTF-8.
        id: u32,
    },
}

/// Result type alias for hdmgen core operations.
pub type Result<T> = std::result::Result<T, Error>;
