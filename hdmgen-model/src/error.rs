//! Error types for the reference object graph.

use hdmgen_core::ObjRef;
use thiserror::Error;

/// Errors raised by graph construction, mutation and archive restore.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Entity name is not part of the schema.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// Abstract entities have no objects.
    #[error("entity '{0}' is abstract and cannot be instantiated")]
    NotInstantiable(String),

    /// Entity has no effective member with that name.
    #[error("entity '{entity}' has no member '{member}'")]
    UnknownMember {
        /// Entity name.
        entity: String,
        /// Requested member name.
        member: String,
    },

    /// Value kind does not fit the member, or a reference violates the
    /// target's is-a set or group closure.
    #[error("type mismatch on '{entity}.{member}': {reason}")]
    TypeMismatch {
        /// Entity name.
        entity: String,
        /// Member name.
        member: String,
        /// What did not fit.
        reason: String,
    },

    /// Reference to an object that does not exist in the graph.
    #[error("dangling reference {obj}")]
    DanglingReference {
        /// Offending reference.
        obj: ObjRef,
    },

    /// Wire or symbol-table error.
    #[error("core error: {0}")]
    Core(#[from] hdmgen_core::Error),
}

impl ModelError {
    /// Creates a type mismatch error.
    pub fn mismatch(
        entity: impl Into<String>,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            entity: entity.into(),
            member: member.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
