//! Error types for schema building, validation and policy loading.

use thiserror::Error;

/// Error type for policy document parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Missing required attribute.
    #[error("missing required attribute '{attribute}' on element '{element}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
    },

    /// Invalid attribute value.
    #[error("invalid value '{value}' for attribute '{attribute}' on element '{element}'")]
    InvalidAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Invalid value.
        value: String,
    },

    /// Unknown element encountered.
    #[error("unknown element '{element}' in context '{context}'")]
    UnknownElement {
        /// Element name.
        element: String,
        /// Parent context.
        context: String,
    },

    /// Invalid document structure.
    #[error("invalid policy structure: {message}")]
    InvalidStructure {
        /// Error message.
        message: String,
    },

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Error type for schema building and validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Policy parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A derived entity is declared before its base.
    #[error("entity '{entity}' is declared before its base '{base}'")]
    OrderingViolation {
        /// Derived entity.
        entity: String,
        /// Base entity.
        base: String,
    },

    /// Base entity does not exist.
    #[error("entity '{entity}' extends unknown base '{base}'")]
    UnknownBase {
        /// Derived entity.
        entity: String,
        /// Missing base.
        base: String,
    },

    /// Member element type does not resolve.
    #[error("member '{member}' of '{entity}' has unresolved element type '{element}'")]
    UnresolvedElementType {
        /// Owning entity.
        entity: String,
        /// Member name.
        member: String,
        /// Unresolved type name.
        element: String,
    },

    /// Two members of one effective member set derive the same name.
    #[error("members '{first}' and '{second}' of '{entity}' both derive the name '{derived}'")]
    NamingCollision {
        /// Entity whose effective member set collides.
        entity: String,
        /// First raw member name.
        first: String,
        /// Second raw member name.
        second: String,
        /// Colliding derived name.
        derived: String,
    },

    /// Group references form a cycle.
    #[error("group reference cycle: {path}")]
    GroupCycle {
        /// Cycle path, joined with ` -> `.
        path: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} definition: '{name}'")]
    DuplicateDefinition {
        /// Kind of definition (entity, group, member).
        kind: String,
        /// Name of the duplicate.
        name: String,
    },

    /// Entity not found.
    #[error("entity '{name}' not found")]
    UnknownEntity {
        /// Entity name.
        name: String,
    },

    /// Group not found.
    #[error("group '{name}' not found")]
    UnknownGroup {
        /// Group name.
        name: String,
    },

    /// Policy entry does not match the schema.
    #[error("policy error: {message}")]
    Policy {
        /// Error message.
        message: String,
    },
}

impl ParseError {
    /// Creates a missing attribute error.
    pub fn missing_attr(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates an invalid attribute error.
    pub fn invalid_attr(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Creates an unknown element error.
    pub fn unknown_element(element: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownElement {
            element: element.into(),
            context: context.into(),
        }
    }
}

impl SchemaError {
    /// Creates a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateDefinition {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates an unknown entity error.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Creates an unknown group error.
    pub fn unknown_group(name: impl Into<String>) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    /// Creates a policy error.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }
}
