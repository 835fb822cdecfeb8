//! Error types for code generation.

use crate::generator::EmitterReport;
use thiserror::Error;

/// Error type for code generation operations.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Schema or policy error.
    #[error("schema error: {0}")]
    Schema(#[from] hdmgen_schema::SchemaError),

    /// Policy document parse error.
    #[error("policy parse error: {0}")]
    Parse(#[from] hdmgen_schema::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template error: unknown or unfilled placeholder.
    #[error("template '{template}': {message}")]
    Template {
        /// Template name.
        template: String,
        /// Error message.
        message: String,
    },

    /// Code generation error.
    #[error("generation error: {message}")]
    Generation {
        /// Error message.
        message: String,
    },

    /// One or more emitters failed; reports of every emitter are kept.
    #[error("emitters failed: {failed}")]
    Emitters {
        /// Comma-separated names of the failed emitters.
        failed: String,
        /// Per-emitter reports, successful siblings included.
        reports: Vec<EmitterReport>,
    },
}

impl CodegenError {
    /// Creates a generation error with the given message.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Creates a template error.
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }
}
