//! # hdmgen Codegen
//!
//! Code generation of polymorphic object models from entity schemas.
//!
//! This crate provides:
//! - The [`Emitter`] interface and the nine Rust backends (type tables,
//!   object model, dispatch, clone, compare, serialization, container
//!   adoption, tree dump, listener tracer)
//! - Embedded templates with named placeholders
//! - The parallel [`Generator`] driver
//! - Idempotent [`OutputWriter`] implementations

pub mod emitter;
pub mod error;
pub mod generator;
pub mod output;
pub mod rust;
pub mod template;

pub use emitter::{Artifact, EmitContext, Emitter, EmitterKind};
pub use error::CodegenError;
pub use generator::{EmitterReport, GenerationOutput, Generator, GeneratorBuilder, WriteSummary};
pub use output::{FsWriter, MemoryWriter, OutputWriter, WriteOutcome};
pub use template::Template;

use hdmgen_schema::{PolicyTable, Schema};
use std::path::Path;

/// Generates every artifact for `schema` under `policy`.
///
/// # Arguments
/// * `schema` - Validated schema
/// * `policy` - Policy table applying to the schema
///
/// # Errors
/// Returns `CodegenError` if validation or any emitter fails.
pub fn generate(schema: &Schema, policy: PolicyTable) -> Result<GenerationOutput, CodegenError> {
    Generator::builder().policy(policy).build(schema)?.run()
}

/// Generates every artifact for `schema` and writes them below `dir`,
/// leaving files with unchanged content untouched.
///
/// # Errors
/// Returns `CodegenError` if generation or writing fails.
pub fn generate_to_dir(
    schema: &Schema,
    policy: PolicyTable,
    dir: &Path,
) -> Result<WriteSummary, CodegenError> {
    let output = generate(schema, policy)?;
    output.write_all(&mut FsWriter::new(dir))
}

/// Loads a policy document from a file.
///
/// # Arguments
/// * `path` - Path to the policy XML document
///
/// # Errors
/// Returns `CodegenError` if reading or parsing fails.
pub fn policy_from_file(path: &Path) -> Result<PolicyTable, CodegenError> {
    let xml = std::fs::read_to_string(path)?;
    Ok(hdmgen_schema::parse_policy(&xml)?)
}
