//! # hdmgen
//!
//! Schema-driven code generator for large polymorphic object models used by
//! hardware-design tooling.
//!
//! From one declarative entity schema (single inheritance, scalar
//! properties, object references and polymorphic group references) and one
//! policy table, hdmgen derives every cross-cutting behavior of the model:
//! typed accessors, visitor dispatch, deep clone with elaboration-time
//! rebinding, structural comparison, a binary wire schema with save/restore
//! adapters, and container adoption hooks.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hdmgen::prelude::*;
//!
//! let schema = SchemaBuilder::new("design")
//!     .entity(EntityBuilder::new("base").member(Member::scalar("name", ScalarKind::String)))
//!     .build()?;
//!
//! let summary = Generator::builder()
//!     .policy(PolicyTable::hdl_defaults().restrict_to(&schema))
//!     .build(&schema)?
//!     .run()?
//!     .write_all(&mut FsWriter::new("src/model"))?;
//! println!("{} files changed", summary.changed());
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Object references, headers, symbols, archive wire format
//! - [`schema`] - Schema model, hierarchy resolution, naming, policies
//! - [`codegen`] - Emitters, templates, generation driver, output writers
//! - [`model`] - Reference object graph with the generated semantics

pub mod prelude;

/// Runtime types shared by generated code.
pub mod core {
    pub use hdmgen_core::*;
}

/// Schema model, resolution, naming and policy tables.
pub mod schema {
    pub use hdmgen_schema::*;
}

/// Code generation.
pub mod codegen {
    pub use hdmgen_codegen::*;
}

/// Schema-interpreted reference object graph.
pub mod model {
    pub use hdmgen_model::*;
}

// Re-export commonly used items at the crate root
pub use hdmgen_codegen::{
    CodegenError, FsWriter, GenerationOutput, Generator, GeneratorBuilder, generate,
    generate_to_dir, policy_from_file,
};
pub use hdmgen_schema::{
    NamingEngine, PolicyTable, ResolutionContext, Schema, SchemaBuilder, SchemaError,
};
