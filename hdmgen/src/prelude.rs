//! Prelude module for convenient imports.
//!
//! ```ignore
//! use hdmgen::prelude::*;
//! ```

// Core types
pub use hdmgen_core::error::{Error as CoreError, Result as CoreResult};
pub use hdmgen_core::{ElaborationContext, ObjRef, ObjectHeader, SymbolTable};

// Schema types
pub use hdmgen_schema::{
    Cardinality, ClonePolicy, CustomClone, EntityBuilder, EntityClone, GroupDef, Member,
    MemberOrder, MemberTag, NamingEngine, PolicyTable, ResolutionContext, ScalarKind, Schema,
    SchemaBuilder, SchemaError, parse_policy,
};

// Generation
pub use hdmgen_codegen::{
    CodegenError, EmitterKind, FsWriter, GenerationOutput, Generator, GeneratorBuilder,
    MemoryWriter, OutputWriter, WriteOutcome,
};

// Reference model
pub use hdmgen_model::{
    CloneOptions, Cloner, Comparison, Elaboration, Graph, GraphListener, ModelError, Value,
};
