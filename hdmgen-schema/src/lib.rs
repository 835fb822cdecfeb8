//! # hdmgen Schema
//!
//! In-memory object-model schema and the derived views every emitter shares.
//!
//! This crate provides:
//! - Entity, member and group definitions with a validating builder
//! - Hierarchy resolution (effective members, subclass and group closures)
//! - Deterministic identifier derivation with override tables
//! - Declarative clone, traversal, comparison and container policies
//! - A policy document parser

pub mod builder;
pub mod error;
pub mod naming;
pub mod parser;
pub mod policy;
pub mod resolver;
pub mod types;
pub mod validation;

pub use builder::{EntityBuilder, SchemaBuilder};
pub use error::{ParseError, SchemaError};
pub use naming::{NamingEngine, NamingEngineBuilder};
pub use parser::parse_policy;
pub use policy::{
    ANY_ENTITY, BindingKind, ClonePolicy, CustomClone, EntityClone, KeySource, PolicyTable,
    PolicyTableBuilder,
};
pub use resolver::{MemberOrder, OwnedMember, ResolutionContext};
pub use types::{
    Cardinality, ElementType, EntityDef, EntityKind, GroupDef, GroupRef, Member, MemberKind,
    MemberTag, ScalarKind, Schema,
};
pub use validation::validate_schema;
