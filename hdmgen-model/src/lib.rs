//! # hdmgen Model
//!
//! A reference object graph interpreted directly from a resolved schema.
//!
//! Generated object models are compiled into the crates that use them; this
//! crate provides the same runtime semantics without code generation, so
//! they can be exercised and compared against:
//! - [`Graph`]: typed member storage with group compliance checks
//! - [`traverse`]: push-style traversal with policy exclusions
//! - [`Cloner`] and [`Elaboration`]: policy-driven deep clone with rebinding
//! - [`compare`]: structural comparison with a blacklist
//! - [`archive`]: binary save and restore
//! - [`Graph::attach_child`]: collector bucket synchronization

pub mod archive;
pub mod clone;
pub mod compare;
mod containers;
pub mod error;
pub mod graph;
pub mod traverse;
pub mod value;

pub use archive::{reachable, restore, restore_like, save};
pub use clone::{CloneOptions, Cloner, Elaboration, clone_tree};
pub use compare::{Comparison, compare};
pub use error::{ModelError, Result};
pub use graph::{Graph, Object};
pub use traverse::{GraphListener, TraceListener, traverse};
pub use value::Value;
