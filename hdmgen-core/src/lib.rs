//! # hdmgen Core
//!
//! Runtime types shared by generated object-model code and the reference model.
//!
//! This crate provides:
//! - Object references ([`ObjRef`]) and the common base record ([`ObjectHeader`])
//! - Symbol interning for text content ([`SymbolTable`])
//! - Little-endian wire reader/writer for the archive format
//! - Elaboration and comparison contexts used by clone and compare code
//! - The handle-based traversal protocol consumed by pull-style listeners

pub mod context;
pub mod error;
pub mod objref;
pub mod protocol;
pub mod symbol;
pub mod wire;

pub use context::{CompareContext, ElaborationContext, NoElaboration, VisitedSet};
pub use error::{Error, Result};
pub use objref::{ObjRef, ObjectHeader};
pub use protocol::HandleProtocol;
pub use symbol::{SymbolId, SymbolTable};
pub use wire::{ArchiveHeader, WireReader, WireWriter};
