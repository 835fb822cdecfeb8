//! # hdmgen Fixture
//!
//! A small object model generated by the build script and compiled against
//! `hdmgen-core`. It holds a scope, a module deriving from it, nets and
//! constants, so the generated traversal, dump, tracer, clone, compare and
//! container adoption code can be exercised as ordinary Rust.

include!(concat!(env!("OUT_DIR"), "/fixture.rs"));

pub use model::clone::Cloner;
pub use model::compare::compare_any;
pub use model::listener::{Listener, Traversal};
pub use model::listener_tracer::ListenerTracer;
pub use model::store::Store;
pub use model::types::TypeTag;
pub use model::visitor::dump;
