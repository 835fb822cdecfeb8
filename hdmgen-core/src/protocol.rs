//! Handle-based traversal protocol.
//!
//! Pull-style listeners do not touch the object store directly. They walk an
//! object graph through an externally defined protocol: ask for the object a
//! relation points at, or open an iterator over a relation collection and
//! scan it to exhaustion. Handles are owned by the caller and given back with
//! [`HandleProtocol::release`].

use crate::objref::ObjRef;

/// External handle protocol consumed by generated pull-style listeners.
pub trait HandleProtocol {
    /// Opaque handle to one object.
    type Handle;
    /// Opaque iterator over a relation collection.
    type Iterator;

    /// Returns the object a handle designates.
    fn object(&self, handle: &Self::Handle) -> Option<ObjRef>;

    /// Follows a single-valued relation from `handle`.
    fn handle(&self, relation: &str, handle: &Self::Handle) -> Option<Self::Handle>;

    /// Opens an iterator over a many-valued relation of `handle`.
    fn iterate(&self, relation: &str, handle: &Self::Handle) -> Option<Self::Iterator>;

    /// Returns the next element of an iterator, or `None` once exhausted.
    fn scan(&self, iterator: &mut Self::Iterator) -> Option<Self::Handle>;

    /// Releases a handle obtained from this protocol.
    fn release(&self, handle: Self::Handle) {
        drop(handle);
    }
}
