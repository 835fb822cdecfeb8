//! Child adoption for collector entities.
//!
//! A collector keeps a generic child list in its header and per-type bucket
//! collections among its members. Attaching or detaching a child updates
//! both, walking the collector's ancestor chain from the root so inherited
//! buckets are filled as well.

use crate::error::Result;
use crate::graph::Graph;
use crate::value::Value;
use hdmgen_core::ObjRef;
use tracing::{debug, warn};

impl Graph {
    /// Adopts `child` under `parent`.
    ///
    /// Sets the child's parent, appends it to the generic child list and
    /// files it into every bucket whose child entity it is-a. A child owned
    /// by another parent is detached from it first. Adopting the same child
    /// twice has no further effect.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if either object is missing.
    pub fn attach_child(&mut self, parent: ObjRef, child: ObjRef) -> Result<()> {
        let previous = self.header(child)?.parent;
        let buckets = self.buckets_for(parent, child)?;
        if let Some(previous) = previous.filter(|&p| p != parent) {
            debug!(%child, from = %previous, to = %parent, "reparenting child");
            self.detach_child(previous, child)?;
        }

        self.header_mut(child)?.parent = Some(parent);
        let header = self.header_mut(parent)?;
        if !header.children.contains(&child) {
            header.children.push(child);
        }
        for bucket in buckets {
            let items = self.refs(parent, &bucket)?;
            if !items.contains(&child) {
                self.push(parent, &bucket, child)?;
            }
        }
        Ok(())
    }

    /// Releases `child` from `parent`.
    ///
    /// Returns false if `child` was not adopted by `parent`.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if either object is missing.
    pub fn detach_child(&mut self, parent: ObjRef, child: ObjRef) -> Result<bool> {
        self.header(child)?;
        let buckets = self.buckets_for(parent, child)?;

        let header = self.header_mut(parent)?;
        let before = header.children.len();
        header.children.retain(|&c| c != child);
        let adopted = header.children.len() != before;

        for bucket in buckets {
            if let Value::Refs(Some(items)) = self.get(parent, &bucket)? {
                let remaining: Vec<ObjRef> = items.iter().copied().filter(|&c| c != child).collect();
                if remaining.len() != items.len() {
                    self.set(parent, &bucket, Value::Refs(Some(remaining)))?;
                }
            }
        }
        let child_header = self.header_mut(child)?;
        if child_header.parent == Some(parent) {
            child_header.parent = None;
        }
        Ok(adopted)
    }

    /// Bucket members of `parent` that `child` belongs in, root level first.
    fn buckets_for(&self, parent: ObjRef, child: ObjRef) -> Result<Vec<String>> {
        let resolution = self.resolution();
        let entity = self.entity(parent)?;
        let mut buckets = Vec::new();
        for level in resolution.levels_of(entity) {
            for (child_entity, bucket) in self.policy().collector_buckets(&level.name) {
                let Some(child_def) = resolution.schema().entity(child_entity) else {
                    continue;
                };
                if !resolution.is_a(child.tag, child_def) {
                    continue;
                }
                let is_list = self
                    .members(parent)?
                    .iter()
                    .any(|m| &m.name == bucket && m.is_many());
                if !is_list {
                    warn!(
                        collector = %level.name,
                        bucket = %bucket,
                        "collector bucket is not a collection member, skipping"
                    );
                    continue;
                }
                if !buckets.contains(bucket) {
                    buckets.push(bucket.clone());
                }
            }
        }
        Ok(buckets)
    }
}
