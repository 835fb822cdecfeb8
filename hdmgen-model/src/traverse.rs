//! Push-style traversal over a [`Graph`].
//!
//! Mirrors the generated `Traversal`: members are walked base-first, members
//! excluded by the policy table are never stepped through, and every object
//! and every `(owner, relation)` collection is entered at most once.

use crate::error::Result;
use crate::graph::Graph;
use crate::value::Value;
use hdmgen_core::{ObjRef, VisitedSet};

/// Traversal callbacks. Every hook has an empty default body.
///
/// `relation` names the member through which the object was reached and is
/// `None` for the root.
#[allow(unused_variables)]
pub trait GraphListener {
    /// Called when an object is entered, before its members.
    fn enter_object(&mut self, graph: &Graph, obj: ObjRef, relation: Option<&str>) {}

    /// Called when an object is left, after its members.
    fn leave_object(&mut self, graph: &Graph, obj: ObjRef, relation: Option<&str>) {}

    /// Called before the elements of a collection are visited.
    fn enter_collection(&mut self, graph: &Graph, owner: ObjRef, relation: &str, items: &[ObjRef]) {}

    /// Called after the elements of a collection were visited.
    fn leave_collection(&mut self, graph: &Graph, owner: ObjRef, relation: &str, items: &[ObjRef]) {}
}

/// Visits `root` and everything reachable from it through traversed members.
///
/// Returns the number of distinct objects entered.
///
/// # Errors
/// Returns `ModelError::DanglingReference` if a reference names a missing object.
pub fn traverse<L: GraphListener>(graph: &Graph, root: ObjRef, listener: &mut L) -> Result<usize> {
    let mut walker = Walker {
        graph,
        listener,
        visited: VisitedSet::new(),
    };
    walker.visit(root, None)?;
    Ok(walker.visited.len())
}

struct Walker<'g, 'l, L: GraphListener> {
    graph: &'g Graph,
    listener: &'l mut L,
    visited: VisitedSet,
}

impl<'g, L: GraphListener> Walker<'g, '_, L> {
    fn visit(&mut self, obj: ObjRef, relation: Option<&str>) -> Result<()> {
        if !self.visited.insert(obj) {
            return Ok(());
        }
        let graph = self.graph;
        let object = graph.object(obj)?;
        let entity = graph.entity(obj)?;
        let chain = graph.resolution().ancestors_of(entity);

        self.listener.enter_object(graph, obj, relation);
        for (member, value) in graph.members(obj)?.iter().zip(object.values()) {
            if !member.is_reference() || graph.policy().is_traversal_excluded(&chain, member) {
                continue;
            }
            match value {
                Value::Ref(Some(target)) => self.visit(*target, Some(&member.relation))?,
                Value::Refs(Some(items)) => self.visit_collection(obj, &member.relation, items)?,
                _ => {}
            }
        }
        self.listener.leave_object(graph, obj, relation);
        Ok(())
    }

    fn visit_collection(&mut self, owner: ObjRef, relation: &str, items: &'g [ObjRef]) -> Result<()> {
        if !self.visited.insert_collection(owner, relation) {
            return Ok(());
        }
        self.listener.enter_collection(self.graph, owner, relation, items);
        for &item in items {
            self.visit(item, Some(relation))?;
        }
        self.listener.leave_collection(self.graph, owner, relation, items);
        Ok(())
    }
}

/// Listener recording the order objects are entered and left in.
#[derive(Debug, Default)]
pub struct TraceListener {
    /// `(entered, obj, relation)` per hook call.
    pub events: Vec<(bool, ObjRef, Option<String>)>,
    /// `(owner, relation, length)` per entered collection.
    pub collections: Vec<(ObjRef, String, usize)>,
}

impl TraceListener {
    /// Objects in the order they were entered.
    #[must_use]
    pub fn entered(&self) -> Vec<ObjRef> {
        self.events
            .iter()
            .filter(|(entered, ..)| *entered)
            .map(|(_, obj, _)| *obj)
            .collect()
    }
}

impl GraphListener for TraceListener {
    fn enter_object(&mut self, _graph: &Graph, obj: ObjRef, relation: Option<&str>) {
        self.events.push((true, obj, relation.map(str::to_string)));
    }

    fn leave_object(&mut self, _graph: &Graph, obj: ObjRef, relation: Option<&str>) {
        self.events.push((false, obj, relation.map(str::to_string)));
    }

    fn enter_collection(&mut self, _graph: &Graph, owner: ObjRef, relation: &str, items: &[ObjRef]) {
        self.collections.push((owner, relation.to_string(), items.len()));
    }
}
