//! Contexts threaded through clone, compare and traversal code.

use crate::objref::ObjRef;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Elaboration-time binding lookups used while cloning.
///
/// Back-references are rebound by name through [`bind_any`](Self::bind_any);
/// a miss keeps the original pointer. Nets and parameters are deduplicated by
/// name through their own tables so that cloning one definition into many
/// instances yields one object per name per scope.
pub trait ElaborationContext {
    /// Looks up any object bound to `name` in the current scope.
    fn bind_any(&self, _name: &str) -> Option<ObjRef> {
        None
    }

    /// Looks up a net already cloned under `name`.
    fn bind_net(&self, _name: &str) -> Option<ObjRef> {
        None
    }

    /// Looks up a parameter already cloned under `name`.
    fn bind_param(&self, _name: &str) -> Option<ObjRef> {
        None
    }

    /// Looks up a task or function definition by name.
    fn bind_task_func(&self, _name: &str) -> Option<ObjRef> {
        None
    }

    /// Records a freshly cloned net.
    fn record_net(&mut self, _name: &str, _obj: ObjRef) {}

    /// Records a freshly cloned parameter.
    fn record_param(&mut self, _name: &str, _obj: ObjRef) {}

    /// Records a task or function definition.
    fn record_task_func(&mut self, _name: &str, _obj: ObjRef) {}

    /// Called before a scope-like object's members are cloned.
    fn enter_scope(&mut self, _scope: ObjRef) {}

    /// Called after a scope-like object's members are cloned.
    fn leave_scope(&mut self, _scope: ObjRef) {}

    /// Returns true if type specifications are deep-cloned instead of shared.
    fn uniquify_typespecs(&self) -> bool {
        false
    }
}

/// Elaboration context with no bindings: every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElaboration;

impl ElaborationContext for NoElaboration {}

/// Visited-set for one traversal run.
///
/// Tracks objects and `(owner, relation)` collections separately so each is
/// entered and left at most once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    objects: HashSet<ObjRef>,
    collections: HashSet<(ObjRef, String)>,
}

impl VisitedSet {
    /// Creates an empty visited-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `obj` visited, returning false if it already was.
    pub fn insert(&mut self, obj: ObjRef) -> bool {
        self.objects.insert(obj)
    }

    /// Returns true if `obj` has been visited.
    #[must_use]
    pub fn contains(&self, obj: ObjRef) -> bool {
        self.objects.contains(&obj)
    }

    /// Marks the `relation` collection of `owner` visited, returning false if
    /// it already was.
    pub fn insert_collection(&mut self, owner: ObjRef, relation: &str) -> bool {
        self.collections.insert((owner, relation.to_string()))
    }

    /// Number of distinct objects visited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no object has been visited yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forgets everything visited.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.collections.clear();
    }
}

/// State for one structural comparison.
///
/// Pairs already under comparison are treated as equal when met again, which
/// bounds recursion on cyclic graphs. The first pair found to differ is kept
/// for diagnostics.
#[derive(Debug, Default)]
pub struct CompareContext {
    visited: HashSet<(ObjRef, ObjRef)>,
    mismatch: Option<(ObjRef, ObjRef)>,
}

impl CompareContext {
    /// Creates an empty comparison context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the pair, returning false if it was already compared.
    pub fn enter(&mut self, lhs: ObjRef, rhs: ObjRef) -> bool {
        self.visited.insert((lhs, rhs))
    }

    /// Records `(lhs, rhs)` as the mismatching pair if none is recorded yet
    /// and `ordering` is not equal. Returns `ordering` unchanged.
    pub fn fail(&mut self, lhs: ObjRef, rhs: ObjRef, ordering: Ordering) -> Ordering {
        if ordering != Ordering::Equal && self.mismatch.is_none() {
            self.mismatch = Some((lhs, rhs));
        }
        ordering
    }

    /// Returns the first mismatching pair, if any.
    #[must_use]
    pub fn mismatch(&self) -> Option<(ObjRef, ObjRef)> {
        self.mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_elaboration_misses() {
        let mut cx = NoElaboration;
        assert_eq!(cx.bind_any("x"), None);
        cx.record_net("n", ObjRef::new(1, 0));
        assert_eq!(cx.bind_net("n"), None);
        assert!(!cx.uniquify_typespecs());
    }

    #[test]
    fn test_visited_set() {
        let mut visited = VisitedSet::new();
        assert!(visited.is_empty());
        let a = ObjRef::new(2, 0);
        assert!(visited.insert(a));
        assert!(!visited.is_empty());
        assert!(!visited.insert(a));
        assert!(visited.contains(a));
        assert!(visited.insert_collection(a, "children"));
        assert!(!visited.insert_collection(a, "children"));
        assert!(visited.insert_collection(a, "ports"));
        assert_eq!(visited.len(), 1);
        visited.clear();
        assert!(visited.is_empty());
    }

    #[test]
    fn test_compare_context_keeps_first_mismatch() {
        let mut cx = CompareContext::new();
        let a = ObjRef::new(0, 0);
        let b = ObjRef::new(0, 1);
        let c = ObjRef::new(0, 2);
        assert!(cx.enter(a, b));
        assert!(!cx.enter(a, b));
        assert_eq!(cx.fail(a, b, Ordering::Equal), Ordering::Equal);
        assert_eq!(cx.mismatch(), None);
        assert_eq!(cx.fail(b, c, Ordering::Less), Ordering::Less);
        assert_eq!(cx.fail(a, c, Ordering::Greater), Ordering::Greater);
        assert_eq!(cx.mismatch(), Some((b, c)));
    }
}
