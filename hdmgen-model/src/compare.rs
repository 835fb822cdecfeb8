//! Structural comparison of two object trees.
//!
//! Members are compared level by level from the root ancestor down, scalars
//! before references within a level, skipping members the policy table
//! blacklists. Headers (ids and source provenance) never take part. Each
//! `(lhs, rhs)` pair is compared at most once, so cyclic graphs terminate.
//!
//! Lists compare by length before elements; an absent list equals an empty one.

use crate::error::Result;
use crate::graph::Graph;
use crate::value::Value;
use hdmgen_core::{CompareContext, ObjRef};
use std::cmp::Ordering;

/// Outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// Overall ordering of the left tree relative to the right.
    pub ordering: Ordering,
    /// First pair of objects found to differ.
    pub mismatch: Option<(ObjRef, ObjRef)>,
}

impl Comparison {
    /// Returns true if the trees compared equal.
    #[must_use]
    pub fn is_equal(&self) -> bool {
        self.ordering == Ordering::Equal
    }
}

/// Compares the tree at `lhs` in `left` with the tree at `rhs` in `right`.
///
/// Both graphs must be interpreted against the same schema.
///
/// # Errors
/// Returns `ModelError::DanglingReference` if a reference names a missing object.
pub fn compare(left: &Graph, lhs: ObjRef, right: &Graph, rhs: ObjRef) -> Result<Comparison> {
    let mut cx = CompareContext::new();
    let ordering = compare_objects(left, right, lhs, rhs, &mut cx)?;
    Ok(Comparison {
        ordering,
        mismatch: cx.mismatch(),
    })
}

fn compare_objects(
    left: &Graph,
    right: &Graph,
    lhs: ObjRef,
    rhs: ObjRef,
    cx: &mut CompareContext,
) -> Result<Ordering> {
    if lhs.tag != rhs.tag {
        return Ok(cx.fail(lhs, rhs, lhs.tag.cmp(&rhs.tag)));
    }
    if !cx.enter(lhs, rhs) {
        return Ok(Ordering::Equal);
    }
    let entity = left.entity(lhs)?;
    let levels = left.resolution().levels_of(entity);
    let layout = left.layout(lhs.tag)?;
    let lvalues = left.object(lhs)?.values();
    let rvalues = right.object(rhs)?.values();

    for level in levels {
        let members = level
            .members
            .iter()
            .filter(|m| !left.policy().is_compare_excluded(m));
        let (scalars, references): (Vec<_>, Vec<_>) = members.partition(|m| !m.is_reference());

        for member in scalars {
            let Some(slot) = layout.slot(&member.name) else {
                continue;
            };
            let ordering = lvalues[slot].scalar_cmp(&rvalues[slot]);
            if ordering != Ordering::Equal {
                return Ok(cx.fail(lhs, rhs, ordering));
            }
        }
        for member in references {
            let Some(slot) = layout.slot(&member.name) else {
                continue;
            };
            let ordering = compare_values(left, right, lhs, rhs, &lvalues[slot], &rvalues[slot], cx)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
    }
    Ok(Ordering::Equal)
}

fn compare_values(
    left: &Graph,
    right: &Graph,
    lhs: ObjRef,
    rhs: ObjRef,
    lvalue: &Value,
    rvalue: &Value,
    cx: &mut CompareContext,
) -> Result<Ordering> {
    match (lvalue, rvalue) {
        (Value::Ref(l), Value::Ref(r)) => match (l, r) {
            (Some(l), Some(r)) => compare_objects(left, right, *l, *r, cx),
            (l, r) => Ok(cx.fail(lhs, rhs, l.is_some().cmp(&r.is_some()))),
        },
        (Value::Refs(l), Value::Refs(r)) => {
            let l = l.as_deref().unwrap_or(&[]);
            let r = r.as_deref().unwrap_or(&[]);
            if l.len() != r.len() {
                return Ok(cx.fail(lhs, rhs, l.len().cmp(&r.len())));
            }
            for (&a, &b) in l.iter().zip(r) {
                let ordering = compare_objects(left, right, a, b, cx)?;
                if ordering != Ordering::Equal {
                    return Ok(cx.fail(lhs, rhs, ordering));
                }
            }
            Ok(Ordering::Equal)
        }
        (l, r) => Ok(cx.fail(lhs, rhs, l.scalar_cmp(r))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_graph;

    fn module_with_nets(graph: &mut Graph, names: &[&str]) -> ObjRef {
        let module = graph.create("module").unwrap();
        graph.set_text(module, "name", "top").unwrap();
        for name in names {
            let net = graph.create("net").unwrap();
            graph.set_text(net, "name", *name).unwrap();
            graph.push(module, "nets", net).unwrap();
        }
        module
    }

    #[test]
    fn test_equal_trees_across_graphs() {
        let mut left = sample_graph();
        let mut right = sample_graph();
        right.create("constant").unwrap();
        let l = module_with_nets(&mut left, &["a", "b"]);
        let r = module_with_nets(&mut right, &["a", "b"]);
        let result = compare(&left, l, &right, r).unwrap();
        assert!(result.is_equal());
        assert_eq!(result.mismatch, None);
    }

    #[test]
    fn test_first_mismatch_recorded() {
        let mut graph = sample_graph();
        let l = module_with_nets(&mut graph, &["a", "b"]);
        let r = module_with_nets(&mut graph, &["a", "c"]);
        let result = compare(&graph, l, &graph, r).unwrap();
        assert_eq!(result.ordering, Ordering::Less);
        let lb = graph.refs(l, "nets").unwrap()[1];
        let rc = graph.refs(r, "nets").unwrap()[1];
        assert_eq!(result.mismatch, Some((lb, rc)));
    }

    #[test]
    fn test_blacklisted_member_ignored() {
        let mut graph = sample_graph();
        let l = module_with_nets(&mut graph, &[]);
        let r = module_with_nets(&mut graph, &[]);
        graph.set_text(l, "def_name", "work@top").unwrap();
        graph.header_mut(l).unwrap().file = "top.sv".into();
        assert!(compare(&graph, l, &graph, r).unwrap().is_equal());
    }

    #[test]
    fn test_type_tag_short_circuit() {
        let mut graph = sample_graph();
        let net = graph.create("net").unwrap();
        let constant = graph.create("constant").unwrap();
        let result = compare(&graph, net, &graph, constant).unwrap();
        assert_eq!(result.ordering, Ordering::Less);
        assert_eq!(result.mismatch, Some((net, constant)));
    }

    #[test]
    fn test_absent_list_equals_empty_list() {
        let mut graph = sample_graph();
        let l = graph.create("scope").unwrap();
        let r = graph.create("scope").unwrap();
        graph.set(r, "nets", Value::Refs(Some(Vec::new()))).unwrap();
        assert!(compare(&graph, l, &graph, r).unwrap().is_equal());
        assert!(compare(&graph, r, &graph, l).unwrap().is_equal());

        let net = graph.create("net").unwrap();
        graph.push(l, "nets", net).unwrap();
        let result = compare(&graph, l, &graph, r).unwrap();
        assert_eq!(result.ordering, Ordering::Greater);
        assert_eq!(result.mismatch, Some((l, r)));
    }

    #[test]
    fn test_shorter_list_orders_first_regardless_of_elements() {
        let mut graph = sample_graph();
        let l = module_with_nets(&mut graph, &["z"]);
        let r = module_with_nets(&mut graph, &["a", "b"]);
        let result = compare(&graph, l, &graph, r).unwrap();
        assert_eq!(result.ordering, Ordering::Less);
        assert_eq!(result.mismatch, Some((l, r)));
    }

    #[test]
    fn test_cyclic_trees_terminate() {
        let mut graph = sample_graph();
        let a = graph.create("module").unwrap();
        let b = graph.create("module").unwrap();
        graph.push(a, "ref_modules", a).unwrap();
        graph.push(b, "ref_modules", b).unwrap();
        assert!(compare(&graph, a, &graph, b).unwrap().is_equal());
    }
}
