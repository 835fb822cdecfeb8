//! Synthetic schemas and object graphs for the hdmgen benchmarks.
//!
//! The schema has `families` independent three-level hierarchies under one
//! abstract root, all joined by a polymorphic `nodes` group, so generation
//! cost scales the way a real hardware object model does.

use hdmgen_core::ObjRef;
use hdmgen_model::{Graph, ModelError};
use hdmgen_schema::{
    Cardinality, EntityBuilder, GroupDef, Member, MemberTag, PolicyTable, ResolutionContext,
    ScalarKind, Schema, SchemaBuilder, SchemaError,
};
use std::sync::Arc;

/// Concrete entity name of family `k`.
#[must_use]
pub fn leaf_name(k: usize) -> String {
    format!("n{k}_leaf")
}

/// Builds a schema with `families` hierarchies.
///
/// # Errors
/// Returns `SchemaError` if the schema fails validation.
pub fn synthetic_schema(families: usize) -> Result<Schema, SchemaError> {
    let mut builder = SchemaBuilder::new("synthetic")
        .entity(
            EntityBuilder::new("node")
                .abstract_entity()
                .member(Member::scalar("name", ScalarKind::String).tag(MemberTag::NameIdentifier))
                .member(Member::scalar("line", ScalarKind::UInt32).tag(MemberTag::Provenance)),
        )
        .group(GroupDef::new("nodes").class("node"));

    for k in 0..families {
        let base = format!("n{k}_base");
        builder = builder
            .entity(
                EntityBuilder::new(base.clone())
                    .extends("node")
                    .abstract_entity()
                    .member(Member::scalar(format!("size{k}"), ScalarKind::Int32))
                    .member(Member::scalar(format!("label{k}"), ScalarKind::String)),
            )
            .entity(
                EntityBuilder::new(leaf_name(k))
                    .extends(base)
                    .member(Member::scalar(format!("flag{k}"), ScalarKind::Bool))
                    .member(Member::union(format!("items{k}"), "nodes", Cardinality::Many))
                    .member(Member::object(
                        format!("next{k}"),
                        leaf_name((k + 1) % families),
                        Cardinality::One,
                    )),
            );
    }
    builder.build()
}

/// Resolves a [`synthetic_schema`] of `families` hierarchies.
///
/// # Errors
/// Returns `SchemaError` if the schema fails validation or resolution.
pub fn synthetic_resolution(families: usize) -> Result<Arc<ResolutionContext>, SchemaError> {
    Ok(Arc::new(ResolutionContext::new(Arc::new(synthetic_schema(families)?))?))
}

/// Populates a graph with `width` objects per family.
///
/// Every object lists the following object of its family in its item
/// collection; the first object of each family links to the first object of
/// the next family. Returns the graph and those family heads.
///
/// # Errors
/// Returns `ModelError` if the resolved schema cannot back a graph.
pub fn synthetic_graph(
    resolution: Arc<ResolutionContext>,
    width: usize,
) -> Result<(Graph, Vec<ObjRef>), ModelError> {
    let families = resolution.concrete().count();
    let mut graph = Graph::new(resolution, Arc::new(PolicyTable::new()))?;

    let mut heads = Vec::with_capacity(families);
    for k in 0..families {
        let mut previous: Option<ObjRef> = None;
        for i in 0..width {
            let obj = graph.create(&leaf_name(k))?;
            graph.set_text(obj, "name", format!("obj_{k}_{i}"))?;
            graph.set_int(obj, &format!("size{k}"), i as i64)?;
            graph.set_bool(obj, &format!("flag{k}"), i % 2 == 0)?;
            match previous {
                Some(prev) => graph.push(prev, &format!("items{k}"), obj)?,
                None => heads.push(obj),
            }
            previous = Some(obj);
        }
    }
    for (k, &head) in heads.iter().enumerate() {
        let next = heads[(k + 1) % heads.len()];
        graph.set_ref(head, &format!("next{k}"), Some(next))?;
    }
    Ok((graph, heads))
}
