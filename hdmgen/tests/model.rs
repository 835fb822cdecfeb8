//! Runtime properties of the reference model over a generated-size schema.

mod common;

use common::{hdl_policy, hdl_schema, init_tracing};
use hdmgen::core::{ElaborationContext, ObjRef};
use hdmgen::model::{
    CloneOptions, Elaboration, Graph, TraceListener, clone_tree, compare, restore_like, save,
    traverse,
};
use hdmgen::schema::{
    Cardinality, EntityBuilder, Member, MemberOrder, PolicyTable, ResolutionContext, ScalarKind,
    SchemaBuilder,
};
use std::sync::Arc;

fn hdl_graph() -> Graph {
    let schema = hdl_schema();
    let policy = hdl_policy(&schema);
    let resolution = ResolutionContext::new(Arc::new(schema)).unwrap();
    Graph::new(Arc::new(resolution), Arc::new(policy)).unwrap()
}

/// A top module with two nets, a parameter, a continuous assignment and a
/// self-referencing module list.
fn design(graph: &mut Graph) -> ObjRef {
    let top = graph.create("module").unwrap();
    graph.set_text(top, "name", "top").unwrap();
    graph.set_text(top, "def_name", "work@top").unwrap();
    graph.set_text(top, "file", "top.sv").unwrap();
    graph.set_bool(top, "top_module", true).unwrap();

    let mut nets = Vec::new();
    for name in ["a", "y"] {
        let net = graph.create("net").unwrap();
        graph.set_text(net, "name", name).unwrap();
        graph.set_int(net, "net_type", 36).unwrap();
        graph.attach_child(top, net).unwrap();
        nets.push(net);
    }
    let width = graph.create("parameter").unwrap();
    graph.set_text(width, "name", "WIDTH").unwrap();
    graph.set_text(width, "value", "UINT:8").unwrap();
    graph.attach_child(top, width).unwrap();

    let lhs = graph.create("ref_obj").unwrap();
    graph.set_text(lhs, "name", "y").unwrap();
    graph.set_ref(lhs, "actual_group", Some(nets[1])).unwrap();
    let rhs = graph.create("ref_obj").unwrap();
    graph.set_text(rhs, "name", "a").unwrap();
    graph.set_ref(rhs, "actual_group", Some(nets[0])).unwrap();

    let assign = graph.create("cont_assign").unwrap();
    graph.set_ref(assign, "lhs", Some(lhs)).unwrap();
    graph.set_ref(assign, "rhs", Some(rhs)).unwrap();
    graph.set_text(assign, "delay", "#1").unwrap();
    graph.push(top, "cont_assigns", assign).unwrap();
    graph.push(top, "ref_modules", top).unwrap();
    top
}

#[test]
fn test_effective_members_are_base_first_concatenation() {
    let schema = hdl_schema();
    let resolution = ResolutionContext::new(Arc::new(schema)).unwrap();
    for entity in &resolution.schema().entities {
        let effective: Vec<&str> = resolution
            .effective_members_of(entity, MemberOrder::BaseFirst)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        let expected: Vec<&str> = resolution
            .levels_of(entity)
            .iter()
            .flat_map(|level| level.members.iter().map(|m| m.name.as_str()))
            .collect();
        assert_eq!(effective, expected, "entity {}", entity.name);

        let mut unique = effective.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), effective.len(), "entity {}", entity.name);
    }
}

#[test]
fn test_round_trip_and_resave() {
    init_tracing();
    let mut graph = hdl_graph();
    let top = design(&mut graph);

    let bytes = save(&graph, &[top]).unwrap();
    let (restored, roots) = restore_like(&graph, bytes.clone()).unwrap();
    assert!(compare(&graph, top, &restored, roots[0]).unwrap().is_equal());
    assert_eq!(save(&restored, &roots).unwrap(), bytes);
}

#[test]
fn test_provenance_differences_ignored() {
    let mut graph = hdl_graph();
    let left = design(&mut graph);
    let right = design(&mut graph);
    graph.set_text(right, "file", "elsewhere.sv").unwrap();
    graph.set_uint(right, "start_line", 40).unwrap();
    assert!(compare(&graph, left, &graph, right).unwrap().is_equal());

    graph.set_bool(right, "top_module", false).unwrap();
    let result = compare(&graph, left, &graph, right).unwrap();
    assert!(!result.is_equal());
    assert_eq!(result.mismatch, Some((left, right)));
}

#[test]
fn test_traversal_terminates_on_self_reference() {
    let mut graph = hdl_graph();
    let top = design(&mut graph);
    let mut trace = TraceListener::default();
    let visited = traverse(&graph, top, &mut trace).unwrap();
    // top, two nets, parameter, assignment, two ref_objs
    assert_eq!(visited, 7);
    assert_eq!(trace.entered()[0], top);
}

#[test]
fn test_elaborated_clone_rebinds_into_instance() {
    init_tracing();
    let mut graph = hdl_graph();
    let definition = design(&mut graph);
    let mut cx = Elaboration::new(CloneOptions::default());
    let instance = clone_tree(&mut graph, definition, None, &mut cx).unwrap();

    let nets = graph.refs(instance, "instance_items").unwrap().to_vec();
    assert_eq!(nets.len(), 2);
    let originals = graph.refs(definition, "instance_items").unwrap().to_vec();
    for (copy, original) in nets.iter().zip(&originals) {
        assert_ne!(copy, original);
        assert!(compare(&graph, *original, &graph, *copy).unwrap().is_equal());
    }

    // Assignment operands resolve to the nets elaborated into the instance.
    let assign = graph.refs(instance, "cont_assigns").unwrap()[0];
    assert_eq!(graph.get_ref(assign, "lhs").unwrap(), Some(nets[1]));
    assert_eq!(graph.get_ref(assign, "rhs").unwrap(), Some(nets[0]));
    assert_eq!(graph.get(assign, "delay").unwrap(), &hdmgen::model::Value::Text("#1".into()));

    // Adopted children map onto their copies.
    let children = &graph.header(instance).unwrap().children;
    assert_eq!(children.len(), graph.header(definition).unwrap().children.len());
    assert_eq!(&children[..2], &nets[..]);

    // The self reference follows the copy.
    assert_eq!(graph.refs(instance, "ref_modules").unwrap(), [instance]);
    assert_eq!(cx.depth(), 0);
    assert_eq!(cx.bind_net("y"), None);
}

#[test]
fn test_base_derived_scenario_round_trip() {
    let schema = SchemaBuilder::new("scenario")
        .entity(EntityBuilder::new("base").member(Member::scalar("name", ScalarKind::String)))
        .entity(
            EntityBuilder::new("derived")
                .extends("base")
                .member(Member::scalar("count", ScalarKind::Int32))
                .member(Member::object("children", "derived", Cardinality::Many)),
        )
        .build()
        .unwrap();
    let resolution = Arc::new(ResolutionContext::new(Arc::new(schema)).unwrap());
    let mut graph = Graph::new(Arc::clone(&resolution), Arc::new(PolicyTable::new())).unwrap();

    let root = graph.create("derived").unwrap();
    graph.set_text(root, "name", "root").unwrap();
    graph.set_int(root, "count", 3).unwrap();
    for name in ["second", "first"] {
        let child = graph.create("derived").unwrap();
        graph.set_text(child, "name", name).unwrap();
        graph.push(root, "children", child).unwrap();
    }

    let bytes = save(&graph, &[root]).unwrap();
    let (restored, roots) =
        hdmgen::model::restore(bytes, resolution, Arc::new(PolicyTable::new())).unwrap();
    let copy = roots[0];
    assert_eq!(restored.text(copy, "name").unwrap(), "root");
    assert_eq!(restored.int(copy, "count").unwrap(), 3);
    let names: Vec<&str> = restored
        .refs(copy, "children")
        .unwrap()
        .iter()
        .map(|&c| restored.text(c, "name").unwrap())
        .collect();
    assert_eq!(names, ["second", "first"]);
}
