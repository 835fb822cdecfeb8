//! End-to-end generation tests.

mod common;

use common::{hdl_policy, hdl_schema, init_tracing};
use hdmgen::codegen::{EmitterKind, FsWriter, Generator, MemoryWriter, WriteOutcome};
use hdmgen::schema::{Member, NamingEngine, ScalarKind, SchemaBuilder, parse_policy};
use hdmgen::{generate, generate_to_dir};

#[test]
fn test_every_rust_artifact_parses() {
    init_tracing();
    let schema = hdl_schema();
    let output = generate(&schema, hdl_policy(&schema)).unwrap();
    assert_eq!(output.reports().len(), EmitterKind::ALL.len());
    assert!(output.reports().iter().all(|r| r.is_ok()));

    for artifact in output.artifacts() {
        if artifact.path.extension().is_some_and(|e| e == "rs") {
            if let Err(e) = syn::parse_file(&artifact.content) {
                panic!("{} does not parse: {e}", artifact.path.display());
            }
        }
    }
    let capnp = output.artifact("model.capnp").unwrap();
    assert!(capnp.contains("struct Module {"));
    assert!(capnp.contains("factoryModule"));
}

#[test]
fn test_generated_code_carries_policies() {
    let schema = hdl_schema();
    let output = generate(&schema, hdl_policy(&schema)).unwrap();

    let clone = output.artifact("clone.rs").unwrap();
    assert!(clone.contains("super::custom_clone::call(self, obj, parent)"));
    assert!(clone.contains("super::custom_clone::cont_assign(self, obj, parent)"));
    assert!(clone.contains("self.cx.bind_net(&name)"));
    assert!(clone.contains("self.cx.bind_param(&name)"));

    let listener = output.artifact("listener.rs").unwrap();
    assert!(!listener.contains("\"instance\""));
    assert!(listener.contains("\"internal_scopes\""));

    // Excluded relations are dumped without descending.
    let visitor = output.artifact("visitor.rs").unwrap();
    assert!(visitor.contains("\"instance\"), true);") || visitor.contains("\"instance\", true);"));
    let tracer = output.artifact("listener_tracer.rs").unwrap();
    assert!(tracer.contains("self.enter(\"enter_module\", Some(&object.header));"));

    let containers = output.artifact("containers.rs").unwrap();
    assert!(containers.contains("instance_items_mut("));

    let module = output.artifact("mod.rs").unwrap();
    assert!(module.contains("mod custom_clone;"));
}

#[test]
fn test_second_run_rewrites_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let schema = hdl_schema();

    let first = generate_to_dir(&schema, hdl_policy(&schema), dir.path()).unwrap();
    assert!(first.created > 0);
    assert_eq!(first.rewritten, 0);

    let second = generate_to_dir(&schema, hdl_policy(&schema), dir.path()).unwrap();
    assert_eq!(second.changed(), 0);
    assert_eq!(second.unchanged, first.created);
}

#[test]
fn test_schema_change_rewrites_only_affected_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let schema = hdl_schema();
    generate_to_dir(&schema, hdl_policy(&schema), dir.path()).unwrap();

    let mut changed = schema.clone();
    let constant = changed
        .entities
        .iter_mut()
        .find(|e| e.name == "constant")
        .unwrap();
    constant
        .members
        .push(Member::scalar("decompile", ScalarKind::String));

    let output = Generator::builder()
        .policy(hdl_policy(&changed))
        .build(&changed)
        .unwrap()
        .run()
        .unwrap();
    let summary = output.write_all(&mut FsWriter::new(dir.path())).unwrap();
    assert!(summary.rewritten > 0);
    assert!(summary.unchanged > 0);
    assert_eq!(summary.created, 0);

    let objects = std::fs::read_to_string(dir.path().join("objects.rs")).unwrap();
    assert!(objects.contains("decompile"));
}

#[test]
fn test_parallel_output_is_deterministic() {
    let schema = hdl_schema();
    let run = |parallel| {
        let mut writer = MemoryWriter::new();
        Generator::builder()
            .parallel(parallel)
            .policy(hdl_policy(&schema))
            .build(&schema)
            .unwrap()
            .run()
            .unwrap()
            .write_all(&mut writer)
            .unwrap();
        writer
    };
    let a = run(true);
    let b = run(false);
    assert_eq!(a.files().collect::<Vec<_>>(), b.files().collect::<Vec<_>>());
    assert!(a.outcomes().iter().all(|(_, o)| *o == WriteOutcome::Created));
}

#[test]
fn test_policy_document_drives_generation() {
    let policy = parse_policy(
        r#"
        <policy>
          <entity name="constant" clone="custom" kind="constant"/>
          <exclude entity="func_call" relation="function"/>
          <collector entity="scope">
            <bucket child="net" member="instance_items"/>
          </collector>
        </policy>
        "#,
    )
    .unwrap();
    let output = generate(&hdl_schema(), policy).unwrap();
    let clone = output.artifact("clone.rs").unwrap();
    assert!(clone.contains("super::custom_clone::constant(self, obj, parent)"));
    assert!(!clone.contains("custom_clone::call"));
}

#[test]
fn test_base_derived_scenario_names() {
    let naming = NamingEngine::hdl();
    assert_eq!(naming.class_name("derived"), "Derived");
    assert_eq!(
        naming.accessor_name("children", hdmgen::schema::Cardinality::Many),
        "Children"
    );

    let schema = SchemaBuilder::new("scenario")
        .entity(
            hdmgen::schema::EntityBuilder::new("base")
                .member(Member::scalar("name", ScalarKind::String)),
        )
        .entity(
            hdmgen::schema::EntityBuilder::new("derived")
                .extends("base")
                .member(Member::scalar("count", ScalarKind::Int32))
                .member(Member::object(
                    "children",
                    "derived",
                    hdmgen::schema::Cardinality::Many,
                )),
        )
        .build()
        .unwrap();
    let output = generate(&schema, Default::default()).unwrap();
    let objects = output.artifact("objects.rs").unwrap();
    assert!(objects.contains("pub struct Derived {"));
    assert!(objects.contains("pub fn children(&self) -> Option<&[ObjRef]>"));
    assert!(objects.contains("pub fn count(&self) -> i32"));
    let capnp = output.artifact("model.capnp").unwrap();
    assert!(capnp.contains("struct Derived {"));
    assert!(capnp.contains("base @0 :Base;"));
}
