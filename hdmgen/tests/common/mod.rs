//! Shared fixtures for end-to-end tests.

#![allow(dead_code)]

use hdmgen::schema::{
    Cardinality, EntityBuilder, GroupDef, Member, MemberTag, PolicyTable, ScalarKind, Schema,
    SchemaBuilder,
};

fn under(name: &str, base: &str) -> EntityBuilder {
    EntityBuilder::new(name).extends(base)
}

/// A slice of the hardware object model exercising every member kind,
/// inheritance three levels deep, groups built from classes and entities,
/// and entities covered by every clone policy kind.
pub fn hdl_schema() -> Schema {
    SchemaBuilder::new("hdl")
        .entity(
            EntityBuilder::new("any_obj")
                .abstract_entity()
                .member(Member::scalar("name", ScalarKind::String).tag(MemberTag::NameIdentifier))
                .member(Member::scalar("file", ScalarKind::String).tag(MemberTag::Provenance))
                .member(Member::scalar("start_line", ScalarKind::UInt32).tag(MemberTag::Provenance)),
        )
        .entity(
            under("expr", "any_obj")
                .abstract_entity()
                .member(Member::scalar("size", ScalarKind::Int32)),
        )
        .entity(
            under("constant", "expr")
                .member(Member::scalar("value", ScalarKind::Value))
                .member(Member::scalar("const_type", ScalarKind::Int32)),
        )
        .entity(
            under("ref_obj", "expr").member(
                Member::union("actual_group", "actuals", Cardinality::One)
                    .tag(MemberTag::BackReference),
            ),
        )
        .entity(
            under("func_call", "expr")
                .member(Member::object("function", "function", Cardinality::One))
                .member(Member::union("arguments", "exprs", Cardinality::Many)),
        )
        .entity(
            under("net", "any_obj")
                .member(Member::scalar("net_type", ScalarKind::Int32))
                .member(
                    Member::object("typespec", "logic_typespec", Cardinality::One)
                        .tag(MemberTag::TypeSpecification),
                ),
        )
        .entity(under("logic_typespec", "any_obj").member(Member::scalar("packed", ScalarKind::Bool)))
        .entity(under("parameter", "any_obj").member(Member::scalar("value", ScalarKind::Value)))
        .entity(
            under("cont_assign", "any_obj")
                .member(Member::union("lhs", "exprs", Cardinality::One))
                .member(Member::union("rhs", "exprs", Cardinality::One))
                .member(Member::scalar("delay", ScalarKind::Delay)),
        )
        .entity(
            under("scope", "any_obj")
                .member(Member::union("instance_items", "items", Cardinality::Many))
                .member(Member::object("parameters", "parameter", Cardinality::Many))
                .member(Member::object("internal_scopes", "scope", Cardinality::Many)),
        )
        .entity(
            under("module", "scope")
                .member(Member::scalar("def_name", ScalarKind::String))
                .member(Member::scalar("top_module", ScalarKind::Bool))
                .member(Member::object("cont_assigns", "cont_assign", Cardinality::Many))
                .member(Member::object("ref_modules", "module", Cardinality::Many))
                .member(
                    Member::object("instance", "module", Cardinality::One)
                        .tag(MemberTag::BackReference),
                ),
        )
        .entity(under("function", "scope").member(Member::union("stmts", "exprs", Cardinality::Many)))
        .entity(under("gen_scope_array", "any_obj").member(Member::object("gen_scopes", "scope", Cardinality::Many)))
        .group(GroupDef::new("exprs").class("expr").entity("net"))
        .group(GroupDef::new("actuals").entity("net").entity("parameter"))
        .group(GroupDef::new("items").group("actuals").entity("cont_assign"))
        .build()
        .unwrap()
}

/// HDL default policies restricted to [`hdl_schema`].
pub fn hdl_policy(schema: &Schema) -> PolicyTable {
    PolicyTable::hdl_defaults().restrict_to(schema)
}

/// Routes `tracing` output to the test harness; `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
