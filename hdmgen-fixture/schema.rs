//! Schema and policy of the fixture model, shared by the build script and
//! the tests.

use hdmgen_schema::{
    BindingKind, Cardinality, ClonePolicy, EntityBuilder, EntityClone, GroupDef, Member,
    MemberTag, PolicyTable, ScalarKind, Schema, SchemaBuilder, SchemaError,
};

/// Fixture schema.
///
/// Tags: any_obj 0 (abstract), scope 1, module 2, net 3, constant 4.
pub fn schema() -> Result<Schema, SchemaError> {
    SchemaBuilder::new("fixture")
        .entity(
            EntityBuilder::new("any_obj")
                .abstract_entity()
                .member(Member::scalar("name", ScalarKind::String).tag(MemberTag::NameIdentifier)),
        )
        .entity(
            EntityBuilder::new("scope")
                .extends("any_obj")
                .member(Member::object("nets", "net", Cardinality::Many)),
        )
        .entity(
            EntityBuilder::new("module")
                .extends("scope")
                .member(Member::scalar("def_name", ScalarKind::String))
                .member(Member::union("expr", "exprs", Cardinality::One))
                .member(
                    Member::object("instance", "module", Cardinality::One)
                        .tag(MemberTag::BackReference),
                )
                .member(Member::object("ref_modules", "module", Cardinality::Many)),
        )
        .entity(
            EntityBuilder::new("net")
                .extends("any_obj")
                .member(Member::scalar("type", ScalarKind::Int32).tag(MemberTag::TypeDiscriminant))
                .member(
                    Member::object("typespec", "constant", Cardinality::One)
                        .tag(MemberTag::TypeSpecification),
                ),
        )
        .entity(
            EntityBuilder::new("constant")
                .extends("any_obj")
                .member(Member::scalar("value", ScalarKind::Value))
                .member(Member::scalar("size", ScalarKind::Int32)),
        )
        .group(GroupDef::new("exprs").entity("net").entity("constant"))
        .build()
}

/// Policy table of the fixture schema.
pub fn policy() -> PolicyTable {
    PolicyTable::builder()
        .exclude_relation("instance")
        .member_clone("module", "ref_modules", ClonePolicy::Alias)
        .entity_clone("net", EntityClone::DedupByName(BindingKind::Net))
        .compare_exclude("def_name")
        .collector("scope", "net", "nets")
        .build()
}
