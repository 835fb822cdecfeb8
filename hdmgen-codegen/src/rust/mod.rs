//! Rust code generation backends.
//!
//! Each backend is an [`Emitter`](crate::emitter::Emitter) producing one or
//! more files of the generated object model module.

pub mod clone;
pub mod compare;
pub mod containers;
pub mod dispatch;
pub mod model;
pub mod serialize;
pub mod tracer;
pub mod types;
pub mod visitor;

pub use clone::CloneEmitter;
pub use compare::CompareEmitter;
pub use containers::ContainerAdoptionEmitter;
pub use dispatch::DispatchEmitter;
pub use model::ModelEmitter;
pub use serialize::SerializationEmitter;
pub use tracer::TracerEmitter;
pub use types::TypeTableEmitter;
pub use visitor::VisitorEmitter;

use crate::emitter::{Emitter, EmitterKind};

/// Returns the emitter implementing `kind`.
#[must_use]
pub fn emitter_for(kind: EmitterKind) -> Box<dyn Emitter> {
    match kind {
        EmitterKind::TypeTable => Box::new(TypeTableEmitter),
        EmitterKind::Model => Box::new(ModelEmitter),
        EmitterKind::Dispatch => Box::new(DispatchEmitter),
        EmitterKind::Clone => Box::new(CloneEmitter),
        EmitterKind::Compare => Box::new(CompareEmitter),
        EmitterKind::Serialization => Box::new(SerializationEmitter),
        EmitterKind::ContainerAdoption => Box::new(ContainerAdoptionEmitter),
        EmitterKind::Visitor => Box::new(VisitorEmitter),
        EmitterKind::Tracer => Box::new(TracerEmitter),
    }
}

/// `matches!` expression accepting exactly `tags`, or a constant `false`.
pub(crate) fn or_pattern(subject: &str, tags: &[u32]) -> String {
    if tags.is_empty() {
        return format!("let _ = {subject};\n    false");
    }
    let alternatives: Vec<String> = tags.iter().map(u32::to_string).collect();
    format!("matches!({subject}, {})", alternatives.join(" | "))
}

#[cfg(test)]
pub(crate) mod tests {
    use hdmgen_schema::{
        Cardinality, ClonePolicy, CustomClone, BindingKind, EntityBuilder, EntityClone, GroupDef,
        Member, MemberTag, NamingEngine, PolicyTable, ResolutionContext, ScalarKind, Schema,
        SchemaBuilder,
    };
    use std::sync::Arc;

    /// Tags: any_obj 0 (abstract), scope 1, module 2, net 3, constant 4.
    pub(crate) fn sample_schema() -> Schema {
        SchemaBuilder::new("sample")
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
            .unwrap()
    }

    pub(crate) fn sample_policy() -> PolicyTable {
        PolicyTable::builder()
            .exclude_relation("instance")
            .member_clone("module", "ref_modules", ClonePolicy::Alias)
            .entity_clone("net", EntityClone::DedupByName(BindingKind::Net))
            .entity_clone("constant", EntityClone::Custom(CustomClone::Constant))
            .compare_exclude("def_name")
            .collector("scope", "net", "nets")
            .build()
    }

    pub(crate) fn context_parts(schema: Schema) -> (ResolutionContext, NamingEngine, PolicyTable) {
        let resolution = ResolutionContext::new(Arc::new(schema)).unwrap();
        (resolution, NamingEngine::hdl(), sample_policy())
    }

    #[test]
    fn test_or_pattern() {
        assert_eq!(super::or_pattern("tag", &[1, 4]), "matches!(tag, 1 | 4)");
        assert!(super::or_pattern("tag", &[]).ends_with("false"));
    }
}
