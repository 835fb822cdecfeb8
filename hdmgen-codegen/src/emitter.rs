//! Emitter interface and the shared, read-only emission context.

use crate::error::CodegenError;
use hdmgen_schema::{
    ElementType, EntityDef, GroupDef, Member, MemberOrder, MemberTag, NamingEngine, OwnedMember,
    PolicyTable, ResolutionContext, Schema,
};
use std::fmt;
use std::path::PathBuf;

/// The emitters a generation run can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmitterKind {
    /// Type tags, name and forward-declaration tables.
    TypeTable,
    /// Object structs, the arena store and group predicates.
    Model,
    /// Push and pull listener dispatch.
    Dispatch,
    /// Deep clone with elaboration rebinding.
    Clone,
    /// Structural three-way comparison.
    Compare,
    /// Wire schema and save/restore adapters.
    Serialization,
    /// Collector bucket synchronization.
    ContainerAdoption,
    /// Indented tree dump.
    Visitor,
    /// Listener that traces every hook call.
    Tracer,
}

impl EmitterKind {
    /// Every emitter, in report order.
    pub const ALL: [Self; 9] = [
        Self::TypeTable,
        Self::Model,
        Self::Dispatch,
        Self::Clone,
        Self::Compare,
        Self::Serialization,
        Self::ContainerAdoption,
        Self::Visitor,
        Self::Tracer,
    ];

    /// Short name used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeTable => "type-table",
            Self::Model => "model",
            Self::Dispatch => "dispatch",
            Self::Clone => "clone",
            Self::Compare => "compare",
            Self::Serialization => "serialization",
            Self::ContainerAdoption => "container-adoption",
            Self::Visitor => "visitor",
            Self::Tracer => "tracer",
        }
    }
}

impl fmt::Display for EmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One generated file, addressed relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Relative output path.
    pub path: PathBuf,
    /// Full file content.
    pub content: String,
}

impl Artifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }

    /// Returns the Rust module name if this artifact is a Rust source file.
    #[must_use]
    pub fn rust_module(&self) -> Option<&str> {
        if self.path.extension().is_some_and(|e| e == "rs") {
            self.path.file_stem().and_then(|s| s.to_str())
        } else {
            None
        }
    }
}

/// A code generation backend.
pub trait Emitter: Send + Sync {
    /// Which emitter this is.
    fn kind(&self) -> EmitterKind;

    /// Produces this emitter's artifacts.
    ///
    /// # Errors
    /// Returns `CodegenError` if a template cannot be filled or the schema
    /// holds something this backend cannot express.
    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError>;
}

/// Read-only inputs shared by every emitter of a run.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Resolved schema views.
    pub resolution: &'a ResolutionContext,
    /// Identifier derivation.
    pub naming: &'a NamingEngine,
    /// Special-case policies.
    pub policy: &'a PolicyTable,
}

impl<'a> EmitContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(
        resolution: &'a ResolutionContext,
        naming: &'a NamingEngine,
        policy: &'a PolicyTable,
    ) -> Self {
        Self {
            resolution,
            naming,
            policy,
        }
    }

    /// The schema being generated.
    #[must_use]
    pub fn schema(&self) -> &'a Schema {
        self.resolution.schema()
    }

    /// Concrete entities in tag order.
    #[must_use]
    pub fn concrete(&self) -> Vec<&'a EntityDef> {
        self.resolution.concrete().collect()
    }

    /// Pascal-case type name of an entity.
    #[must_use]
    pub fn class_name(&self, entity: &EntityDef) -> String {
        self.naming.class_name(&entity.name)
    }

    /// `TypeTag` variant path of an entity.
    #[must_use]
    pub fn tag_variant(&self, entity: &EntityDef) -> String {
        format!("TypeTag::{}", self.class_name(entity))
    }

    /// Snake-case stem for entity-derived function names.
    #[must_use]
    pub fn type_stem(&self, entity: &EntityDef) -> String {
        self.naming.type_fn_stem(&entity.name)
    }

    /// Store field holding an entity's objects.
    #[must_use]
    pub fn store_field(&self, entity: &EntityDef) -> String {
        self.naming.escape(&self.type_stem(entity))
    }

    /// Struct field (and getter) identifier of a member.
    #[must_use]
    pub fn field(&self, member: &Member) -> String {
        self.naming.field_ident(&member.name, member.cardinality)
    }

    /// Unescaped stem of a member for composed method names.
    #[must_use]
    pub fn stem(&self, member: &Member) -> String {
        self.naming.fn_stem(&member.name, member.cardinality)
    }

    /// Ancestor chain, entity first.
    #[must_use]
    pub fn chain(&self, entity: &EntityDef) -> Vec<&'a EntityDef> {
        self.resolution.ancestors_of(entity)
    }

    /// Effective members with their declaring entity.
    #[must_use]
    pub fn members(&self, entity: &EntityDef, order: MemberOrder) -> Vec<OwnedMember<'a>> {
        self.resolution.owned_members_of(entity, order)
    }

    /// Snake-case stem of a group predicate.
    #[must_use]
    pub fn group_stem(&self, group: &GroupDef) -> String {
        self.naming.snake_case(&self.naming.normalize(&group.name))
    }

    /// Path of the predicate accepting the type tags a reference member may
    /// hold, relative to a sibling generated module.
    #[must_use]
    pub fn target_predicate(&self, member: &Member) -> Option<String> {
        match &member.element {
            ElementType::Scalar(_) => None,
            ElementType::Entity(name) => Some(format!(
                "super::types::is_{}",
                self.naming.type_fn_stem(name)
            )),
            ElementType::Group(name) => Some(format!(
                "super::groups::is_{}",
                self.naming.snake_case(&self.naming.normalize(name))
            )),
        }
    }

    /// Text member naming objects of `entity`: the one tagged as name
    /// identifier, else one called `name`.
    #[must_use]
    pub fn name_member(&self, entity: &EntityDef) -> Option<&'a Member> {
        let members = self.members(entity, MemberOrder::BaseFirst);
        let text = |m: &&OwnedMember<'a>| m.member.scalar_kind().is_some_and(|k| k.is_symbol());
        members
            .iter()
            .filter(text)
            .find(|m| m.member.has_tag(MemberTag::NameIdentifier))
            .or_else(|| members.iter().filter(text).find(|m| m.member.name == "name"))
            .map(|m| m.member)
    }

    /// Rust type of a member's struct field.
    #[must_use]
    pub fn field_type(&self, member: &Member) -> String {
        match (&member.element, member.is_many()) {
            (ElementType::Scalar(kind), _) => kind.rust_type().to_string(),
            (_, false) => "Option<ObjRef>".to_string(),
            (_, true) => "Option<Vec<ObjRef>>".to_string(),
        }
    }
}

/// Appends a generated-file banner.
pub(crate) fn banner(output: &mut String, summary: &str) {
    output.push_str(&format!("//! {summary}\n"));
    output.push_str("//!\n");
    output.push_str("//! Generated by hdmgen. Do not edit.\n\n");
}
