//! Schema type definitions.
//!
//! A [`Schema`] is an ordered list of [`EntityDef`]s forming a single
//! inheritance forest, plus named [`GroupDef`] unions used by polymorphic
//! references. Schemas are immutable once built; see
//! [`SchemaBuilder`](crate::builder::SchemaBuilder).

use std::collections::HashMap;
use std::fmt;

/// Complete, validated object-model schema.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema (and generated crate) name.
    pub name: String,
    /// Entities in declaration order; `entities[i].tag == i`.
    pub entities: Vec<EntityDef>,
    /// Groups in declaration order.
    pub groups: Vec<GroupDef>,
    entity_index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
}

impl Schema {
    pub(crate) fn new(name: String, entities: Vec<EntityDef>, groups: Vec<GroupDef>) -> Self {
        let entity_index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        let group_index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();
        Self {
            name,
            entities,
            groups,
            entity_index,
            group_index,
        }
    }

    /// Gets an entity by raw name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entity_index.get(name).map(|&i| &self.entities[i])
    }

    /// Gets a group by raw name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&GroupDef> {
        self.group_index.get(name).map(|&i| &self.groups[i])
    }

    /// Gets an entity by type tag.
    #[must_use]
    pub fn entity_by_tag(&self, tag: u32) -> Option<&EntityDef> {
        self.entities.get(tag as usize)
    }

    /// Returns true if an entity with this name exists.
    #[must_use]
    pub fn has_entity(&self, name: &str) -> bool {
        self.entity_index.contains_key(name)
    }

    /// Returns true if a group with this name exists.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.group_index.contains_key(name)
    }

    /// Iterates the concrete (instantiable) entities in tag order.
    pub fn concrete_entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.iter().filter(|e| e.kind.is_concrete())
    }
}

/// Entity kind, computed once when the schema is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// No declared subclasses.
    Leaf,
    /// Has subclasses and may itself be instantiated.
    Interior,
    /// Has subclasses and is never instantiated.
    Abstract,
}

impl EntityKind {
    /// Returns true if objects of this kind can exist at runtime.
    #[must_use]
    pub const fn is_concrete(self) -> bool {
        matches!(self, Self::Leaf | Self::Interior)
    }

    /// Returns true if the entity has subclasses.
    #[must_use]
    pub const fn has_subclasses(self) -> bool {
        matches!(self, Self::Interior | Self::Abstract)
    }
}

/// Entity definition.
#[derive(Debug, Clone)]
pub struct EntityDef {
    /// Raw entity name (e.g. `cont_assign`).
    pub name: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Base entity name, if any.
    pub base: Option<String>,
    /// Own members in declaration order.
    pub members: Vec<Member>,
    /// Dense type tag in declaration order.
    pub tag: u32,
    /// Direct subclasses in declaration order.
    pub subclasses: Vec<String>,
}

impl EntityDef {
    /// Finds an own member by raw name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Member cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cardinality {
    /// Exactly one (possibly null for references).
    One,
    /// Ordered collection.
    Many,
}

impl Cardinality {
    /// Parses `1`/`one` or `any`/`many`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1" | "one" => Some(Self::One),
            "any" | "many" => Some(Self::Many),
            _ => None,
        }
    }
}

/// Member discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Scalar property.
    ScalarProperty,
    /// Reference to one object of a fixed entity.
    SingleObjectRef,
    /// Collection of objects of a fixed entity.
    ManyObjectRef,
    /// Reference to one object of any entity in a group.
    SingleUnionRef,
    /// Collection of objects from a group.
    ManyUnionRef,
}

impl MemberKind {
    /// Returns true for the four reference discriminants.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        !matches!(self, Self::ScalarProperty)
    }

    /// Returns true for collection discriminants.
    #[must_use]
    pub const fn is_many(self) -> bool {
        matches!(self, Self::ManyObjectRef | Self::ManyUnionRef)
    }
}

/// Scalar kinds and their fixed type mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    /// Interned text.
    String,
    /// Interned value literal.
    Value,
    /// Interned delay literal.
    Delay,
}

impl ScalarKind {
    /// Parses a schema scalar type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int16_t" | "int16" => Some(Self::Int16),
            "uint16_t" | "uint16" => Some(Self::UInt16),
            "int" | "int32_t" | "int32" => Some(Self::Int32),
            "unsigned" | "unsigned int" | "uint32_t" | "uint32" => Some(Self::UInt32),
            "int64_t" | "int64" => Some(Self::Int64),
            "uint64_t" | "uint64" => Some(Self::UInt64),
            "string" => Some(Self::String),
            "value" => Some(Self::Value),
            "delay" => Some(Self::Delay),
            _ => None,
        }
    }

    /// Returns the Rust type used for this scalar in generated code.
    #[must_use]
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int16 => "i16",
            Self::UInt16 => "u16",
            Self::Int32 => "i32",
            Self::UInt32 => "u32",
            Self::Int64 => "i64",
            Self::UInt64 => "u64",
            Self::String | Self::Value | Self::Delay => "String",
        }
    }

    /// Returns the wire-schema type. Text content travels as a symbol id.
    #[must_use]
    pub const fn wire_type(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 | Self::String | Self::Value | Self::Delay => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
        }
    }

    /// Returns true if values are interned in the symbol table.
    #[must_use]
    pub const fn is_symbol(self) -> bool {
        matches!(self, Self::String | Self::Value | Self::Delay)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::String => "string",
            Self::Value => "value",
            Self::Delay => "delay",
        };
        f.write_str(name)
    }
}

/// Member element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Scalar value.
    Scalar(ScalarKind),
    /// Entity name.
    Entity(String),
    /// Group name.
    Group(String),
}

/// Tags used by policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberTag {
    /// The object's name; used as the rebinding and dedup key.
    NameIdentifier,
    /// Upward pointer to an enclosing scope or definition.
    BackReference,
    /// Explicit type discriminant property.
    TypeDiscriminant,
    /// Type specification reference.
    TypeSpecification,
    /// Cached hierarchical name.
    FullName,
    /// Source provenance.
    Provenance,
}

impl MemberTag {
    /// Parses a tag name as used in policy documents.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" | "is-name-identifier" => Some(Self::NameIdentifier),
            "back-reference" | "is-back-reference" => Some(Self::BackReference),
            "type-discriminant" | "is-type-discriminant" => Some(Self::TypeDiscriminant),
            "typespec" | "is-type-specification" => Some(Self::TypeSpecification),
            "full-name" => Some(Self::FullName),
            "provenance" => Some(Self::Provenance),
            _ => None,
        }
    }
}

/// Member definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Discriminant.
    pub kind: MemberKind,
    /// Raw member name.
    pub name: String,
    /// Element type.
    pub element: ElementType,
    /// Cardinality.
    pub cardinality: Cardinality,
    /// Relation identity used by dispatch; defaults to the raw name.
    pub relation: String,
    /// Policy tags.
    pub tags: Vec<MemberTag>,
}

impl Member {
    /// Creates a scalar property.
    #[must_use]
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(
            MemberKind::ScalarProperty,
            name.into(),
            ElementType::Scalar(kind),
            Cardinality::One,
        )
    }

    /// Creates a reference to a fixed entity.
    #[must_use]
    pub fn object(name: impl Into<String>, target: impl Into<String>, cardinality: Cardinality) -> Self {
        let kind = match cardinality {
            Cardinality::One => MemberKind::SingleObjectRef,
            Cardinality::Many => MemberKind::ManyObjectRef,
        };
        Self::new(kind, name.into(), ElementType::Entity(target.into()), cardinality)
    }

    /// Creates a reference to any member of a group.
    #[must_use]
    pub fn union(name: impl Into<String>, group: impl Into<String>, cardinality: Cardinality) -> Self {
        let kind = match cardinality {
            Cardinality::One => MemberKind::SingleUnionRef,
            Cardinality::Many => MemberKind::ManyUnionRef,
        };
        Self::new(kind, name.into(), ElementType::Group(group.into()), cardinality)
    }

    fn new(kind: MemberKind, name: String, element: ElementType, cardinality: Cardinality) -> Self {
        Self {
            kind,
            relation: name.clone(),
            name,
            element,
            cardinality,
            tags: Vec::new(),
        }
    }

    /// Adds a policy tag.
    #[must_use]
    pub fn tag(mut self, tag: MemberTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Overrides the relation identity.
    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    /// Returns true if the member carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: MemberTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Returns true if this member references objects.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.kind.is_reference()
    }

    /// Returns true if this member is a collection.
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Returns the scalar kind for scalar properties.
    #[must_use]
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.element {
            ElementType::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns the target entity or group name for references.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match &self.element {
            ElementType::Scalar(_) => None,
            ElementType::Entity(name) | ElementType::Group(name) => Some(name),
        }
    }
}

/// Reference inside a group definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupRef {
    /// Adds the entity only.
    Entity(String),
    /// Adds the entity and all its transitive subclasses.
    Class(String),
    /// Adds every member of another group.
    Group(String),
}

/// Named union of entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDef {
    /// Raw group name.
    pub name: String,
    /// References in declaration order.
    pub refs: Vec<GroupRef>,
}

impl GroupDef {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refs: Vec::new(),
        }
    }

    /// Adds a single entity.
    #[must_use]
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.refs.push(GroupRef::Entity(name.into()));
        self
    }

    /// Adds an entity with its subclasses.
    #[must_use]
    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.refs.push(GroupRef::Class(name.into()));
        self
    }

    /// Adds another group.
    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.refs.push(GroupRef::Group(name.into()));
        self
    }
}
