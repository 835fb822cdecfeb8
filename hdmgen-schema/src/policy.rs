//! Declarative clone, traversal, comparison and container policies.
//!
//! Emitters never branch on entity names. Every special case lives in a
//! [`PolicyTable`] loaded alongside the schema, either from
//! [`PolicyTable::hdl_defaults`] or from a policy document (see
//! [`crate::parser::parse_policy`]).
//!
//! Per-member lookups walk the entity's ancestor chain derived-first, then the
//! `*` wildcard, then fall back to tag-driven defaults.

use crate::error::SchemaError;
use crate::types::{EntityDef, Member, MemberTag, ScalarKind, Schema};
use std::collections::{BTreeMap, BTreeSet};

/// Wildcard entity name matching every entity.
pub const ANY_ENTITY: &str = "*";

/// Which object the rebinding key is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// The object being cloned.
    Referrer,
    /// The object the original reference points at.
    Target,
}

/// How one reference member is cloned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClonePolicy {
    /// Deep-clone the referenced object(s).
    Deep,
    /// Share the referenced object(s); collections are copied, elements aliased.
    Alias,
    /// Look the scalar `key` up in the elaboration bindings; keep the original on a miss.
    Rebind {
        /// Scalar member holding the lookup name.
        key: String,
        /// Object the key is read from.
        source: KeySource,
    },
    /// Deep-clone only when type specifications are uniquified, alias otherwise.
    Uniquify,
}

impl ClonePolicy {
    /// Rebind by the target's `name`.
    #[must_use]
    pub fn rebind_by_name() -> Self {
        Self::Rebind {
            key: "name".to_string(),
            source: KeySource::Target,
        }
    }
}

/// Hand-written clone bodies coordinating with the elaboration context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomClone {
    /// Call expressions: callee rebinding.
    Call,
    /// Function and task definitions: task/function table maintenance.
    TaskFunc,
    /// Constant literals: shallow copy.
    Constant,
    /// Generate-scope arrays: scoped elaboration.
    GenScopeArray,
    /// Hierarchical path expressions.
    HierPath,
    /// Continuous assignments.
    ContAssign,
}

impl CustomClone {
    /// Snake-case name used for generated function names and policy documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::TaskFunc => "task_func",
            Self::Constant => "constant",
            Self::GenScopeArray => "gen_scope_array",
            Self::HierPath => "hier_path",
            Self::ContAssign => "cont_assign",
        }
    }

    /// Parses a policy document name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "call" => Some(Self::Call),
            "task_func" => Some(Self::TaskFunc),
            "constant" => Some(Self::Constant),
            "gen_scope_array" => Some(Self::GenScopeArray),
            "hier_path" => Some(Self::HierPath),
            "cont_assign" => Some(Self::ContAssign),
            _ => None,
        }
    }
}

/// Binding table used for clone-by-name deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Net,
    Param,
}

/// How a whole entity is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityClone {
    /// Per-member algorithm.
    #[default]
    Generic,
    /// Hand-written body.
    Custom(CustomClone),
    /// Reuse an existing clone bound to the same name.
    DedupByName(BindingKind),
}

/// Policy table shared by every emitter and the reference model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    member_clone: BTreeMap<(String, String), ClonePolicy>,
    entity_clone: BTreeMap<String, EntityClone>,
    excluded_relations: BTreeSet<String>,
    excluded_edges: BTreeSet<(String, String)>,
    compare_blacklist: BTreeSet<String>,
    collectors: BTreeMap<String, Vec<(String, String)>>,
}

const HDL_EXCLUDED_RELATIONS: &[&str] = &[
    "parent", "instance", "module", "interface", "use", "program", "class_defn", "package",
    "udp",
];

const HDL_EXCLUDED_EDGES: &[(&str, &str)] = &[
    ("func_call", "function"),
    ("method_func_call", "function"),
    ("task_call", "task"),
    ("method_task_call", "task"),
];

const HDL_COMPARE_BLACKLIST: &[&str] = &[
    "id",
    "type_tag",
    "file",
    "def_file",
    "def_line",
    "included_file",
    "full_name",
    "start_line",
    "start_column",
    "end_line",
    "end_column",
    "body_start_column",
    "name_start_column",
    "section_start_line",
    "section_start_column",
    "section_end_line",
    "section_end_column",
    "source_start_line",
    "source_start_column",
    "source_end_line",
    "source_end_column",
];

const HDL_CUSTOM_CLONES: &[(&str, CustomClone)] = &[
    ("func_call", CustomClone::Call),
    ("task_call", CustomClone::Call),
    ("method_func_call", CustomClone::Call),
    ("method_task_call", CustomClone::Call),
    ("sys_func_call", CustomClone::Call),
    ("sys_task_call", CustomClone::Call),
    ("tf_call", CustomClone::Call),
    ("function", CustomClone::TaskFunc),
    ("task", CustomClone::TaskFunc),
    ("constant", CustomClone::Constant),
    ("gen_scope_array", CustomClone::GenScopeArray),
    ("hier_path", CustomClone::HierPath),
    ("cont_assign", CustomClone::ContAssign),
];

const HDL_DEDUP: &[(&str, BindingKind)] = &[
    ("net", BindingKind::Net),
    ("logic_net", BindingKind::Net),
    ("array_net", BindingKind::Net),
    ("packed_array_net", BindingKind::Net),
    ("struct_net", BindingKind::Net),
    ("enum_net", BindingKind::Net),
    ("integer_net", BindingKind::Net),
    ("time_net", BindingKind::Net),
    ("parameter", BindingKind::Param),
    ("type_parameter", BindingKind::Param),
];

const HDL_ALIASED: &[(&str, &str)] = &[
    (ANY_ENTITY, "instance"),
    (ANY_ENTITY, "module"),
    (ANY_ENTITY, "interface"),
    (ANY_ENTITY, "typespecs"),
    ("class_defn", "derived_classes"),
    ("module_inst", "ref_modules"),
    ("disable", "expr"),
    ("int_typespec", "cast_to_expr"),
    ("function", "return"),
    ("class_typespec", "class_defn"),
];

const HDL_COLLECTORS: &[(&str, &[(&str, &str)])] = &[
    (
        "scope",
        &[
            ("array_net", "instance_items"),
            ("array_var", "reg_arrays"),
            ("assert_stmt", "instance_items"),
            ("assume", "instance_items"),
            ("checker_inst", "instance_items"),
            ("class_defn", "instance_items"),
            ("concurrent_assertions", "concurrent_assertions"),
            ("cover", "instance_items"),
            ("gen_var", "gen_vars"),
            ("immediate_assert", "instance_items"),
            ("immediate_assume", "instance_items"),
            ("immediate_cover", "instance_items"),
            ("let_decl", "let_decls"),
            ("logic_var", "regs"),
            ("named_event", "instance_items"),
            ("named_event", "named_events"),
            ("named_event_array", "instance_items"),
            ("named_event_array", "named_event_arrays"),
            ("net", "instance_items"),
            ("param_assign", "param_assigns"),
            ("parameter", "parameters"),
            ("program", "instance_items"),
            ("program_array", "instance_items"),
            ("property_decl", "property_decls"),
            ("property_inst", "instance_items"),
            ("restrict", "instance_items"),
            ("scope", "internal_scopes"),
            ("sequence_decl", "sequence_decls"),
            ("sequence_inst", "instance_items"),
            ("spec_param", "instance_items"),
            ("task_func", "instance_items"),
            ("type_parameter", "parameters"),
            ("typespec", "instance_items"),
            ("typespec", "typespecs"),
            ("variables", "instance_items"),
            ("variables", "variables"),
            ("virtual_interface_var", "virtual_interface_vars"),
        ],
    ),
    ("udp_defn", &[("io_decl", "io_decls"), ("table_entry", "table_entries")]),
    (
        "design",
        &[
            ("class_defn", "all_classes"),
            ("interface_inst", "all_interfaces"),
            ("let_decl", "let_decls"),
            ("module_inst", "all_modules"),
            ("package", "all_packages"),
            ("param_assign", "param_assigns"),
            ("parameter", "parameters"),
            ("program", "all_programs"),
            ("task_func", "task_funcs"),
            ("typespec", "typespecs"),
            ("udp_defn", "all_udps"),
        ],
    ),
    (
        "class_defn",
        &[
            ("class_defn", "derived_classes"),
            ("class_typespec", "class_typespecs"),
            ("constraint", "constraints"),
            ("task_func", "methods"),
            ("task_func_decl", "task_func_decls"),
        ],
    ),
    (
        "class_obj",
        &[
            ("constraint", "constraints"),
            ("expr", "messages"),
            ("task_func", "task_funcs"),
            ("thread_obj", "threads"),
        ],
    ),
    (
        "instance",
        &[
            ("array_net", "array_nets"),
            ("class_defn", "class_defns"),
            ("net", "nets"),
            ("program", "programs"),
            ("program_array", "program_arrays"),
            ("spec_param", "spec_params"),
            ("task_func", "task_funcs"),
            ("task_func_decl", "task_func_decls"),
        ],
    ),
    (
        "checker_decl",
        &[
            ("checker_port", "ports"),
            ("cont_assign", "cont_assigns"),
            ("process_stmt", "process_stmts"),
        ],
    ),
    ("checker_inst", &[("checker_inst_port", "ports")]),
    (
        "interface_inst",
        &[
            ("clocking_block", "clocking_blocks"),
            ("cont_assign", "cont_assigns"),
            ("gen_scope_array", "gen_scope_arrays"),
            ("gen_stmt", "gen_stmts"),
            ("interface_array", "interface_arrays"),
            ("interface_inst", "interfaces"),
            ("interface_tf_decl", "interface_tf_decls"),
            ("mod_path", "mod_paths"),
            ("modport", "modports"),
            ("port", "ports"),
            ("process_stmt", "process_stmts"),
            ("tf_call", "sys_task_calls"),
        ],
    ),
    (
        "module_inst",
        &[
            ("alias_stmt", "alias_stmts"),
            ("clocking_block", "clocking_blocks"),
            ("cont_assign", "cont_assigns"),
            ("def_param", "def_params"),
            ("gen_scope_array", "gen_scope_arrays"),
            ("gen_stmt", "gen_stmts"),
            ("interface_array", "interface_arrays"),
            ("interface_inst", "interfaces"),
            ("io_decl", "io_decls"),
            ("mod_path", "mod_paths"),
            ("module_array", "module_arrays"),
            ("module_inst", "modules"),
            ("port", "ports"),
            ("primitive", "primitives"),
            ("primitive_array", "primitive_arrays"),
            ("process_stmt", "process_stmts"),
            ("ref_module", "ref_modules"),
            ("tchk", "tchks"),
            ("tf_call", "sys_task_calls"),
        ],
    ),
    ("multiclock_sequence_expr", &[("clocked_seq", "clocked_seqs")]),
    (
        "program",
        &[
            ("clocking_block", "clocking_blocks"),
            ("cont_assign", "cont_assigns"),
            ("gen_scope_array", "gen_scope_arrays"),
            ("interface_array", "interface_arrays"),
            ("interface_inst", "interfaces"),
            ("port", "ports"),
            ("process_stmt", "process_stmts"),
        ],
    ),
];

impl PolicyTable {
    /// Creates an empty table: everything deep-cloned, traversed and compared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::default()
    }

    /// Policies of the hardware object model.
    ///
    /// Entries name entities of the full model; use [`restrict_to`](Self::restrict_to)
    /// before checking against a partial schema.
    #[must_use]
    pub fn hdl_defaults() -> Self {
        let mut builder = Self::builder();
        for rel in HDL_EXCLUDED_RELATIONS {
            builder = builder.exclude_relation(*rel);
        }
        for (entity, rel) in HDL_EXCLUDED_EDGES {
            builder = builder.exclude_edge(*entity, *rel);
        }
        for member in HDL_COMPARE_BLACKLIST {
            builder = builder.compare_exclude(*member);
        }
        for (entity, custom) in HDL_CUSTOM_CLONES {
            builder = builder.entity_clone(*entity, EntityClone::Custom(*custom));
        }
        for (entity, kind) in HDL_DEDUP {
            builder = builder.entity_clone(*entity, EntityClone::DedupByName(*kind));
        }
        for (entity, member) in HDL_ALIASED {
            builder = builder.member_clone(*entity, *member, ClonePolicy::Alias);
        }
        for entity in ["ref_obj", "ref_var"] {
            builder = builder.member_clone(
                entity,
                "actual_group",
                ClonePolicy::Rebind {
                    key: "name".to_string(),
                    source: KeySource::Referrer,
                },
            );
        }
        builder = builder
            .member_clone(
                "udp",
                "udp_defn",
                ClonePolicy::Rebind {
                    key: "def_name".to_string(),
                    source: KeySource::Referrer,
                },
            )
            .member_clone("ref_typespec", "actual_typespec", ClonePolicy::Uniquify);
        for (collector, buckets) in HDL_COLLECTORS {
            for (child, bucket) in *buckets {
                builder = builder.collector(*collector, *child, *bucket);
            }
        }
        builder.build()
    }

    /// Clone policy for `member` as seen from an entity's ancestor chain
    /// (entity first).
    #[must_use]
    pub fn clone_policy(&self, chain: &[&EntityDef], member: &Member) -> ClonePolicy {
        let names = chain
            .iter()
            .map(|e| e.name.as_str())
            .chain(std::iter::once(ANY_ENTITY));
        for name in names {
            if let Some(policy) = self
                .member_clone
                .get(&(name.to_string(), member.name.clone()))
            {
                return policy.clone();
            }
        }
        if member.has_tag(MemberTag::BackReference) {
            ClonePolicy::rebind_by_name()
        } else if member.has_tag(MemberTag::TypeSpecification) {
            ClonePolicy::Uniquify
        } else {
            ClonePolicy::Deep
        }
    }

    /// Whole-entity clone behavior, searched derived-first along `chain`.
    #[must_use]
    pub fn entity_clone(&self, chain: &[&EntityDef]) -> EntityClone {
        chain
            .iter()
            .find_map(|e| self.entity_clone.get(&e.name).copied())
            .unwrap_or_default()
    }

    /// Returns true if traversal never steps through `member`.
    #[must_use]
    pub fn is_traversal_excluded(&self, chain: &[&EntityDef], member: &Member) -> bool {
        if self.excluded_relations.contains(&member.relation)
            || self.excluded_relations.contains(&member.name)
        {
            return true;
        }
        chain
            .iter()
            .map(|e| e.name.as_str())
            .chain(std::iter::once(ANY_ENTITY))
            .any(|name| {
                self.excluded_edges
                    .contains(&(name.to_string(), member.relation.clone()))
                    || self
                        .excluded_edges
                        .contains(&(name.to_string(), member.name.clone()))
            })
    }

    /// Returns true if `member` does not take part in structural comparison.
    #[must_use]
    pub fn is_compare_excluded(&self, member: &Member) -> bool {
        member.has_tag(MemberTag::Provenance)
            || member.has_tag(MemberTag::FullName)
            || self.compare_blacklist.contains(&member.name)
    }

    /// Ordered `(child entity, bucket member)` pairs of a collector.
    #[must_use]
    pub fn collector_buckets(&self, collector: &str) -> &[(String, String)] {
        self.collectors
            .get(collector)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates collectors in name order.
    pub fn collectors(&self) -> impl Iterator<Item = (&str, &[(String, String)])> {
        self.collectors
            .iter()
            .map(|(name, buckets)| (name.as_str(), buckets.as_slice()))
    }

    /// Returns true if no entity owns collector buckets.
    #[must_use]
    pub fn has_collectors(&self) -> bool {
        !self.collectors.is_empty()
    }

    /// Verifies that every entry names entities and members of `schema`.
    ///
    /// # Errors
    /// Returns `SchemaError::Policy` describing the first stale entry.
    pub fn check(&self, schema: &Schema) -> Result<(), SchemaError> {
        match self.first_stale_entry(schema) {
            Some(message) => Err(SchemaError::policy(message)),
            None => Ok(()),
        }
    }

    /// Returns a copy without the entries that do not apply to `schema`.
    #[must_use]
    pub fn restrict_to(&self, schema: &Schema) -> Self {
        let known = |entity: &str| entity == ANY_ENTITY || schema.has_entity(entity);
        let mut restricted = self.clone();
        restricted.member_clone.retain(|(entity, member), policy| {
            entity == ANY_ENTITY
                || (known(entity)
                    && lookup_member(schema, entity, member).is_some()
                    && rebind_key_ok(schema, entity, policy))
        });
        restricted.entity_clone.retain(|entity, _| known(entity));
        restricted.excluded_edges.retain(|(entity, _)| known(entity));
        restricted.collectors.retain(|collector, _| known(collector));
        for (collector, buckets) in restricted.collectors.iter_mut() {
            buckets.retain(|(child, bucket)| {
                schema.has_entity(child) && bucket_ok(schema, collector, bucket)
            });
        }
        restricted.collectors.retain(|_, buckets| !buckets.is_empty());
        restricted
    }

    fn first_stale_entry(&self, schema: &Schema) -> Option<String> {
        let known = |entity: &str| entity == ANY_ENTITY || schema.has_entity(entity);
        for ((entity, member), policy) in &self.member_clone {
            if entity == ANY_ENTITY {
                continue;
            }
            if !known(entity) {
                return Some(format!("clone policy names unknown entity '{entity}'"));
            }
            if lookup_member(schema, entity, member).is_none() {
                return Some(format!("clone policy names unknown member '{entity}.{member}'"));
            }
            if !rebind_key_ok(schema, entity, policy) {
                return Some(format!(
                    "rebinding key of '{entity}.{member}' is not a text member"
                ));
            }
        }
        for entity in self.entity_clone.keys() {
            if !known(entity) {
                return Some(format!("entity clone policy names unknown entity '{entity}'"));
            }
        }
        for (entity, relation) in &self.excluded_edges {
            if !known(entity) {
                return Some(format!(
                    "traversal exclusion '{entity}.{relation}' names unknown entity"
                ));
            }
        }
        for (collector, buckets) in &self.collectors {
            if !schema.has_entity(collector) {
                return Some(format!("unknown collector entity '{collector}'"));
            }
            for (child, bucket) in buckets {
                if !schema.has_entity(child) {
                    return Some(format!("collector '{collector}' names unknown child '{child}'"));
                }
                if !bucket_ok(schema, collector, bucket) {
                    return Some(format!(
                        "bucket '{bucket}' of collector '{collector}' is not a collection member"
                    ));
                }
            }
        }
        None
    }
}

fn lookup_member<'a>(schema: &'a Schema, entity: &str, member: &str) -> Option<&'a Member> {
    let mut current = schema.entity(entity);
    while let Some(def) = current {
        if let Some(m) = def.member(member) {
            return Some(m);
        }
        current = def.base.as_deref().and_then(|b| schema.entity(b));
    }
    None
}

fn rebind_key_ok(schema: &Schema, entity: &str, policy: &ClonePolicy) -> bool {
    match policy {
        ClonePolicy::Rebind {
            key,
            source: KeySource::Referrer,
        } => lookup_member(schema, entity, key)
            .and_then(Member::scalar_kind)
            .is_some_and(|k| k == ScalarKind::String),
        _ => true,
    }
}

fn bucket_ok(schema: &Schema, collector: &str, bucket: &str) -> bool {
    lookup_member(schema, collector, bucket).is_some_and(|m| m.is_reference() && m.is_many())
}

/// Builder for [`PolicyTable`].
#[derive(Debug, Clone, Default)]
pub struct PolicyTableBuilder {
    table: PolicyTable,
}

impl From<PolicyTable> for PolicyTableBuilder {
    fn from(table: PolicyTable) -> Self {
        Self { table }
    }
}

impl PolicyTableBuilder {
    /// Sets the clone policy of `(entity, member)`; `entity` may be [`ANY_ENTITY`].
    #[must_use]
    pub fn member_clone(
        mut self,
        entity: impl Into<String>,
        member: impl Into<String>,
        policy: ClonePolicy,
    ) -> Self {
        self.table
            .member_clone
            .insert((entity.into(), member.into()), policy);
        self
    }

    /// Sets the whole-entity clone behavior.
    #[must_use]
    pub fn entity_clone(mut self, entity: impl Into<String>, clone: EntityClone) -> Self {
        self.table.entity_clone.insert(entity.into(), clone);
        self
    }

    /// Excludes a relation from traversal everywhere.
    #[must_use]
    pub fn exclude_relation(mut self, relation: impl Into<String>) -> Self {
        self.table.excluded_relations.insert(relation.into());
        self
    }

    /// Excludes a relation from traversal for one entity and its subclasses.
    #[must_use]
    pub fn exclude_edge(mut self, entity: impl Into<String>, relation: impl Into<String>) -> Self {
        self.table
            .excluded_edges
            .insert((entity.into(), relation.into()));
        self
    }

    /// Excludes a member name from comparison.
    #[must_use]
    pub fn compare_exclude(mut self, member: impl Into<String>) -> Self {
        self.table.compare_blacklist.insert(member.into());
        self
    }

    /// Adds a `(child, bucket)` pair to a collector, keeping declaration order.
    #[must_use]
    pub fn collector(
        mut self,
        collector: impl Into<String>,
        child: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let pair = (child.into(), bucket.into());
        let buckets = self.table.collectors.entry(collector.into()).or_default();
        if !buckets.contains(&pair) {
            buckets.push(pair);
        }
        self
    }

    /// Builds the table.
    #[must_use]
    pub fn build(self) -> PolicyTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{EntityBuilder, SchemaBuilder};
    use crate::types::Cardinality;

    fn schema() -> Schema {
        SchemaBuilder::new("hdl")
            .entity(
                EntityBuilder::new("scope")
                    .member(Member::scalar("name", ScalarKind::String))
                    .member(Member::object("parent", "scope", Cardinality::One).tag(MemberTag::BackReference))
                    .member(Member::object("nets", "net", Cardinality::Many))
                    .member(Member::object("instance_items", "net", Cardinality::Many))
                    .member(Member::object("typespec", "scope", Cardinality::One).tag(MemberTag::TypeSpecification)),
            )
            .entity(EntityBuilder::new("module_inst").extends("scope"))
            .entity(
                EntityBuilder::new("net")
                    .member(Member::scalar("name", ScalarKind::String))
                    .member(Member::scalar("full_name", ScalarKind::String).tag(MemberTag::FullName))
                    .member(Member::scalar("line", ScalarKind::Int32)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_tag_defaults() {
        let schema = schema();
        let table = PolicyTable::new();
        let module = schema.entity("module_inst").unwrap();
        let scope = schema.entity("scope").unwrap();
        let chain = [module, scope];
        assert_eq!(
            table.clone_policy(&chain, scope.member("parent").unwrap()),
            ClonePolicy::rebind_by_name()
        );
        assert_eq!(
            table.clone_policy(&chain, scope.member("typespec").unwrap()),
            ClonePolicy::Uniquify
        );
        assert_eq!(
            table.clone_policy(&chain, scope.member("nets").unwrap()),
            ClonePolicy::Deep
        );
    }

    #[test]
    fn test_chain_and_wildcard_lookup() {
        let schema = schema();
        let module = schema.entity("module_inst").unwrap();
        let scope = schema.entity("scope").unwrap();
        let nets = scope.member("nets").unwrap();
        let table = PolicyTable::builder()
            .member_clone(ANY_ENTITY, "nets", ClonePolicy::Deep)
            .member_clone("scope", "nets", ClonePolicy::Alias)
            .build();
        assert_eq!(table.clone_policy(&[module, scope], nets), ClonePolicy::Alias);

        let table = PolicyTable::builder()
            .member_clone(ANY_ENTITY, "nets", ClonePolicy::Alias)
            .build();
        assert_eq!(table.clone_policy(&[scope], nets), ClonePolicy::Alias);
    }

    #[test]
    fn test_traversal_exclusions() {
        let schema = schema();
        let scope = schema.entity("scope").unwrap();
        let module = schema.entity("module_inst").unwrap();
        let table = PolicyTable::builder()
            .exclude_relation("parent")
            .exclude_edge("module_inst", "nets")
            .build();
        assert!(table.is_traversal_excluded(&[scope], scope.member("parent").unwrap()));
        assert!(!table.is_traversal_excluded(&[scope], scope.member("nets").unwrap()));
        assert!(table.is_traversal_excluded(&[module, scope], scope.member("nets").unwrap()));
    }

    #[test]
    fn test_compare_exclusions() {
        let schema = schema();
        let net = schema.entity("net").unwrap();
        let table = PolicyTable::builder().compare_exclude("line").build();
        assert!(table.is_compare_excluded(net.member("full_name").unwrap()));
        assert!(table.is_compare_excluded(net.member("line").unwrap()));
        assert!(!table.is_compare_excluded(net.member("name").unwrap()));
    }

    #[test]
    fn test_check_reports_stale_entries() {
        let schema = schema();
        let ok = PolicyTable::builder()
            .collector("scope", "net", "nets")
            .entity_clone("net", EntityClone::DedupByName(BindingKind::Net))
            .build();
        assert!(ok.check(&schema).is_ok());

        let bad = PolicyTable::builder().collector("scope", "net", "name").build();
        assert!(matches!(bad.check(&schema), Err(SchemaError::Policy { .. })));

        let bad = PolicyTable::builder()
            .member_clone("ghost", "x", ClonePolicy::Alias)
            .build();
        assert!(bad.check(&schema).is_err());

        let bad = PolicyTable::builder()
            .member_clone(
                "scope",
                "parent",
                ClonePolicy::Rebind {
                    key: "nets".to_string(),
                    source: KeySource::Referrer,
                },
            )
            .build();
        assert!(bad.check(&schema).is_err());
    }

    #[test]
    fn test_hdl_defaults_restrict() {
        let schema = schema();
        let defaults = PolicyTable::hdl_defaults();
        assert!(defaults.check(&schema).is_err());
        let restricted = defaults.restrict_to(&schema);
        assert!(restricted.check(&schema).is_ok());
        assert_eq!(
            restricted.collector_buckets("scope"),
            &[("net".to_string(), "instance_items".to_string())]
        );
        let net = schema.entity("net").unwrap();
        assert_eq!(
            restricted.entity_clone(&[net]),
            EntityClone::DedupByName(BindingKind::Net)
        );
    }

    #[test]
    fn test_collector_order_is_declaration_order() {
        let table = PolicyTable::builder()
            .collector("scope", "b", "bs")
            .collector("scope", "a", "as")
            .collector("scope", "b", "bs")
            .build();
        let buckets: Vec<&str> = table
            .collector_buckets("scope")
            .iter()
            .map(|(c, _)| c.as_str())
            .collect();
        assert_eq!(buckets, vec!["b", "a"]);
        assert!(table.collector_buckets("module").is_empty());
    }
}
