//! Schema-interpreted object graph.
//!
//! [`Graph`] is the runtime counterpart of the generated `Store`: objects are
//! kept in per-type vectors addressed by [`ObjRef`], each with an
//! [`ObjectHeader`] and one [`Value`] per effective member, base-first. The
//! member layout of every concrete entity is computed once from the
//! [`ResolutionContext`] and shared by every graph built over it.

use crate::error::{ModelError, Result};
use crate::value::Value;
use hdmgen_core::{ObjRef, ObjectHeader};
use hdmgen_schema::{EntityDef, Member, MemberOrder, MemberTag, PolicyTable, ResolutionContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Effective member layout of one concrete entity.
#[derive(Debug)]
pub(crate) struct Layout {
    /// Effective members, base-first.
    pub(crate) members: Vec<Member>,
    /// Sorted concrete tags each reference slot accepts; empty for scalars.
    pub(crate) targets: Vec<Vec<u32>>,
    /// Slot holding the object's name, if any.
    pub(crate) name_slot: Option<usize>,
    index: HashMap<String, usize>,
}

impl Layout {
    fn build(resolution: &ResolutionContext, entity: &EntityDef) -> Result<Self> {
        let members: Vec<Member> = resolution
            .effective_members_of(entity, MemberOrder::BaseFirst)
            .into_iter()
            .cloned()
            .collect();
        let mut targets = Vec::with_capacity(members.len());
        for member in &members {
            let tags = resolution.target_tags(member).map_err(|_| {
                ModelError::UnknownEntity(member.target().unwrap_or_default().to_string())
            })?;
            targets.push(tags);
        }
        let is_text = |m: &Member| m.scalar_kind().is_some_and(|k| k.is_symbol());
        let name_slot = members
            .iter()
            .position(|m| is_text(m) && m.has_tag(MemberTag::NameIdentifier))
            .or_else(|| members.iter().position(|m| is_text(m) && m.name == "name"));
        let index = members
            .iter()
            .enumerate()
            .map(|(slot, m)| (m.name.clone(), slot))
            .collect();
        Ok(Self {
            members,
            targets,
            name_slot,
            index,
        })
    }

    pub(crate) fn slot(&self, member: &str) -> Option<usize> {
        self.index.get(member).copied()
    }
}

/// One object: its base record and its member values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub(crate) header: ObjectHeader,
    pub(crate) values: Vec<Value>,
}

impl Object {
    /// Base record.
    #[must_use]
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Member values in base-first effective member order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Object graph interpreted against a resolved schema and policy table.
#[derive(Debug, Clone)]
pub struct Graph {
    resolution: Arc<ResolutionContext>,
    policy: Arc<PolicyTable>,
    layouts: Arc<Vec<Option<Layout>>>,
    objects: Vec<Vec<Object>>,
    last_id: u32,
}

impl Graph {
    /// Creates an empty graph.
    ///
    /// # Errors
    /// Returns `ModelError::UnknownEntity` if a member target does not
    /// resolve, which cannot happen for a validated schema.
    pub fn new(resolution: Arc<ResolutionContext>, policy: Arc<PolicyTable>) -> Result<Self> {
        let mut layouts = Vec::with_capacity(resolution.schema().entities.len());
        for entity in &resolution.schema().entities {
            layouts.push(if entity.kind.is_concrete() {
                Some(Layout::build(&resolution, entity)?)
            } else {
                None
            });
        }
        let objects = vec![Vec::new(); layouts.len()];
        Ok(Self {
            resolution,
            policy,
            layouts: Arc::new(layouts),
            objects,
            last_id: 0,
        })
    }

    /// Creates an empty graph sharing this graph's schema, policy and layouts.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self {
            resolution: Arc::clone(&self.resolution),
            policy: Arc::clone(&self.policy),
            layouts: Arc::clone(&self.layouts),
            objects: vec![Vec::new(); self.layouts.len()],
            last_id: 0,
        }
    }

    /// Resolution context the graph is interpreted against.
    #[must_use]
    pub fn resolution(&self) -> &ResolutionContext {
        &self.resolution
    }

    pub(crate) fn resolution_arc(&self) -> Arc<ResolutionContext> {
        Arc::clone(&self.resolution)
    }

    /// Policy table used by traversal, clone, compare and containers.
    #[must_use]
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub(crate) fn policy_arc(&self) -> Arc<PolicyTable> {
        Arc::clone(&self.policy)
    }

    /// Entity definition of `obj`'s type tag.
    ///
    /// # Errors
    /// Returns `ModelError::Core` if the tag is unknown.
    pub fn entity(&self, obj: ObjRef) -> Result<&EntityDef> {
        self.entity_by_tag(obj.tag)
    }

    fn entity_by_tag(&self, tag: u32) -> Result<&EntityDef> {
        self.resolution
            .schema()
            .entity_by_tag(tag)
            .ok_or(ModelError::Core(hdmgen_core::Error::UnknownTypeTag { tag }))
    }

    fn entity_name(&self, tag: u32) -> &str {
        self.resolution
            .schema()
            .entity_by_tag(tag)
            .map_or("?", |e| e.name.as_str())
    }

    pub(crate) fn layout(&self, tag: u32) -> Result<&Layout> {
        self.layouts
            .get(tag as usize)
            .and_then(Option::as_ref)
            .ok_or(ModelError::Core(hdmgen_core::Error::UnknownTypeTag { tag }))
    }

    /// Creates an object of the named entity with default values.
    ///
    /// # Errors
    /// Returns `ModelError::UnknownEntity` or `ModelError::NotInstantiable`.
    pub fn create(&mut self, entity: &str) -> Result<ObjRef> {
        let tag = self
            .resolution
            .schema()
            .entity(entity)
            .ok_or_else(|| ModelError::UnknownEntity(entity.to_string()))?
            .tag;
        self.create_tag(tag)
    }

    /// Creates an object with the given type tag.
    ///
    /// # Errors
    /// Returns `ModelError::NotInstantiable` for abstract entities and
    /// `ModelError::Core` for unknown tags.
    pub fn create_tag(&mut self, tag: u32) -> Result<ObjRef> {
        let entity = self.entity_by_tag(tag)?;
        if !entity.kind.is_concrete() {
            return Err(ModelError::NotInstantiable(entity.name.clone()));
        }
        let values: Vec<Value> = self
            .layout(tag)?
            .members
            .iter()
            .map(Value::default_for)
            .collect();
        self.last_id += 1;
        let objects = &mut self.objects[tag as usize];
        let obj = ObjRef::new(tag, objects.len() as u32);
        objects.push(Object {
            header: ObjectHeader::with_id(self.last_id),
            values,
        });
        Ok(obj)
    }

    /// Returns true if `obj` names a live object.
    #[must_use]
    pub fn contains(&self, obj: ObjRef) -> bool {
        self.objects
            .get(obj.tag as usize)
            .is_some_and(|objects| (obj.index as usize) < objects.len())
    }

    /// Returns the object `obj` designates.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if it does not exist.
    pub fn object(&self, obj: ObjRef) -> Result<&Object> {
        self.objects
            .get(obj.tag as usize)
            .and_then(|objects| objects.get(obj.index as usize))
            .ok_or(ModelError::DanglingReference { obj })
    }

    fn object_mut(&mut self, obj: ObjRef) -> Result<&mut Object> {
        self.objects
            .get_mut(obj.tag as usize)
            .and_then(|objects| objects.get_mut(obj.index as usize))
            .ok_or(ModelError::DanglingReference { obj })
    }

    /// Base record of `obj`.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if it does not exist.
    pub fn header(&self, obj: ObjRef) -> Result<&ObjectHeader> {
        Ok(&self.object(obj)?.header)
    }

    /// Mutable base record of `obj`.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if it does not exist.
    pub fn header_mut(&mut self, obj: ObjRef) -> Result<&mut ObjectHeader> {
        Ok(&mut self.object_mut(obj)?.header)
    }

    pub(crate) fn values_mut(&mut self, obj: ObjRef) -> Result<&mut Vec<Value>> {
        Ok(&mut self.object_mut(obj)?.values)
    }

    /// Number of objects of type `tag`.
    #[must_use]
    pub fn count(&self, tag: u32) -> usize {
        self.objects.get(tag as usize).map_or(0, Vec::len)
    }

    /// Total number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.iter().map(Vec::len).sum()
    }

    /// Returns true if the graph holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.iter().all(Vec::is_empty)
    }

    /// Every object in `(tag, index)` order.
    pub fn objects(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.objects.iter().enumerate().flat_map(|(tag, objects)| {
            (0..objects.len()).map(move |index| ObjRef::new(tag as u32, index as u32))
        })
    }

    /// Highest object id handed out so far.
    #[must_use]
    pub fn last_id(&self) -> u32 {
        self.last_id
    }

    pub(crate) fn set_last_id(&mut self, id: u32) {
        self.last_id = id;
    }

    /// Effective members of `obj`, base-first.
    ///
    /// # Errors
    /// Returns `ModelError::Core` if the tag is unknown.
    pub fn members(&self, obj: ObjRef) -> Result<&[Member]> {
        Ok(&self.layout(obj.tag)?.members)
    }

    fn slot_of(&self, obj: ObjRef, member: &str) -> Result<usize> {
        self.layout(obj.tag)?
            .slot(member)
            .ok_or_else(|| ModelError::UnknownMember {
                entity: self.entity_name(obj.tag).to_string(),
                member: member.to_string(),
            })
    }

    /// Value of `member` on `obj`.
    ///
    /// # Errors
    /// Returns an error for dangling objects or unknown members.
    pub fn get(&self, obj: ObjRef, member: &str) -> Result<&Value> {
        let slot = self.slot_of(obj, member)?;
        Ok(&self.object(obj)?.values[slot])
    }

    /// Stores `value` into `member` of `obj`.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the value does not fit the
    /// declared kind or width, or a referenced object's type lies outside
    /// the member's target entity or group; `ModelError::DanglingReference`
    /// if a referenced object does not exist.
    pub fn set(&mut self, obj: ObjRef, member: &str, value: Value) -> Result<()> {
        let slot = self.slot_of(obj, member)?;
        let def = &self.layout(obj.tag)?.members[slot];
        value
            .check_fits(def)
            .map_err(|reason| ModelError::mismatch(self.entity_name(obj.tag), member, reason))?;
        for &target in value.references() {
            self.check_target(obj.tag, slot, target)?;
        }
        self.object_mut(obj)?.values[slot] = value;
        Ok(())
    }

    fn check_target(&self, tag: u32, slot: usize, target: ObjRef) -> Result<()> {
        if !self.contains(target) {
            return Err(ModelError::DanglingReference { obj: target });
        }
        let layout = self.layout(tag)?;
        if layout.targets[slot].binary_search(&target.tag).is_err() {
            return Err(ModelError::mismatch(
                self.entity_name(tag),
                layout.members[slot].name.as_str(),
                format!(
                    "'{}' is not a valid target",
                    self.entity_name(target.tag)
                ),
            ));
        }
        Ok(())
    }

    /// Text content of `member`.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the member is not textual.
    pub fn text(&self, obj: ObjRef, member: &str) -> Result<&str> {
        match self.get(obj, member)? {
            Value::Text(text) => Ok(text),
            other => Err(self.wrong_kind(obj, member, other, "text")),
        }
    }

    /// Sets text content of `member`.
    ///
    /// # Errors
    /// See [`Graph::set`].
    pub fn set_text(&mut self, obj: ObjRef, member: &str, text: impl Into<String>) -> Result<()> {
        self.set(obj, member, Value::Text(text.into()))
    }

    /// Signed integer content of `member`.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the member is not a signed integer.
    pub fn int(&self, obj: ObjRef, member: &str) -> Result<i64> {
        match self.get(obj, member)? {
            Value::Int(v) => Ok(*v),
            other => Err(self.wrong_kind(obj, member, other, "signed integer")),
        }
    }

    /// Sets a signed integer member.
    ///
    /// # Errors
    /// See [`Graph::set`].
    pub fn set_int(&mut self, obj: ObjRef, member: &str, value: i64) -> Result<()> {
        self.set(obj, member, Value::Int(value))
    }

    /// Sets an unsigned integer member.
    ///
    /// # Errors
    /// See [`Graph::set`].
    pub fn set_uint(&mut self, obj: ObjRef, member: &str, value: u64) -> Result<()> {
        self.set(obj, member, Value::UInt(value))
    }

    /// Sets a boolean member.
    ///
    /// # Errors
    /// See [`Graph::set`].
    pub fn set_bool(&mut self, obj: ObjRef, member: &str, value: bool) -> Result<()> {
        self.set(obj, member, Value::Bool(value))
    }

    /// Single reference held by `member`.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the member is not a single reference.
    pub fn get_ref(&self, obj: ObjRef, member: &str) -> Result<Option<ObjRef>> {
        match self.get(obj, member)? {
            Value::Ref(target) => Ok(*target),
            other => Err(self.wrong_kind(obj, member, other, "reference")),
        }
    }

    /// Sets a single reference.
    ///
    /// # Errors
    /// See [`Graph::set`].
    pub fn set_ref(&mut self, obj: ObjRef, member: &str, target: Option<ObjRef>) -> Result<()> {
        self.set(obj, member, Value::Ref(target))
    }

    /// Collection held by `member`, or `None` if it was never created.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the member is not a collection.
    pub fn list(&self, obj: ObjRef, member: &str) -> Result<Option<&[ObjRef]>> {
        match self.get(obj, member)? {
            Value::Refs(items) => Ok(items.as_deref()),
            other => Err(self.wrong_kind(obj, member, other, "reference list")),
        }
    }

    /// Elements of a collection; empty if it was never created.
    ///
    /// # Errors
    /// See [`Graph::list`].
    pub fn refs(&self, obj: ObjRef, member: &str) -> Result<&[ObjRef]> {
        Ok(self.list(obj, member)?.unwrap_or_default())
    }

    /// Appends `item` to a collection, creating it if needed.
    ///
    /// # Errors
    /// Returns `ModelError::TypeMismatch` if the member is not a collection
    /// or `item` is not a valid target.
    pub fn push(&mut self, obj: ObjRef, member: &str, item: ObjRef) -> Result<()> {
        let slot = self.slot_of(obj, member)?;
        if !self.layout(obj.tag)?.members[slot].is_many() {
            return Err(ModelError::mismatch(
                self.entity_name(obj.tag),
                member,
                "not a reference list",
            ));
        }
        self.check_target(obj.tag, slot, item)?;
        if let Value::Refs(items) = &mut self.object_mut(obj)?.values[slot] {
            items.get_or_insert_with(Vec::new).push(item);
        }
        Ok(())
    }

    fn wrong_kind(&self, obj: ObjRef, member: &str, found: &Value, wanted: &str) -> ModelError {
        ModelError::mismatch(
            self.entity_name(obj.tag),
            member,
            format!("holds {}, not {wanted}", found.kind_name()),
        )
    }

    /// Name of `obj`: its name-identifier member, or a textual `name`.
    #[must_use]
    pub fn name(&self, obj: ObjRef) -> Option<&str> {
        let slot = self.layout(obj.tag).ok()?.name_slot?;
        match &self.object(obj).ok()?.values[slot] {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Text of `member` if `obj` has such a textual member.
    #[must_use]
    pub fn key_text(&self, obj: ObjRef, member: &str) -> Option<&str> {
        match self.get(obj, member).ok()? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Every outgoing reference of `obj` with the member it is held in,
    /// base-first, collections in element order.
    ///
    /// # Errors
    /// Returns `ModelError::DanglingReference` if `obj` does not exist.
    pub fn references(&self, obj: ObjRef) -> Result<Vec<(&Member, ObjRef)>> {
        let layout = self.layout(obj.tag)?;
        let object = self.object(obj)?;
        Ok(layout
            .members
            .iter()
            .zip(&object.values)
            .flat_map(|(member, value)| value.references().iter().map(move |&r| (member, r)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_graph;

    #[test]
    fn test_create_and_defaults() {
        let mut graph = sample_graph();
        let module = graph.create("module").unwrap();
        let net = graph.create("net").unwrap();
        assert_eq!(module.index, 0);
        assert_eq!(graph.header(module).unwrap().id, 1);
        assert_eq!(graph.header(net).unwrap().id, 2);
        assert_eq!(graph.text(module, "name").unwrap(), "");
        assert_eq!(graph.list(module, "nets").unwrap(), None);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.last_id(), 2);
    }

    #[test]
    fn test_abstract_and_unknown_entities() {
        let mut graph = sample_graph();
        assert_eq!(
            graph.create("any_obj"),
            Err(ModelError::NotInstantiable("any_obj".into()))
        );
        assert_eq!(
            graph.create("missing"),
            Err(ModelError::UnknownEntity("missing".into()))
        );
    }

    #[test]
    fn test_inherited_members_base_first() {
        let graph = sample_graph();
        let tag = graph.resolution().schema().entity("module").unwrap().tag;
        let names: Vec<&str> = graph
            .layout(tag)
            .unwrap()
            .members
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "name",
                "nets",
                "def_name",
                "expr",
                "instance",
                "ref_modules",
                "task_funcs",
                "cont_assigns"
            ]
        );
    }

    #[test]
    fn test_group_compliance() {
        let mut graph = sample_graph();
        let module = graph.create("module").unwrap();
        let net = graph.create("net").unwrap();
        let other = graph.create("module").unwrap();

        graph.set_ref(module, "expr", Some(net)).unwrap();
        assert_eq!(graph.get_ref(module, "expr").unwrap(), Some(net));
        assert!(matches!(
            graph.set_ref(module, "expr", Some(other)),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            graph.push(module, "nets", other),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert_eq!(
            graph.set_ref(module, "expr", Some(ObjRef::new(net.tag, 9))),
            Err(ModelError::DanglingReference {
                obj: ObjRef::new(net.tag, 9)
            })
        );
    }

    #[test]
    fn test_scalar_checks() {
        let mut graph = sample_graph();
        let constant = graph.create("constant").unwrap();
        graph.set_int(constant, "size", 32).unwrap();
        assert_eq!(graph.int(constant, "size").unwrap(), 32);
        assert!(graph.set_int(constant, "size", i64::MAX).is_err());
        assert!(graph.set_text(constant, "size", "x").is_err());
        assert!(matches!(
            graph.get(constant, "width"),
            Err(ModelError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_name_and_references() {
        let mut graph = sample_graph();
        let scope = graph.create("scope").unwrap();
        let a = graph.create("net").unwrap();
        let b = graph.create("net").unwrap();
        graph.set_text(scope, "name", "top").unwrap();
        graph.push(scope, "nets", a).unwrap();
        graph.push(scope, "nets", b).unwrap();
        assert_eq!(graph.name(scope), Some("top"));
        assert_eq!(graph.refs(scope, "nets").unwrap(), [a, b]);
        let refs: Vec<(&str, ObjRef)> = graph
            .references(scope)
            .unwrap()
            .into_iter()
            .map(|(m, r)| (m.name.as_str(), r))
            .collect();
        assert_eq!(refs, [("nets", a), ("nets", b)]);
    }

    #[test]
    fn test_empty_like_shares_layouts() {
        let mut graph = sample_graph();
        graph.create("net").unwrap();
        let empty = graph.empty_like();
        assert!(empty.is_empty());
        assert_eq!(empty.last_id(), 0);
        assert!(Arc::ptr_eq(&graph.layouts, &empty.layouts));
    }
}
