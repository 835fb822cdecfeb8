//! Hierarchy resolution.
//!
//! [`ResolutionContext`] precomputes every derived view of a validated schema
//! once: ancestor chains, effective member lists in both orders, transitive
//! subclasses, concrete is-a sets and group closures. It is built once per
//! generation run and shared read-only by all emitters.

use crate::error::SchemaError;
use crate::types::{ElementType, EntityDef, GroupRef, Member, ScalarKind, Schema};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Order in which inherited members are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberOrder {
    /// Root ancestor's members first, the entity's own members last.
    BaseFirst,
    /// The entity's own members first, the root ancestor's last.
    DerivedFirst,
}

/// A member together with the entity that declares it.
#[derive(Debug, Clone, Copy)]
pub struct OwnedMember<'a> {
    /// Declaring entity.
    pub owner: &'a EntityDef,
    /// Member definition.
    pub member: &'a Member,
}

/// Resolved, read-only views over a schema.
#[derive(Debug)]
pub struct ResolutionContext {
    schema: Arc<Schema>,
    /// Per tag: the entity's own tag followed by every ancestor's tag.
    ancestors: Vec<Vec<usize>>,
    /// Per tag: transitive subclass tags in declaration order.
    descendants: Vec<Vec<usize>>,
    /// Per tag: sorted concrete tags that are-a this entity.
    is_a: Vec<Vec<u32>>,
    /// Per tag: whether an explicit `type` scalar is declared.
    declares_type: Vec<bool>,
    /// Per group: sorted, deduplicated concrete entity names.
    closures: HashMap<String, Vec<String>>,
}

impl ResolutionContext {
    /// Resolves a validated schema.
    ///
    /// # Errors
    /// Returns `SchemaError::GroupCycle` if group references loop; the check
    /// is repeated here so hand-assembled schemas are also safe.
    pub fn new(schema: Arc<Schema>) -> Result<Self, SchemaError> {
        let count = schema.entities.len();

        let mut ancestors = Vec::with_capacity(count);
        for entity in &schema.entities {
            let mut chain = vec![entity.tag as usize];
            let mut current = entity.base.as_deref();
            while let Some(base) = current {
                let def = schema
                    .entity(base)
                    .ok_or_else(|| SchemaError::unknown_entity(base))?;
                chain.push(def.tag as usize);
                current = def.base.as_deref();
            }
            ancestors.push(chain);
        }

        // Ancestors precede descendants, so one forward pass suffices.
        let mut descendants: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (tag, chain) in ancestors.iter().enumerate() {
            for &ancestor in &chain[1..] {
                descendants[ancestor].push(tag);
            }
        }

        let is_a = (0..count)
            .map(|tag| {
                let mut tags: Vec<u32> = std::iter::once(tag)
                    .chain(descendants[tag].iter().copied())
                    .filter(|&t| schema.entities[t].kind.is_concrete())
                    .map(|t| t as u32)
                    .collect();
                tags.sort_unstable();
                tags
            })
            .collect();

        let declares_type = ancestors
            .iter()
            .map(|chain| {
                chain.iter().any(|&t| {
                    schema.entities[t].members.iter().any(|m| {
                        m.name == "type" && matches!(m.element, ElementType::Scalar(_))
                    })
                })
            })
            .collect();

        let mut ctx = Self {
            schema,
            ancestors,
            descendants,
            is_a,
            declares_type,
            closures: HashMap::new(),
        };

        let mut closures = HashMap::with_capacity(ctx.schema.groups.len());
        for group in &ctx.schema.groups {
            let mut visiting = Vec::new();
            let mut members = BTreeSet::new();
            ctx.expand_group(&group.name, &mut visiting, &mut members)?;
            if members.is_empty() {
                tracing::warn!("group '{}' resolves to no concrete entity", group.name);
            }
            closures.insert(group.name.clone(), members.into_iter().collect());
        }
        ctx.closures = closures;
        Ok(ctx)
    }

    fn expand_group(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
        out: &mut BTreeSet<String>,
    ) -> Result<(), SchemaError> {
        if visiting.iter().any(|v| v == name) {
            let mut path = visiting.clone();
            path.push(name.to_string());
            return Err(SchemaError::GroupCycle {
                path: path.join(" -> "),
            });
        }
        let group = self
            .schema
            .group(name)
            .ok_or_else(|| SchemaError::unknown_group(name))?;
        visiting.push(name.to_string());
        for r in &group.refs {
            match r {
                GroupRef::Entity(entity) => {
                    let def = self.entity(entity)?;
                    if def.kind.is_concrete() {
                        out.insert(def.name.clone());
                    }
                }
                GroupRef::Class(entity) => {
                    let def = self.entity(entity)?;
                    for &tag in &self.is_a[def.tag as usize] {
                        out.insert(self.schema.entities[tag as usize].name.clone());
                    }
                }
                GroupRef::Group(inner) => self.expand_group(inner, visiting, out)?,
            }
        }
        visiting.pop();
        Ok(())
    }

    /// Returns the underlying schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns a shared handle to the underlying schema.
    #[must_use]
    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Gets an entity by name.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownEntity` if no such entity exists.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, SchemaError> {
        self.schema
            .entity(name)
            .ok_or_else(|| SchemaError::unknown_entity(name))
    }

    /// Ancestor chain starting with the entity itself.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownEntity` for unknown names.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&EntityDef>, SchemaError> {
        Ok(self.ancestors_of(self.entity(name)?))
    }

    /// Ancestor chain of a schema entity, starting with the entity itself.
    #[must_use]
    pub fn ancestors_of(&self, entity: &EntityDef) -> Vec<&EntityDef> {
        self.ancestors[entity.tag as usize]
            .iter()
            .map(|&t| &self.schema.entities[t])
            .collect()
    }

    /// Declaration levels, root ancestor first.
    #[must_use]
    pub fn levels_of(&self, entity: &EntityDef) -> Vec<&EntityDef> {
        let mut levels = self.ancestors_of(entity);
        levels.reverse();
        levels
    }

    /// Effective (inherited plus own) members of `name`.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownEntity` for unknown names.
    pub fn effective_members(
        &self,
        name: &str,
        order: MemberOrder,
    ) -> Result<Vec<&Member>, SchemaError> {
        Ok(self
            .owned_members_of(self.entity(name)?, order)
            .into_iter()
            .map(|m| m.member)
            .collect())
    }

    /// Effective members of a schema entity.
    #[must_use]
    pub fn effective_members_of(&self, entity: &EntityDef, order: MemberOrder) -> Vec<&Member> {
        self.owned_members_of(entity, order)
            .into_iter()
            .map(|m| m.member)
            .collect()
    }

    /// Effective members of a schema entity paired with their declaring entity.
    #[must_use]
    pub fn owned_members_of(&self, entity: &EntityDef, order: MemberOrder) -> Vec<OwnedMember<'_>> {
        let mut chain = self.ancestors[entity.tag as usize].clone();
        if order == MemberOrder::BaseFirst {
            chain.reverse();
        }
        chain
            .into_iter()
            .flat_map(|t| {
                let owner = &self.schema.entities[t];
                owner.members.iter().map(move |member| OwnedMember { owner, member })
            })
            .collect()
    }

    /// Finds an effective member of `entity` by raw name.
    #[must_use]
    pub fn find_member<'a>(&'a self, entity: &EntityDef, name: &str) -> Option<OwnedMember<'a>> {
        self.owned_members_of(entity, MemberOrder::DerivedFirst)
            .into_iter()
            .find(|m| m.member.name == name)
    }

    /// Transitive subclasses of `name`, in declaration order.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownEntity` for unknown names.
    pub fn subclasses(&self, name: &str) -> Result<Vec<&EntityDef>, SchemaError> {
        let entity = self.entity(name)?;
        Ok(self.descendants[entity.tag as usize]
            .iter()
            .map(|&t| &self.schema.entities[t])
            .collect())
    }

    /// Sorted concrete tags whose objects are-a `entity`.
    #[must_use]
    pub fn is_a_tags(&self, entity: &EntityDef) -> &[u32] {
        &self.is_a[entity.tag as usize]
    }

    /// Returns true if objects tagged `tag` are-a `entity`.
    #[must_use]
    pub fn is_a(&self, tag: u32, entity: &EntityDef) -> bool {
        self.is_a[entity.tag as usize].binary_search(&tag).is_ok()
    }

    /// Sorted concrete entity names a group may denote.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownGroup` for unknown names.
    pub fn group_closure(&self, group: &str) -> Result<&[String], SchemaError> {
        self.closures
            .get(group)
            .map(Vec::as_slice)
            .ok_or_else(|| SchemaError::unknown_group(group))
    }

    /// Sorted concrete tags a reference member may point at.
    ///
    /// Empty for scalar members.
    ///
    /// # Errors
    /// Returns an error if the member's target does not resolve.
    pub fn target_tags(&self, member: &Member) -> Result<Vec<u32>, SchemaError> {
        match &member.element {
            ElementType::Scalar(_) => Ok(Vec::new()),
            ElementType::Entity(name) => Ok(self.is_a_tags(self.entity(name)?).to_vec()),
            ElementType::Group(name) => {
                let mut tags = self
                    .group_closure(name)?
                    .iter()
                    .map(|n| self.entity(n).map(|e| e.tag))
                    .collect::<Result<Vec<_>, _>>()?;
                tags.sort_unstable();
                Ok(tags)
            }
        }
    }

    /// Returns true if `entity` (or an ancestor) declares a scalar named `type`.
    #[must_use]
    pub fn declares_type_member(&self, entity: &EntityDef) -> bool {
        self.declares_type[entity.tag as usize]
    }

    /// Concrete entities in tag order.
    pub fn concrete(&self) -> impl Iterator<Item = &EntityDef> {
        self.schema.concrete_entities()
    }

    /// Scalar members of interned kinds across the effective member set.
    #[must_use]
    pub fn symbol_members_of(&self, entity: &EntityDef) -> Vec<&Member> {
        self.effective_members_of(entity, MemberOrder::BaseFirst)
            .into_iter()
            .filter(|m| m.scalar_kind().is_some_and(ScalarKind::is_symbol))
            .collect()
    }

    /// Names of every group containing `tag`, sorted.
    #[must_use]
    pub fn groups_containing(&self, tag: u32) -> Vec<&str> {
        let Some(entity) = self.schema.entity_by_tag(tag) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .closures
            .iter()
            .filter(|(_, members)| members.binary_search(&entity.name).is_ok())
            .map(|(g, _)| g.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Entities referenced by members of `entity` (deduplicated).
    #[must_use]
    pub fn referenced_entities(&self, entity: &EntityDef) -> HashSet<u32> {
        self.effective_members_of(entity, MemberOrder::BaseFirst)
            .into_iter()
            .filter_map(|m| self.target_tags(m).ok())
            .flatten()
            .collect()
    }
}
