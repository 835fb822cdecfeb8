//! Programmatic schema construction.
//!
//! The raw schema loader hands entities to [`SchemaBuilder`] in declaration
//! order. [`SchemaBuilder::build`] assigns type tags, derives subclass lists
//! and entity kinds, then runs full validation.

use crate::error::SchemaError;
use crate::naming::NamingEngine;
use crate::types::{EntityDef, EntityKind, GroupDef, Member, Schema};
use crate::validation::validate_schema;
use std::collections::{HashMap, HashSet};

/// Entity declaration collected by [`SchemaBuilder`].
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    base: Option<String>,
    is_abstract: bool,
    members: Vec<Member>,
}

impl EntityBuilder {
    /// Starts an entity declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            is_abstract: false,
            members: Vec::new(),
        }
    }

    /// Sets the base entity.
    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Marks the entity as never instantiated.
    ///
    /// Only meaningful for entities with subclasses; a leaf stays concrete.
    #[must_use]
    pub fn abstract_entity(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Appends an own member.
    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    entities: Vec<EntityBuilder>,
    groups: Vec<GroupDef>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Declares an entity. Declaration order defines type tags.
    #[must_use]
    pub fn entity(mut self, entity: EntityBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Declares a group.
    #[must_use]
    pub fn group(mut self, group: GroupDef) -> Self {
        self.groups.push(group);
        self
    }

    /// Builds and validates the schema with the default naming engine.
    ///
    /// # Errors
    /// Returns `SchemaError` for any ordering, resolution or naming violation.
    pub fn build(self) -> Result<Schema, SchemaError> {
        self.build_with(&NamingEngine::default())
    }

    /// Builds and validates the schema, checking name collisions with `naming`.
    ///
    /// # Errors
    /// Returns `SchemaError` for any ordering, resolution or naming violation.
    pub fn build_with(self, naming: &NamingEngine) -> Result<Schema, SchemaError> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            if position.insert(entity.name.as_str(), i).is_some() {
                return Err(SchemaError::duplicate("entity", entity.name.clone()));
            }
            let mut seen = HashSet::new();
            for member in &entity.members {
                if !seen.insert(member.name.as_str()) {
                    return Err(SchemaError::duplicate(
                        "member",
                        format!("{}.{}", entity.name, member.name),
                    ));
                }
            }
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(SchemaError::duplicate("group", group.name.clone()));
            }
        }

        let mut subclasses: Vec<Vec<String>> = vec![Vec::new(); self.entities.len()];
        for (i, entity) in self.entities.iter().enumerate() {
            if let Some(base) = &entity.base {
                match position.get(base.as_str()) {
                    None => {
                        return Err(SchemaError::UnknownBase {
                            entity: entity.name.clone(),
                            base: base.clone(),
                        });
                    }
                    Some(&b) if b >= i => {
                        return Err(SchemaError::OrderingViolation {
                            entity: entity.name.clone(),
                            base: base.clone(),
                        });
                    }
                    Some(&b) => subclasses[b].push(entity.name.clone()),
                }
            }
        }

        let entities = self
            .entities
            .into_iter()
            .zip(subclasses)
            .enumerate()
            .map(|(i, (entity, subclasses))| {
                let kind = if subclasses.is_empty() {
                    EntityKind::Leaf
                } else if entity.is_abstract {
                    EntityKind::Abstract
                } else {
                    EntityKind::Interior
                };
                EntityDef {
                    name: entity.name,
                    kind,
                    base: entity.base,
                    members: entity.members,
                    tag: i as u32,
                    subclasses,
                }
            })
            .collect();

        let schema = Schema::new(self.name, entities, self.groups);
        validate_schema(&schema, naming)?;
        tracing::debug!(
            "built schema '{}': {} entities, {} groups",
            schema.name,
            schema.entities.len(),
            schema.groups.len()
        );
        Ok(schema)
    }
}
