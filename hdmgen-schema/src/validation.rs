//! Schema validation.
//!
//! Every condition checked here is fatal: generation never starts on a schema
//! that fails validation.

use crate::error::SchemaError;
use crate::naming::NamingEngine;
use crate::types::{ElementType, EntityDef, GroupRef, Schema};
use std::collections::HashMap;

/// Validates a built schema.
///
/// # Arguments
/// * `schema` - The schema to validate
/// * `naming` - Naming engine used for collision checks
///
/// # Errors
/// Returns `SchemaError` describing the first violation found.
pub fn validate_schema(schema: &Schema, naming: &NamingEngine) -> Result<(), SchemaError> {
    validate_elements(schema)?;
    validate_groups(schema)?;
    for entity in &schema.entities {
        validate_names(schema, entity, naming)?;
    }
    Ok(())
}

/// Checks that every member's element type resolves.
fn validate_elements(schema: &Schema) -> Result<(), SchemaError> {
    for entity in &schema.entities {
        for member in &entity.members {
            let resolved = match &member.element {
                ElementType::Scalar(_) => true,
                ElementType::Entity(name) => schema.has_entity(name),
                ElementType::Group(name) => schema.has_group(name),
            };
            if !resolved {
                return Err(SchemaError::UnresolvedElementType {
                    entity: entity.name.clone(),
                    member: member.name.clone(),
                    element: member.target().unwrap_or_default().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Checks group references and rejects reference cycles.
fn validate_groups(schema: &Schema) -> Result<(), SchemaError> {
    for group in &schema.groups {
        for r in &group.refs {
            match r {
                GroupRef::Entity(name) | GroupRef::Class(name) if !schema.has_entity(name) => {
                    return Err(SchemaError::unknown_entity(name.clone()));
                }
                GroupRef::Group(name) if !schema.has_group(name) => {
                    return Err(SchemaError::unknown_group(name.clone()));
                }
                _ => {}
            }
        }
    }

    let mut state: HashMap<&str, Visit> = HashMap::new();
    for group in &schema.groups {
        let mut path = Vec::new();
        visit_group(schema, &group.name, &mut state, &mut path)?;
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn visit_group<'a>(
    schema: &'a Schema,
    name: &'a str,
    state: &mut HashMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Result<(), SchemaError> {
    match state.get(name) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::InProgress) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(name);
            return Err(SchemaError::GroupCycle {
                path: cycle.join(" -> "),
            });
        }
        None => {}
    }

    state.insert(name, Visit::InProgress);
    path.push(name);
    if let Some(group) = schema.group(name) {
        for r in &group.refs {
            if let GroupRef::Group(inner) = r {
                visit_group(schema, inner, state, path)?;
            }
        }
    }
    path.pop();
    state.insert(name, Visit::Done);
    Ok(())
}

/// Checks that no two members of the effective member set derive the same
/// member, accessor or Rust field name.
fn validate_names(
    schema: &Schema,
    entity: &EntityDef,
    naming: &NamingEngine,
) -> Result<(), SchemaError> {
    let mut members = Vec::new();
    let mut current = Some(entity);
    while let Some(level) = current {
        members.extend(level.members.iter());
        current = level.base.as_deref().and_then(|b| schema.entity(b));
    }

    let mut by_member: HashMap<String, &str> = HashMap::new();
    let mut by_accessor: HashMap<String, &str> = HashMap::new();
    let mut by_field: HashMap<String, &str> = HashMap::new();
    for member in members {
        let derived = [
            (&mut by_member, naming.member_name(&member.name, member.cardinality)),
            (&mut by_accessor, naming.accessor_name(&member.name, member.cardinality)),
            (&mut by_field, naming.fn_stem(&member.name, member.cardinality)),
        ];
        for (seen, name) in derived {
            if let Some(first) = seen.insert(name.clone(), member.name.as_str()) {
                return Err(SchemaError::NamingCollision {
                    entity: entity.name.clone(),
                    first: first.to_string(),
                    second: member.name.clone(),
                    derived: name,
                });
            }
        }
    }
    Ok(())
}
