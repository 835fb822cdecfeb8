//! Policy document parser.
//!
//! Policies can be kept next to the schema as a small XML document:
//!
//! ```xml
//! <policy base="hdl">
//!   <clone entity="ref_obj" member="actual_group" policy="rebind" key="name" source="referrer"/>
//!   <entity name="func_call" clone="custom" kind="call"/>
//!   <entity name="net" clone="dedup" binding="net"/>
//!   <exclude relation="parent"/>
//!   <exclude entity="func_call" relation="function"/>
//!   <compare-exclude member="file"/>
//!   <collector entity="scope">
//!     <bucket child="net" member="instance_items"/>
//!   </collector>
//! </policy>
//! ```
//!
//! `base="hdl"` starts from [`PolicyTable::hdl_defaults`]; entries in the
//! document are added on top.

use crate::error::ParseError;
use crate::policy::{
    ANY_ENTITY, BindingKind, ClonePolicy, CustomClone, EntityClone, KeySource, PolicyTable,
    PolicyTableBuilder,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Parses a policy document.
///
/// # Arguments
/// * `xml` - Policy document content
///
/// # Errors
/// Returns `ParseError` if the XML is malformed or an entry is invalid.
pub fn parse_policy(xml: &str) -> Result<PolicyTable, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder: Option<PolicyTableBuilder> = None;
    let mut collector: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name_bytes = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_bytes)?;
                match name {
                    "policy" => builder = Some(parse_root(e)?),
                    "collector" if builder.is_some() => {
                        let attrs = attributes(e)?;
                        collector = Some(required(&attrs, "collector", "entity")?.to_string());
                    }
                    other => return Err(ParseError::unknown_element(other, "policy")),
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name_bytes = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_bytes)?;
                if name == "policy" {
                    builder = Some(parse_root(e)?);
                } else {
                    let current = builder.take().ok_or_else(|| ParseError::InvalidStructure {
                        message: format!("'{name}' outside of <policy>"),
                    })?;
                    builder = Some(parse_entry(current, name, e, collector.as_deref())?);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"collector" {
                    collector = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    builder
        .map(PolicyTableBuilder::build)
        .ok_or_else(|| ParseError::InvalidStructure {
            message: "No policy element found".to_string(),
        })
}

fn parse_root(e: &BytesStart<'_>) -> Result<PolicyTableBuilder, ParseError> {
    let attrs = attributes(e)?;
    match attrs.get("base").map(String::as_str) {
        None => Ok(PolicyTable::builder()),
        Some("hdl") => Ok(PolicyTableBuilder::from(PolicyTable::hdl_defaults())),
        Some(other) => Err(ParseError::invalid_attr("policy", "base", other)),
    }
}

fn parse_entry(
    builder: PolicyTableBuilder,
    element: &str,
    e: &BytesStart<'_>,
    collector: Option<&str>,
) -> Result<PolicyTableBuilder, ParseError> {
    let attrs = attributes(e)?;
    match element {
        "clone" => {
            let entity = attrs.get("entity").map_or(ANY_ENTITY, String::as_str);
            let member = required(&attrs, element, "member")?;
            let policy = match required(&attrs, element, "policy")? {
                "deep" => ClonePolicy::Deep,
                "alias" => ClonePolicy::Alias,
                "uniquify" => ClonePolicy::Uniquify,
                "rebind" => {
                    let key = attrs.get("key").map_or("name", String::as_str).to_string();
                    let source = match attrs.get("source").map(String::as_str) {
                        None | Some("target") => KeySource::Target,
                        Some("referrer") => KeySource::Referrer,
                        Some(other) => return Err(ParseError::invalid_attr(element, "source", other)),
                    };
                    ClonePolicy::Rebind { key, source }
                }
                other => return Err(ParseError::invalid_attr(element, "policy", other)),
            };
            Ok(builder.member_clone(entity, member, policy))
        }
        "entity" => {
            let name = required(&attrs, element, "name")?;
            let clone = match required(&attrs, element, "clone")? {
                "generic" => EntityClone::Generic,
                "custom" => {
                    let kind = required(&attrs, element, "kind")?;
                    EntityClone::Custom(
                        CustomClone::parse(kind)
                            .ok_or_else(|| ParseError::invalid_attr(element, "kind", kind))?,
                    )
                }
                "dedup" => match required(&attrs, element, "binding")? {
                    "net" => EntityClone::DedupByName(BindingKind::Net),
                    "param" => EntityClone::DedupByName(BindingKind::Param),
                    other => return Err(ParseError::invalid_attr(element, "binding", other)),
                },
                other => return Err(ParseError::invalid_attr(element, "clone", other)),
            };
            Ok(builder.entity_clone(name, clone))
        }
        "exclude" => {
            let relation = required(&attrs, element, "relation")?;
            Ok(match attrs.get("entity") {
                Some(entity) => builder.exclude_edge(entity.as_str(), relation),
                None => builder.exclude_relation(relation),
            })
        }
        "compare-exclude" => {
            let member = required(&attrs, element, "member")?;
            Ok(builder.compare_exclude(member))
        }
        "bucket" => {
            let collector = collector.ok_or_else(|| ParseError::InvalidStructure {
                message: "<bucket> outside of <collector>".to_string(),
            })?;
            let child = required(&attrs, element, "child")?;
            let member = required(&attrs, element, "member")?;
            Ok(builder.collector(collector, child, member))
        }
        other => Err(ParseError::unknown_element(other, "policy")),
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, ParseError> {
    let mut attrs = HashMap::new();
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = std::str::from_utf8(&attr.value)?;
        attrs.insert(key.to_string(), value.to_string());
    }
    Ok(attrs)
}

fn required<'a>(
    attrs: &'a HashMap<String, String>,
    element: &str,
    attribute: &str,
) -> Result<&'a str, ParseError> {
    attrs
        .get(attribute)
        .map(String::as_str)
        .ok_or_else(|| ParseError::missing_attr(element, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{EntityBuilder, SchemaBuilder};
    use crate::types::{Cardinality, Member, MemberTag, ScalarKind};

    const POLICY: &str = r#"
        <policy>
          <clone entity="ref_obj" member="actual" policy="rebind" key="name" source="referrer"/>
          <clone member="typespecs" policy="alias"/>
          <entity name="net" clone="dedup" binding="net"/>
          <entity name="func_call" clone="custom" kind="call"/>
          <exclude relation="parent"/>
          <exclude entity="func_call" relation="function"/>
          <compare-exclude member="line"/>
          <collector entity="scope">
            <bucket child="net" member="nets"/>
          </collector>
        </policy>
    "#;

    #[test]
    fn test_parse_policy() {
        let table = parse_policy(POLICY).unwrap();
        let schema = SchemaBuilder::new("s")
            .entity(
                EntityBuilder::new("scope")
                    .member(Member::object("nets", "net", Cardinality::Many))
                    .member(Member::object("parent", "scope", Cardinality::One)),
            )
            .entity(EntityBuilder::new("net").member(Member::scalar("line", ScalarKind::Int32)))
            .entity(
                EntityBuilder::new("ref_obj")
                    .member(Member::scalar("name", ScalarKind::String).tag(MemberTag::NameIdentifier))
                    .member(Member::object("actual", "net", Cardinality::One)),
            )
            .entity(
                EntityBuilder::new("func_call")
                    .member(Member::object("function", "scope", Cardinality::One)),
            )
            .build()
            .unwrap();
        assert!(table.check(&schema).is_ok());

        let ref_obj = schema.entity("ref_obj").unwrap();
        assert_eq!(
            table.clone_policy(&[ref_obj], ref_obj.member("actual").unwrap()),
            ClonePolicy::Rebind {
                key: "name".to_string(),
                source: KeySource::Referrer
            }
        );
        let net = schema.entity("net").unwrap();
        assert_eq!(
            table.entity_clone(&[net]),
            EntityClone::DedupByName(BindingKind::Net)
        );
        assert!(table.is_compare_excluded(net.member("line").unwrap()));
        let call = schema.entity("func_call").unwrap();
        assert!(table.is_traversal_excluded(&[call], call.member("function").unwrap()));
        assert_eq!(table.collector_buckets("scope").len(), 1);
    }

    #[test]
    fn test_parse_hdl_base() {
        let table = parse_policy(r#"<policy base="hdl"><compare-exclude member="extra"/></policy>"#)
            .unwrap();
        assert!(table.has_collectors());
        assert_ne!(table, PolicyTable::hdl_defaults());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_policy(r#"<policy><clone member="x" policy="teleport"/></policy>"#),
            Err(ParseError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            parse_policy(r#"<policy><entity clone="generic"/></policy>"#),
            Err(ParseError::MissingAttribute { .. })
        ));
        assert!(matches!(
            parse_policy(r#"<policy><bucket child="a" member="b"/></policy>"#),
            Err(ParseError::InvalidStructure { .. })
        ));
        assert!(matches!(
            parse_policy("<other/>"),
            Err(ParseError::InvalidStructure { .. })
        ));
        assert!(matches!(
            parse_policy(r#"<policy><mystery/></policy>"#),
            Err(ParseError::UnknownElement { .. })
        ));
    }
}
