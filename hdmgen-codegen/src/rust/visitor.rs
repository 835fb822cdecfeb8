//! Tree dump generation.
//!
//! The generated `dump` prints every object once with its scalar members
//! and follows references one level deeper per hop. Relations the policy
//! table excludes from traversal still print their target, without
//! descending into it.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::{EntityDef, MemberOrder};

const TEMPLATE: &str = include_str!("../../templates/visitor.rs.in");

/// Emits `visitor.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisitorEmitter;

impl Emitter for VisitorEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Visitor
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        Ok(vec![Artifact::new("visitor.rs", VisitorGenerator::new(cx).generate()?)])
    }
}

/// Generator for the dump artifact.
pub struct VisitorGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> VisitorGenerator<'a> {
    /// Creates a new visitor generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `visitor.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate(&self) -> Result<String, CodegenError> {
        let mut arms = String::new();
        let mut fns = String::new();
        for entity in self.cx.concrete() {
            arms.push_str(&format!(
                "            Some({}) => self.dump_{}(obj, indent, relation, shallow),\n",
                self.cx.tag_variant(entity),
                self.cx.type_stem(entity)
            ));
            fns.push_str(&self.generate_entity(entity));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Tree dump of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("visitor.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("DUMP_ARMS", arms)?
            .fill("DUMP_FNS", fns)?;
        template.render()
    }

    fn generate_entity(&self, entity: &EntityDef) -> String {
        let stem = self.cx.type_stem(entity);
        let chain = self.cx.chain(entity);
        let name_member = self.cx.name_member(entity);
        let name = match name_member {
            Some(member) => format!("&object.{}", self.cx.field(member)),
            None => "\"\"".to_string(),
        };

        let mut output = String::new();
        output.push_str(&format!(
            "    fn dump_{stem}(&mut self, obj: ObjRef, indent: usize, relation: Option<&str>, shallow: bool) {{\n"
        ));
        output.push_str("        let store = self.store;\n");
        output.push_str(&format!(
            "        let Some(object) = store.{}(obj) else {{\n",
            self.cx.store_field(entity)
        ));
        output.push_str("            return;\n");
        output.push_str("        };\n");
        output.push_str(&format!(
            "        if !self.header(obj, indent, relation, {name}, &object.header, shallow) {{\n"
        ));
        output.push_str("            return;\n");
        output.push_str("        }\n");

        let members = self.cx.members(entity, MemberOrder::BaseFirst);
        for owned in &members {
            let member = owned.member;
            let Some(kind) = member.scalar_kind() else {
                continue;
            };
            if name_member.is_some_and(|n| n.name == member.name) {
                continue;
            }
            let field = self.cx.field(member);
            if kind.is_symbol() {
                output.push_str(&format!(
                    "        self.text(indent, \"{}\", &object.{field});\n",
                    member.name
                ));
            } else {
                output.push_str(&format!(
                    "        self.scalar(indent, \"{}\", object.{field});\n",
                    member.name
                ));
            }
        }
        for owned in &members {
            let member = owned.member;
            if !member.is_reference() {
                continue;
            }
            let field = self.cx.field(member);
            let relation = &member.relation;
            let shallow = self.cx.policy.is_traversal_excluded(&chain, member);
            if member.is_many() {
                output.push_str(&format!(
                    "        if let Some(items) = object.{field}.as_deref() {{\n"
                ));
                output.push_str(&format!(
                    "            self.collection(items, indent + LEVEL_INDENT, \"{relation}\", {shallow});\n"
                ));
            } else {
                output.push_str(&format!("        if let Some(child) = object.{field} {{\n"));
                output.push_str(&format!(
                    "            self.object(child, indent + LEVEL_INDENT, Some(\"{relation}\"), {shallow});\n"
                ));
            }
            output.push_str("        }\n");
        }
        output.push_str("    }\n\n");
        output
    }
}
