//! Clone generation.
//!
//! Every concrete entity gets a `clone_<type>` method on the generated
//! `Cloner`. The per-member behavior comes from the policy table: deep copy,
//! alias, rebinding through the elaboration context, or copy only when the
//! context asks for unique type specifications. Entities with a custom clone
//! delegate to hand-written functions in `custom_clone`, and net/parameter
//! entities reuse an existing clone bound to the same name.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::{BindingKind, ClonePolicy, EntityClone, EntityDef, KeySource, Member, MemberOrder};

const TEMPLATE: &str = include_str!("../../templates/clone.rs.in");

/// Emits `clone.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloneEmitter;

impl Emitter for CloneEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Clone
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        Ok(vec![Artifact::new("clone.rs", CloneGenerator::new(cx).generate()?)])
    }
}

/// Generator for the clone artifact.
pub struct CloneGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> CloneGenerator<'a> {
    /// Creates a new clone generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `clone.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate(&self) -> Result<String, CodegenError> {
        let mut arms = String::new();
        let mut fns = String::new();

        for entity in self.cx.concrete() {
            arms.push_str(&format!(
                "            {} => self.clone_{}(obj, parent),\n",
                self.cx.tag_variant(entity),
                self.cx.type_stem(entity)
            ));
            fns.push_str(&self.generate_entity(entity));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Deep clone of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("clone.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("CLONE_ARMS", arms)?
            .fill("CLONE_FNS", fns)?;
        template.render()
    }

    fn generate_entity(&self, entity: &EntityDef) -> String {
        let stem = self.cx.type_stem(entity);
        let chain = self.cx.chain(entity);

        let mut output = String::new();
        output.push_str(&format!("    /// Clones a `{}`.\n", entity.name));
        output.push_str(&format!(
            "    pub fn clone_{stem}(&mut self, obj: ObjRef, parent: Option<ObjRef>) -> Option<ObjRef> {{\n"
        ));

        match self.cx.policy.entity_clone(&chain) {
            EntityClone::Generic => {
                output.push_str(&self.generic_body(entity));
                output.push_str("    }\n\n");
                return output;
            }
            EntityClone::Custom(custom) => {
                output.push_str(&format!(
                    "        super::custom_clone::{}(self, obj, parent)\n",
                    custom.name()
                ));
            }
            EntityClone::DedupByName(binding) => match self.cx.name_member(entity) {
                Some(name) => {
                    let kind = match binding {
                        BindingKind::Net => "net",
                        BindingKind::Param => "param",
                    };
                    output.push_str(&format!(
                        "        let name = self.store.{}(obj)?.{}.clone();\n",
                        self.cx.store_field(entity),
                        self.cx.field(name)
                    ));
                    output.push_str(&format!(
                        "        if let Some(existing) = self.cx.bind_{kind}(&name) {{\n"
                    ));
                    output.push_str("            self.remember(obj, existing);\n");
                    output.push_str("            return Some(existing);\n");
                    output.push_str("        }\n");
                    output.push_str(&format!(
                        "        let clone = self.generic_{stem}(obj, parent)?;\n"
                    ));
                    output.push_str(&format!("        self.cx.record_{kind}(&name, clone);\n"));
                    output.push_str("        Some(clone)\n");
                }
                None => {
                    output.push_str(&format!("        self.generic_{stem}(obj, parent)\n"));
                }
            },
        }
        output.push_str("    }\n\n");

        output.push_str(&format!(
            "    /// Member-wise clone of a `{}`, bypassing its special handling.\n",
            entity.name
        ));
        output.push_str(&format!(
            "    pub fn generic_{stem}(&mut self, obj: ObjRef, parent: Option<ObjRef>) -> Option<ObjRef> {{\n"
        ));
        output.push_str(&self.generic_body(entity));
        output.push_str("    }\n\n");
        output
    }

    fn generic_body(&self, entity: &EntityDef) -> String {
        let store = self.cx.store_field(entity);
        let stem = self.cx.type_stem(entity);
        let chain = self.cx.chain(entity);
        let scoped = chain
            .iter()
            .any(|e| !self.cx.policy.collector_buckets(&e.name).is_empty());

        let mut output = String::new();
        output.push_str(&format!("        let mut object = self.store.{store}(obj)?.clone();\n"));
        output.push_str(&format!("        let clone = self.store.make_{stem}();\n"));
        output.push_str("        self.remember(obj, clone);\n");
        output.push_str("        object.header.id = self.store.header(clone).map_or(0, |h| h.id);\n");
        output.push_str("        object.header.parent = parent;\n");
        output.push_str("        let children = std::mem::take(&mut object.header.children);\n");
        if scoped {
            output.push_str("        self.cx.enter_scope(clone);\n");
        }

        for owned in self.cx.members(entity, MemberOrder::BaseFirst) {
            let member = owned.member;
            if !member.is_reference() {
                continue;
            }
            output.push_str(&self.member_clone(entity, &chain, member));
        }

        output.push_str("        object.header.children = children\n");
        output.push_str("            .into_iter()\n");
        output.push_str("            .filter_map(|child| self.clone_any(child, Some(clone)))\n");
        output.push_str("            .collect();\n");
        if scoped {
            output.push_str("        self.cx.leave_scope(clone);\n");
        }
        output.push_str(&format!("        *self.store.{stem}_mut(clone)? = object;\n"));
        output.push_str("        Some(clone)\n");
        output
    }

    fn member_clone(&self, entity: &EntityDef, chain: &[&EntityDef], member: &Member) -> String {
        let field = self.cx.field(member);
        let many = member.is_many();
        match self.cx.policy.clone_policy(chain, member) {
            ClonePolicy::Deep => deep(&field, many, "        "),
            ClonePolicy::Alias => format!("        // {}: shared with the source\n", member.name),
            ClonePolicy::Uniquify => {
                let mut output = String::from("        if self.cx.uniquify_typespecs() {\n");
                output.push_str(&deep(&field, many, "            "));
                output.push_str("        }\n");
                output
            }
            ClonePolicy::Rebind { key, source } => {
                let referrer_key = match source {
                    KeySource::Referrer => self
                        .cx
                        .resolution
                        .find_member(entity, &key)
                        .filter(|m| m.member.scalar_kind().is_some_and(|k| k.is_symbol()))
                        .map(|m| self.cx.field(m.member)),
                    KeySource::Target => None,
                };
                match (referrer_key, many) {
                    (Some(key_field), false) => format!(
                        "        object.{field} = self.rebind(object.{field}, &object.{key_field});\n"
                    ),
                    (Some(key_field), true) => {
                        let mut output = format!(
                            "        let key = object.{key_field}.clone();\n"
                        );
                        output.push_str(&format!(
                            "        object.{field} = object.{field}.take().map(|items| {{\n"
                        ));
                        output.push_str("            items\n");
                        output.push_str("                .into_iter()\n");
                        output.push_str(
                            "                .filter_map(|item| self.rebind(Some(item), &key))\n",
                        );
                        output.push_str("                .collect()\n");
                        output.push_str("        });\n");
                        output
                    }
                    (None, false) => format!(
                        "        object.{field} = self.rebind_target(object.{field}, \"{key}\");\n"
                    ),
                    (None, true) => format!(
                        "        object.{field} = self.rebind_list(object.{field}.as_deref(), \"{key}\");\n"
                    ),
                }
            }
        }
    }
}

fn deep(field: &str, many: bool, indent: &str) -> String {
    if many {
        format!("{indent}object.{field} = self.clone_list(object.{field}.as_deref(), clone);\n")
    } else {
        format!("{indent}object.{field} = self.clone_ref(object.{field}, clone);\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rust::tests::{context_parts, sample_schema};

    fn generated() -> String {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        CloneGenerator::new(&cx).generate().unwrap()
    }

    fn body<'s>(source: &'s str, function: &str) -> &'s str {
        let start = source.find(&format!("pub fn {function}(")).unwrap();
        let rest = &source[start..];
        &rest[..rest.find("\n    }\n").unwrap()]
    }

    #[test]
    fn test_member_policies() {
        let source = generated();
        let module = body(&source, "clone_module");
        assert!(module.contains("object.nets = self.clone_list(object.nets.as_deref(), clone);"));
        assert!(module.contains("object.expr = self.clone_ref(object.expr, clone);"));
        assert!(module.contains("// ref_modules: shared with the source"));
        assert!(module.contains("object.instance = self.rebind_target(object.instance, \"name\");"));
        assert!(module.contains("self.cx.enter_scope(clone);"));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn test_children_follow_the_copy() {
        let source = generated();
        let module = body(&source, "clone_module");
        assert!(!module.contains("children.clear()"));
        let take = module.find("let children = std::mem::take(&mut object.header.children);").unwrap();
        let members = module.find("object.nets = self.clone_list(").unwrap();
        let remap = module
            .find(".filter_map(|child| self.clone_any(child, Some(clone)))")
            .unwrap();
        let leave = module.find("self.cx.leave_scope(clone);").unwrap();
        assert!(take < members && members < remap && remap < leave);
    }

    #[test]
    fn test_uniquify_guard() {
        let source = generated();
        let net = body(&source, "generic_net");
        assert!(net.contains(
            "if self.cx.uniquify_typespecs() {\n            object.typespec = self.clone_ref(object.typespec, clone);"
        ));
        assert!(!net.contains("enter_scope"));
    }

    #[test]
    fn test_dedup_and_custom_entities() {
        let source = generated();
        let net = body(&source, "clone_net");
        assert!(net.contains("let name = self.store.net(obj)?.name.clone();"));
        assert!(net.contains("self.cx.bind_net(&name)"));
        assert!(net.contains("self.cx.record_net(&name, clone);"));

        let constant = body(&source, "clone_constant");
        assert!(constant.contains("super::custom_clone::constant(self, obj, parent)"));
        assert!(source.contains("pub fn generic_constant("));
        assert!(!source.contains("pub fn generic_module("));
    }
}
