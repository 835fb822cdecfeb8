//! Listener dispatch generation.
//!
//! Both traversal flavors are built from the same per-entity member walk:
//! the push style reads fields straight from the store, the pull style asks
//! a [`HandleProtocol`](hdmgen_core::HandleProtocol) implementation for each
//! relation. Members the policy table excludes from traversal are skipped in
//! both.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::{EntityDef, Member, MemberOrder};

const LISTENER_TEMPLATE: &str = include_str!("../../templates/listener.rs.in");
const HANDLE_TEMPLATE: &str = include_str!("../../templates/handle_listener.rs.in");

/// Emits `listener.rs` and `handle_listener.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchEmitter;

impl Emitter for DispatchEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Dispatch
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        let generator = DispatchGenerator::new(cx);
        Ok(vec![
            Artifact::new("listener.rs", generator.generate_listener()?),
            Artifact::new("handle_listener.rs", generator.generate_handle_listener()?),
        ])
    }
}

/// Generator for the traversal artifacts.
pub struct DispatchGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> DispatchGenerator<'a> {
    /// Creates a new dispatch generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Reference members traversed from `entity`, base-first.
    fn traversed(&self, entity: &EntityDef) -> Vec<&'a Member> {
        let chain = self.cx.chain(entity);
        self.cx
            .members(entity, MemberOrder::BaseFirst)
            .into_iter()
            .map(|owned| owned.member)
            .filter(|m| m.is_reference() && !self.cx.policy.is_traversal_excluded(&chain, m))
            .collect()
    }

    /// Generates the push-style `listener.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_listener(&self) -> Result<String, CodegenError> {
        let mut classes = Vec::new();
        let mut hooks = String::new();
        let mut arms = String::new();
        let mut visit_fns = String::new();

        for entity in self.cx.concrete() {
            let class = self.cx.class_name(entity);
            let stem = self.cx.type_stem(entity);
            classes.push(class.clone());

            for phase in ["enter", "leave"] {
                hooks.push_str(&format!(
                    "    /// Called when a `{}` is {}.\n",
                    entity.name,
                    if phase == "enter" { "entered" } else { "left" }
                ));
                hooks.push_str(&format!(
                    "    fn {phase}_{stem}(&mut self, store: &Store, obj: ObjRef, object: &{class}, relation: Option<&'static str>) {{}}\n\n"
                ));
            }

            arms.push_str(&format!(
                "            Some({}) => self.visit_{stem}(obj, relation),\n",
                self.cx.tag_variant(entity)
            ));

            visit_fns.push_str(&format!(
                "    fn visit_{stem}(&mut self, obj: ObjRef, relation: Option<&'static str>) {{\n"
            ));
            visit_fns.push_str("        let store = self.store;\n");
            visit_fns.push_str(&format!(
                "        let Some(object) = store.{}(obj) else {{\n",
                self.cx.store_field(entity)
            ));
            visit_fns.push_str("            return;\n");
            visit_fns.push_str("        };\n");
            visit_fns.push_str(&format!(
                "        self.listener.enter_{stem}(store, obj, object, relation);\n"
            ));
            for member in self.traversed(entity) {
                let field = self.cx.field(member);
                let relation = &member.relation;
                if member.is_many() {
                    visit_fns.push_str(&format!(
                        "        if let Some(items) = object.{field}.as_deref() {{\n"
                    ));
                    visit_fns.push_str(&format!(
                        "            self.visit_collection(obj, \"{relation}\", items);\n"
                    ));
                } else {
                    visit_fns.push_str(&format!(
                        "        if let Some(child) = object.{field} {{\n"
                    ));
                    visit_fns.push_str(&format!(
                        "            self.visit(child, Some(\"{relation}\"));\n"
                    ));
                }
                visit_fns.push_str("        }\n");
            }
            visit_fns.push_str(&format!(
                "        self.listener.leave_{stem}(store, obj, object, relation);\n"
            ));
            visit_fns.push_str("    }\n\n");
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Push-style traversal of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("listener.rs", LISTENER_TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("CLASSES", classes.join(", "))?
            .fill("HOOKS", hooks)?
            .fill("VISIT_ARMS", arms)?
            .fill("VISIT_FNS", visit_fns)?;
        template.render()
    }

    /// Generates the pull-style `handle_listener.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_handle_listener(&self) -> Result<String, CodegenError> {
        let mut hooks = String::new();
        let mut arms = String::new();
        let mut visit_fns = String::new();

        for entity in self.cx.concrete() {
            let stem = self.cx.type_stem(entity);
            let traversed = self.traversed(entity);

            hooks.push_str(&format!(
                "    /// Called when a `{}` handle is entered.\n",
                entity.name
            ));
            hooks.push_str(&format!(
                "    fn enter_{stem}(&mut self, protocol: &P, handle: &P::Handle) {{}}\n\n"
            ));
            hooks.push_str(&format!(
                "    /// Called when a `{}` handle is left.\n",
                entity.name
            ));
            hooks.push_str(&format!(
                "    fn leave_{stem}(&mut self, protocol: &P, handle: &P::Handle) {{}}\n\n"
            ));

            arms.push_str(&format!(
                "                    Some({}) => self.visit_{stem}(obj, &handle),\n",
                self.cx.tag_variant(entity)
            ));

            let obj = if traversed.iter().any(|m| m.is_many()) {
                "obj"
            } else {
                "_obj"
            };
            visit_fns.push_str(&format!(
                "    fn visit_{stem}(&mut self, {obj}: ObjRef, handle: &P::Handle) {{\n"
            ));
            visit_fns.push_str("        let protocol = self.protocol;\n");
            visit_fns.push_str(&format!(
                "        self.listener.enter_{stem}(protocol, handle);\n"
            ));
            for member in &traversed {
                if member.is_many() {
                    visit_fns.push_str(&format!(
                        "        self.visit_collection(obj, handle, \"{}\");\n",
                        member.relation
                    ));
                } else {
                    visit_fns.push_str(&format!(
                        "        self.visit_single(handle, \"{}\");\n",
                        member.relation
                    ));
                }
            }
            visit_fns.push_str(&format!(
                "        self.listener.leave_{stem}(protocol, handle);\n"
            ));
            visit_fns.push_str("    }\n\n");
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!(
                "Handle-protocol traversal of the `{}` object model.",
                self.cx.schema().name
            ),
        );

        let mut template = Template::new("handle_listener.rs", HANDLE_TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("HOOKS", hooks)?
            .fill("VISIT_ARMS", arms)?
            .fill("VISIT_FNS", visit_fns)?;
        template.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rust::tests::{context_parts, sample_schema};

    #[test]
    fn test_listener_skips_excluded_relations() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let listener = DispatchGenerator::new(&cx).generate_listener().unwrap();

        let module = listener.split("fn visit_module(").nth(1).unwrap();
        let module = module.split("\n    }\n").next().unwrap();
        assert!(module.contains("self.visit_collection(obj, \"nets\", items);"));
        assert!(module.contains("self.visit(child, Some(\"expr\"));"));
        assert!(module.contains("\"ref_modules\""));
        assert!(!module.contains("\"instance\""));
        syn::parse_file(&listener).unwrap();
    }

    #[test]
    fn test_listener_hooks_per_type() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let listener = DispatchGenerator::new(&cx).generate_listener().unwrap();
        for stem in ["scope", "module", "net", "constant"] {
            assert!(listener.contains(&format!("fn enter_{stem}(&mut self")));
            assert!(listener.contains(&format!("fn leave_{stem}(&mut self")));
        }
        assert!(!listener.contains("fn enter_any_obj"));
        assert!(listener.contains("Some(TypeTag::Net) => self.visit_net(obj, relation),"));
    }

    #[test]
    fn test_handle_listener_uses_protocol() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let pull = DispatchGenerator::new(&cx).generate_handle_listener().unwrap();

        assert!(pull.contains("self.visit_single(handle, \"expr\");"));
        assert!(pull.contains("self.visit_collection(obj, handle, \"nets\");"));
        assert!(pull.contains("fn visit_constant(&mut self, _obj: ObjRef, handle: &P::Handle)"));
        assert!(!pull.contains("\"instance\""));
        syn::parse_file(&pull).unwrap();
    }
}
