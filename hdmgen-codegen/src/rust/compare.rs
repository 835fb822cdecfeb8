//! Structural comparison generation.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::EntityDef;

const TEMPLATE: &str = include_str!("../../templates/compare.rs.in");

/// Emits `compare.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompareEmitter;

impl Emitter for CompareEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Compare
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        Ok(vec![Artifact::new("compare.rs", CompareGenerator::new(cx).generate()?)])
    }
}

/// Generator for the comparison artifact.
pub struct CompareGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> CompareGenerator<'a> {
    /// Creates a new compare generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `compare.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate(&self) -> Result<String, CodegenError> {
        let mut arms = String::new();
        let mut fns = String::new();
        for entity in self.cx.concrete() {
            arms.push_str(&format!(
                "        Some({}) => compare_{}(ls, lhs, rs, rhs, cx),\n",
                self.cx.tag_variant(entity),
                self.cx.type_stem(entity)
            ));
            fns.push_str(&self.generate_entity(entity));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Structural comparison of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("compare.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("COMPARE_ARMS", arms)?
            .fill("COMPARE_FNS", fns)?;
        template.render()
    }

    /// Per-level member comparisons: inherited levels first, scalars before
    /// references within a level.
    fn comparisons(&self, entity: &EntityDef) -> String {
        let mut output = String::new();
        for level in self.cx.resolution.levels_of(entity) {
            let compared: Vec<_> = level
                .members
                .iter()
                .filter(|m| !self.cx.policy.is_compare_excluded(m))
                .collect();
            if compared.is_empty() {
                continue;
            }
            output.push_str(&format!("    // {}\n", level.name));
            let (scalars, refs): (Vec<_>, Vec<_>) =
                compared.into_iter().partition(|m| !m.is_reference());
            for member in scalars {
                let field = self.cx.field(member);
                output.push_str(&format!("    let ord = l.{field}.cmp(&r.{field});\n"));
                output.push_str("    if ord != Ordering::Equal {\n");
                output.push_str("        return cx.fail(lhs, rhs, ord);\n");
                output.push_str("    }\n");
            }
            for member in refs {
                let field = self.cx.field(member);
                if member.is_many() {
                    output.push_str(&format!(
                        "    let ord = compare_refs(ls, l.{field}.as_deref(), rs, r.{field}.as_deref(), cx);\n"
                    ));
                } else {
                    output.push_str(&format!(
                        "    let ord = compare_ref(ls, l.{field}, rs, r.{field}, cx);\n"
                    ));
                }
                output.push_str("    if ord != Ordering::Equal {\n");
                output.push_str("        return cx.fail(lhs, rhs, ord);\n");
                output.push_str("    }\n");
            }
        }
        output
    }

    fn generate_entity(&self, entity: &EntityDef) -> String {
        let stem = self.cx.type_stem(entity);
        let store = self.cx.store_field(entity);
        let comparisons = self.comparisons(entity);
        let bindings = if comparisons.is_empty() {
            "(Some(_), Some(_))"
        } else {
            "(Some(l), Some(r))"
        };

        let mut output = String::new();
        output.push_str(&format!("/// Compares two `{}` objects.\n", entity.name));
        output.push_str(&format!(
            "pub fn compare_{stem}(ls: &Store, lhs: ObjRef, rs: &Store, rhs: ObjRef, cx: &mut CompareContext) -> Ordering {{\n"
        ));
        output.push_str(&format!(
            "    let {bindings} = (ls.{store}(lhs), rs.{store}(rhs)) else {{\n"
        ));
        output.push_str(&format!(
            "        let present = ls.{store}(lhs).is_some().cmp(&rs.{store}(rhs).is_some());\n"
        ));
        output.push_str("        return cx.fail(lhs, rhs, present);\n");
        output.push_str("    };\n");
        output.push_str(&comparisons);
        output.push_str("    Ordering::Equal\n");
        output.push_str("}\n\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rust::tests::{context_parts, sample_schema};

    #[test]
    fn test_compare_order_and_blacklist() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let source = CompareGenerator::new(&cx).generate().unwrap();

        let start = source.find("pub fn compare_module(").unwrap();
        let module = &source[start..];
        let module = &module[..module.find("\n}\n").unwrap()];

        let name = module.find("l.name.cmp(&r.name)").unwrap();
        let nets = module.find("l.nets.as_deref()").unwrap();
        let expr = module.find("compare_ref(ls, l.expr, rs, r.expr, cx)").unwrap();
        assert!(name < nets && nets < expr);
        assert!(!module.contains("def_name"));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn test_tag_short_circuit() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let source = CompareGenerator::new(&cx).generate().unwrap();
        let any = source.find("if lhs.tag != rhs.tag").unwrap();
        let enter = source.find("if !cx.enter(lhs, rhs)").unwrap();
        assert!(any < enter);
        assert!(source.contains("Some(TypeTag::Constant) => compare_constant(ls, lhs, rs, rhs, cx),"));
    }

    #[test]
    fn test_list_length_before_elements() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let source = CompareGenerator::new(&cx).generate().unwrap();

        let start = source.find("pub fn compare_refs(").unwrap();
        let body = &source[start..];
        let body = &body[..body.find("\n}\n").unwrap()];
        assert!(body.contains("let l = lhs.unwrap_or(&[]);"));
        assert!(body.contains("let r = rhs.unwrap_or(&[]);"));
        let length = body.find("if l.len() != r.len()").unwrap();
        let elements = body.find("compare_any(ls, a, rs, b, cx)").unwrap();
        assert!(length < elements);
        assert!(!body.contains("is_some()"));
    }
}
