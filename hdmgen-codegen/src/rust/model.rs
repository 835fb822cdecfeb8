//! Object model generation: one struct per concrete entity, the arena store
//! and the group membership predicates.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::{EntityDef, MemberKind, MemberOrder, OwnedMember};

const STORE_TEMPLATE: &str = include_str!("../../templates/store.rs.in");

/// Emits `objects.rs`, `store.rs` and `groups.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelEmitter;

impl Emitter for ModelEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Model
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        let generator = ModelGenerator::new(cx);
        Ok(vec![
            Artifact::new("objects.rs", generator.generate_objects()),
            Artifact::new("store.rs", generator.generate_store()?),
            Artifact::new("groups.rs", generator.generate_groups()?),
        ])
    }
}

/// Generator for the object model artifacts.
pub struct ModelGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> ModelGenerator<'a> {
    /// Creates a new model generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `objects.rs`.
    #[must_use]
    pub fn generate_objects(&self) -> String {
        let mut output = String::new();
        banner(
            &mut output,
            &format!("Object types of the `{}` object model.", self.cx.schema().name),
        );
        output.push_str("#![allow(clippy::too_many_lines)]\n\n");
        output.push_str("use super::types::TypeTag;\n");
        output.push_str("use hdmgen_core::{ObjRef, ObjectHeader};\n\n");

        for entity in self.cx.concrete() {
            output.push_str(&self.generate_struct(entity));
        }
        output
    }

    fn generate_struct(&self, entity: &EntityDef) -> String {
        let mut output = String::new();
        let class = self.cx.class_name(entity);
        let members = self.cx.members(entity, MemberOrder::BaseFirst);

        output.push_str(&format!("/// `{}` object.\n", entity.name));
        output.push_str("#[derive(Debug, Clone, Default)]\n");
        output.push_str(&format!("pub struct {class} {{\n"));
        output.push_str("    pub(crate) header: ObjectHeader,\n");
        for owned in &members {
            if owned.owner.name != entity.name {
                output.push_str(&format!(
                    "    /// `{}` (from `{}`)\n",
                    owned.member.name, owned.owner.name
                ));
            }
            output.push_str(&format!(
                "    pub(crate) {}: {},\n",
                self.cx.field(owned.member),
                self.cx.field_type(owned.member)
            ));
        }
        output.push_str("}\n\n");

        output.push_str(&format!("impl {class} {{\n"));
        output.push_str("    /// Type tag of this type.\n");
        output.push_str(&format!(
            "    pub const TAG: TypeTag = {};\n\n",
            self.cx.tag_variant(entity)
        ));
        output.push_str("    /// Base record.\n");
        output.push_str("    #[must_use]\n");
        output.push_str("    pub fn header(&self) -> &ObjectHeader {\n");
        output.push_str("        &self.header\n");
        output.push_str("    }\n\n");
        output.push_str("    /// Mutable base record.\n");
        output.push_str("    pub fn header_mut(&mut self) -> &mut ObjectHeader {\n");
        output.push_str("        &mut self.header\n");
        output.push_str("    }\n\n");

        // An explicit `type` member takes the accessor over.
        if !self.cx.resolution.declares_type_member(entity) {
            output.push_str("    /// Type discriminant.\n");
            output.push_str("    #[must_use]\n");
            output.push_str("    pub const fn type_tag(&self) -> TypeTag {\n");
            output.push_str("        Self::TAG\n");
            output.push_str("    }\n\n");
        }

        for owned in &members {
            output.push_str(&self.generate_accessors(owned));
        }
        output.push_str("}\n\n");
        output
    }

    fn generate_accessors(&self, owned: &OwnedMember<'_>) -> String {
        let mut output = String::new();
        let member = owned.member;
        let field = self.cx.field(member);
        let stem = self.cx.stem(member);

        match member.kind {
            MemberKind::ScalarProperty => {
                let ty = self.cx.field_type(member);
                if ty == "String" {
                    output.push_str("    #[must_use]\n");
                    output.push_str(&format!("    pub fn {field}(&self) -> &str {{\n"));
                    output.push_str(&format!("        &self.{field}\n"));
                    output.push_str("    }\n\n");
                    output.push_str(&format!(
                        "    pub fn set_{stem}(&mut self, value: impl Into<String>) -> bool {{\n"
                    ));
                    output.push_str(&format!("        self.{field} = value.into();\n"));
                } else {
                    output.push_str("    #[must_use]\n");
                    output.push_str(&format!("    pub fn {field}(&self) -> {ty} {{\n"));
                    output.push_str(&format!("        self.{field}\n"));
                    output.push_str("    }\n\n");
                    output.push_str(&format!(
                        "    pub fn set_{stem}(&mut self, value: {ty}) -> bool {{\n"
                    ));
                    output.push_str(&format!("        self.{field} = value;\n"));
                }
                output.push_str("        true\n");
                output.push_str("    }\n\n");
            }
            MemberKind::SingleObjectRef | MemberKind::SingleUnionRef => {
                let check = self.cx.target_predicate(member).unwrap_or_default();
                output.push_str("    #[must_use]\n");
                output.push_str(&format!("    pub fn {field}(&self) -> Option<ObjRef> {{\n"));
                output.push_str(&format!("        self.{field}\n"));
                output.push_str("    }\n\n");
                output.push_str(&format!(
                    "    /// Sets `{}`; rejects objects that are not a `{}`.\n",
                    member.name,
                    member.target().unwrap_or_default()
                ));
                output.push_str(&format!(
                    "    pub fn set_{stem}(&mut self, value: Option<ObjRef>) -> bool {{\n"
                ));
                output.push_str(&format!(
                    "        if value.is_some_and(|r| !{check}(r.tag)) {{\n"
                ));
                output.push_str("            return false;\n");
                output.push_str("        }\n");
                output.push_str(&format!("        self.{field} = value;\n"));
                output.push_str("        true\n");
                output.push_str("    }\n\n");
            }
            MemberKind::ManyObjectRef | MemberKind::ManyUnionRef => {
                let check = self.cx.target_predicate(member).unwrap_or_default();
                output.push_str("    #[must_use]\n");
                output.push_str(&format!("    pub fn {field}(&self) -> Option<&[ObjRef]> {{\n"));
                output.push_str(&format!("        self.{field}.as_deref()\n"));
                output.push_str("    }\n\n");
                output.push_str(&format!(
                    "    /// Sets `{}`; rejects lists holding an object that is not a `{}`.\n",
                    member.name,
                    member.target().unwrap_or_default()
                ));
                output.push_str(&format!(
                    "    pub fn set_{stem}(&mut self, value: Option<Vec<ObjRef>>) -> bool {{\n"
                ));
                output.push_str("        if value\n");
                output.push_str("            .as_ref()\n");
                output.push_str(&format!(
                    "            .is_some_and(|items| items.iter().any(|r| !{check}(r.tag)))\n"
                ));
                output.push_str("        {\n");
                output.push_str("            return false;\n");
                output.push_str("        }\n");
                output.push_str(&format!("        self.{field} = value;\n"));
                output.push_str("        true\n");
                output.push_str("    }\n\n");
                output.push_str(&format!(
                    "    /// Mutable `{}` list, created empty when `create` is set.\n",
                    member.name
                ));
                output.push_str(&format!(
                    "    pub fn {stem}_mut(&mut self, create: bool) -> Option<&mut Vec<ObjRef>> {{\n"
                ));
                output.push_str(&format!("        if create && self.{field}.is_none() {{\n"));
                output.push_str(&format!("            self.{field} = Some(Vec::new());\n"));
                output.push_str("        }\n");
                output.push_str(&format!("        self.{field}.as_mut()\n"));
                output.push_str("    }\n\n");
            }
        }
        output
    }

    /// Generates `store.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_store(&self) -> Result<String, CodegenError> {
        let concrete = self.cx.concrete();
        let mut classes = Vec::new();
        let mut fields = String::new();
        let mut accessors = String::new();
        let mut make_arms = String::new();
        let mut count_arms = String::new();
        let mut header_arms = String::new();
        let mut header_mut_arms = String::new();
        let mut reference_arms = String::new();
        let mut text_arms = String::new();

        for entity in &concrete {
            let class = self.cx.class_name(entity);
            let variant = self.cx.tag_variant(entity);
            let stem = self.cx.type_stem(entity);
            let store = self.cx.store_field(entity);
            classes.push(class.clone());

            fields.push_str(&format!("    {store}: Vec<{class}>,\n"));

            accessors.push_str(&format!("    /// Allocates a `{}` object.\n", entity.name));
            accessors.push_str(&format!("    pub fn make_{stem}(&mut self) -> ObjRef {{\n"));
            accessors.push_str(&format!(
                "        let obj = ObjRef::new({variant}.ordinal(), self.{store}.len() as u32);\n"
            ));
            accessors.push_str("        let id = self.next_id();\n");
            accessors.push_str(&format!("        self.{store}.push({class} {{\n"));
            accessors.push_str("            header: ObjectHeader::with_id(id),\n");
            accessors.push_str("            ..Default::default()\n");
            accessors.push_str("        });\n");
            accessors.push_str("        obj\n");
            accessors.push_str("    }\n\n");

            accessors.push_str("    #[must_use]\n");
            accessors.push_str(&format!(
                "    pub fn {store}(&self, obj: ObjRef) -> Option<&{class}> {{\n"
            ));
            accessors.push_str(&format!("        if obj.tag != {variant}.ordinal() {{\n"));
            accessors.push_str("            return None;\n");
            accessors.push_str("        }\n");
            accessors.push_str(&format!("        self.{store}.get(obj.index as usize)\n"));
            accessors.push_str("    }\n\n");

            accessors.push_str(&format!(
                "    pub fn {stem}_mut(&mut self, obj: ObjRef) -> Option<&mut {class}> {{\n"
            ));
            accessors.push_str(&format!("        if obj.tag != {variant}.ordinal() {{\n"));
            accessors.push_str("            return None;\n");
            accessors.push_str("        }\n");
            accessors.push_str(&format!("        self.{store}.get_mut(obj.index as usize)\n"));
            accessors.push_str("    }\n\n");

            make_arms.push_str(&format!("            {variant} => self.make_{stem}(),\n"));
            count_arms.push_str(&format!("            {variant} => self.{store}.len(),\n"));
            header_arms.push_str(&format!(
                "            {variant} => self.{store}.get(index).map(|o| &o.header),\n"
            ));
            header_mut_arms.push_str(&format!(
                "            {variant} => self.{store}.get_mut(index).map(|o| &mut o.header),\n"
            ));

            reference_arms.push_str(&self.reference_arm(entity));
            text_arms.push_str(&self.text_arm(entity));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Object store of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("store.rs", STORE_TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("CLASSES", classes.join(", "))?
            .fill("FIELDS", fields)?
            .fill("ACCESSORS", accessors)?
            .fill("MAKE_ARMS", make_arms)?
            .fill("COUNT_ARMS", count_arms)?
            .fill("HEADER_ARMS", header_arms)?
            .fill("HEADER_MUT_ARMS", header_mut_arms)?
            .fill("REFERENCE_ARMS", reference_arms)?
            .fill("TEXT_ARMS", text_arms)?;
        template.render()
    }

    fn reference_arm(&self, entity: &EntityDef) -> String {
        let variant = self.cx.tag_variant(entity);
        let refs: Vec<_> = self
            .cx
            .members(entity, MemberOrder::BaseFirst)
            .into_iter()
            .filter(|m| m.member.is_reference())
            .collect();
        if refs.is_empty() {
            return format!("            Some({variant}) => {{}}\n");
        }

        let mut output = String::new();
        output.push_str(&format!("            Some({variant}) => {{\n"));
        output.push_str(&format!(
            "                if let Some(object) = self.{}.get(index) {{\n",
            self.cx.store_field(entity)
        ));
        for owned in refs {
            let field = self.cx.field(owned.member);
            let relation = &owned.member.relation;
            if owned.member.is_many() {
                output.push_str(&format!(
                    "                    if let Some(items) = &object.{field} {{\n"
                ));
                output.push_str(&format!(
                    "                        refs.extend(items.iter().map(|&r| (\"{relation}\", r)));\n"
                ));
                output.push_str("                    }\n");
            } else {
                output.push_str(&format!(
                    "                    refs.extend(object.{field}.map(|r| (\"{relation}\", r)));\n"
                ));
            }
        }
        output.push_str("                }\n");
        output.push_str("            }\n");
        output
    }

    fn text_arm(&self, entity: &EntityDef) -> String {
        let variant = self.cx.tag_variant(entity);
        let texts: Vec<_> = self
            .cx
            .members(entity, MemberOrder::BaseFirst)
            .into_iter()
            .filter(|m| m.member.scalar_kind().is_some_and(|k| k.rust_type() == "String"))
            .collect();
        if texts.is_empty() {
            return format!("            {variant} => None,\n");
        }

        let mut output = String::new();
        output.push_str(&format!("            {variant} => {{\n"));
        output.push_str(&format!(
            "                let object = self.{}.get(index)?;\n",
            self.cx.store_field(entity)
        ));
        output.push_str("                match member {\n");
        for owned in texts {
            output.push_str(&format!(
                "                    \"{}\" => Some(object.{}.as_str()),\n",
                owned.member.name,
                self.cx.field(owned.member)
            ));
        }
        output.push_str("                    _ => None,\n");
        output.push_str("                }\n");
        output.push_str("            }\n");
        output
    }

    /// Generates `groups.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Schema` if a group closure is missing.
    pub fn generate_groups(&self) -> Result<String, CodegenError> {
        let mut output = String::new();
        banner(
            &mut output,
            &format!("Group membership of the `{}` object model.", self.cx.schema().name),
        );

        for group in &self.cx.schema().groups {
            let mut tags = Vec::new();
            for name in self.cx.resolution.group_closure(&group.name)? {
                tags.push(self.cx.resolution.entity(name)?.tag);
            }
            tags.sort_unstable();

            output.push_str(&format!(
                "/// Returns true if objects tagged `tag` may appear where `{}` is expected.\n",
                group.name
            ));
            output.push_str("#[must_use]\n");
            output.push_str(&format!(
                "pub const fn is_{}(tag: u32) -> bool {{\n",
                self.cx.group_stem(group)
            ));
            output.push_str(&format!("    {}\n", super::or_pattern("tag", &tags)));
            output.push_str("}\n\n");
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rust::tests::{context_parts, sample_schema};

    #[test]
    fn test_objects_flatten_inherited_members() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let objects = ModelGenerator::new(&cx).generate_objects();

        let module = objects
            .split("pub struct Module {")
            .nth(1)
            .and_then(|s| s.split("}\n").next())
            .unwrap();
        let name = module.find("pub(crate) name: String").unwrap();
        let nets = module.find("pub(crate) nets: Option<Vec<ObjRef>>").unwrap();
        let expr = module.find("pub(crate) expr: Option<ObjRef>").unwrap();
        assert!(name < nets && nets < expr);
        syn::parse_file(&objects).unwrap();
    }

    #[test]
    fn test_type_accessor_suppressed_by_explicit_member() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let objects = ModelGenerator::new(&cx).generate_objects();

        let net = objects.split("impl Net {").nth(1).unwrap();
        let net = net.split("\nimpl ").next().unwrap();
        assert!(!net.contains("fn type_tag"));
        assert!(net.contains("pub fn r#type(&self) -> i32"));
        assert!(net.contains("pub fn set_type(&mut self, value: i32) -> bool"));

        let module = objects.split("impl Module {").nth(1).unwrap();
        assert!(module.contains("pub const fn type_tag(&self) -> TypeTag"));
    }

    #[test]
    fn test_setters_check_group_compliance() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let objects = ModelGenerator::new(&cx).generate_objects();
        assert!(objects.contains("value.is_some_and(|r| !super::groups::is_exprs(r.tag))"));
        assert!(objects.contains("items.iter().any(|r| !super::types::is_net(r.tag))"));
        assert!(objects.contains("pub fn nets_mut(&mut self, create: bool)"));
    }

    #[test]
    fn test_store_and_groups_parse() {
        let (resolution, naming, policy) = context_parts(sample_schema());
        let cx = EmitContext::new(&resolution, &naming, &policy);
        let generator = ModelGenerator::new(&cx);

        let store = generator.generate_store().unwrap();
        assert!(store.contains("pub fn make_module(&mut self) -> ObjRef"));
        assert!(!store.contains("TypeTag::Constant => None,"));
        assert!(store.contains("\"value\" => Some(object.value.as_str()),"));
        assert!(store.contains("refs.extend(object.expr.map(|r| (\"expr\", r)));"));
        syn::parse_file(&store).unwrap();

        let groups = generator.generate_groups().unwrap();
        assert!(groups.contains("pub const fn is_exprs(tag: u32) -> bool {\n    matches!(tag, 3 | 4)\n}"));
        syn::parse_file(&groups).unwrap();
    }
}
