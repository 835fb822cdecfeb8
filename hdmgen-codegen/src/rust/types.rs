//! Type table generation: type tags, name tables, is-a predicates and the
//! forward-declaration table.

use super::or_pattern;
use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;

const TEMPLATE: &str = include_str!("../../templates/types.rs.in");

/// Emits `types.rs` and `forward.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeTableEmitter;

impl Emitter for TypeTableEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::TypeTable
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        let generator = TypeTableGenerator::new(cx);
        Ok(vec![
            Artifact::new("types.rs", generator.generate_types()?),
            Artifact::new("forward.rs", generator.generate_forward()),
        ])
    }
}

/// Generator for the type table artifacts.
pub struct TypeTableGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> TypeTableGenerator<'a> {
    /// Creates a new type table generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `types.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_types(&self) -> Result<String, CodegenError> {
        let concrete = self.cx.concrete();
        let mut variants = String::new();
        let mut all = String::new();
        let mut from_arms = String::new();
        let mut name_arms = String::new();
        let mut names = String::new();

        for entity in &concrete {
            let class = self.cx.class_name(entity);
            variants.push_str(&format!("    /// `{}`\n", entity.name));
            variants.push_str(&format!("    {} = {},\n", class, entity.tag));
            all.push_str(&format!("        Self::{class},\n"));
            from_arms.push_str(&format!(
                "            {} => Some(Self::{}),\n",
                entity.tag, class
            ));
            name_arms.push_str(&format!(
                "            Self::{} => \"{}\",\n",
                class, entity.name
            ));
            names.push_str(&format!("    ({}, \"{}\"),\n", entity.tag, entity.name));
        }

        let mut header = String::new();
        banner(&mut header, &format!("Type tags of the `{}` object model.", self.cx.schema().name));

        let mut template = Template::new("types.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("VARIANTS", variants)?
            .fill("COUNT", concrete.len().to_string())?
            .fill("ALL_TAGS", all)?
            .fill("FROM_ARMS", from_arms)?
            .fill("NAME_ARMS", name_arms)?
            .fill("TYPE_NAMES", names)?
            .fill("PREDICATES", self.generate_predicates())?;
        template.render()
    }

    /// Generates one is-a predicate per entity, abstract ones included.
    fn generate_predicates(&self) -> String {
        let mut output = String::new();
        for entity in &self.cx.schema().entities {
            let tags = self.cx.resolution.is_a_tags(entity);
            output.push_str(&format!(
                "/// Returns true if objects tagged `tag` are-a `{}`.\n",
                entity.name
            ));
            output.push_str("#[must_use]\n");
            output.push_str(&format!(
                "pub const fn is_{}(tag: u32) -> bool {{\n",
                self.cx.type_stem(entity)
            ));
            output.push_str(&format!("    {}\n", or_pattern("tag", tags)));
            output.push_str("}\n\n");
        }
        output
    }

    /// Generates `forward.rs`: the object types re-exported in one place and
    /// the tag to class-name table.
    #[must_use]
    pub fn generate_forward(&self) -> String {
        let concrete = self.cx.concrete();
        let mut output = String::new();
        banner(
            &mut output,
            &format!("Forward declarations of the `{}` object model.", self.cx.schema().name),
        );

        if !concrete.is_empty() {
            output.push_str("pub use super::objects::{\n");
            for entity in &concrete {
                output.push_str(&format!("    {},\n", self.cx.class_name(entity)));
            }
            output.push_str("};\n");
        }
        output.push_str("use super::types::TypeTag;\n\n");

        output.push_str("/// Class name of every type, in declaration order.\n");
        output.push_str(&format!(
            "pub const CLASS_NAMES: [(TypeTag, &str); {}] = [\n",
            concrete.len()
        ));
        for entity in &concrete {
            let class = self.cx.class_name(entity);
            output.push_str(&format!("    (TypeTag::{class}, \"{class}\"),\n"));
        }
        output.push_str("];\n");
        output
    }
}
