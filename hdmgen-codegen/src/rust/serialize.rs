//! Serialization generation: the capnp wire schema and the save/restore
//! adapters targeting the code capnp generates from it.
//!
//! Each entity becomes a struct whose field `@0` is its base record (the
//! parent entity's struct, or `ObjHeader` at the root of the hierarchy),
//! followed by one field per own member. Text values travel as ids into the
//! root's symbol list. References are `(type tag, one-based index)` pairs.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::{ElementType, EntityDef, Member};

const SCHEMA_TEMPLATE: &str = include_str!("../../templates/model.capnp.in");
const ARCHIVE_TEMPLATE: &str = include_str!("../../templates/archive.rs.in");

/// Archive format version.
pub const ARCHIVE_VERSION: u32 = 1;

/// Emits `model.capnp` and `archive.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerializationEmitter;

impl Emitter for SerializationEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Serialization
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        let generator = SerializationGenerator::new(cx);
        Ok(vec![
            Artifact::new("model.capnp", generator.generate_schema()?),
            Artifact::new("archive.rs", generator.generate_archive()?),
        ])
    }
}

/// Generator for the serialization artifacts.
pub struct SerializationGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> SerializationGenerator<'a> {
    /// Creates a new serialization generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Wire-schema field name of a member.
    fn wire_name(&self, member: &Member) -> String {
        self.cx.naming.member_name(&member.name, member.cardinality)
    }

    /// Wire-schema type of a member.
    fn wire_type(member: &Member) -> String {
        match (&member.element, member.is_many()) {
            (ElementType::Scalar(kind), _) => kind.wire_type().to_string(),
            (_, false) => "ObjIndexType".to_string(),
            (_, true) => "List(ObjIndexType)".to_string(),
        }
    }

    /// Generates `model.capnp`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_schema(&self) -> Result<String, CodegenError> {
        let mut structs = String::new();
        for entity in &self.cx.schema().entities {
            let base = entity
                .base
                .as_deref()
                .map_or_else(|| "ObjHeader".to_string(), |b| self.cx.naming.class_name(b));
            structs.push_str(&format!("struct {} {{\n", self.cx.class_name(entity)));
            structs.push_str(&format!("  base @0 :{base};\n"));
            for (ordinal, member) in entity.members.iter().enumerate() {
                structs.push_str(&format!(
                    "  {} @{} :{};\n",
                    self.wire_name(member),
                    ordinal + 1,
                    Self::wire_type(member)
                ));
            }
            structs.push_str("}\n\n");
        }

        let mut factories = String::new();
        for (ordinal, entity) in self.cx.concrete().into_iter().enumerate() {
            let class = self.cx.class_name(entity);
            factories.push_str(&format!(
                "  factory{class} @{} :List({class});\n",
                ordinal + 3
            ));
        }

        let mut template = Template::new("model.capnp", SCHEMA_TEMPLATE);
        template
            .fill("SCHEMA", self.cx.schema().name.clone())?
            .fill("FILE_ID", format!("0x{:016x}", file_id(&self.cx.schema().name)))?
            .fill("STRUCTS", structs)?
            .fill("FACTORIES", factories)?;
        template.render()
    }

    /// Generates `archive.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate_archive(&self) -> Result<String, CodegenError> {
        let mut save = String::new();
        let mut allocate = String::new();
        let mut restore = String::new();
        for entity in self.cx.concrete() {
            save.push_str(&self.save_block(entity));
            let factory = capnp_snake(&format!("factory{}", self.cx.class_name(entity)));
            allocate.push_str(&format!(
                "    for _ in 0..root.get_{factory}()?.len() {{\n        store.make_{}();\n    }}\n",
                self.cx.type_stem(entity)
            ));
            restore.push_str(&self.restore_block(entity));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Archive adapters of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("archive.rs", ARCHIVE_TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("VERSION", ARCHIVE_VERSION.to_string())?
            .fill("SAVE_BLOCKS", save)?
            .fill("ALLOCATE", allocate)?
            .fill("RESTORE_BLOCKS", restore)?;
        template.render()
    }

    fn save_block(&self, entity: &EntityDef) -> String {
        let variant = self.cx.tag_variant(entity);
        let factory = capnp_snake(&format!("factory{}", self.cx.class_name(entity)));
        let mut output = String::new();
        output.push_str("    {\n");
        output.push_str(&format!("        let objects = state.objects({variant});\n"));
        output.push_str(&format!(
            "        let mut list = root.reborrow().init_{factory}(objects.len() as u32);\n"
        ));
        output.push_str("        for (i, obj) in objects.into_iter().enumerate() {\n");
        output.push_str(&format!(
            "            let Some(object) = store.{}(obj) else {{\n",
            self.cx.store_field(entity)
        ));
        output.push_str("                continue;\n");
        output.push_str("            };\n");
        output.push_str("            let builder = list.reborrow().get(i as u32);\n");

        for (depth, level) in self.cx.chain(entity).into_iter().enumerate() {
            if depth == 0 {
                output.push_str(&format!("            // {}\n", level.name));
                output.push_str("            let mut builder = builder;\n");
            } else {
                output.push_str(&format!("            // {}\n", level.name));
                output.push_str("            let mut builder = builder.init_base();\n");
            }
            for member in &level.members {
                output.push_str(&self.save_member(member));
            }
        }
        output.push_str("            state.put_header(builder.init_base(), &object.header);\n");
        output.push_str("        }\n");
        output.push_str("    }\n");
        output
    }

    fn save_member(&self, member: &Member) -> String {
        let field = self.cx.field(member);
        let wire = capnp_snake(&self.wire_name(member));
        match (&member.element, member.is_many()) {
            (ElementType::Scalar(kind), _) if kind.is_symbol() => format!(
                "            builder.set_{wire}(state.symbol(&object.{field}));\n"
            ),
            (ElementType::Scalar(_), _) => {
                format!("            builder.set_{wire}(object.{field});\n")
            }
            (_, false) => format!(
                "            state.put_ref(builder.reborrow().init_{wire}(), object.{field});\n"
            ),
            (_, true) => {
                let mut output = format!(
                    "            if let Some(items) = &object.{field} {{\n"
                );
                output.push_str(&format!(
                    "                let mut refs = builder.reborrow().init_{wire}(items.len() as u32);\n"
                ));
                output.push_str("                for (k, &item) in items.iter().enumerate() {\n");
                output.push_str(
                    "                    state.put_ref(refs.reborrow().get(k as u32), Some(item));\n",
                );
                output.push_str("                }\n");
                output.push_str("            }\n");
                output
            }
        }
    }

    fn restore_block(&self, entity: &EntityDef) -> String {
        let factory = capnp_snake(&format!("factory{}", self.cx.class_name(entity)));
        let mut output = String::new();
        output.push_str(&format!(
            "    for (i, reader) in root.get_{factory}()?.iter().enumerate() {{\n"
        ));
        output.push_str(&format!(
            "        let obj = ObjRef::new({}.ordinal(), i as u32);\n",
            self.cx.tag_variant(entity)
        ));
        output.push_str(&format!(
            "        let Some(object) = store.{}_mut(obj) else {{\n",
            self.cx.type_stem(entity)
        ));
        output.push_str("            continue;\n");
        output.push_str("        };\n");
        for (depth, level) in self.cx.chain(entity).into_iter().enumerate() {
            output.push_str(&format!("        // {}\n", level.name));
            if depth > 0 {
                output.push_str("        let reader = reader.get_base()?;\n");
            }
            for member in &level.members {
                output.push_str(&self.restore_member(member));
            }
        }
        output.push_str("        get_header(&mut object.header, reader.get_base()?, &symbol)?;\n");
        output.push_str("    }\n");
        output
    }

    fn restore_member(&self, member: &Member) -> String {
        let field = self.cx.field(member);
        let wire = capnp_snake(&self.wire_name(member));
        match (&member.element, member.is_many()) {
            (ElementType::Scalar(kind), _) if kind.is_symbol() => {
                format!("        object.{field} = symbol(reader.get_{wire}());\n")
            }
            (ElementType::Scalar(_), _) => {
                format!("        object.{field} = reader.get_{wire}();\n")
            }
            (_, false) => {
                format!("        object.{field} = get_ref(reader.get_{wire}()?);\n")
            }
            (_, true) => {
                let mut output = format!("        object.{field} = if reader.has_{wire}() {{\n");
                output.push_str(&format!(
                    "            Some(reader.get_{wire}()?.iter().filter_map(get_ref).collect())\n"
                ));
                output.push_str("        } else {\n");
                output.push_str("            None\n");
                output.push_str("        };\n");
                output
            }
        }
    }
}

/// Method stem capnp derives from a camel-case name: every upper-case
/// letter after the first character starts a new word.
fn capnp_snake(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, ch) in camel.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Stable 64-bit capnp file id derived from the schema name (FNV-1a with
/// the top bit set, as capnp requires).
fn file_id(name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash | (1 << 63)
}
