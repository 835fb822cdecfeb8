//! Container adoption generation.
//!
//! Collector entities keep typed buckets (`nets`, `parameters`, ...) in sync
//! with their generic child list. A child is filed into a bucket when it
//! is-a the bucket's child entity; the collector tables of every ancestor of
//! the parent apply, base first.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;
use hdmgen_schema::EntityDef;
use tracing::warn;

const TEMPLATE: &str = include_str!("../../templates/containers.rs.in");

/// Emits `containers.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerAdoptionEmitter;

impl Emitter for ContainerAdoptionEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::ContainerAdoption
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        Ok(vec![Artifact::new(
            "containers.rs",
            ContainerGenerator::new(cx).generate()?,
        )])
    }
}

/// Generator for the container adoption artifact.
pub struct ContainerGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> ContainerGenerator<'a> {
    /// Creates a new container generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `containers.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate(&self) -> Result<String, CodegenError> {
        let mut added = String::new();
        let mut removed = String::new();
        for entity in self.cx.concrete() {
            added.push_str(&self.arm(entity, "file_into", true));
            removed.push_str(&self.arm(entity, "remove_from", false));
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Container adoption of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("containers.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("ADDED_ARMS", added)?
            .fill("REMOVED_ARMS", removed)?;
        template.render()
    }

    /// `(collector, child stem, bucket stem)` entries applying to objects of
    /// `entity`, base collectors first.
    fn buckets(&self, entity: &EntityDef) -> Vec<(String, String, String)> {
        let mut buckets = Vec::new();
        for level in self.cx.resolution.levels_of(entity) {
            for (child, bucket) in self.cx.policy.collector_buckets(&level.name) {
                let Some(owned) = self.cx.resolution.find_member(entity, bucket) else {
                    warn!(collector = %level.name, bucket = %bucket, "collector bucket not found");
                    continue;
                };
                buckets.push((
                    level.name.clone(),
                    self.cx.naming.type_fn_stem(child),
                    self.cx.stem(owned.member),
                ));
            }
        }
        buckets
    }

    fn arm(&self, entity: &EntityDef, action: &str, create: bool) -> String {
        let variant = self.cx.tag_variant(entity);
        let buckets = self.buckets(entity);
        if buckets.is_empty() {
            return format!("            Some({variant}) => {{}}\n");
        }

        let mut output = String::new();
        output.push_str(&format!("            Some({variant}) => {{\n"));
        output.push_str(&format!(
            "                let Some(object) = self.{}_mut(parent) else {{\n",
            self.cx.type_stem(entity)
        ));
        output.push_str("                    return;\n");
        output.push_str("                };\n");
        let mut level = String::new();
        for (collector, child, bucket) in buckets {
            if collector != level {
                output.push_str(&format!("                // {collector}\n"));
                level = collector;
            }
            output.push_str(&format!(
                "                if super::types::is_{child}(child.tag) {{\n"
            ));
            output.push_str(&format!(
                "                    {action}(object.{bucket}_mut({create}), child);\n"
            ));
            output.push_str("                }\n");
        }
        output.push_str("            }\n");
        output
    }
}
