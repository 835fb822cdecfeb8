//! Listener tracer generation.
//!
//! The tracer implements every hook of the push-style `Listener` and logs
//! one line per call, so it needs the dispatch artifacts alongside it.

use crate::emitter::{Artifact, EmitContext, Emitter, EmitterKind, banner};
use crate::error::CodegenError;
use crate::template::Template;

const TEMPLATE: &str = include_str!("../../templates/listener_tracer.rs.in");

/// Emits `listener_tracer.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracerEmitter;

impl Emitter for TracerEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Tracer
    }

    fn emit(&self, cx: &EmitContext<'_>) -> Result<Vec<Artifact>, CodegenError> {
        Ok(vec![Artifact::new(
            "listener_tracer.rs",
            TracerGenerator::new(cx).generate()?,
        )])
    }
}

/// Generator for the tracer artifact.
pub struct TracerGenerator<'a> {
    cx: &'a EmitContext<'a>,
}

impl<'a> TracerGenerator<'a> {
    /// Creates a new tracer generator.
    #[must_use]
    pub fn new(cx: &'a EmitContext<'a>) -> Self {
        Self { cx }
    }

    /// Generates `listener_tracer.rs`.
    ///
    /// # Errors
    /// Returns `CodegenError::Template` if the embedded template is stale.
    pub fn generate(&self) -> Result<String, CodegenError> {
        let mut classes = Vec::new();
        let mut hooks = String::new();
        for entity in self.cx.concrete() {
            let class = self.cx.class_name(entity);
            let stem = self.cx.type_stem(entity);
            for phase in ["enter", "leave"] {
                hooks.push_str(&format!(
                    "    fn {phase}_{stem}(&mut self, _store: &Store, _obj: ObjRef, object: &{class}, _relation: Option<&'static str>) {{\n"
                ));
                hooks.push_str(&format!(
                    "        self.{phase}(\"{phase}_{stem}\", Some(&object.header));\n"
                ));
                hooks.push_str("    }\n\n");
            }
            classes.push(class);
        }

        let mut header = String::new();
        banner(
            &mut header,
            &format!("Tracing listener of the `{}` object model.", self.cx.schema().name),
        );

        let mut template = Template::new("listener_tracer.rs", TEMPLATE);
        template
            .fill("BANNER", header)?
            .fill("CLASSES", classes.join(", "))?
            .fill("TRACER_HOOKS", hooks)?;
        template.render()
    }
}
