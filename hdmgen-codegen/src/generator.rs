//! Generation driver.
//!
//! The driver validates the schema under the chosen naming engine, checks
//! the policy table against it, resolves the hierarchy once and runs the
//! selected emitters over the shared, read-only context, concurrently on
//! the rayon pool unless configured otherwise.

use crate::emitter::{Artifact, EmitContext, EmitterKind, banner};
use crate::error::CodegenError;
use crate::output::{OutputWriter, WriteOutcome};
use crate::rust::emitter_for;
use hdmgen_schema::{
    EntityClone, NamingEngine, PolicyTable, ResolutionContext, Schema, validate_schema,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name of the generated module root file.
pub const MODULE_FILE: &str = "mod.rs";

/// Result of one emitter.
#[derive(Debug, Clone)]
pub struct EmitterReport {
    /// Which emitter ran.
    pub kind: EmitterKind,
    /// Produced artifacts, or the error message.
    pub outcome: Result<Vec<Artifact>, String>,
}

impl EmitterReport {
    /// Returns true if the emitter succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Artifacts of a successful emitter; empty on failure.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        self.outcome.as_deref().unwrap_or_default()
    }

    /// Error message of a failed emitter.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }
}

/// Builder for [`Generator`].
#[derive(Debug, Clone)]
pub struct GeneratorBuilder {
    parallel: bool,
    naming: NamingEngine,
    policy: PolicyTable,
    only: Option<Vec<EmitterKind>>,
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self {
            parallel: true,
            naming: NamingEngine::default(),
            policy: PolicyTable::default(),
            only: None,
        }
    }
}

impl GeneratorBuilder {
    /// Creates a builder with default settings: parallel, default naming,
    /// empty policy table, every emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs emitters concurrently (default) or one after another.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the naming engine.
    #[must_use]
    pub fn naming(mut self, naming: NamingEngine) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the policy table.
    #[must_use]
    pub fn policy(mut self, policy: PolicyTable) -> Self {
        self.policy = policy;
        self
    }

    /// Restricts the run to the given emitters.
    #[must_use]
    pub fn only(mut self, kinds: &[EmitterKind]) -> Self {
        self.only = Some(kinds.to_vec());
        self
    }

    /// Validates `schema` and the policy table and resolves the hierarchy.
    ///
    /// # Errors
    /// Returns `CodegenError::Schema` for naming collisions under the chosen
    /// naming engine, stale policy entries or resolution failures.
    pub fn build(self, schema: &Schema) -> Result<Generator, CodegenError> {
        validate_schema(schema, &self.naming)?;
        self.policy.check(schema)?;
        let resolution = ResolutionContext::new(Arc::new(schema.clone()))?;

        let kinds: Vec<EmitterKind> = match self.only {
            Some(only) => only
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            None => EmitterKind::ALL.to_vec(),
        };
        debug!(schema = %schema.name, emitters = kinds.len(), "generator ready");

        Ok(Generator {
            resolution,
            naming: self.naming,
            policy: self.policy,
            kinds,
            parallel: self.parallel,
        })
    }
}

/// Runs emitters over one resolved schema.
#[derive(Debug)]
pub struct Generator {
    resolution: ResolutionContext,
    naming: NamingEngine,
    policy: PolicyTable,
    kinds: Vec<EmitterKind>,
    parallel: bool,
}

impl Generator {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::new()
    }

    /// The resolved schema views.
    #[must_use]
    pub fn resolution(&self) -> &ResolutionContext {
        &self.resolution
    }

    /// Emitters this generator runs, in report order.
    #[must_use]
    pub fn kinds(&self) -> &[EmitterKind] {
        &self.kinds
    }

    /// Runs every selected emitter.
    ///
    /// # Errors
    /// Returns `CodegenError::Emitters` if any emitter failed; the error
    /// carries the reports of all emitters. Returns
    /// `CodegenError::Generation` if two emitters produce the same path.
    pub fn run(&self) -> Result<GenerationOutput, CodegenError> {
        let cx = EmitContext::new(&self.resolution, &self.naming, &self.policy);
        let schema = &self.resolution.schema().name;
        info!(
            schema = %schema,
            emitters = self.kinds.len(),
            parallel = self.parallel,
            "generation started"
        );

        let run_one = |kind: &EmitterKind| -> EmitterReport {
            debug!(emitter = %kind, "emitter started");
            let outcome = emitter_for(*kind).emit(&cx).map_err(|e| e.to_string());
            match &outcome {
                Ok(artifacts) => {
                    debug!(emitter = %kind, artifacts = artifacts.len(), "emitter finished");
                }
                Err(e) => warn!(emitter = %kind, error = %e, "emitter failed"),
            }
            EmitterReport {
                kind: *kind,
                outcome,
            }
        };

        let reports: Vec<EmitterReport> = if self.parallel {
            self.kinds.par_iter().map(run_one).collect()
        } else {
            self.kinds.iter().map(run_one).collect()
        };

        let failed: Vec<&str> = reports
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.kind.name())
            .collect();
        if !failed.is_empty() {
            let failed = failed.join(", ");
            error!(schema = %schema, failed = %failed, "generation failed");
            return Err(CodegenError::Emitters { failed, reports });
        }

        let mut artifacts: Vec<Artifact> = reports
            .iter()
            .flat_map(|r| r.artifacts().iter().cloned())
            .collect();
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        if let Some(pair) = artifacts.windows(2).find(|w| w[0].path == w[1].path) {
            return Err(CodegenError::generation(format!(
                "artifact {} produced twice",
                pair[0].path.display()
            )));
        }
        if !artifacts.is_empty() {
            let module = Artifact::new(MODULE_FILE, self.module_file(&artifacts));
            let at = artifacts.partition_point(|a| a.path < module.path);
            artifacts.insert(at, module);
        }

        info!(schema = %schema, artifacts = artifacts.len(), "generation finished");
        Ok(GenerationOutput { artifacts, reports })
    }

    /// Root module declaring every generated Rust file.
    fn module_file(&self, artifacts: &[Artifact]) -> String {
        let schema = self.resolution.schema();
        let mut output = String::new();
        banner(&mut output, &format!("The `{}` object model.", schema.name));

        for artifact in artifacts {
            if let Some(module) = artifact.rust_module() {
                output.push_str(&format!("pub mod {module};\n"));
            }
        }

        let has_clone = artifacts.iter().any(|a| a.rust_module() == Some("clone"));
        let has_custom = schema.concrete_entities().any(|entity| {
            let chain = self.resolution.ancestors_of(entity);
            matches!(self.policy.entity_clone(&chain), EntityClone::Custom(_))
        });
        if has_clone && has_custom {
            output.push_str("\n// Hand-written clone bodies.\n");
            output.push_str("mod custom_clone;\n");
        }

        if artifacts.iter().any(|a| a.path.extension().is_some_and(|e| e == "capnp")) {
            output.push_str("\n/// Code generated by capnp from `model.capnp`.\n");
            output.push_str("pub mod model_capnp {\n");
            output.push_str("    #![allow(clippy::all, missing_docs)]\n");
            output.push_str("    include!(concat!(env!(\"OUT_DIR\"), \"/model_capnp.rs\"));\n");
            output.push_str("}\n");
        }
        output
    }
}

/// Artifacts of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    artifacts: Vec<Artifact>,
    reports: Vec<EmitterReport>,
}

impl GenerationOutput {
    /// Every artifact, sorted by path, module root included.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Per-emitter reports, in report order.
    #[must_use]
    pub fn reports(&self) -> &[EmitterReport] {
        &self.reports
    }

    /// Content of the artifact at `path`.
    #[must_use]
    pub fn artifact(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = path.as_ref();
        self.artifacts
            .iter()
            .find(|a| a.path == path)
            .map(|a| a.content.as_str())
    }

    /// Materializes every artifact through `writer`.
    ///
    /// # Errors
    /// Returns `CodegenError::Io` on the first failed write.
    pub fn write_all(&self, writer: &mut dyn OutputWriter) -> Result<WriteSummary, CodegenError> {
        let mut summary = WriteSummary::default();
        for artifact in &self.artifacts {
            match writer.write(&artifact.path, &artifact.content)? {
                WriteOutcome::Created => summary.created += 1,
                WriteOutcome::Rewritten => summary.rewritten += 1,
                WriteOutcome::Unchanged => summary.unchanged += 1,
            }
        }
        info!(
            created = summary.created,
            rewritten = summary.rewritten,
            unchanged = summary.unchanged,
            "artifacts written"
        );
        Ok(summary)
    }
}

/// Write outcome counts of [`GenerationOutput::write_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files that did not exist.
    pub created: usize,
    /// Files whose content changed.
    pub rewritten: usize,
    /// Files left untouched.
    pub unchanged: usize,
}

impl WriteSummary {
    /// Number of files actually written.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.created + self.rewritten
    }
}
