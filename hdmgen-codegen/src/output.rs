//! Idempotent materialization of generated artifacts.
//!
//! A writer compares the new content with what is already stored and only
//! replaces files whose content changed, so unchanged files keep their
//! modification times and downstream builds are not invalidated.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// The file did not exist.
    Created,
    /// The file existed with different content.
    Rewritten,
    /// The file already held this content; nothing was written.
    Unchanged,
}

/// Destination for generated files.
pub trait OutputWriter {
    /// Writes `content` to `path` (relative to the writer's root) unless it
    /// is already there.
    ///
    /// # Errors
    /// Returns the underlying I/O error.
    fn write(&mut self, path: &Path, content: &str) -> io::Result<WriteOutcome>;
}

/// Writes below a root directory, replacing changed files atomically.
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    /// Creates a writer rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputWriter for FsWriter {
    fn write(&mut self, path: &Path, content: &str) -> io::Result<WriteOutcome> {
        let target = self.root.join(path);
        let outcome = match fs::read(&target) {
            Ok(existing) if existing == content.as_bytes() => {
                debug!(path = %target.display(), "unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
            Ok(_) => WriteOutcome::Rewritten,
            Err(e) if e.kind() == io::ErrorKind::NotFound => WriteOutcome::Created,
            Err(e) => return Err(e),
        };

        let dir = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;
        staged.persist(&target).map_err(|e| e.error)?;

        info!(path = %target.display(), ?outcome, "wrote artifact");
        Ok(outcome)
    }
}

/// In-memory writer keeping the last content and outcome per path.
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    files: BTreeMap<PathBuf, String>,
    outcomes: Vec<(PathBuf, WriteOutcome)>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored content of `path`.
    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Every stored file, in path order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    /// Outcomes of every write, in call order.
    #[must_use]
    pub fn outcomes(&self) -> &[(PathBuf, WriteOutcome)] {
        &self.outcomes
    }

    /// Forgets recorded outcomes, keeping the stored files.
    pub fn clear_outcomes(&mut self) {
        self.outcomes.clear();
    }
}

impl OutputWriter for MemoryWriter {
    fn write(&mut self, path: &Path, content: &str) -> io::Result<WriteOutcome> {
        let outcome = match self.files.get(path) {
            Some(existing) if existing == content => WriteOutcome::Unchanged,
            Some(_) => WriteOutcome::Rewritten,
            None => WriteOutcome::Created,
        };
        if outcome != WriteOutcome::Unchanged {
            self.files.insert(path.to_path_buf(), content.to_string());
        }
        self.outcomes.push((path.to_path_buf(), outcome));
        Ok(outcome)
    }
}
