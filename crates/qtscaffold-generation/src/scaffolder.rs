//! Scaffolder
//!
//! Renders a batch of [`ScaffoldEntry`]s and writes each result below one
//! target directory. Entries are independent: a failing entry is recorded
//! and the remaining entries still run. Files already written stay on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ScaffoldError;
use crate::models::ScaffoldEntry;
use crate::output_writer::{resolve_output_path, FileWriteResult, OutputWriter, OutputWriterConfig};
use crate::templates::engine::TemplateEngine;
use crate::templates::loader::TemplateSource;

/// Outcome of one entry
#[derive(Debug)]
pub struct EntryOutcome {
    /// Template the entry used
    pub template_id: String,
    /// Output path as given in the entry
    pub output_path: PathBuf,
    /// Written (or, in dry-run mode, planned) file, or why it failed
    pub result: Result<FileWriteResult, ScaffoldError>,
}

impl EntryOutcome {
    /// Whether the entry succeeded
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-entry outcomes of one scaffold run
#[derive(Debug)]
pub struct ScaffoldReport {
    /// Directory outputs were resolved against
    pub target_dir: PathBuf,
    /// Whether nothing was actually written
    pub dry_run: bool,
    /// One outcome per entry, in entry order
    pub outcomes: Vec<EntryOutcome>,
}

impl ScaffoldReport {
    /// Paths written (or that would be written in dry-run mode)
    pub fn written_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .map(|file| file.path.as_path())
            .collect()
    }

    /// Entries that failed
    pub fn failures(&self) -> Vec<&EntryOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok()).collect()
    }

    /// Whether every entry succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(EntryOutcome::is_ok)
    }
}

/// Renders entries from a template source and writes them out
pub struct Scaffolder<S> {
    source: S,
    engine: TemplateEngine,
    writer: OutputWriter,
}

impl<S: TemplateSource> Scaffolder<S> {
    /// Create a scaffolder with the default writer configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, OutputWriterConfig::default())
    }

    /// Create a scaffolder with a custom writer configuration
    pub fn with_config(source: S, config: OutputWriterConfig) -> Self {
        Self {
            source,
            engine: TemplateEngine::new(),
            writer: OutputWriter::with_config(config),
        }
    }

    /// Replace the template engine
    pub fn with_engine(mut self, engine: TemplateEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Template source entries are resolved through
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scaffold every entry below `target_dir`
    ///
    /// # Arguments
    /// * `target_dir` - Directory all outputs must stay inside
    /// * `entries` - Work items, processed in order
    ///
    /// # Returns
    /// A report with one outcome per entry
    pub fn scaffold(&self, target_dir: &Path, entries: &[ScaffoldEntry]) -> ScaffoldReport {
        let outcomes: Vec<EntryOutcome> = entries
            .iter()
            .map(|entry| {
                let result = self.scaffold_entry(target_dir, entry);
                match &result {
                    Ok(file) => debug!(
                        template = %entry.template_id,
                        path = %file.path.display(),
                        written = file.written,
                        "scaffolded entry"
                    ),
                    Err(err) => warn!(
                        template = %entry.template_id,
                        output = %entry.output_path.display(),
                        error = %err,
                        "scaffold entry failed"
                    ),
                }
                EntryOutcome {
                    template_id: entry.template_id.clone(),
                    output_path: entry.output_path.clone(),
                    result,
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
        info!(
            target = %target_dir.display(),
            entries = outcomes.len(),
            failed,
            dry_run = self.writer.config().dry_run,
            "scaffold finished"
        );

        ScaffoldReport {
            target_dir: target_dir.to_path_buf(),
            dry_run: self.writer.config().dry_run,
            outcomes,
        }
    }

    /// Run a single entry
    pub fn scaffold_entry(
        &self,
        target_dir: &Path,
        entry: &ScaffoldEntry,
    ) -> Result<FileWriteResult, ScaffoldError> {
        resolve_output_path(target_dir, &entry.output_path)?;

        let template = self
            .source
            .load(&entry.template_id)
            .map_err(|source| ScaffoldError::Template {
                template_id: entry.template_id.clone(),
                source,
            })?;

        let content = if entry.bypass {
            template.source
        } else {
            self.engine
                .render(&template, &entry.context)
                .map_err(|source| ScaffoldError::Render {
                    template_id: entry.template_id.clone(),
                    output: entry.output_path.clone(),
                    source,
                })?
        };

        self.writer.write(target_dir, &entry.output_path, &content)
    }
}
