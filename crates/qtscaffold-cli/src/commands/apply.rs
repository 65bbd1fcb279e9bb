// Scaffold the entries of a manifest into a target directory

use std::path::{Path, PathBuf};

use qtscaffold_generation::{
    OutputWriterConfig, ScaffoldEntry, ScaffoldReport, Scaffolder, TemplateLoader,
};
use serde::Deserialize;
use tracing::info;

use super::{check_report, Command};
use crate::error::{CliError, CliResult};
use crate::output;

/// Batch of scaffold entries read from JSON or YAML
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Directory template ids resolve against, relative to the manifest
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    /// Polish rendered output before writing
    #[serde(default)]
    pub polish_output: bool,
    pub entries: Vec<ScaffoldEntry>,
}

impl Manifest {
    /// Parse a manifest file; `.json` picks JSON, anything else YAML
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed: Result<Manifest, String> = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| CliError::Manifest {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Template directory, resolved against the manifest's own directory
    pub fn templates_root(&self, manifest_path: &Path) -> PathBuf {
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.templates_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }
}

/// Scaffold a manifest's entries below a target directory
pub struct ApplyCommand {
    pub target: PathBuf,
    pub manifest: PathBuf,
    pub dry_run: bool,
    pub overwrite: bool,
}

impl ApplyCommand {
    pub fn new(target: PathBuf, manifest: PathBuf, dry_run: bool, overwrite: bool) -> Self {
        Self {
            target,
            manifest,
            dry_run,
            overwrite,
        }
    }

    /// Run the manifest and return the per-entry report
    pub fn run(&self) -> CliResult<ScaffoldReport> {
        let manifest = Manifest::load(&self.manifest)?;
        let root = manifest.templates_root(&self.manifest);
        info!(
            manifest = %self.manifest.display(),
            templates = %root.display(),
            entries = manifest.entries.len(),
            "applying manifest"
        );

        let scaffolder = Scaffolder::with_config(
            TemplateLoader::new(root),
            OutputWriterConfig {
                dry_run: self.dry_run,
                overwrite: self.overwrite,
                polish_output: manifest.polish_output,
            },
        );

        Ok(scaffolder.scaffold(&self.target, &manifest.entries))
    }
}

impl Command for ApplyCommand {
    fn execute(&self) -> CliResult<()> {
        let report = self.run()?;
        output::print_report(&report);
        check_report(&report)
    }
}
