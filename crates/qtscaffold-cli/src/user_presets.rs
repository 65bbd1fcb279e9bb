// User presets: a named preset plus saved options, kept in one YAML file

use std::fs;
use std::path::{Path, PathBuf};

use qtscaffold_generation::TemplateContext;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Format version written to new preset files
pub const PRESET_FILE_VERSION: &str = "1";

/// A saved combination of a template preset and context values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreset {
    /// Name accepted by `new --preset`
    pub name: String,
    /// Preset the files come from: bundled, under templates_dir, or a directory
    pub template: String,
    /// Context values applied before `--set`
    #[serde(default)]
    pub options: TemplateContext,
}

impl UserPreset {
    pub fn new(name: impl Into<String>, template: impl Into<String>, options: TemplateContext) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            options,
        }
    }

    /// `name (-> @template)`
    pub fn description(&self) -> String {
        format!("{} (-> @{})", self.name, self.template)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PresetFileContents {
    version: String,
    #[serde(default)]
    items: Vec<UserPreset>,
}

impl Default for PresetFileContents {
    fn default() -> Self {
        Self {
            version: PRESET_FILE_VERSION.to_string(),
            items: Vec::new(),
        }
    }
}

/// User presets loaded from disk; changes stay in memory until [`save`](Self::save)
#[derive(Debug, Clone)]
pub struct UserPresetFile {
    path: PathBuf,
    contents: PresetFileContents,
}

impl UserPresetFile {
    /// `<config dir>/qtscaffold/presets.yml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qtscaffold")
            .join("presets.yml")
    }

    /// Read the preset file; a missing file is an empty set of presets
    pub fn open(path: impl Into<PathBuf>) -> CliResult<Self> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => PresetFileContents::default(),
            Ok(text) => serde_yaml::from_str(&text).map_err(|e| CliError::Preset {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no user preset file yet");
                PresetFileContents::default()
            }
            Err(err) => return Err(CliError::io(&path, err)),
        };

        Ok(Self { path, contents })
    }

    /// File the presets are read from and saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Presets in file order
    pub fn items(&self) -> &[UserPreset] {
        &self.contents.items
    }

    pub fn find(&self, name: &str) -> Option<&UserPreset> {
        self.contents.items.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Add `preset`, replacing one with the same name in place
    ///
    /// Returns `true` when an existing preset was replaced.
    pub fn upsert(&mut self, preset: UserPreset) -> bool {
        match self.contents.items.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => {
                *existing = preset;
                true
            }
            None => {
                self.contents.items.push(preset);
                false
            }
        }
    }

    /// Remove and return the preset called `name`
    pub fn remove(&mut self, name: &str) -> CliResult<UserPreset> {
        let index = self
            .contents
            .items
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| self.not_found(name))?;
        Ok(self.contents.items.remove(index))
    }

    /// Rename `from` to `to`; `to` must not be taken
    pub fn rename(&mut self, from: &str, to: &str) -> CliResult<()> {
        if self.contains(to) {
            return Err(CliError::Preset {
                path: self.path.clone(),
                message: format!("cannot rename '{}', '{}' already exists", from, to),
            });
        }
        let not_found = self.not_found(from);
        let preset = self
            .contents
            .items
            .iter_mut()
            .find(|p| p.name == from)
            .ok_or(not_found)?;
        preset.name = to.to_string();
        Ok(())
    }

    /// Drop every preset and return how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.contents.items.len();
        self.contents.items.clear();
        count
    }

    /// Write the presets as YAML, creating the parent directory
    pub fn save(&self) -> CliResult<()> {
        let yaml = serde_yaml::to_string(&self.contents).map_err(|e| CliError::Preset {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
        }
        fs::write(&self.path, yaml).map_err(|e| CliError::io(&self.path, e))?;
        debug!(path = %self.path.display(), presets = self.contents.items.len(), "saved user presets");
        Ok(())
    }

    fn not_found(&self, name: &str) -> CliError {
        CliError::Preset {
            path: self.path.clone(),
            message: format!("no preset named '{}'", name),
        }
    }
}
