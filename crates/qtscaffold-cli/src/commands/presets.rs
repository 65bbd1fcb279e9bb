// List, show and manage presets

use std::path::{Path, PathBuf};

use clap::Subcommand;
use qtscaffold_generation::{
    BuiltinTemplates, TemplateDefinition, TemplateLoader, DEFINITION_FILE,
};
use walkdir::WalkDir;

use super::new::{check_user_preset_name, resolve_preset};
use super::Command;
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputStyle};
use crate::user_presets::{UserPreset, UserPresetFile};

const USER_PRESET_DEPTH: usize = 4;

/// One listed preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetInfo {
    /// Name accepted by `new --preset`
    pub name: String,
    /// `file` or `project`, or `invalid` when the definition does not load
    pub kind: String,
    pub title: String,
}

impl PresetInfo {
    fn from_definition(name: String, definition: Result<TemplateDefinition, impl std::fmt::Display>) -> Self {
        match definition {
            Ok(definition) => Self {
                name,
                kind: definition.meta.kind.to_string(),
                title: definition.meta.title,
            },
            Err(err) => Self {
                name,
                kind: "invalid".to_string(),
                title: err.to_string(),
            },
        }
    }
}

/// Presets compiled into the binary
pub fn bundled_presets() -> Vec<PresetInfo> {
    BuiltinTemplates::presets()
        .iter()
        .filter_map(|name| {
            BuiltinTemplates::preset(name).map(|source| {
                PresetInfo::from_definition(name.to_string(), TemplateDefinition::load(&source))
            })
        })
        .collect()
}

/// Directories below `root` that hold a definition file, named by relative path
pub fn user_presets(root: &Path) -> Vec<PresetInfo> {
    let mut presets: Vec<PresetInfo> = WalkDir::new(root)
        .max_depth(USER_PRESET_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DEFINITION_FILE)
        .filter_map(|entry| {
            let dir = entry.path().parent()?.to_path_buf();
            let name = preset_name(root, &dir)?;
            let definition = TemplateDefinition::load(&TemplateLoader::new(dir));
            Some(PresetInfo::from_definition(name, definition))
        })
        .collect();

    presets.sort_by(|a, b| a.name.cmp(&b.name));
    presets
}

fn preset_name(root: &Path, dir: &Path) -> Option<String> {
    let relative: PathBuf = dir.strip_prefix(root).ok()?.to_path_buf();
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// What `presets` should do
#[derive(Subcommand, Debug, Clone, PartialEq, Eq, Default)]
pub enum PresetsAction {
    /// List bundled, directory and user presets
    #[default]
    Ls,

    /// Show a user preset, or the definition behind a template preset
    Cat {
        /// Preset name
        name: String,
    },

    /// Rename a user preset
    Mv {
        /// Current name
        from: String,
        /// New name
        to: String,
    },

    /// Delete a user preset
    Rm {
        /// Preset name
        name: String,
    },

    /// Delete every user preset
    Clear {
        /// Confirm deleting all user presets
        #[arg(long)]
        yes: bool,
    },
}

/// Print and manage the preset catalogue
pub struct PresetsCommand {
    pub action: PresetsAction,
    pub templates_dir: Option<PathBuf>,
    pub presets_file: PathBuf,
}

impl PresetsCommand {
    pub fn new(action: PresetsAction, templates_dir: Option<PathBuf>, presets_file: PathBuf) -> Self {
        Self {
            action,
            templates_dir,
            presets_file,
        }
    }

    fn section(style: &OutputStyle, title: &str, presets: &[PresetInfo]) -> String {
        let mut lines = vec![style.header(title)];
        for preset in presets {
            let detail = if preset.title.is_empty() {
                preset.kind.clone()
            } else {
                format!("{} ({})", preset.title, preset.kind)
            };
            lines.push(style.key_value(&preset.name, &detail));
        }
        lines.join("\n")
    }

    fn user_section(style: &OutputStyle, presets: &UserPresetFile) -> String {
        let title = format!("User presets in {}", presets.path().display());
        let mut lines = vec![style.header(&title)];
        for preset in presets.items() {
            lines.push(format!("  {}", preset.description()));
        }
        lines.join("\n")
    }

    /// Everything `presets ls` prints
    fn listing(&self, style: &OutputStyle) -> CliResult<String> {
        let mut blocks = vec![Self::section(style, "Bundled presets", &bundled_presets())];

        if let Some(dir) = &self.templates_dir {
            let presets = user_presets(dir);
            if presets.is_empty() {
                blocks.push(style.info(&format!("No presets under {}", dir.display())));
            } else {
                let title = format!("Presets in {}", dir.display());
                blocks.push(Self::section(style, &title, &presets));
            }
        }

        let saved = UserPresetFile::open(&self.presets_file)?;
        if !saved.items().is_empty() {
            blocks.push(Self::user_section(style, &saved));
        }

        Ok(blocks.join("\n\n"))
    }

    /// Text for `presets cat`: template presets first, then saved ones
    fn show(&self, style: &OutputStyle, name: &str) -> CliResult<String> {
        match resolve_preset(name, self.templates_dir.as_deref()) {
            Ok(source) => {
                let definition = TemplateDefinition::load(&source)?;
                return Ok(describe_definition(style, name, &definition));
            }
            Err(CliError::UnknownPreset(_)) => {}
            Err(err) => return Err(err),
        }

        let saved = UserPresetFile::open(&self.presets_file)?;
        let preset = saved
            .find(name)
            .ok_or_else(|| CliError::UnknownPreset(name.to_string()))?;
        describe_user_preset(preset, saved.path())
    }
}

fn describe_definition(style: &OutputStyle, name: &str, definition: &TemplateDefinition) -> String {
    let mut lines = vec![
        style.header(name),
        style.key_value("type", &definition.meta.kind.to_string()),
    ];
    if !definition.meta.title.is_empty() {
        lines.push(style.key_value("title", &definition.meta.title));
    }
    if !definition.meta.description.is_empty() {
        lines.push(style.key_value("description", &definition.meta.description));
    }

    lines.push(style.header("files"));
    for item in &definition.files {
        let mut target = if item.out.is_empty() {
            "(same name)".to_string()
        } else {
            item.out.clone()
        };
        if !item.when.is_empty() {
            target.push_str(&format!(" when {}", item.when));
        }
        lines.push(style.key_value(&item.input, &target));
    }

    if !definition.fields.is_empty() {
        lines.push(style.header("fields"));
        for field in &definition.fields {
            lines.push(style.key_value(&field.name, &field.value.to_string()));
        }
    }
    lines.join("\n")
}

fn describe_user_preset(preset: &UserPreset, path: &Path) -> CliResult<String> {
    let yaml = serde_yaml::to_string(preset).map_err(|e| CliError::Preset {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(format!("id: {}\n---\n{}", preset.name, yaml.trim_end()))
}

impl Command for PresetsCommand {
    fn execute(&self) -> CliResult<()> {
        let style = OutputStyle::default();
        match &self.action {
            PresetsAction::Ls => println!("{}", self.listing(&style)?),
            PresetsAction::Cat { name } => println!("{}", self.show(&style, name)?),
            PresetsAction::Mv { from, to } => {
                check_user_preset_name(to)?;
                let mut saved = UserPresetFile::open(&self.presets_file)?;
                saved.rename(from, to)?;
                saved.save()?;
                output::print_success(&format!("Renamed preset '{}' to '{}'", from, to));
            }
            PresetsAction::Rm { name } => {
                let mut saved = UserPresetFile::open(&self.presets_file)?;
                saved.remove(name)?;
                saved.save()?;
                output::print_success(&format!("Removed preset '{}'", name));
            }
            PresetsAction::Clear { yes } => {
                let mut saved = UserPresetFile::open(&self.presets_file)?;
                if !yes {
                    return Err(CliError::InvalidArgument {
                        message: format!(
                            "refusing to delete {} user presets without --yes",
                            saved.items().len()
                        ),
                    });
                }
                let removed = saved.clear();
                saved.save()?;
                output::print_success(&format!("Removed {} presets", removed));
            }
        }
        Ok(())
    }
}
