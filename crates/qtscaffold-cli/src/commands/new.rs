// Generate a file or project from a template definition

use std::path::{Path, PathBuf};

use qtscaffold_generation::{
    BuiltinTemplates, GenerateOptions, Generator, ScaffoldReport, TemplateContext, TemplateLoader,
    TemplateSource, DEFINITION_FILE,
};
use tracing::debug;

use super::{check_report, parse_assignments, Command};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::user_presets::{UserPreset, UserPresetFile};

/// Resolve a preset to a template source
///
/// Tried in order: a bundled preset, `<templates_dir>/<preset>`, then
/// `preset` as a directory path. Directories must hold a definition file.
pub fn resolve_preset(
    preset: &str,
    templates_dir: Option<&Path>,
) -> CliResult<Box<dyn TemplateSource>> {
    if let Some(bundled) = BuiltinTemplates::preset(preset) {
        debug!(preset, "using bundled preset");
        return Ok(Box::new(bundled));
    }

    let candidates = templates_dir
        .map(|dir| dir.join(preset))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(preset)));

    for dir in candidates {
        if dir.join(DEFINITION_FILE).is_file() {
            debug!(preset, dir = %dir.display(), "using preset directory");
            return Ok(Box::new(TemplateLoader::new(dir)));
        }
    }

    Err(CliError::UnknownPreset(preset.to_string()))
}

/// User preset names must not hide a bundled preset
pub fn check_user_preset_name(name: &str) -> CliResult<()> {
    if name.trim().is_empty() {
        return Err(CliError::InvalidArgument {
            message: "preset name must not be empty".to_string(),
        });
    }
    if BuiltinTemplates::preset(name).is_some() {
        return Err(CliError::InvalidArgument {
            message: format!("'{}' is a bundled preset and cannot be a user preset name", name),
        });
    }
    Ok(())
}

/// A resolved preset: where the files come from and the saved options
struct ResolvedPreset {
    source: Box<dyn TemplateSource>,
    template: String,
    options: TemplateContext,
}

/// Run a template definition for a new file or project
pub struct NewCommand {
    pub name: String,
    /// Template preset, or the name of a saved user preset
    pub preset: String,
    pub dir: PathBuf,
    pub assignments: Vec<String>,
    pub dry_run: bool,
    pub overwrite: bool,
    /// Save the preset and the effective options under this name
    pub save_preset: Option<String>,
    pub config: CliConfig,
}

impl NewCommand {
    /// Generate and return the per-entry report
    pub fn run(&self) -> CliResult<ScaffoldReport> {
        if let Some(name) = &self.save_preset {
            check_user_preset_name(name)?;
        }

        let resolved = self.resolve()?;
        let generator = Generator::new(resolved.source);
        let definition = generator.definition()?;

        let mut context = resolved.options;
        context.extend(&parse_assignments(&self.assignments)?);

        let mut options = GenerateOptions::new(self.dir.clone());
        options.context = context.clone();
        options.dry_run = self.dry_run;
        options.overwrite = self.overwrite || self.config.overwrite;
        options.polish_output = self.config.polish_output;

        debug!(
            name = %self.name,
            preset = %self.preset,
            template = %resolved.template,
            kind = %definition.meta.kind,
            "generating from definition"
        );
        let report = generator.generate(&definition, &self.name, &options)?;

        if let Some(name) = &self.save_preset {
            if !self.dry_run && report.is_success() {
                self.save_preset(name, &resolved.template, context)?;
            }
        }
        Ok(report)
    }

    /// Template presets win; a saved user preset is tried last
    fn resolve(&self) -> CliResult<ResolvedPreset> {
        let templates_dir = self.config.templates_dir.as_deref();
        match resolve_preset(&self.preset, templates_dir) {
            Ok(source) => {
                return Ok(ResolvedPreset {
                    source,
                    template: self.preset.clone(),
                    options: TemplateContext::new(),
                })
            }
            Err(CliError::UnknownPreset(_)) => {}
            Err(err) => return Err(err),
        }

        let presets = UserPresetFile::open(self.config.presets_path())?;
        let preset = presets
            .find(&self.preset)
            .ok_or_else(|| CliError::UnknownPreset(self.preset.clone()))?;
        debug!(preset = %preset.name, template = %preset.template, "using user preset");

        Ok(ResolvedPreset {
            source: resolve_preset(&preset.template, templates_dir)?,
            template: preset.template.clone(),
            options: preset.options.clone(),
        })
    }

    fn save_preset(&self, name: &str, template: &str, options: TemplateContext) -> CliResult<()> {
        let mut presets = UserPresetFile::open(self.config.presets_path())?;
        let replaced = presets.upsert(UserPreset::new(name, template, options));
        presets.save()?;

        let verb = if replaced { "Updated" } else { "Saved" };
        output::print_success(&format!("{} preset '{}'", verb, name));
        Ok(())
    }
}

impl Command for NewCommand {
    fn execute(&self) -> CliResult<()> {
        let report = self.run()?;
        output::print_report(&report);
        check_report(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtscaffold_generation::{DefinitionError, Value};
    use std::fs;
    use tempfile::TempDir;

    fn command(dir: &Path, preset: &str, name: &str) -> NewCommand {
        NewCommand {
            name: name.to_string(),
            preset: preset.to_string(),
            dir: dir.to_path_buf(),
            assignments: Vec::new(),
            dry_run: false,
            overwrite: false,
            save_preset: None,
            config: CliConfig {
                presets_file: Some(dir.join("presets.yml")),
                ..CliConfig::default()
            },
        }
    }

    #[test]
    fn test_bundled_class_preset() {
        let temp_dir = TempDir::new().unwrap();
        let report = command(temp_dir.path(), "cpp/class", "Widget").run().unwrap();

        assert!(report.is_success());
        assert!(temp_dir.path().join("Widget.h").is_file());
        assert!(temp_dir.path().join("Widget.cpp").is_file());
    }

    #[test]
    fn test_directory_preset_from_templates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let preset = temp_dir.path().join("presets/note");
        fs::create_dir_all(&preset).unwrap();
        fs::write(
            preset.join(DEFINITION_FILE),
            "meta:\n  type: file\nfiles:\n  - in: note.txt\n    out: \"{{ .name }}\"\n",
        )
        .unwrap();
        fs::write(preset.join("note.txt"), "note for {{ .name }}\n").unwrap();

        let out = temp_dir.path().join("out");
        let mut new = command(&out, "note", "todo");
        new.config.templates_dir = Some(temp_dir.path().join("presets"));

        let report = new.run().unwrap();
        assert!(report.is_success());
        assert_eq!(
            fs::read_to_string(out.join("todo.txt")).unwrap(),
            "note for todo\n"
        );
    }

    #[test]
    fn test_unknown_preset() {
        let temp_dir = TempDir::new().unwrap();
        let err = command(temp_dir.path(), "no/such/preset", "Foo")
            .run()
            .unwrap_err();
        assert!(matches!(err, CliError::UnknownPreset(_)));
    }

    #[test]
    fn test_invalid_name_is_definition_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = command(temp_dir.path(), "cpp/class", "1bad")
            .run()
            .unwrap_err();
        assert!(matches!(err, CliError::Definition(_)));
    }

    #[test]
    fn test_saved_preset_options_then_sets() {
        let temp_dir = TempDir::new().unwrap();
        let mut first = command(temp_dir.path(), "cpp/class", "Item");
        first.assignments = vec![
            "baseClass=QQuickItem".to_string(),
            "parentClass=QQuickItem".to_string(),
        ];
        first.save_preset = Some("quick".to_string());
        first.run().unwrap();

        let presets = UserPresetFile::open(temp_dir.path().join("presets.yml")).unwrap();
        let saved = presets.find("quick").unwrap();
        assert_eq!(saved.template, "cpp/class");
        assert_eq!(saved.options.get("baseClass"), Some(&Value::from("QQuickItem")));
        assert!(saved.options.get("name").is_none());

        let mut second = command(temp_dir.path(), "quick", "Dial");
        second.assignments = vec!["parentClass=QObject".to_string()];
        let report = second.run().unwrap();

        assert!(report.is_success());
        let header = fs::read_to_string(temp_dir.path().join("Dial.h")).unwrap();
        assert!(header.contains("#include <QQuickItem>"));
        assert!(header.contains("explicit Dial(QObject *parent = nullptr);"));
    }

    #[test]
    fn test_bundled_name_cannot_be_saved() {
        let temp_dir = TempDir::new().unwrap();
        let mut new = command(temp_dir.path(), "cpp/class", "Widget");
        new.save_preset = Some("cpp/class".to_string());

        let err = new.run().unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
        assert!(!temp_dir.path().join("presets.yml").exists());
        assert!(!temp_dir.path().join("Widget.h").exists());
    }

    #[test]
    fn test_dry_run_does_not_save_preset() {
        let temp_dir = TempDir::new().unwrap();
        let mut new = command(temp_dir.path(), "cpp/class", "Widget");
        new.dry_run = true;
        new.save_preset = Some("mine".to_string());

        new.run().unwrap();
        assert!(!temp_dir.path().join("presets.yml").exists());
    }

    #[test]
    fn test_existing_class_file_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Widget.cpp"), "// keep\n").unwrap();

        let err = command(temp_dir.path(), "cpp/class", "Widget").run().unwrap_err();

        assert!(matches!(
            err,
            CliError::Definition(DefinitionError::OutputExists { .. })
        ));
        assert!(!temp_dir.path().join("Widget.h").exists());
    }
}
