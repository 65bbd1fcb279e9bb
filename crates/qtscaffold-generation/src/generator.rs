//! Definition-driven generation
//!
//! Turns a [`TemplateDefinition`] plus a user supplied name and options into
//! scaffold entries, then hands them to the [`Scaffolder`].

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::definition::{FileItem, TemplateDefinition};
use crate::error::DefinitionError;
use crate::models::{ScaffoldEntry, TemplateContext, Value};
use crate::output_writer::{resolve_output_path, OutputWriterConfig};
use crate::scaffolder::{ScaffoldReport, Scaffolder};
use crate::templates::engine::TemplateEngine;
use crate::templates::loader::TemplateSource;
use crate::templates::validation::ValidationEngine;

static MULTI_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid regex"));

/// Options for one generation run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Directory the definition generates into
    pub target_dir: PathBuf,
    /// Values supplied by the caller; they win over definition fields
    pub context: TemplateContext,
    /// Plan and report without writing
    pub dry_run: bool,
    /// Replace existing files
    pub overwrite: bool,
    /// Polish rendered output before writing
    pub polish_output: bool,
}

impl GenerateOptions {
    /// Defaults for generating into `target_dir`
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            context: TemplateContext::new(),
            dry_run: false,
            overwrite: false,
            polish_output: true,
        }
    }
}

/// Entries and context derived from a definition
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    /// Directory entries are written below
    pub output_dir: PathBuf,
    /// Context after fields were evaluated
    pub context: TemplateContext,
    /// Files to generate
    pub entries: Vec<ScaffoldEntry>,
    /// Template ids whose `when` condition was false
    pub skipped: Vec<String>,
}

/// Collapse repeated dots and append `fallback_ext` when `name` has none
pub fn normalize_file_ext(name: &str, fallback_ext: &str) -> String {
    let name = MULTI_DOT.replace_all(name, ".");
    let name = name.strip_suffix('.').unwrap_or(&name);

    let has_ext = Path::new(name).extension().is_some();
    let fallback = fallback_ext.trim_start_matches('.');
    if has_ext || fallback.is_empty() {
        return name.to_string();
    }

    format!("{}.{}", name, fallback)
}

/// Whether a rendered `when` condition counts as true
fn is_true_text(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("yes")
}

/// Plans and runs template definitions against one template source
pub struct Generator<S> {
    source: S,
    engine: TemplateEngine,
}

impl<S: TemplateSource> Generator<S> {
    /// Create a generator reading templates from `source`
    pub fn new(source: S) -> Self {
        Self {
            source,
            engine: TemplateEngine::new(),
        }
    }

    /// Load the definition shipped with the source
    pub fn definition(&self) -> Result<TemplateDefinition, DefinitionError> {
        TemplateDefinition::load(&self.source)
    }

    /// Work out the context and entries for `name`
    ///
    /// # Arguments
    /// * `definition` - Parsed definition
    /// * `name` - Name of the generated file or project
    /// * `options` - Caller supplied context values and target directory
    ///
    /// # Returns
    /// The plan, or the first definition, name or template error
    pub fn plan(
        &self,
        definition: &TemplateDefinition,
        name: &str,
        options: &GenerateOptions,
    ) -> Result<GenerationPlan, DefinitionError> {
        let name = ValidationEngine::validate_name(name, definition.meta.kind)?;
        let context = self.build_context(definition, &name, &options.context)?;

        let output_dir = if definition.is_project() {
            options.target_dir.join(&name)
        } else {
            options.target_dir.clone()
        };

        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for item in &definition.files {
            if !self.evaluate_when(item, &context)? {
                debug!(template = %item.input, "skipping file, 'when' condition not satisfied");
                skipped.push(item.input.clone());
                continue;
            }

            let output = self.output_name(item, &context)?;
            let mut entry = ScaffoldEntry::new(item.input.as_str(), output, context.clone());
            if item.bypass {
                entry = entry.bypassed();
            }
            entries.push(entry);
        }

        Ok(GenerationPlan {
            output_dir,
            context,
            entries,
            skipped,
        })
    }

    /// Plan and scaffold in one go
    ///
    /// A project whose directory already exists is refused unless
    /// `overwrite` is set.
    pub fn generate(
        &self,
        definition: &TemplateDefinition,
        name: &str,
        options: &GenerateOptions,
    ) -> Result<ScaffoldReport, DefinitionError> {
        let plan = self.plan(definition, name, options)?;

        if definition.is_project() && !options.overwrite && plan.output_dir.exists() {
            return Err(DefinitionError::TargetExists {
                path: plan.output_dir,
            });
        }

        self.check_plan(&plan, options)?;

        let scaffolder = Scaffolder::with_config(
            &self.source,
            OutputWriterConfig {
                dry_run: options.dry_run,
                overwrite: options.overwrite,
                polish_output: options.polish_output,
            },
        )
        .with_engine(self.engine.clone());

        Ok(scaffolder.scaffold(&plan.output_dir, &plan.entries))
    }

    /// Refuse the whole plan when any entry would fail before writing,
    /// so a run never leaves half of a class or project behind
    fn check_plan(
        &self,
        plan: &GenerationPlan,
        options: &GenerateOptions,
    ) -> Result<(), DefinitionError> {
        for entry in &plan.entries {
            if !self.source.contains(&entry.template_id) {
                return Err(DefinitionError::MissingInput(entry.template_id.clone()));
            }

            let path = resolve_output_path(&plan.output_dir, &entry.output_path).map_err(|err| {
                DefinitionError::OutputRejected {
                    path: entry.output_path.clone(),
                    reason: err.to_string(),
                }
            })?;

            if !options.overwrite && path.exists() {
                return Err(DefinitionError::OutputExists { path });
            }
        }

        debug!(entries = plan.entries.len(), "plan checked");
        Ok(())
    }

    fn build_context(
        &self,
        definition: &TemplateDefinition,
        name: &str,
        supplied: &TemplateContext,
    ) -> Result<TemplateContext, DefinitionError> {
        let mut context = supplied.clone();
        context.insert("name", name);

        for field in &definition.fields {
            if supplied.contains_key(&field.name) {
                continue;
            }

            let value = match &field.value {
                Value::String(text) => {
                    let id = format!("fields.{}", field.name);
                    let rendered = self.engine.render_str(&id, text, &context)?;
                    Value::String(rendered.trim().to_string())
                }
                other => other.clone(),
            };
            context.insert(field.name.clone(), value);
        }

        Ok(context)
    }

    fn evaluate_when(&self, item: &FileItem, context: &TemplateContext) -> Result<bool, DefinitionError> {
        if item.when.trim().is_empty() {
            return Ok(true);
        }
        let id = format!("{}#when", item.input);
        let rendered = self.engine.render_str(&id, &item.when, context)?;
        Ok(is_true_text(&rendered))
    }

    fn output_name(&self, item: &FileItem, context: &TemplateContext) -> Result<String, DefinitionError> {
        if item.out.is_empty() {
            let base = Path::new(&item.input)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.input.clone());
            return Ok(base);
        }

        let id = format!("{}#out", item.input);
        let rendered = self.engine.render_str(&id, &item.out, context)?;
        let fallback = Path::new(&item.input)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(normalize_file_ext(rendered.trim(), &fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DEFINITION_FILE;
    use crate::templates::loader::MemoryTemplates;
    use std::fs;
    use tempfile::TempDir;

    const DEFINITION: &str = r#"
meta:
  type: project
files:
  - in: main.cpp
  - in: window.h
    out: "{{ .fileNameBase }}"
  - in: window.ui
    out: "{{ .fileNameBase }}"
    when: "{{ .useForm }}"
fields:
  - className: "  {{ .name }}Window  "
  - fileNameBase: "{{ .className }}"
  - useForm: false
"#;

    fn generator() -> Generator<MemoryTemplates> {
        Generator::new(
            MemoryTemplates::new()
                .with_template(DEFINITION_FILE, DEFINITION)
                .with_template("main.cpp", "#include \"{{ .fileNameBase }}.h\"\n")
                .with_template("window.h", "class {{ .className }};\n")
                .with_template("window.ui", "<ui/>\n"),
        )
    }

    #[test]
    fn test_normalize_file_ext() {
        assert_eq!(normalize_file_ext("mainwindow", ".h"), "mainwindow.h");
        assert_eq!(normalize_file_ext("mainwindow", "h"), "mainwindow.h");
        assert_eq!(normalize_file_ext("main..cpp", ".h"), "main.cpp");
        assert_eq!(normalize_file_ext("widget.", ".h"), "widget.h");
        assert_eq!(normalize_file_ext("CMakeLists", ""), "CMakeLists");
    }

    #[test]
    fn test_when_text() {
        assert!(is_true_text("true"));
        assert!(is_true_text(" YES "));
        assert!(!is_true_text("false"));
        assert!(!is_true_text("1"));
    }

    #[test]
    fn test_plan_evaluates_fields_in_order() {
        let generator = generator();
        let definition = generator.definition().unwrap();
        let plan = generator
            .plan(&definition, "Demo", &GenerateOptions::new("/work"))
            .unwrap();

        assert_eq!(plan.output_dir, PathBuf::from("/work/Demo"));
        assert_eq!(plan.context.get("className"), Some(&Value::from("DemoWindow")));
        assert_eq!(plan.context.get("fileNameBase"), Some(&Value::from("DemoWindow")));

        let outputs: Vec<_> = plan.entries.iter().map(|e| e.output_path.clone()).collect();
        assert_eq!(
            outputs,
            vec![PathBuf::from("main.cpp"), PathBuf::from("DemoWindow.h")]
        );
        assert_eq!(plan.skipped, vec!["window.ui".to_string()]);
    }

    #[test]
    fn test_supplied_values_win() {
        let generator = generator();
        let definition = generator.definition().unwrap();
        let mut options = GenerateOptions::new("/work");
        options.context = TemplateContext::new()
            .with("className", "Custom")
            .with("useForm", true);

        let plan = generator.plan(&definition, "Demo", &options).unwrap();

        assert_eq!(plan.context.get("className"), Some(&Value::from("Custom")));
        assert_eq!(plan.context.get("fileNameBase"), Some(&Value::from("Custom")));
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.entries[2].output_path, PathBuf::from("Custom.ui"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let generator = generator();
        let definition = generator.definition().unwrap();
        let err = generator
            .plan(&definition, "../evil", &GenerateOptions::new("/work"))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidName { .. }));
    }

    #[test]
    fn test_generate_writes_project() {
        let temp_dir = TempDir::new().unwrap();
        let generator = generator();
        let definition = generator.definition().unwrap();

        let report = generator
            .generate(&definition, "Demo", &GenerateOptions::new(temp_dir.path()))
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("Demo/main.cpp")).unwrap(),
            "#include \"DemoWindow.h\"\n"
        );
        assert!(!temp_dir.path().join("Demo/DemoWindow.ui").exists());
    }

    #[test]
    fn test_existing_project_dir_refused() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("Demo")).unwrap();
        let generator = generator();
        let definition = generator.definition().unwrap();

        let err = generator
            .generate(&definition, "Demo", &GenerateOptions::new(temp_dir.path()))
            .unwrap_err();

        assert!(matches!(err, DefinitionError::TargetExists { .. }));
    }

    #[test]
    fn test_existing_output_aborts_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Generator::new(
            MemoryTemplates::new()
                .with_template(
                    DEFINITION_FILE,
                    "meta:\n  type: file\nfiles:\n  - in: class.h\n    out: \"{{ .name }}.h\"\n  - in: class.cpp\n    out: \"{{ .name }}.cpp\"\n",
                )
                .with_template("class.h", "class {{ .name }};\n")
                .with_template("class.cpp", "#include \"{{ .name }}.h\"\n"),
        );
        let definition = generator.definition().unwrap();
        fs::write(temp_dir.path().join("Foo.cpp"), "// mine\n").unwrap();

        let err = generator
            .generate(&definition, "Foo", &GenerateOptions::new(temp_dir.path()))
            .unwrap_err();

        assert!(matches!(err, DefinitionError::OutputExists { ref path } if path.ends_with("Foo.cpp")));
        assert!(!temp_dir.path().join("Foo.h").exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("Foo.cpp")).unwrap(),
            "// mine\n"
        );
    }

    #[test]
    fn test_missing_template_aborts_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Generator::new(
            MemoryTemplates::new()
                .with_template(DEFINITION_FILE, DEFINITION)
                .with_template("main.cpp", "int main() {}\n"),
        );
        let definition = generator.definition().unwrap();

        let err = generator
            .generate(&definition, "Demo", &GenerateOptions::new(temp_dir.path()))
            .unwrap_err();

        assert!(matches!(err, DefinitionError::MissingInput(ref id) if id == "window.h"));
        assert!(!temp_dir.path().join("Demo").exists());
    }
}
