// Render a single template file to stdout

use std::path::PathBuf;

use qtscaffold_generation::{TemplateContext, TemplateEngine};
use tracing::debug;

use super::{load_context_file, parse_assignments, Command};
use crate::error::{CliError, CliResult};

/// Render one template against `--context` and `--set` values
pub struct RenderCommand {
    pub file: PathBuf,
    pub assignments: Vec<String>,
    pub context_file: Option<PathBuf>,
}

impl RenderCommand {
    pub fn new(file: PathBuf, assignments: Vec<String>, context_file: Option<PathBuf>) -> Self {
        Self {
            file,
            assignments,
            context_file,
        }
    }

    /// Context file values, overridden by `--set` values
    pub fn context(&self) -> CliResult<TemplateContext> {
        let mut context = match &self.context_file {
            Some(path) => load_context_file(path)?,
            None => TemplateContext::new(),
        };
        context.extend(&parse_assignments(&self.assignments)?);
        Ok(context)
    }

    /// Rendered text of the template
    pub fn render(&self) -> CliResult<String> {
        let source = std::fs::read_to_string(&self.file).map_err(|e| CliError::io(&self.file, e))?;
        let context = self.context()?;
        debug!(file = %self.file.display(), keys = context.len(), "rendering template");

        let id = self.file.display().to_string();
        Ok(TemplateEngine::new().render_str(&id, &source, &context)?)
    }
}

impl Command for RenderCommand {
    fn execute(&self) -> CliResult<()> {
        print!("{}", self.render()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_set_overrides_context_file() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("greeting.txt");
        let context = temp_dir.path().join("ctx.json");
        fs::write(&template, "{{ .greeting }}, {{ .who }}!\n").unwrap();
        fs::write(&context, r#"{"greeting": "Hello", "who": "file"}"#).unwrap();

        let command = RenderCommand::new(
            template,
            vec!["who=flag".to_string()],
            Some(context),
        );

        assert_eq!(command.render().unwrap(), "Hello, flag!\n");
    }

    #[test]
    fn test_missing_key_is_template_error() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("t.txt");
        fs::write(&template, "{{ .absent }}").unwrap();

        let err = RenderCommand::new(template, Vec::new(), None)
            .render()
            .unwrap_err();
        assert!(matches!(err, CliError::Template(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = RenderCommand::new(temp_dir.path().join("nope.txt"), Vec::new(), None)
            .render()
            .unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
