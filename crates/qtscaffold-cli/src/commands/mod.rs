// Command handlers for the qtscaffold CLI

pub mod apply;
pub mod config;
pub mod new;
pub mod presets;
pub mod render;

pub use apply::{ApplyCommand, Manifest};
pub use config::ConfigCommand;
pub use new::NewCommand;
pub use presets::{PresetsAction, PresetsCommand};
pub use render::RenderCommand;

use std::path::Path;

use qtscaffold_generation::{ScaffoldReport, TemplateContext, Value};

use crate::error::{CliError, CliResult};

/// Trait for command handlers
pub trait Command {
    /// Execute the command
    fn execute(&self) -> CliResult<()>;
}

/// Parse one `--set` value
///
/// `true`/`false` become booleans, `[a,b]` becomes a sequence, anything
/// else is kept as a string.
pub fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Some(inner) = raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        let items = inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        return Value::Sequence(items);
    }

    Value::String(raw.to_string())
}

/// Parse `key=value` assignments into a context
pub fn parse_assignments(assignments: &[String]) -> CliResult<TemplateContext> {
    let mut context = TemplateContext::new();
    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::InvalidArgument {
                message: format!("expected KEY=VALUE, got '{}'", assignment),
            })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::InvalidArgument {
                message: format!("missing key in '{}'", assignment),
            });
        }
        context.insert(key, parse_value(value));
    }
    Ok(context)
}

/// Read a JSON or YAML context file; `.json` picks JSON, anything else YAML
pub fn load_context_file(path: &Path) -> CliResult<TemplateContext> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| CliError::InvalidArgument {
        message: format!("cannot read context {}: {}", path.display(), message),
    })
}

/// Fail when any entry of the report failed
pub(crate) fn check_report(report: &ScaffoldReport) -> CliResult<()> {
    let failed = report.failures().len();
    if failed > 0 {
        return Err(CliError::EntriesFailed {
            failed,
            total: report.outcomes.len(),
        });
    }
    Ok(())
}
