// CLI error types

use std::path::PathBuf;

use qtscaffold_generation::{DefinitionError, TemplateError};
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("User presets {}: {message}", path.display())]
    Preset { path: PathBuf, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("{failed} of {total} entries failed")]
    EntriesFailed { failed: usize, total: usize },
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'qtscaffold --help' for usage information.",
                    message
                )
            }
            CliError::Io { path, source } => {
                format!("File operation failed on {}: {}", path.display(), source)
            }
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nCheck {} or the QTSCAFFOLD_* environment variables.",
                    msg,
                    crate::config::ConfigManager::default_config_path().display()
                )
            }
            CliError::Manifest { path, message } => {
                format!("Manifest {} is invalid: {}", path.display(), message)
            }
            CliError::UnknownPreset(name) => {
                format!(
                    "Unknown preset '{}'.\n\nRun 'qtscaffold presets' to list bundled and user presets.",
                    name
                )
            }
            CliError::Preset { path, message } => {
                format!("User preset error: {}\n\nPresets are stored in {}.", message, path.display())
            }
            CliError::Template(e) => format!("Template error: {}", e),
            CliError::Definition(e) => format!("Template definition error: {}", e),
            CliError::EntriesFailed { failed, total } => {
                format!("{} of {} entries failed; see the report above.", failed, total)
            }
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_preset_suggests_listing() {
        let err = CliError::UnknownPreset("qml".to_string());
        assert!(err.user_message().contains("qtscaffold presets"));
    }

    #[test]
    fn test_definition_error_converts() {
        let err: CliError = DefinitionError::NotFound("templates.yml".to_string()).into();
        assert!(matches!(err, CliError::Definition(_)));
        assert!(err.user_message().contains("templates.yml"));
    }

    #[test]
    fn test_entries_failed_message() {
        let err = CliError::EntriesFailed { failed: 1, total: 3 };
        assert_eq!(err.to_string(), "1 of 3 entries failed");
    }
}
