//! Error types for scaffolding and template definitions

use std::path::PathBuf;

use thiserror::Error;

use crate::templates::error::TemplateError;

/// Errors recorded against a single scaffold entry
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Template could not be loaded
    #[error("cannot load template {template_id}: {source}")]
    Template {
        /// Template identifier
        template_id: String,
        /// Underlying loader error
        #[source]
        source: TemplateError,
    },

    /// Template failed to parse or render; nothing was written
    #[error("cannot render {output} from {template_id}: {source}")]
    Render {
        /// Template identifier
        template_id: String,
        /// Output path of the entry
        output: PathBuf,
        /// Underlying template error
        #[source]
        source: TemplateError,
    },

    /// Output path is absolute or climbs out of the target directory
    #[error("output path escapes the target directory: {}", path.display())]
    PathEscapesTarget {
        /// Offending output path as given
        path: PathBuf,
    },

    /// Output file exists and overwriting is off
    #[error("output already exists: {}", path.display())]
    AlreadyExists {
        /// Existing file
        path: PathBuf,
    },

    /// IO error creating directories or writing the file
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being created or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl ScaffoldError {
    /// Whether the failure happened before any IO was attempted
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            ScaffoldError::Template { .. } | ScaffoldError::Render { .. }
        )
    }
}

/// Errors loading or applying a template definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Definition file is missing from its source
    #[error("template definition not found: {0}")]
    NotFound(String),

    /// Definition file is not valid YAML for the expected shape
    #[error("invalid template definition {path}: {source}")]
    Yaml {
        /// Definition path
        path: String,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// Definition parsed but its contents are unusable
    #[error("invalid template definition: {0}")]
    Invalid(String),

    /// Generated item name is not acceptable
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// Name as given
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Project directory already exists
    #[error("target directory already exists: {}", path.display())]
    TargetExists {
        /// Existing directory
        path: PathBuf,
    },

    /// A file listed by the definition has no template in the source
    #[error("file not found: {0}")]
    MissingInput(String),

    /// A planned output path is unusable before anything was written
    #[error("cannot generate {}: {reason}", path.display())]
    OutputRejected {
        /// Planned output, relative to the output directory
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// A planned output file already exists
    #[error("output already exists: {}", path.display())]
    OutputExists {
        /// Existing file
        path: PathBuf,
    },

    /// A field, `when` or `out` expression failed to render
    #[error(transparent)]
    Template(#[from] TemplateError),
}
