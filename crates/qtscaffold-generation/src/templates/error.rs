//! Error types for template parsing, rendering and helper calls

use thiserror::Error;

/// Errors produced while loading, parsing or rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed directive syntax
    #[error("{template}:{line}: parse error: {message}")]
    Parse {
        /// Template identifier
        template: String,
        /// Line of the offending directive (1-based)
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Undefined variable or type mismatch while evaluating
    #[error("{template}:{line}: render error: {message}")]
    Render {
        /// Template identifier
        template: String,
        /// Line of the offending directive (1-based)
        line: usize,
        /// What was wrong
        message: String,
    },

    /// A helper rejected its arguments
    #[error("{template}:{line}: helper `{helper}`: {source}")]
    Helper {
        /// Template identifier
        template: String,
        /// Line of the helper call (1-based)
        line: usize,
        /// Helper name as written in the template
        helper: String,
        /// Underlying argument error
        #[source]
        source: HelperArgumentError,
    },

    /// Template id not known to the template source
    #[error("Template not found: {0}")]
    NotFound(String),

    /// IO error while reading a template
    #[error("IO error reading template {path}: {source}")]
    Io {
        /// Path that failed to read
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    /// Identifier of the template the error points at, if any
    pub fn template(&self) -> Option<&str> {
        match self {
            TemplateError::Parse { template, .. }
            | TemplateError::Render { template, .. }
            | TemplateError::Helper { template, .. } => Some(template),
            TemplateError::NotFound(id) => Some(id),
            TemplateError::Io { .. } => None,
        }
    }

    /// Line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Parse { line, .. }
            | TemplateError::Render { line, .. }
            | TemplateError::Helper { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Bad arguments passed to a helper function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelperArgumentError {
    /// Wrong number of arguments
    #[error("expected {expected} argument(s), got {found}")]
    Arity {
        /// Human readable expectation (e.g. "2", "at least 1")
        expected: String,
        /// Number of arguments actually passed
        found: usize,
    },

    /// Argument of the wrong kind
    #[error("argument {position} must be a {expected}, got {found}")]
    Type {
        /// 1-based argument position
        position: usize,
        /// Expected kind
        expected: &'static str,
        /// Kind actually passed
        found: &'static str,
    },

    /// Malformed format string or verb/argument mismatch
    #[error("{0}")]
    Format(String),
}
