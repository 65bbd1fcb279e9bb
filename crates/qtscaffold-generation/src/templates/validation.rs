//! Template validation engine
//!
//! Validates template syntax, checks context key references and validates
//! the names used for generated files and projects.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::definition::TargetKind;
use crate::error::DefinitionError;
use crate::models::{Template, TemplateContext};
use crate::templates::error::TemplateError;
use crate::templates::parser::{ParsedTemplate, TemplateParser};

/// Longest accepted file or project name
pub const MAX_NAME_LENGTH: usize = 255;

static WINDOWS_RESERVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").expect("valid regex"));

static SAFE_PROJECT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").expect("valid regex"));

static SAFE_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*(\.[a-zA-Z0-9]+)?$").expect("valid regex")
});

/// Template validation engine
pub struct ValidationEngine;

impl ValidationEngine {
    /// Validate template syntax
    ///
    /// # Arguments
    /// * `template` - Template to validate
    ///
    /// # Returns
    /// The parsed template if valid, Err with line number if invalid
    pub fn validate_template_syntax(template: &Template) -> Result<ParsedTemplate, TemplateError> {
        TemplateParser::parse(template)
    }

    /// Context keys the template references that `context` does not provide
    ///
    /// Keys referenced only inside branches that never run do not fail a
    /// render, so this is a report rather than an error.
    pub fn missing_context_keys(parsed: &ParsedTemplate, context: &TemplateContext) -> Vec<String> {
        parsed
            .context_keys()
            .into_iter()
            .filter(|key| !context.contains_key(key))
            .collect()
    }

    /// Validate the name of a generated file or project
    ///
    /// # Arguments
    /// * `name` - Name as typed by the user
    /// * `kind` - Whether the name becomes a file stem or a project directory
    ///
    /// # Returns
    /// The trimmed name if acceptable
    pub fn validate_name(name: &str, kind: TargetKind) -> Result<String, DefinitionError> {
        let name = name.trim();
        let reject = |reason: &str| DefinitionError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(reject("name is required"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(reject("name is longer than 255 characters"));
        }
        if name == "." || name == ".." {
            return Err(reject("name cannot be a relative directory"));
        }
        if name.contains(['/', '\\']) {
            return Err(reject("name cannot contain path separators"));
        }
        if WINDOWS_RESERVED.is_match(name) {
            return Err(reject("name is reserved on Windows"));
        }

        let (pattern, expected) = match kind {
            TargetKind::Project => (&*SAFE_PROJECT_NAME, "letters, digits, '_' and '-'"),
            TargetKind::File => (
                &*SAFE_FILE_NAME,
                "letters, digits, '_' and '-' with an optional extension",
            ),
        };
        if !pattern.is_match(name) {
            return Err(reject(&format!(
                "name must start with a letter or '_' and contain only {}",
                expected
            )));
        }

        Ok(name.to_string())
    }
}
