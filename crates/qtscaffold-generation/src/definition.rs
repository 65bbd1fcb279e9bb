//! Template definitions
//!
//! A definition (`templates.yml`) sits next to the templates it drives and
//! lists which files to generate, under which names and conditions, and
//! which context fields to derive before rendering:
//!
//! ```yaml
//! version: "1"
//! meta:
//!   type: project
//!   title: Qt Widgets Application
//! files:
//!   - in: mainwindow.h
//!     out: "{{ .fileNameBase }}"
//! fields:
//!   - fileNameBase: mainwindow
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DefinitionError;
use crate::models::Value;
use crate::templates::loader::TemplateSource;

/// File name of a definition inside its template directory
pub const DEFINITION_FILE: &str = "templates.yml";

/// What a definition generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Files written straight into the target directory
    File,
    /// A new `<target>/<name>` project directory
    Project,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::File => write!(f, "file"),
            TargetKind::Project => write!(f, "project"),
        }
    }
}

/// Descriptive header of a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionMeta {
    /// File or project
    #[serde(rename = "type")]
    pub kind: TargetKind,
    /// Short human readable title
    #[serde(default)]
    pub title: String,
    /// One line description
    #[serde(default)]
    pub description: String,
}

/// One file a definition generates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    /// Template id, relative to the definition directory
    #[serde(rename = "in")]
    pub input: String,
    /// Output name template; empty means the basename of `in`
    #[serde(default)]
    pub out: String,
    /// Condition template; empty means always
    #[serde(default)]
    pub when: String,
    /// Copy the input verbatim instead of rendering it
    #[serde(default)]
    pub bypass: bool,
}

/// A context field with its default value or value template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Context key
    pub name: String,
    /// Default; strings are rendered as templates
    pub value: Value,
}

/// Parsed `templates.yml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Format version as written
    #[serde(default)]
    pub version: String,
    /// Header
    pub meta: DefinitionMeta,
    /// Files to generate, in order
    #[serde(default)]
    pub files: Vec<FileItem>,
    /// Fields evaluated in order before any file is rendered
    #[serde(default, deserialize_with = "deserialize_fields", skip_serializing)]
    pub fields: Vec<Field>,
}

impl TemplateDefinition {
    /// Parse and check a definition document
    ///
    /// # Arguments
    /// * `path` - Where the document came from, for error messages
    /// * `text` - YAML source
    pub fn from_yaml(path: &str, text: &str) -> Result<Self, DefinitionError> {
        let definition: TemplateDefinition =
            serde_yaml::from_str(text).map_err(|source| DefinitionError::Yaml {
                path: path.to_string(),
                source,
            })?;
        definition.check()?;
        Ok(definition)
    }

    /// Load the definition file from a template source
    pub fn load(source: &dyn TemplateSource) -> Result<Self, DefinitionError> {
        let template = source.load(DEFINITION_FILE).map_err(|err| match err {
            crate::templates::error::TemplateError::NotFound(id) => DefinitionError::NotFound(id),
            other => DefinitionError::Template(other),
        })?;
        Self::from_yaml(&template.id, &template.source)
    }

    /// Whether the definition creates a project directory
    pub fn is_project(&self) -> bool {
        self.meta.kind == TargetKind::Project
    }

    fn check(&self) -> Result<(), DefinitionError> {
        if self.files.is_empty() {
            return Err(DefinitionError::Invalid("no files listed".to_string()));
        }
        if let Some(item) = self.files.iter().find(|item| item.input.trim().is_empty()) {
            return Err(DefinitionError::Invalid(format!(
                "file entry with an empty 'in' (out: '{}')",
                item.out
            )));
        }
        if let Some(field) = self.fields.iter().find(|field| field.name.trim().is_empty()) {
            return Err(DefinitionError::Invalid(format!(
                "field with an empty name (value: {})",
                field.value
            )));
        }
        Ok(())
    }
}

/// `fields` is a list of single-entry maps; keep their order
fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let maps = Vec::<serde_yaml::Mapping>::deserialize(deserializer)?;
    let mut fields = Vec::new();

    for map in maps {
        for (key, value) in map {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(D::Error::custom(format!(
                        "field names must be strings, got {:?}",
                        other
                    )))
                }
            };
            let value = field_value(value)
                .ok_or_else(|| D::Error::custom(format!("unsupported value for field '{}'", name)))?;
            fields.push(Field { name, value });
        }
    }

    Ok(fields)
}

fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_value(value: serde_yaml::Value) -> Option<Value> {
    match value {
        serde_yaml::Value::Bool(b) => Some(Value::Bool(b)),
        serde_yaml::Value::Null => Some(Value::String(String::new())),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(scalar_string)
            .collect::<Option<Vec<_>>>()
            .map(Value::Sequence),
        other => scalar_string(&other).map(Value::String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::loader::{BuiltinTemplates, MemoryTemplates};

    const PROJECT: &str = r#"
version: "1"
meta:
  type: project
  title: Widgets
files:
  - in: main.cpp
  - in: mainwindow.h
    out: "{{ .fileNameBase }}"
    when: "{{ .useForm }}"
  - in: icon.png
    bypass: true
fields:
  - className: MainWindow
  - fileNameBase: "{{ .className }}"
  - useForm: false
  - modules: [Widgets, Gui]
  - major: 6
"#;

    #[test]
    fn test_parse_definition() {
        let definition = TemplateDefinition::from_yaml("templates.yml", PROJECT).unwrap();

        assert_eq!(definition.version, "1");
        assert!(definition.is_project());
        assert_eq!(definition.files.len(), 3);
        assert_eq!(definition.files[0].out, "");
        assert!(definition.files[2].bypass);

        let names: Vec<_> = definition.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["className", "fileNameBase", "useForm", "modules", "major"]);
        assert_eq!(definition.fields[2].value, Value::Bool(false));
        assert_eq!(definition.fields[3].value, Value::from(vec!["Widgets", "Gui"]));
        assert_eq!(definition.fields[4].value, Value::from("6"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let text = "meta:\n  type: library\nfiles:\n  - in: a.h\n";
        assert!(matches!(
            TemplateDefinition::from_yaml("x", text),
            Err(DefinitionError::Yaml { .. })
        ));
    }

    #[test]
    fn test_empty_files_rejected() {
        let text = "meta:\n  type: file\nfiles: []\n";
        assert!(matches!(
            TemplateDefinition::from_yaml("x", text),
            Err(DefinitionError::Invalid(_))
        ));
    }

    #[test]
    fn test_nested_field_rejected() {
        let text = "meta:\n  type: file\nfiles:\n  - in: a.h\nfields:\n  - opts: { a: b }\n";
        assert!(TemplateDefinition::from_yaml("x", text).is_err());
    }

    #[test]
    fn test_load_from_source() {
        let source = MemoryTemplates::new().with_template(DEFINITION_FILE, PROJECT);
        assert!(TemplateDefinition::load(&source).is_ok());

        let empty = MemoryTemplates::new();
        assert!(matches!(
            TemplateDefinition::load(&empty),
            Err(DefinitionError::NotFound(_))
        ));
    }

    #[test]
    fn test_bundled_definitions_parse() {
        for preset in BuiltinTemplates::presets() {
            let source = BuiltinTemplates::preset(preset).unwrap();
            let definition = TemplateDefinition::load(&source).unwrap();
            for item in &definition.files {
                assert!(source.contains(&item.input), "{} lists missing {}", preset, item.input);
            }
        }
    }
}
