//! Core data models for template rendering and scaffolding

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// A value bound to a context key or a local variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag (e.g. `useForm`)
    Bool(bool),
    /// Plain string (e.g. `name`, `baseClass`)
    String(String),
    /// Ordered sequence of strings
    Sequence(Vec<String>),
}

impl Value {
    /// Truthiness used by `if`, `not`, `and` and `or`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Sequence(items) => !items.is_empty(),
        }
    }

    /// Name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
        }
    }

    /// Borrow the string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the sequence payload, if any
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => f.write_str(s),
            Value::Sequence(items) => write!(f, "[{}]", items.join(" ")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::Sequence(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::Sequence(value.into_iter().map(str::to_string).collect())
    }
}

/// Variables passed into one render call
///
/// Keys are kept in sorted order so iteration (and serialization) is
/// deterministic. The renderer only ever reads from a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateContext {
    values: BTreeMap<String, Value>,
}

impl TemplateContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether a key is bound
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over bindings in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every binding of `other` into this context, replacing existing keys
    pub fn extend(&mut self, other: &TemplateContext) {
        for (key, value) in other.iter() {
            self.values.insert(key.to_string(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TemplateContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = TemplateContext::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// Template text plus the identifier used in error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Identifier, usually the path relative to the template root
    pub id: String,
    /// Raw template source
    pub source: String,
}

impl Template {
    /// Create a template from an identifier and its source text
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// One unit of work for the scaffolder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldEntry {
    /// Template identifier resolved through the scaffolder's template source
    #[serde(rename = "template")]
    pub template_id: String,
    /// Output path relative to the target directory
    #[serde(rename = "output")]
    pub output_path: PathBuf,
    /// Variables for this entry
    #[serde(default)]
    pub context: TemplateContext,
    /// Copy the template text without rendering it
    #[serde(default)]
    pub bypass: bool,
}

impl ScaffoldEntry {
    /// Create an entry that renders `template_id` into `output_path`
    pub fn new(
        template_id: impl Into<String>,
        output_path: impl AsRef<Path>,
        context: TemplateContext,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            output_path: output_path.as_ref().to_path_buf(),
            context,
            bypass: false,
        }
    }

    /// Mark the entry as a verbatim copy
    pub fn bypassed(mut self) -> Self {
        self.bypass = true;
        self
    }
}
