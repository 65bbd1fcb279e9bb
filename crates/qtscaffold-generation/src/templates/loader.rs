//! Template sources
//!
//! A [`TemplateSource`] resolves template identifiers to template text.
//! Three sources ship with the crate: a directory on disk with a read cache,
//! an in-memory map, and the bundled catalogue compiled into the binary.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::models::Template;
use crate::templates::error::TemplateError;

/// Resolves template identifiers to templates
pub trait TemplateSource: Send + Sync {
    /// Load the template registered under `id`
    fn load(&self, id: &str) -> Result<Template, TemplateError>;

    /// Whether `id` can be loaded
    fn contains(&self, id: &str) -> bool {
        self.load(id).is_ok()
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for &T {
    fn load(&self, id: &str) -> Result<Template, TemplateError> {
        (**self).load(id)
    }

    fn contains(&self, id: &str) -> bool {
        (**self).contains(id)
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn load(&self, id: &str) -> Result<Template, TemplateError> {
        (**self).load(id)
    }

    fn contains(&self, id: &str) -> bool {
        (**self).contains(id)
    }
}

/// Template ids are forward-slash relative paths that stay below their root
fn is_relative_id(id: &str) -> bool {
    !id.is_empty()
        && Path::new(id)
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Loads templates from a directory, caching each file after the first read
pub struct TemplateLoader {
    /// Directory template ids are relative to
    root: PathBuf,
    /// Cache of loaded templates
    cache: RwLock<HashMap<String, Template>>,
}

impl TemplateLoader {
    /// Create a loader rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Directory template ids are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a template from a file
    ///
    /// # Arguments
    /// * `id` - Path of the template relative to the loader root
    ///
    /// # Returns
    /// Loaded template or error
    pub fn load_from_file(&self, id: &str) -> Result<Template, TemplateError> {
        if !is_relative_id(id) {
            return Err(TemplateError::NotFound(id.to_string()));
        }

        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return Ok(cached.clone());
        }

        let path = self.root.join(id);
        let source = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(id.to_string()),
            _ => TemplateError::Io {
                path: path.display().to_string(),
                source,
            },
        })?;

        debug!(template = id, path = %path.display(), "loaded template from disk");

        let template = Template::new(id, source);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), template.clone());

        Ok(template)
    }

    /// Clear the template cache
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            cached_templates: self
                .cache
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

impl TemplateSource for TemplateLoader {
    fn load(&self, id: &str) -> Result<Template, TemplateError> {
        self.load_from_file(id)
    }

    fn contains(&self, id: &str) -> bool {
        is_relative_id(id) && self.root.join(id).is_file()
    }
}

/// Statistics about the template cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached templates
    pub cached_templates: usize,
}

/// Templates held in memory, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<String, String>,
}

impl MemoryTemplates {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_template(mut self, id: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(id, source);
        self
    }

    /// Register or replace a template
    pub fn insert(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(id.into(), source.into());
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl TemplateSource for MemoryTemplates {
    fn load(&self, id: &str) -> Result<Template, TemplateError> {
        self.templates
            .get(id)
            .map(|source| Template::new(id, source.as_str()))
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }
}

macro_rules! bundled {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../../assets/templates/", $path)))),*]
    };
}

/// Every bundled file as `(path, contents)`
const BUNDLED_FILES: &[(&str, &str)] = bundled![
    "cpp/class/templates.yml",
    "cpp/class/cpp-class.h",
    "cpp/class/cpp-class.cpp",
    "projects/cpp/qwidget/templates.yml",
    "projects/cpp/qwidget/CMakeLists.txt",
    "projects/cpp/qwidget/main.cpp",
    "projects/cpp/qwidget/mainwindow.h",
    "projects/cpp/qwidget/mainwindow.cpp",
    "projects/cpp/qwidget/mainwindow.ui",
];

/// Bundled preset directories
pub const BUNDLED_PRESETS: &[&str] = &["cpp/class", "projects/cpp/qwidget"];

/// Catalogue of templates compiled into the crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    /// Names of the bundled presets
    pub fn presets() -> &'static [&'static str] {
        BUNDLED_PRESETS
    }

    /// Contents of a bundled file by its full path
    pub fn get(path: &str) -> Option<&'static str> {
        BUNDLED_FILES
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, contents)| *contents)
    }

    /// Files of one preset, with ids relative to the preset directory
    pub fn preset(name: &str) -> Option<MemoryTemplates> {
        let name = name.trim_matches('/');
        if !BUNDLED_PRESETS.contains(&name) {
            return None;
        }

        let prefix = format!("{}/", name);
        let templates = BUNDLED_FILES
            .iter()
            .filter_map(|(path, contents)| {
                path.strip_prefix(&prefix)
                    .map(|relative| (relative.to_string(), contents.to_string()))
            })
            .collect();

        Some(MemoryTemplates { templates })
    }
}

impl TemplateSource for BuiltinTemplates {
    fn load(&self, id: &str) -> Result<Template, TemplateError> {
        Self::get(id)
            .map(|source| Template::new(id, source))
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> bool {
        Self::get(id).is_some()
    }
}
