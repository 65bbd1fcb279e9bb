#![warn(missing_docs)]

//! Template rendering and scaffolding for Qt project templates
//!
//! Renders templates written in a Go `text/template` compatible subset
//! against a variable context, and scaffolds batches of rendered files into
//! a target directory. Template definitions (`templates.yml`) describe
//! complete file and project presets on top of that.

pub mod definition;
pub mod error;
pub mod generator;
pub mod models;
pub mod output_writer;
pub mod scaffolder;
pub mod templates;

// Re-export public API
pub use definition::{DefinitionMeta, Field, FileItem, TargetKind, TemplateDefinition, DEFINITION_FILE};
pub use error::{DefinitionError, ScaffoldError};
pub use generator::{normalize_file_ext, GenerateOptions, GenerationPlan, Generator};
pub use models::{ScaffoldEntry, Template, TemplateContext, Value};
pub use output_writer::{polish_output, resolve_output_path, FileWriteResult, OutputWriter, OutputWriterConfig};
pub use scaffolder::{EntryOutcome, ScaffoldReport, Scaffolder};
pub use templates::{
    BuiltinTemplates, HelperArgumentError, HelperLibrary, MemoryTemplates, ParsedTemplate,
    TemplateEngine, TemplateError, TemplateLoader, TemplateParser, TemplateSource, ValidationEngine,
};
