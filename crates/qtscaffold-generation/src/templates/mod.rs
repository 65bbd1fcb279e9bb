//! Template engine module
//!
//! Provides template parsing, rendering, the helper library and template
//! sources.

pub mod engine;
pub mod error;
pub mod expression;
pub mod helpers;
pub mod loader;
pub mod parser;
pub mod trim;
pub mod validation;

// Re-export public API
pub use engine::TemplateEngine;
pub use error::{HelperArgumentError, TemplateError};
pub use expression::{Expr, Statement};
pub use helpers::{HelperFn, HelperLibrary, HELPER_NAMESPACE};
pub use loader::{BuiltinTemplates, CacheStats, MemoryTemplates, TemplateLoader, TemplateSource};
pub use parser::{Branch, ParsedTemplate, TemplateElement, TemplateParser};
pub use validation::ValidationEngine;
