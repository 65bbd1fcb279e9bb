// qtscaffold CLI library

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod router;
pub mod user_presets;

pub use config::{CliConfig, ConfigManager};
pub use error::{CliError, CliResult};
pub use logging::{init_logging, VerbosityLevel};
pub use router::{Cli, CommandRouter, Commands};
pub use user_presets::{UserPreset, UserPresetFile};
