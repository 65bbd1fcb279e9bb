// Command routing and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::*;
use crate::config::{CliConfig, ConfigManager};
use crate::error::CliResult;
use crate::logging::{init_logging, VerbosityLevel};

/// qtscaffold - render and scaffold Qt project templates
#[derive(Parser, Debug)]
#[command(name = "qtscaffold")]
#[command(bin_name = "qtscaffold")]
#[command(about = "Render and scaffold Qt project templates")]
#[command(
    long_about = "qtscaffold renders Go text/template style templates and scaffolds the results into a directory.\n\nQuick start:\n  • qtscaffold presets                       List bundled and user presets\n  • qtscaffold new Counter --preset cpp/class Create Counter.h and Counter.cpp\n  • qtscaffold render header.h --set name=Foo Render one template to stdout"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: the per-user config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render one template file to stdout
    Render {
        /// Template file
        #[arg(value_name = "TEMPLATE_FILE")]
        file: PathBuf,

        /// Context value; `true`/`false` are booleans, `[a,b]` is a sequence
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// JSON or YAML file with context values
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,
    },

    /// Scaffold the entries of a manifest into a directory
    Apply {
        /// Directory every output must stay inside
        #[arg(value_name = "TARGET_DIR")]
        target: PathBuf,

        /// JSON or YAML manifest
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,

        /// Report what would be written without writing
        #[arg(long)]
        dry_run: bool,

        /// Replace existing files
        #[arg(long)]
        overwrite: bool,
    },

    /// Create a file or project from a preset
    New {
        /// Name of the class, file or project
        #[arg(value_name = "NAME")]
        name: String,

        /// Bundled preset, preset under templates_dir, preset directory, or saved user preset
        #[arg(long, short)]
        preset: String,

        /// Directory to generate into
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Context value overriding the preset's fields
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// Report what would be written without writing
        #[arg(long)]
        dry_run: bool,

        /// Replace existing files
        #[arg(long)]
        overwrite: bool,

        /// Save the preset and the effective --set values as a user preset
        #[arg(long, value_name = "PRESET_NAME")]
        save_preset: Option<String>,
    },

    /// List, show and manage presets (default: ls)
    Presets {
        #[command(subcommand)]
        action: Option<PresetsAction>,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse arguments, set up configuration and logging, run the command
    pub fn route() -> CliResult<()> {
        let cli = Cli::parse();

        let manager = Self::config_manager(&cli);
        let config = manager.load_config()?;
        init_logging(
            VerbosityLevel::from_flags(cli.verbose, cli.quiet),
            &config.log_level,
        );

        Self::execute(&cli, manager, config)
    }

    /// Config manager for `--config`, or the per-user default
    pub fn config_manager(cli: &Cli) -> ConfigManager {
        match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone()),
            None => ConfigManager::new(),
        }
    }

    /// Execute a parsed command
    pub fn execute(cli: &Cli, manager: ConfigManager, config: CliConfig) -> CliResult<()> {
        match cli.command.clone() {
            Commands::Render {
                file,
                assignments,
                context,
            } => RenderCommand::new(file, assignments, context).execute(),
            Commands::Apply {
                target,
                manifest,
                dry_run,
                overwrite,
            } => ApplyCommand::new(target, manifest, dry_run, overwrite || config.overwrite)
                .execute(),
            Commands::New {
                name,
                preset,
                dir,
                assignments,
                dry_run,
                overwrite,
                save_preset,
            } => NewCommand {
                name,
                preset,
                dir,
                assignments,
                dry_run,
                overwrite,
                save_preset,
                config,
            }
            .execute(),
            Commands::Presets { action } => PresetsCommand::new(
                action.unwrap_or_default(),
                config.templates_dir.clone(),
                config.presets_path(),
            )
            .execute(),
            Commands::Config { init } => ConfigCommand::new(manager, config, init).execute(),
        }
    }
}
