// Show or initialize the CLI configuration

use super::Command;
use crate::config::{CliConfig, ConfigManager};
use crate::error::CliResult;
use crate::output::{self, OutputStyle};

/// Print the effective configuration, or write a default config file
pub struct ConfigCommand {
    pub manager: ConfigManager,
    pub config: CliConfig,
    pub init: bool,
}

impl ConfigCommand {
    pub fn new(manager: ConfigManager, config: CliConfig, init: bool) -> Self {
        Self {
            manager,
            config,
            init,
        }
    }

    fn describe(&self, style: &OutputStyle) -> String {
        let templates_dir = self
            .config
            .templates_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        [
            style.header("Configuration"),
            style.key_value("file", &self.manager.config_path().display().to_string()),
            style.key_value("overwrite", &self.config.overwrite.to_string()),
            style.key_value("polish_output", &self.config.polish_output.to_string()),
            style.key_value("templates_dir", &templates_dir),
            style.key_value("presets_file", &self.config.presets_path().display().to_string()),
            style.key_value("log_level", &self.config.log_level),
        ]
        .join("\n")
    }
}

impl Command for ConfigCommand {
    fn execute(&self) -> CliResult<()> {
        if self.init {
            let path = self.manager.config_path();
            if path.exists() {
                output::print_warning(&format!("{} already exists", path.display()));
                return Ok(());
            }
            self.manager.save_config(&CliConfig::default())?;
            output::print_success(&format!("Wrote {}", path.display()));
            return Ok(());
        }

        println!("{}", self.describe(&OutputStyle::default()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_defaults_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("qtscaffold/config.toml");
        let command = ConfigCommand::new(ConfigManager::with_path(&path), CliConfig::default(), true);

        command.execute().unwrap();
        assert!(path.is_file());
        let loaded = ConfigManager::with_path(&path).load_config().unwrap();
        assert_eq!(loaded, CliConfig::default());

        command.execute().unwrap();
    }

    #[test]
    fn test_describe_lists_keys() {
        let command = ConfigCommand::new(
            ConfigManager::with_path("/etc/qtscaffold.toml"),
            CliConfig::default(),
            false,
        );
        let text = command.describe(&OutputStyle { use_colors: false });
        assert!(text.contains("  file: /etc/qtscaffold.toml"));
        assert!(text.contains("  polish_output: true"));
        assert!(text.contains("  templates_dir: (none)"));
    }
}
