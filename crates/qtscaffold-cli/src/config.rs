// Layered CLI configuration: config file, then QTSCAFFOLD_* environment

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use crate::user_presets::UserPresetFile;

/// Prefix of the environment variables that override file settings
pub const ENV_PREFIX: &str = "QTSCAFFOLD";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Effective CLI settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Replace existing output files
    pub overwrite: bool,
    /// Polish definition-driven output before writing
    pub polish_output: bool,
    /// Directory holding user presets, searched by `new --preset`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// YAML file holding saved user presets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets_file: Option<PathBuf>,
    /// Default log level when neither `-v` nor `-q` is given
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            polish_output: true,
            templates_dir: None,
            presets_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// `presets_file`, or the per-user default
    pub fn presets_path(&self) -> PathBuf {
        self.presets_file
            .clone()
            .unwrap_or_else(UserPresetFile::default_path)
    }
}

/// Loads, validates and saves [`CliConfig`]
pub struct ConfigManager {
    config_path: PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Manager for the default per-user config file
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Manager for an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// `<config dir>/qtscaffold/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qtscaffold")
            .join("config.toml")
    }

    /// Config file this manager reads and writes
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file (if present) and environment overrides, then validate
    pub fn load_config(&self) -> CliResult<CliConfig> {
        let config = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(&self.env_prefix).try_parsing(true))
            .build()?;

        let cli_config: CliConfig = config.try_deserialize()?;
        self.validate_config(&cli_config)?;
        Ok(cli_config)
    }

    /// Write `config` as TOML, creating the parent directory
    pub fn save_config(&self, config: &CliConfig) -> CliResult<()> {
        let toml = toml::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
        }
        std::fs::write(&self.config_path, toml).map_err(|e| CliError::io(&self.config_path, e))?;
        Ok(())
    }

    /// Reject settings the CLI cannot act on
    pub fn validate_config(&self, config: &CliConfig) -> CliResult<()> {
        let level = config.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(CliError::Config(format!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                config.log_level
            )));
        }
        if let Some(dir) = &config.templates_dir {
            if dir.as_os_str().is_empty() {
                return Err(CliError::Config("templates_dir must not be empty".to_string()));
            }
        }
        if let Some(file) = &config.presets_file {
            if file.as_os_str().is_empty() {
                return Err(CliError::Config("presets_file must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("absent.toml"));

        let config = manager.load_config().unwrap();
        assert!(config.polish_output);
        assert!(!config.overwrite);
        assert_eq!(config.templates_dir, None);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "overwrite = true\npolish_output = false\ntemplates_dir = \"/opt/presets\"\nlog_level = \"warn\"\n",
        )
        .unwrap();

        let config = ConfigManager::with_path(&path).load_config().unwrap();
        assert!(config.overwrite);
        assert!(!config.polish_output);
        assert_eq!(config.templates_dir, Some(PathBuf::from("/opt/presets")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "log_level = \"loud\"\n").unwrap();

        let err = ConfigManager::with_path(&path).load_config().unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_presets_path_follows_setting() {
        let mut config = CliConfig::default();
        assert_eq!(config.presets_path(), UserPresetFile::default_path());

        config.presets_file = Some(PathBuf::from("/srv/presets.yml"));
        assert_eq!(config.presets_path(), PathBuf::from("/srv/presets.yml"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("nested/config.toml"));
        let config = CliConfig {
            overwrite: true,
            ..CliConfig::default()
        };

        manager.save_config(&config).unwrap();
        assert_eq!(manager.load_config().unwrap(), config);
    }
}
