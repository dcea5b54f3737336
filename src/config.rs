//! Configuration handling for the plugin host
//!
//! Configuration is read from TOML. The first file found wins:
//! 1. an explicit `--config` path
//! 2. `./binop.toml`
//! 3. `<config dir>/binop/config.toml` (global)
//!
//! Command-line flags are applied on top by the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plugin::{PluginLimits, DEFAULT_PACKAGE_EXTENSION};

/// Name of the configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "binop.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    /// Directory scanned for plugin packages
    pub plugin_dir: PathBuf,

    /// Extension of plugin package files, without the dot
    pub package_extension: String,

    /// Execution budget for plugin code
    pub limits: PluginLimits,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("./plugins"),
            package_extension: DEFAULT_PACKAGE_EXTENSION.to_string(),
            limits: PluginLimits::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HostConfig {
    /// Loads configuration from `explicit`, or from the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(&local);
        }

        match Self::global_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads and validates one configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        Ok(config)
    }

    /// Parses and validates configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: HostConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let extension = self.package_extension.trim();
        if extension.is_empty() {
            return Err(ConfigError::Invalid(
                "package_extension must not be empty".to_string(),
            ));
        }
        if extension.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "package_extension must not start with a dot: {extension}"
            )));
        }
        if self.limits.instantiate_fuel == 0 || self.limits.invoke_fuel == 0 {
            return Err(ConfigError::Invalid(
                "fuel limits must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_entry_size == 0 {
            return Err(ConfigError::Invalid(
                "max_entry_size must be greater than zero".to_string(),
            ));
        }
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("plugin_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "binop", "binop").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = HostConfig::default();

        assert_eq!(config.plugin_dir, PathBuf::from("./plugins"));
        assert_eq!(config.package_extension, "zip");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
plugin_dir = "/opt/binop/plugins"
package_extension = "opk"

[limits]
instantiate_fuel = 500
invoke_fuel = 50
max_entry_size = 1048576

[logging]
level = "debug"
"#;

        let config = HostConfig::parse(toml).unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("/opt/binop/plugins"));
        assert_eq!(config.package_extension, "opk");
        assert_eq!(config.limits.instantiate_fuel, 500);
        assert_eq!(config.limits.invoke_fuel, 50);
        assert_eq!(config.limits.max_entry_size, 1_048_576);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = HostConfig::parse("[limits]\ninvoke_fuel = 7\n").unwrap();

        assert_eq!(config.limits.invoke_fuel, 7);
        assert_eq!(
            config.limits.instantiate_fuel,
            PluginLimits::default().instantiate_fuel
        );
        assert_eq!(config.package_extension, "zip");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            HostConfig::parse("package_extension = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HostConfig::parse("package_extension = \".zip\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HostConfig::parse("[limits]\ninvoke_fuel = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HostConfig::parse("[limits]\nmax_entry_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn entry_size_limit_is_configurable() {
        let config = HostConfig::parse("[limits]\nmax_entry_size = 4096\n").unwrap();
        assert_eq!(config.limits.max_entry_size, 4096);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            HostConfig::parse("plugin_dir = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "plugin_dir = \"elsewhere\"\n").unwrap();

        let config = HostConfig::load(Some(&path)).unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(HostConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
