#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for droidpm
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/droidpm/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use droidpm_errors::{ConfigError, Error};
use droidpm_types::PrivilegeMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub module: ModuleConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub privilege_mode: PrivilegeMode,
}

/// Shell programs used by the three backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_root_binary")]
    pub root_binary: String,
    #[serde(default = "default_user_binary")]
    pub user_binary: String,
    #[serde(default = "default_broker_binary")]
    pub broker_binary: String,
}

/// Installer session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long to wait for the system to report a commit or uninstall result
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
}

/// Root module configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_module_root")]
    pub root: PathBuf,
    /// World-readable directory the patched apk is staged in before copying
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_module_id")]
    pub id: String,
    #[serde(default = "default_module_name")]
    pub name: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            root_binary: default_root_binary(),
            user_binary: default_user_binary(),
            broker_binary: default_broker_binary(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            completion_timeout_secs: default_completion_timeout(),
        }
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            root: default_module_root(),
            staging_dir: default_staging_dir(),
            id: default_module_id(),
            name: default_module_name(),
        }
    }
}

// Default value functions for serde
fn default_root_binary() -> String {
    constants::DEFAULT_ROOT_SHELL.to_string()
}

fn default_user_binary() -> String {
    constants::DEFAULT_USER_SHELL.to_string()
}

fn default_broker_binary() -> String {
    constants::DEFAULT_BROKER_SHELL.to_string()
}

fn default_completion_timeout() -> u64 {
    constants::DEFAULT_COMPLETION_TIMEOUT_SECS
}

fn default_module_root() -> PathBuf {
    PathBuf::from(constants::DEFAULT_MODULE_ROOT)
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_STAGING_DIR)
}

fn default_module_id() -> String {
    constants::MODULE_ID.to_string()
}

fn default_module_name() -> String {
    constants::MODULE_NAME.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("droidpm").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::Syntax {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit path, or fall back to [`Config::load`]
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides supplied by `lookup`, keyed like the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a supplied value is invalid.
    pub fn merge_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        // DROIDPM_MODE
        if let Some(mode) = lookup("DROIDPM_MODE") {
            self.general.privilege_mode =
                mode.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "DROIDPM_MODE".to_string(),
                    value: mode,
                })?;
        }

        // DROIDPM_SU
        if let Some(su) = lookup("DROIDPM_SU") {
            self.shell.root_binary = su;
        }

        // DROIDPM_BROKER
        if let Some(broker) = lookup("DROIDPM_BROKER") {
            self.shell.broker_binary = broker;
        }

        // DROIDPM_COMPLETION_TIMEOUT
        if let Some(timeout) = lookup("DROIDPM_COMPLETION_TIMEOUT") {
            self.session.completion_timeout_secs =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "DROIDPM_COMPLETION_TIMEOUT".to_string(),
                    value: timeout,
                })?;
        }

        // DROIDPM_MODULE_ROOT
        if let Some(root) = lookup("DROIDPM_MODULE_ROOT") {
            self.module.root = PathBuf::from(root);
        }

        self.validate()
    }

    /// Reject values that would make every operation fail
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.session.completion_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.completion_timeout_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if !self.module.root.is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: "module.root".to_string(),
                value: self.module.root.display().to_string(),
            }
            .into());
        }
        for (field, value) in [
            ("shell.root_binary", &self.shell.root_binary),
            ("shell.user_binary", &self.shell.user_binary),
            ("shell.broker_binary", &self.shell.broker_binary),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.session.completion_timeout_secs)
    }
}
