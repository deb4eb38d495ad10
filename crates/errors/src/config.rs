//! Errors raised while loading the droidpm config file and environment

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigError {
    #[error("no user config directory on this system")]
    NoConfigDir,

    #[error("cannot read config {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("config is not valid TOML: {message}")]
    Syntax { message: String },

    #[error("{field} must not be empty")]
    MissingField { field: String },

    #[error("{field} has unusable value {value:?}")]
    InvalidValue { field: String, value: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoConfigDir | Self::Unreadable { .. } => {
                Some("Pass --config with a readable file, or run without one to use defaults.")
            }
            Self::Syntax { .. } | Self::MissingField { .. } | Self::InvalidValue { .. } => {
                Some("Correct the named setting in the config file or DROIDPM_* variable.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NoConfigDir => "config.no_config_dir",
            Self::Unreadable { .. } => "config.unreadable",
            Self::Syntax { .. } => "config.syntax",
            Self::MissingField { .. } => "config.missing_field",
            Self::InvalidValue { .. } => "config.invalid_value",
        })
    }
}
