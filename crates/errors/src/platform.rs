//! Privileged shell execution errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised before a shell command could report its own exit status.
///
/// A command that runs and exits non-zero is not a `PlatformError`; callers
/// inspect the captured output instead.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlatformError {
    #[error("failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("shell program not found: {program}")]
    CommandNotFound { program: String },

    #[error("failed to read command input {path}: {message}")]
    InputUnreadable { path: String, message: String },

    #[error("failed to stream input into `{command}`: {message}")]
    StdinFailed { command: String, message: String },

    #[error("failed to collect output of `{command}`: {message}")]
    OutputFailed { command: String, message: String },

    #[error("permission denied: {operation} - {message}")]
    PermissionDenied { operation: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandNotFound { .. } => {
                Some("Check the shell binaries configured in the [shell] section.")
            }
            Self::PermissionDenied { .. } => {
                Some("Grant root or broker access to this tool and retry.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::SpawnFailed { .. } => "platform.spawn_failed",
            Self::CommandNotFound { .. } => "platform.command_not_found",
            Self::InputUnreadable { .. } => "platform.input_unreadable",
            Self::StdinFailed { .. } => "platform.stdin_failed",
            Self::OutputFailed { .. } => "platform.output_failed",
            Self::PermissionDenied { .. } => "platform.permission_denied",
        })
    }
}
