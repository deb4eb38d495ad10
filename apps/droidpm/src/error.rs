//! CLI error handling

use std::fmt;

use droidpm_errors::{OperationError, UserFacingError};

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded
    Config(droidpm_errors::Error),
    /// A privileged operation failed
    Operation(OperationError),
    /// Invalid command arguments
    InvalidArguments(String),
    /// Result rendering failed
    Io(std::io::Error),
}

impl CliError {
    /// Stable code for JSON output
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) => e.user_code(),
            CliError::Operation(e) => e.user_code(),
            CliError::InvalidArguments(_) | CliError::Io(_) => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: {}", e.user_message())?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Operation(e) => {
                write!(f, "{}", e.user_message())?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Operation(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<droidpm_errors::Error> for CliError {
    fn from(e: droidpm_errors::Error) -> Self {
        match e {
            droidpm_errors::Error::Operation(op) => CliError::Operation(op),
            other => CliError::Config(other),
        }
    }
}

impl From<OperationError> for CliError {
    fn from(e: OperationError) -> Self {
        CliError::Operation(e)
    }
}

impl From<droidpm_errors::ModuleError> for CliError {
    fn from(e: droidpm_errors::ModuleError) -> Self {
        CliError::Operation(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
