//! Errors from system service proxies (package, activity, broker)

use std::borrow::Cow;

use crate::{PlatformError, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServiceError {
    #[error("{service} is unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{call} failed: {message}")]
    CallFailed { call: String, message: String },

    #[error("unexpected reply to {call}: {reply}")]
    UnexpectedReply { call: String, reply: String },

    #[error("invalid session id: {session_id}")]
    InvalidSession { session_id: i32 },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl UserFacingError for ServiceError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unavailable { .. } => Some("Check that the privilege broker is running."),
            Self::Platform(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Unavailable { .. } => "service.unavailable",
            Self::CallFailed { .. } => "service.call_failed",
            Self::UnexpectedReply { .. } => "service.unexpected_reply",
            Self::InvalidSession { .. } => "service.invalid_session",
            Self::Platform(err) => return err.user_code(),
        })
    }
}
