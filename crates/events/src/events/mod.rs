use serde::{Deserialize, Serialize};

use crate::EventSource;
use droidpm_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the failure has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod module;
pub mod package;
pub mod platform;

pub use general::*;
pub use module::*;
pub use package::*;
pub use platform::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Diagnostics (debug, info, warning, error)
    General(GeneralEvent),

    /// Install/uninstall broadcasts and session lifecycle
    Package(PackageEvent),

    /// Shell command execution
    Platform(PlatformEvent),

    /// Patch-install pipeline
    Module(ModuleEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Package(PackageEvent::AppInstall { .. }) => EventSource::INSTALL,
            Self::Package(PackageEvent::AppUninstall { .. }) => EventSource::UNINSTALL,
            Self::Package(_) => EventSource::SESSION,
            Self::Platform(_) => EventSource::PLATFORM,
            Self::Module(_) => EventSource::MODULE,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Platform(PlatformEvent::CommandFailed { .. })
            | Self::Module(ModuleEvent::StepFailed { .. }) => Level::ERROR,

            Self::Package(
                PackageEvent::AppInstall { success: false, .. }
                | PackageEvent::AppUninstall { success: false, .. },
            ) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Module(ModuleEvent::UnmountSkipped { .. })
            | Self::Package(
                PackageEvent::SessionAbandoned { .. } | PackageEvent::UserActionRequired { .. },
            ) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Platform(PlatformEvent::CommandStarted { .. } | PlatformEvent::CommandCompleted { .. })
            | Self::Module(ModuleEvent::StepStarted { .. } | ModuleEvent::StepCompleted { .. }) => {
                Level::DEBUG
            }

            _ => Level::INFO,
        }
    }
}
