use serde::{Deserialize, Serialize};

use droidpm_types::PrivilegeMode;

/// Package operation events
///
/// `AppInstall` and `AppUninstall` are the completion broadcasts: every
/// install or uninstall call publishes exactly one of them, whether it
/// succeeded or not. `status_message` is only present on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    AppInstall {
        package: Option<String>,
        mode: PrivilegeMode,
        success: bool,
        status_message: Option<String>,
    },

    AppUninstall {
        package: String,
        mode: PrivilegeMode,
        success: bool,
        status_message: Option<String>,
    },

    SessionCreated {
        session_id: i32,
        mode: PrivilegeMode,
        parts: usize,
    },

    SessionCommitted {
        session_id: i32,
    },

    /// The system paused the session until the user confirms it
    UserActionRequired {
        session_id: i32,
    },

    /// The session was released without a successful commit
    SessionAbandoned {
        session_id: i32,
        reason: String,
    },
}

impl PackageEvent {
    /// Completion broadcast for an install of `package` (unknown for split sets
    /// whose name was not resolved up front).
    pub fn app_install(
        package: Option<String>,
        mode: PrivilegeMode,
        outcome: Result<(), &str>,
    ) -> Self {
        Self::AppInstall {
            package,
            mode,
            success: outcome.is_ok(),
            status_message: outcome.err().map(str::to_string),
        }
    }

    pub fn app_uninstall(
        package: impl Into<String>,
        mode: PrivilegeMode,
        outcome: Result<(), &str>,
    ) -> Self {
        Self::AppUninstall {
            package: package.into(),
            mode,
            success: outcome.is_ok(),
            status_message: outcome.err().map(str::to_string),
        }
    }
}
