//! Closed failure taxonomy shared by every privileged operation.
//!
//! Every failure the package backends or the module pipeline can produce maps
//! to exactly one [`ErrorCode`]. Free-text diagnostics travel alongside in
//! [`OperationError::message`] and are never folded into the code itself.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::UserFacingError;

/// The lifecycle phase an [`ErrorCode`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorPhase {
    Acquisition,
    Session,
    Install,
    Uninstall,
    Launch,
    AppControl,
    Patch,
    Script,
}

macro_rules! error_codes {
    ($( $phase:ident => { $( $variant:ident = $text:literal ),* $(,)? } )*) => {
        /// Stable error codes surfaced to callers and broadcast observers.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
        pub enum ErrorCode {
            $( $( $variant, )* )*
        }

        impl ErrorCode {
            /// Every code, grouped by phase in declaration order.
            pub const ALL: &'static [ErrorCode] = &[ $( $( ErrorCode::$variant, )* )* ];

            /// Identifier shown to users and written into events.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $( Self::$variant => $text, )* )*
                }
            }

            #[must_use]
            pub fn phase(self) -> ErrorPhase {
                match self {
                    $( $( Self::$variant => ErrorPhase::$phase, )* )*
                }
            }
        }
    };
}

error_codes! {
    Acquisition => {
        GetFailedPackageVersionCode = "GET_FAILED_PACKAGE_VERSION_CODE",
        GetFailedPackageVersionName = "GET_FAILED_PACKAGE_VERSION_NAME",
        GetFailedPackageDir = "GET_FAILED_PACKAGE_DIR",
        GetFailedBroker = "GET_FAILED_BROKER",
    }
    Session => {
        SessionFailedCreate = "SESSION_FAILED_CREATE",
        SessionFailedCommit = "SESSION_FAILED_COMMIT",
        SessionFailedWrite = "SESSION_FAILED_WRITE",
        SessionFailedCopy = "SESSION_FAILED_COPY",
        SessionFailedOpen = "SESSION_FAILED_OPEN",
        SessionInvalidId = "SESSION_INVALID_ID",
    }
    Install => {
        InstallFailedAborted = "INSTALL_FAILED_ABORTED",
        InstallFailedAlreadyExists = "INSTALL_FAILED_ALREADY_EXISTS",
        InstallFailedCpuAbiIncompatible = "INSTALL_FAILED_CPU_ABI_INCOMPATIBLE",
        InstallFailedInsufficientStorage = "INSTALL_FAILED_INSUFFICIENT_STORAGE",
        InstallFailedInvalidApk = "INSTALL_FAILED_INVALID_APK",
        InstallFailedVersionDowngrade = "INSTALL_FAILED_VERSION_DOWNGRADE",
        InstallFailedParseNoCertificates = "INSTALL_FAILED_PARSE_NO_CERTIFICATES",
        InstallFailedTimeout = "INSTALL_FAILED_TIMEOUT",
        InstallFailedUnknown = "INSTALL_FAILED_UNKNOWN",
    }
    Uninstall => {
        UninstallFailed = "UNINSTALL_FAILED",
        UninstallFailedTimeout = "UNINSTALL_FAILED_TIMEOUT",
    }
    Launch => {
        LaunchFailed = "LAUNCH_FAILED",
    }
    AppControl => {
        SetFailedInstaller = "SET_FAILED_INSTALLER",
        AppFailedForceStop = "APP_FAILED_FORCE_STOP",
    }
    Patch => {
        PatchFailedModule = "PATCH_FAILED_MODULE",
        PatchFailedFolder = "PATCH_FAILED_FOLDER",
        PatchFailedScript = "PATCH_FAILED_SCRIPT",
        PatchFailedCopy = "PATCH_FAILED_COPY",
        PatchFailedChmod = "PATCH_FAILED_CHMOD",
        PatchFailedChown = "PATCH_FAILED_CHOWN",
        PatchFailedChcon = "PATCH_FAILED_CHCON",
        PatchFailedMount = "PATCH_FAILED_MOUNT",
        PatchFailedDestroy = "PATCH_FAILED_DESTROY",
    }
    Script => {
        ScriptFailedSetupPostFs = "SCRIPT_FAILED_SETUP_POST_FS",
        ScriptFailedSetupServiceD = "SCRIPT_FAILED_SETUP_SERVICE_D",
        ScriptFailedDestroyPostFs = "SCRIPT_FAILED_DESTROY_POST_FS",
        ScriptFailedDestroyServiceD = "SCRIPT_FAILED_DESTROY_SERVICE_D",
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure half of every privileged operation's result.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[error("{code}: {message}")]
pub struct OperationError {
    pub code: ErrorCode,
    pub message: String,
}

impl OperationError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The backend does not implement the requested capability.
    #[must_use]
    pub fn unsupported(code: ErrorCode) -> Self {
        Self::new(code, "Unsupported")
    }
}

impl UserFacingError for OperationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self.code {
            ErrorCode::GetFailedBroker => {
                Some("Start the privilege broker and grant this tool access, then retry.")
            }
            ErrorCode::InstallFailedInsufficientStorage => {
                Some("Free some storage on the device and retry.")
            }
            ErrorCode::InstallFailedVersionDowngrade => {
                Some("Uninstall the newer version first or use a backend that allows downgrades.")
            }
            ErrorCode::InstallFailedParseNoCertificates => {
                Some("The APK is unsigned or its signature is corrupt.")
            }
            ErrorCode::InstallFailedTimeout | ErrorCode::UninstallFailedTimeout => {
                Some("The system never reported completion; check the device and retry.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InstallFailedTimeout
                | ErrorCode::UninstallFailedTimeout
                | ErrorCode::GetFailedBroker
                | ErrorCode::InstallFailedInsufficientStorage
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(self.code.as_str())
    }
}

/// Result of a privileged package or module operation.
///
/// `Ok(())` stands for a success that carries no value.
pub type OpResult<T> = std::result::Result<T, OperationError>;

/// Attach an [`ErrorCode`] to any displayable failure.
pub trait ResultExt<T> {
    /// Map the error into an [`OperationError`] with `code`, keeping the
    /// error's text as the diagnostic message.
    ///
    /// # Errors
    ///
    /// Returns the mapped error when `self` is `Err`.
    fn or_code(self, code: ErrorCode) -> OpResult<T>;
}

impl<T, E: fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn or_code(self, code: ErrorCode) -> OpResult<T> {
        self.map_err(|e| OperationError::new(code, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique() {
        let names: HashSet<_> = ErrorCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn phase_grouping_follows_prefix() {
        for code in ErrorCode::ALL {
            let text = code.as_str();
            let expected = match code.phase() {
                ErrorPhase::Acquisition => "GET_FAILED_",
                ErrorPhase::Session => "SESSION_",
                ErrorPhase::Install => "INSTALL_FAILED_",
                ErrorPhase::Uninstall => "UNINSTALL_FAILED",
                ErrorPhase::Launch => "LAUNCH_FAILED",
                ErrorPhase::AppControl => "",
                ErrorPhase::Patch => "PATCH_FAILED_",
                ErrorPhase::Script => "SCRIPT_FAILED_",
            };
            assert!(text.starts_with(expected), "{text} not in {:?}", code.phase());
        }
    }

    #[test]
    fn unsupported_carries_fixed_message() {
        let err = OperationError::unsupported(ErrorCode::SetFailedInstaller);
        assert_eq!(err.message, "Unsupported");
        assert_eq!(err.to_string(), "SET_FAILED_INSTALLER: Unsupported");
        assert_eq!(err.user_code(), Some("SET_FAILED_INSTALLER"));
    }

    #[test]
    fn or_code_keeps_message() {
        let res: std::result::Result<(), String> = Err("boom".into());
        let err = res.or_code(ErrorCode::LaunchFailed).unwrap_err();
        assert_eq!(err, OperationError::new(ErrorCode::LaunchFailed, "boom"));
    }
}
