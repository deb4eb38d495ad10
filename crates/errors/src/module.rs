//! Patch-install (root module) errors

use std::borrow::Cow;
use std::fmt;

use crate::{ErrorCode, OperationError, UserFacingError};
use thiserror::Error;

/// Boot-time scripts shared by every mounted package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BootScript {
    PostFsData,
    Service,
}

impl BootScript {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PostFsData => "post-fs-data.sh",
            Self::Service => "service.sh",
        }
    }
}

impl fmt::Display for BootScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Fix-ups applied to the patched APK before it is bind-mounted, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MountStep {
    Chmod,
    Chown,
    Chcon,
    Mount,
}

impl fmt::Display for MountStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Chcon => "chcon",
            Self::Mount => "mount",
        })
    }
}

/// One variant per failing step of the patch-install pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModuleError {
    #[error("failed to create module root: {message}")]
    CreateModule { message: String },

    #[error("failed to set up {script}: {message}")]
    SetupScript { script: BootScript, message: String },

    #[error("failed to create folder for {package}: {message}")]
    CreateAppFolder { package: String, message: String },

    #[error("failed to write mount script for {package}: {message}")]
    WriteMountScript { package: String, message: String },

    #[error("failed to copy patched apk for {package}: {message}")]
    CopyApk { package: String, message: String },

    #[error("{step} failed for {package}: {message}")]
    Remount {
        package: String,
        step: MountStep,
        message: String,
    },

    #[error("failed to remove module of {package}: {message}")]
    Destroy { package: String, message: String },

    #[error("failed to remove {script}: {message}")]
    DestroyScript { script: BootScript, message: String },
}

impl ModuleError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CreateModule { .. } => ErrorCode::PatchFailedModule,
            Self::SetupScript {
                script: BootScript::PostFsData,
                ..
            } => ErrorCode::ScriptFailedSetupPostFs,
            Self::SetupScript {
                script: BootScript::Service,
                ..
            } => ErrorCode::ScriptFailedSetupServiceD,
            Self::CreateAppFolder { .. } => ErrorCode::PatchFailedFolder,
            Self::WriteMountScript { .. } => ErrorCode::PatchFailedScript,
            Self::CopyApk { .. } => ErrorCode::PatchFailedCopy,
            Self::Remount { step, .. } => match step {
                MountStep::Chmod => ErrorCode::PatchFailedChmod,
                MountStep::Chown => ErrorCode::PatchFailedChown,
                MountStep::Chcon => ErrorCode::PatchFailedChcon,
                MountStep::Mount => ErrorCode::PatchFailedMount,
            },
            Self::Destroy { .. } => ErrorCode::PatchFailedDestroy,
            Self::DestroyScript {
                script: BootScript::PostFsData,
                ..
            } => ErrorCode::ScriptFailedDestroyPostFs,
            Self::DestroyScript {
                script: BootScript::Service,
                ..
            } => ErrorCode::ScriptFailedDestroyServiceD,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::CreateModule { message }
            | Self::SetupScript { message, .. }
            | Self::CreateAppFolder { message, .. }
            | Self::WriteMountScript { message, .. }
            | Self::CopyApk { message, .. }
            | Self::Remount { message, .. }
            | Self::Destroy { message, .. }
            | Self::DestroyScript { message, .. } => message,
        }
    }
}

impl From<ModuleError> for OperationError {
    fn from(err: ModuleError) -> Self {
        OperationError::new(err.code(), err.message())
    }
}

impl UserFacingError for ModuleError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CreateModule { .. } | Self::SetupScript { .. } => {
                Some("Make sure root access is granted and /data/adb is writable.")
            }
            Self::Remount { .. } => Some("Reboot the device to apply the patch from the boot script."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(self.code().as_str())
    }
}
