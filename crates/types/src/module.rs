//! Patch-install status reporting

use droidpm_errors::ModuleError;
use std::fmt;

/// Pipeline steps in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallStep {
    Starting,
    EnsuringRootModuleExists,
    CreatingAppFolder,
    WritingMountScript,
    CopyingPatchedApk,
    Remounting,
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Starting => "starting",
            Self::EnsuringRootModuleExists => "ensuring root module exists",
            Self::CreatingAppFolder => "creating app folder",
            Self::WritingMountScript => "writing mount script",
            Self::CopyingPatchedApk => "copying patched apk",
            Self::Remounting => "remounting",
        })
    }
}

/// Status updates emitted by a running patch-install
///
/// Zero or more `InProgress` values are followed by exactly one terminal
/// `Success` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleInstallStatus {
    InProgress { step: InstallStep, message: String },
    Success,
    Failed(ModuleError),
}

impl ModuleInstallStatus {
    pub fn in_progress(step: InstallStep, message: impl Into<String>) -> Self {
        Self::InProgress {
            step,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }
}
