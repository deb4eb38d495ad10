use std::path::{Path, PathBuf};

use droidpm_config::constants::{APPS_DIR, MODULE_PROP, MOUNT_SCRIPT, PATCHED_APK};
use droidpm_errors::BootScript;

/// Paths inside the module root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    root: PathBuf,
}

impl ModuleLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn module_prop(&self) -> PathBuf {
        self.root.join(MODULE_PROP)
    }

    #[must_use]
    pub fn boot_script(&self, script: BootScript) -> PathBuf {
        self.root.join(script.file_name())
    }

    #[must_use]
    pub fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    /// Folder of one package. Callers validate `package` first.
    #[must_use]
    pub fn app_dir(&self, package: &str) -> PathBuf {
        self.apps_dir().join(package)
    }

    #[must_use]
    pub fn mount_script(&self, package: &str) -> PathBuf {
        self.app_dir(package).join(MOUNT_SCRIPT)
    }

    #[must_use]
    pub fn patched_apk(&self, package: &str) -> PathBuf {
        self.app_dir(package).join(PATCHED_APK)
    }
}
