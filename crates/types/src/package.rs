//! Package-related type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File extension every installable package must carry
pub const APK_EXTENSION: &str = "apk";

/// Numeric version of an installed package
pub type VersionCode = i64;

/// Metadata of an installed package as reported by the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub package_name: String,
    pub version_code: VersionCode,
    pub version_name: Option<String>,
    /// Directory holding the installed code (`/data/app/...`)
    pub install_dir: Option<PathBuf>,
}

impl PackageInfo {
    pub fn new(package_name: impl Into<String>, version_code: VersionCode) -> Self {
        Self {
            package_name: package_name.into(),
            version_code,
            version_name: None,
            install_dir: None,
        }
    }

    #[must_use]
    pub fn with_version_name(mut self, name: impl Into<String>) -> Self {
        self.version_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_name {
            Some(name) => write!(f, "{} {} ({})", self.package_name, name, self.version_code),
            None => write!(f, "{} ({})", self.package_name, self.version_code),
        }
    }
}

/// A patched package waiting to be mounted over an installed app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    package_name: String,
    file_path: PathBuf,
}

impl InstallRequest {
    /// Build a request, or `None` when `file_path` is not an `.apk` or the
    /// package name is malformed.
    pub fn new(package_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Option<Self> {
        let package_name = package_name.into();
        let file_path = file_path.into();
        if !is_valid_package_name(&package_name) || !has_apk_extension(&file_path) {
            return None;
        }
        Some(Self {
            package_name,
            file_path,
        })
    }

    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Whether `name` is a dotted application id such as `com.example.app`.
///
/// Every segment starts with a letter and holds only ASCII letters, digits
/// and underscores, so a valid name is always safe as a path component.
#[must_use]
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn has_apk_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(APK_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_request_requires_apk_extension() {
        assert!(InstallRequest::new("com.example.app", "/sdcard/patched.apk").is_some());
        assert!(InstallRequest::new("com.example.app", "/sdcard/PATCHED.APK").is_some());
        assert!(InstallRequest::new("com.example.app", "/sdcard/patched.zip").is_none());
        assert!(InstallRequest::new("com.example.app", "/sdcard/patched").is_none());
        assert!(InstallRequest::new("  ", "/sdcard/patched.apk").is_none());
    }

    #[test]
    fn package_names() {
        assert!(is_valid_package_name("com.example.app"));
        assert!(is_valid_package_name("android"));
        assert!(is_valid_package_name("org.a_b.c2"));
        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("com..app"));
        assert!(!is_valid_package_name("../etc"));
        assert!(!is_valid_package_name("com.example.app; reboot"));
        assert!(!is_valid_package_name("1com.app"));
        assert!(InstallRequest::new("../../system", "/sdcard/patched.apk").is_none());
    }

    #[test]
    fn package_info_display() {
        let info = PackageInfo::new("com.example.app", 5).with_version_name("1.2.0");
        assert_eq!(info.to_string(), "com.example.app 1.2.0 (5)");
    }
}
