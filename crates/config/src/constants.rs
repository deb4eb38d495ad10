//! Fixed on-device locations and module identity defaults
//!
//! The module root is configurable; the file names inside it are not, since
//! the boot loader script locates per-package mounts relative to itself.

pub const DEFAULT_MODULE_ROOT: &str = "/data/adb/modules/droidpm";
pub const DEFAULT_STAGING_DIR: &str = "/data/local/tmp";

pub const MODULE_ID: &str = "droidpm";
pub const MODULE_NAME: &str = "droidpm mounts";

/// Identity file read by the root manager
pub const MODULE_PROP: &str = "module.prop";
/// Directory under the module root holding one folder per mounted package
pub const APPS_DIR: &str = "apps";
pub const PATCHED_APK: &str = "base.apk";
pub const MOUNT_SCRIPT: &str = "mount.sh";

pub const DEFAULT_ROOT_SHELL: &str = "su";
pub const DEFAULT_USER_SHELL: &str = "sh";
pub const DEFAULT_BROKER_SHELL: &str = "rish";

pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 300;
