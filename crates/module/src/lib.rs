#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Patch-install through a root module
//!
//! A patched apk is overlaid on an installed app by bind-mounting it over
//! the app's `base.apk`. The mount is recreated at every boot by a module
//! the root manager runs:
//!
//! ```text
//! <root>/module.prop
//! <root>/post-fs-data.sh
//! <root>/service.sh            runs every apps/*/mount.sh after boot
//! <root>/apps/<package>/base.apk
//! <root>/apps/<package>/mount.sh
//! ```
//!
//! Each `mount.sh` embeds the version code the patch was made for and only
//! mounts while the installed version still matches; after an app update it
//! posts a notification instead (see [`BootGuard`]).

mod guard;
mod layout;
mod manager;
mod script;

pub use guard::BootGuard;
pub use layout::ModuleLayout;
pub use manager::{ModuleManager, ModuleStatus};
pub use script::{mount_script, parse_expected_version, MODULE_VERSION};

/// Version code recorded when the installed version cannot be read.
///
/// No installed package reports it, so a mount script carrying it never
/// mounts.
pub const UNKNOWN_VERSION: droidpm_types::VersionCode = droidpm_types::VersionCode::MAX;
