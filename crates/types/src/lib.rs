#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for droidpm
//!
//! Shared vocabulary of the package backends and the module pipeline:
//! privilege modes, package metadata, install requests and module
//! install statuses.

pub mod module;
pub mod package;

pub use module::{InstallStep, ModuleInstallStatus};
pub use package::{
    is_valid_package_name, InstallRequest, PackageInfo, VersionCode, APK_EXTENSION,
};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution strategy used for privileged package operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeMode {
    /// The system's own installer session, confirmed by the user when needed
    Unprivileged,
    /// Commands run through a root shell
    #[value(alias = "root")]
    Shell,
    /// System services reached through an out-of-process privilege broker
    Delegated,
}

impl Default for PrivilegeMode {
    fn default() -> Self {
        Self::Unprivileged
    }
}

impl fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unprivileged => write!(f, "unprivileged"),
            Self::Shell => write!(f, "shell"),
            Self::Delegated => write!(f, "delegated"),
        }
    }
}

impl std::str::FromStr for PrivilegeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprivileged" => Ok(Self::Unprivileged),
            "shell" | "root" => Ok(Self::Shell),
            "delegated" => Ok(Self::Delegated),
            other => Err(format!("unknown privilege mode: {other}")),
        }
    }
}
