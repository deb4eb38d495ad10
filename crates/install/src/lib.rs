#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Privileged package operations for droidpm
//!
//! One capability contract, [`PackageManager`], implemented by three
//! backends with very different mechanics:
//!
//! - [`UnprivilegedInstaller`] drives the system installer session as the
//!   calling user and forwards confirmation prompts to the foreground.
//! - [`ShellInstaller`] issues `pm` commands through a root shell and
//!   classifies their text output.
//! - [`DelegatedInstaller`] obtains service proxies from a privilege broker
//!   and drives the session protocol with elevated rights.
//!
//! [`for_mode`] picks the backend for a [`PrivilegeMode`]. Every install and
//! uninstall publishes exactly one completion broadcast, and every installer
//! session is released exactly once on every exit path.

mod backends;
mod context;
mod guard;
mod manager;
mod session;

pub use backends::{DelegatedInstaller, ShellInstaller, UnprivilegedInstaller};
pub use context::InstallerContext;
pub use manager::{for_mode, PackageManager};

pub use droidpm_errors::{ErrorCode, OpResult, OperationError};
pub use droidpm_events::EventSender;
pub use droidpm_types::PrivilegeMode;
