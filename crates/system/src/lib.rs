#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! System service contracts for droidpm
//!
//! The package backends talk to the device through three service proxies:
//! a package service (queries and installer sessions), an activity service
//! (force-stop, launch) and, for the delegated mode, a privilege broker that
//! hands out the other two with elevated rights. Results of asynchronous
//! system work (session commits, uninstalls) come back through the
//! [`completion`] bridge.
//!
//! The [`shell`] module implements every contract on top of the `pm`, `am`
//! and `cmd` text protocols, so the same proxies work over the user's own
//! shell or over a broker shell.

pub mod completion;
pub mod parse;
pub mod services;
pub mod shell;

pub use completion::{
    Completion, CompletionAwaiter, CompletionBridge, CompletionSender, CompletionStatus,
    ConfirmationIntent, Delivery,
};
pub use services::{
    ActivityService, BrokerState, InstallSession, PackageService, PrivilegeBroker, SessionId,
    SessionParams,
};
pub use shell::{
    ShellActivityService, ShellBroker, ShellInstallSession, ShellPackageService, WriteMode,
};
