//! Privileged shell execution for droidpm
//!
//! This crate provides the one primitive every privileged path is built on:
//! run a single shell command to completion and hand back its exit status
//! and captured output lines. Commands are composed with [`ShellCommand`],
//! which quotes every interpolated value, and executed through the [`Shell`]
//! trait so backends and the module pipeline can be driven by a scripted
//! shell in tests.

pub mod core;
pub mod implementations;
pub mod process;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use core::PlatformContext;
pub use implementations::unix::ShellExecutor;
pub use process::{quote, Shell, ShellCommand, ShellOutput};
