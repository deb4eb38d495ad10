//! `<program> -c <command>` execution through tokio

pub mod process;

pub use process::ShellExecutor;
