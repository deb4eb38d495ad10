//! Shell execution events

use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Lifecycle of one privileged shell command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    CommandStarted {
        /// Shell program the command was handed to (`su`, `sh`, `rish`)
        shell: String,
        command: String,
    },

    /// The command ran to completion; a non-zero exit still lands here
    CommandCompleted {
        shell: String,
        command: String,
        exit_code: Option<i32>,
        duration_ms: u64,
        stdout_lines: usize,
        stderr_lines: usize,
    },

    /// The command could not be run at all
    CommandFailed {
        shell: String,
        command: String,
        failure: FailureContext,
        duration_ms: u64,
    },
}
