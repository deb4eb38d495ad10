//! Patch-install pipeline events

use serde::{Deserialize, Serialize};

use super::FailureContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModuleEvent {
    StepStarted { package: String, step: String },

    StepCompleted { package: String, step: String },

    StepFailed {
        package: String,
        step: String,
        failure: FailureContext,
    },

    /// The patched apk is mounted and the boot script is in place
    Installed {
        package: String,
        expected_version: i64,
    },

    Deleted { package: String, success: bool },

    /// A stale mount could not be removed; the pipeline continues
    UnmountSkipped { package: String, reason: String },
}
