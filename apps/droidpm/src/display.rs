//! Output rendering and formatting

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use droidpm_module::{BootGuard, ModuleStatus};
use droidpm_types::{InstallStep, VersionCode};

/// Result of a finished command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Success {
        message: String,
    },
    PackageInfo {
        package: String,
        installed: bool,
        version_code: VersionCode,
        version_name: String,
        installation_dir: PathBuf,
    },
    Exists {
        package: String,
        exists: bool,
    },
    ModuleStatus {
        package: String,
        expected_version: Option<VersionCode>,
        live_version: Option<VersionCode>,
        mounts: bool,
        warning: Option<String>,
    },
    Modules {
        packages: Vec<String>,
    },
}

impl CommandOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }
}

impl From<ModuleStatus> for CommandOutput {
    fn from(status: ModuleStatus) -> Self {
        let mounts = status.guard.mounts();
        let warning = match status.guard {
            BootGuard::Mount => None,
            BootGuard::Skip { warning } => Some(warning),
        };
        Self::ModuleStatus {
            package: status.package,
            expected_version: status.expected_version,
            live_version: status.live_version,
            mounts,
            warning,
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render a finished command on stdout
    pub fn render_result(self, result: &CommandOutput) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if self.json_output {
            let json = serde_json::to_string(result).map_err(io::Error::other)?;
            return writeln!(out, "{json}");
        }
        match result {
            CommandOutput::Success { message } => writeln!(out, "{message}"),
            CommandOutput::PackageInfo {
                package,
                installed,
                version_code,
                version_name,
                installation_dir,
            } => {
                writeln!(out, "Package:      {package}")?;
                writeln!(out, "Installed:    {installed}")?;
                writeln!(out, "Version:      {version_name} ({version_code})")?;
                writeln!(out, "Location:     {}", installation_dir.display())
            }
            CommandOutput::Exists { exists, .. } => writeln!(out, "{exists}"),
            CommandOutput::ModuleStatus {
                package,
                expected_version,
                live_version,
                warning,
                ..
            } => {
                let show = |v: &Option<VersionCode>| {
                    v.map_or_else(|| "unknown".to_string(), |v| v.to_string())
                };
                writeln!(out, "Package:      {package}")?;
                writeln!(out, "Patched for:  {}", show(expected_version))?;
                writeln!(out, "Installed:    {}", show(live_version))?;
                match warning {
                    None => writeln!(out, "Boot:         mounts"),
                    Some(warning) => writeln!(out, "Boot:         skipped\n  {warning}"),
                }
            }
            CommandOutput::Modules { packages } => {
                for package in packages {
                    writeln!(out, "{package}")?;
                }
                Ok(())
            }
        }
    }

    /// Progress line of a running patch-install; silent in JSON mode
    pub fn render_step(self, step: InstallStep, message: &str) {
        if !self.json_output {
            eprintln!("[{step}] {message}");
        }
    }

    /// Ask the user to confirm a paused install on the device
    pub fn render_confirmation(self, action: &str) {
        if !self.json_output {
            eprintln!("Waiting for confirmation on the device: {action}");
        }
    }

    /// Report a failed command
    pub fn render_error(self, code: Option<&str>, message: &str) {
        if self.json_output {
            let json = serde_json::json!({ "kind": "error", "code": code, "message": message });
            println!("{json}");
        } else {
            eprintln!("Error: {message}");
        }
    }
}
