//! Service contracts implemented over shell text protocols
//!
//! The same implementations serve the user's own shell (`sh`), the root
//! shell (`su`) and a broker shell (`rish`); only the [`Shell`] handed in
//! decides with which rights the commands run.

mod activity;
mod broker;
mod package;

pub use activity::ShellActivityService;
pub use broker::ShellBroker;
pub use package::{ShellInstallSession, ShellPackageService, WriteMode};

use droidpm_errors::ServiceError;
use droidpm_platform::{Shell, ShellCommand, ShellOutput};

/// Run `command`, mapping a failure to start it into [`ServiceError`]
async fn call(shell: &dyn Shell, command: &ShellCommand) -> Result<ShellOutput, ServiceError> {
    Ok(shell.run(&command.to_string()).await?)
}

/// Run `command` and require a zero exit status
async fn call_checked(
    shell: &dyn Shell,
    name: &str,
    command: &ShellCommand,
) -> Result<ShellOutput, ServiceError> {
    let output = call(shell, command).await?;
    if output.is_success() {
        Ok(output)
    } else {
        Err(ServiceError::CallFailed {
            call: name.to_string(),
            message: failure_text(&output),
        })
    }
}

/// Diagnostic text of a failed command, never empty
fn failure_text(output: &ShellOutput) -> String {
    let text = output.combined();
    if text.trim().is_empty() {
        match output.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    } else {
        text
    }
}
