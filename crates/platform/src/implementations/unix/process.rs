//! Shell executor built on `tokio::process`
//!
//! Wraps every execution with started/completed/failed events, the same
//! three-phase reporting used for all platform operations.

use async_trait::async_trait;
use droidpm_errors::PlatformError;
use droidpm_events::{AppEvent, EventEmitter, FailureContext, PlatformEvent};
use std::convert::TryFrom;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::core::PlatformContext;
use crate::process::{Shell, ShellOutput};

/// Runs commands as `<program> -c <command>`
///
/// With `su` as the program this is the privileged shell; with `sh` it is
/// the caller's own shell; with a broker client such as `rish` it runs with
/// the broker's rights.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    program: String,
    ctx: PlatformContext,
}

impl ShellExecutor {
    pub fn with_program(program: impl Into<String>, ctx: PlatformContext) -> Self {
        Self {
            program: program.into(),
            ctx,
        }
    }

    /// Root shell through `su`
    pub fn root(su: impl Into<String>, ctx: PlatformContext) -> Self {
        Self::with_program(su, ctx)
    }

    /// Unprivileged shell through `sh`
    pub fn user(ctx: PlatformContext) -> Self {
        Self::with_program("sh", ctx)
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, err: &std::io::Error) -> PlatformError {
        match err.kind() {
            ErrorKind::NotFound => PlatformError::CommandNotFound {
                program: self.program.clone(),
            },
            ErrorKind::PermissionDenied => PlatformError::PermissionDenied {
                operation: format!("spawn {}", self.program),
                message: err.to_string(),
            },
            _ => PlatformError::SpawnFailed {
                program: self.program.clone(),
                message: err.to_string(),
            },
        }
    }

    fn emit_started(&self, command: &str) {
        self.ctx.emit(AppEvent::Platform(PlatformEvent::CommandStarted {
            shell: self.program.clone(),
            command: command.to_string(),
        }));
    }

    fn emit_finished(
        &self,
        command: &str,
        result: &Result<ShellOutput, PlatformError>,
        duration: Duration,
    ) {
        let event = match result {
            Ok(output) => PlatformEvent::CommandCompleted {
                shell: self.program.clone(),
                command: command.to_string(),
                exit_code: output.code,
                duration_ms: duration_to_millis(duration),
                stdout_lines: output.stdout.len(),
                stderr_lines: output.stderr.len(),
            },
            Err(err) => PlatformEvent::CommandFailed {
                shell: self.program.clone(),
                command: command.to_string(),
                failure: FailureContext::from_error(err),
                duration_ms: duration_to_millis(duration),
            },
        };
        self.ctx.emit(AppEvent::Platform(event));
    }

    async fn execute(&self, command: &str) -> Result<ShellOutput, PlatformError> {
        let output = self
            .command(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(&e))?;

        Ok(ShellOutput::from_bytes(
            output.status.code(),
            &output.stdout,
            &output.stderr,
        ))
    }

    async fn execute_with_input(
        &self,
        command: &str,
        input: &Path,
    ) -> Result<ShellOutput, PlatformError> {
        let mut file =
            tokio::fs::File::open(input)
                .await
                .map_err(|e| PlatformError::InputUnreadable {
                    path: input.display().to_string(),
                    message: e.to_string(),
                })?;

        let mut child = self
            .command(command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PlatformError::StdinFailed {
                command: command.to_string(),
                message: "stdin was not captured".to_string(),
            })?;

        // Stream while the child drains its pipes, so a large apk never
        // sits in memory and a full stdout pipe cannot deadlock the copy.
        let writer = async move {
            tokio::io::copy(&mut file, &mut stdin).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(writer, child.wait_with_output());

        let output = output.map_err(|e| PlatformError::OutputFailed {
            command: command.to_string(),
            message: e.to_string(),
        })?;
        let output = ShellOutput::from_bytes(output.status.code(), &output.stdout, &output.stderr);

        match written {
            // A command that rejected its input explains why in its output.
            Err(e) if output.is_success() => Err(PlatformError::StdinFailed {
                command: command.to_string(),
                message: e.to_string(),
            }),
            _ => Ok(output),
        }
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl Shell for ShellExecutor {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, command: &str) -> Result<ShellOutput, PlatformError> {
        let start = Instant::now();
        self.emit_started(command);
        let result = self.execute(command).await;
        self.emit_finished(command, &result, start.elapsed());
        result
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &Path,
    ) -> Result<ShellOutput, PlatformError> {
        let start = Instant::now();
        self.emit_started(command);
        let result = self.execute_with_input(command, input).await;
        self.emit_finished(command, &result, start.elapsed());
        result
    }
}
