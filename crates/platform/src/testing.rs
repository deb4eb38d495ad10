//! Scripted shell for tests
//!
//! Responds to commands by substring match against registered rules and
//! records every command it was asked to run, in order.

use async_trait::async_trait;
use droidpm_errors::PlatformError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::process::{Shell, ShellOutput};

struct Rule {
    pattern: String,
    response: Result<ShellOutput, PlatformError>,
}

/// A command seen by [`ScriptedShell`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub command: String,
    pub input: Option<PathBuf>,
    /// Size of the input file at the time it was streamed
    pub input_len: Option<u64>,
}

#[derive(Default)]
pub struct ScriptedShell {
    rules: Mutex<Vec<Rule>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedShell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `output`. Earlier rules win.
    #[must_use]
    pub fn on(self, pattern: &str, output: ShellOutput) -> Self {
        self.push(pattern, Ok(output));
        self
    }

    /// Make commands containing `pattern` fail to run at all.
    #[must_use]
    pub fn fail_to_run(self, pattern: &str) -> Self {
        self.push(
            pattern,
            Err(PlatformError::SpawnFailed {
                program: "scripted".to_string(),
                message: format!("refusing to run `{pattern}`"),
            }),
        );
        self
    }

    fn push(&self, pattern: &str, response: Result<ShellOutput, PlatformError>) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern: pattern.to_string(),
                response,
            });
        }
    }

    /// Every command run so far
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .map(|r| r.command)
            .collect()
    }

    #[must_use]
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Index of the first recorded command containing `pattern`
    #[must_use]
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.contains(pattern))
    }

    #[must_use]
    pub fn ran(&self, pattern: &str) -> bool {
        self.position(pattern).is_some()
    }

    fn respond(&self, command: &str, input: Option<&Path>) -> Result<ShellOutput, PlatformError> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(Recorded {
                command: command.to_string(),
                input: input.map(Path::to_path_buf),
                input_len: input.and_then(|p| std::fs::metadata(p).ok()).map(|m| m.len()),
            });
        }
        let rules = match self.rules.lock() {
            Ok(rules) => rules,
            Err(poisoned) => poisoned.into_inner(),
        };
        rules
            .iter()
            .find(|rule| command.contains(&rule.pattern))
            .map_or_else(|| Ok(ShellOutput::success(&[])), |rule| rule.response.clone())
    }
}

#[async_trait]
impl Shell for ScriptedShell {
    fn program(&self) -> &str {
        "scripted"
    }

    async fn run(&self, command: &str) -> Result<ShellOutput, PlatformError> {
        self.respond(command, None)
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &Path,
    ) -> Result<ShellOutput, PlatformError> {
        self.respond(command, Some(input))
    }
}
