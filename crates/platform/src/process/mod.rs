//! Shell command composition and the execution contract

use async_trait::async_trait;
use droidpm_errors::PlatformError;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Quote a value for safe interpolation into a `sh -c` command line.
#[must_use]
pub fn quote(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Builder for a single shell command line
///
/// Arguments added with [`ShellCommand::arg`] are quoted; fragments added
/// with [`ShellCommand::raw`] are appended verbatim and must only ever be
/// constant shell syntax (pipes, redirections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    parts: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![quote(program).into_owned()],
        }
    }

    /// Add an argument to the command
    #[must_use]
    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.parts.push(quote(arg.as_ref()).into_owned());
        self
    }

    /// Add a path argument to the command
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        let text = path.to_string_lossy();
        self.arg(text.as_ref())
    }

    /// Add multiple arguments to the command
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.parts.push(quote(arg.as_ref()).into_owned());
        }
        self
    }

    /// Append unquoted shell syntax
    #[must_use]
    pub fn raw(mut self, fragment: &str) -> Self {
        self.parts.push(fragment.to_string());
        self
    }

    /// Pipe this command's stdout into `next`
    #[must_use]
    pub fn pipe(self, next: ShellCommand) -> Self {
        self.raw("|").join(next)
    }

    /// Run `next` only if this command succeeds
    #[must_use]
    pub fn and(self, next: ShellCommand) -> Self {
        self.raw("&&").join(next)
    }

    fn join(mut self, next: ShellCommand) -> Self {
        self.parts.extend(next.parts);
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" "))
    }
}

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ShellOutput {
    /// Build an output from raw captured bytes, split into lines.
    #[must_use]
    pub fn from_bytes(code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            code,
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
        }
    }

    #[must_use]
    pub fn success(stdout: &[&str]) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.iter().map(|s| (*s).to_string()).collect(),
            stderr: Vec::new(),
        }
    }

    #[must_use]
    pub fn failure(code: i32, stderr: &[&str]) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    #[must_use]
    pub fn out_text(&self) -> String {
        self.stdout.join("\n")
    }

    #[must_use]
    pub fn err_text(&self) -> String {
        self.stderr.join("\n")
    }

    /// stdout followed by stderr; what failure classification looks at
    #[must_use]
    pub fn combined(&self) -> String {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Runs one command line to completion in a (possibly privileged) shell
///
/// A non-zero exit is reported through [`ShellOutput::code`], not as an
/// error; `Err` means the command could not be run at all.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Program commands are handed to (`su`, `sh`, `rish`)
    fn program(&self) -> &str;

    async fn run(&self, command: &str) -> Result<ShellOutput, PlatformError>;

    /// Run `command` with the contents of `input` streamed into its stdin
    async fn run_with_input(&self, command: &str, input: &Path)
        -> Result<ShellOutput, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_are_quoted() {
        let cmd = ShellCommand::new("pm")
            .arg("uninstall")
            .arg("com.example.app; reboot");
        assert_eq!(cmd.to_string(), "pm uninstall 'com.example.app; reboot'");
    }

    #[test]
    fn pipelines_keep_raw_syntax() {
        let cmd = ShellCommand::new("pm")
            .args(["path", "com.example.app"])
            .pipe(ShellCommand::new("grep").arg("base"));
        assert_eq!(cmd.to_string(), "pm path com.example.app | grep base");
    }

    #[test]
    fn output_lines_and_combined_text() {
        let out = ShellOutput::from_bytes(Some(1), b"Failure [X]\n", b"warn\n");
        assert!(!out.is_success());
        assert_eq!(out.stdout, vec!["Failure [X]"]);
        assert_eq!(out.combined(), "Failure [X]\nwarn");
    }
}
