use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::ServiceError;
use droidpm_platform::{Shell, ShellCommand};
use droidpm_types::PackageInfo;

use super::{call, call_checked, failure_text};
use crate::completion::{CompletionSender, CompletionStatus};
use crate::parse;
use crate::services::{InstallSession, PackageService, SessionId, SessionParams};

/// How session parts reach `pm install-write`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Stream the file through the shell's stdin
    #[default]
    Stdin,
    /// Pass the path; the caller must make it readable by the system
    Path,
}

/// [`PackageService`] over `pm` and `dumpsys`
#[derive(Clone)]
pub struct ShellPackageService {
    shell: Arc<dyn Shell>,
    write_mode: WriteMode,
}

impl ShellPackageService {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self {
            shell,
            write_mode: WriteMode::default(),
        }
    }

    #[must_use]
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Install directory via `pm path`, for dumps that lack `codePath`
    async fn package_path(&self, package: &str) -> Result<Option<std::path::PathBuf>, ServiceError> {
        let command = ShellCommand::new("pm").arg("path").arg(package);
        let output = call(self.shell.as_ref(), &command).await?;
        Ok(parse::parse_package_path(&output.out_text()))
    }
}

fn create_command(params: &SessionParams) -> ShellCommand {
    let mut command = ShellCommand::new("pm").arg("install-create");
    if params.replace_existing {
        command = command.arg("-r");
    }
    if params.allow_downgrade {
        command = command.arg("-d");
    }
    if params.allow_test {
        command = command.arg("-t");
    }
    if let Some(installer) = &params.installer_package {
        command = command.arg("-i").arg(installer);
    }
    if let Some(size) = params.total_size {
        command = command.arg("-S").arg(size.to_string());
    }
    command
}

#[async_trait]
impl PackageService for ShellPackageService {
    async fn package_info(&self, package: &str) -> Result<Option<PackageInfo>, ServiceError> {
        let command = ShellCommand::new("dumpsys").arg("package").arg(package);
        let output = call(self.shell.as_ref(), &command).await?;
        let Some(info) = parse::parse_dumpsys_package(package, &output.out_text()) else {
            return Ok(None);
        };
        if info.install_dir.is_some() {
            return Ok(Some(info));
        }
        Ok(Some(match self.package_path(package).await? {
            Some(dir) => info.with_install_dir(dir),
            None => info,
        }))
    }

    async fn installed_packages(&self) -> Result<Vec<String>, ServiceError> {
        let command = ShellCommand::new("pm").arg("list").arg("packages");
        let output = call_checked(self.shell.as_ref(), "pm list packages", &command).await?;
        Ok(parse::parse_package_list(&output.out_text()))
    }

    async fn create_session(&self, params: &SessionParams) -> Result<SessionId, ServiceError> {
        let output =
            call_checked(self.shell.as_ref(), "pm install-create", &create_command(params)).await?;
        let text = output.combined();
        parse::parse_session_id(&text).ok_or(ServiceError::UnexpectedReply {
            call: "pm install-create".to_string(),
            reply: text,
        })
    }

    async fn open_session(&self, id: SessionId) -> Result<Arc<dyn InstallSession>, ServiceError> {
        if id <= 0 {
            return Err(ServiceError::InvalidSession { session_id: id });
        }
        Ok(Arc::new(ShellInstallSession {
            id,
            shell: Arc::clone(&self.shell),
            write_mode: self.write_mode,
        }))
    }

    async fn uninstall(&self, package: &str, sender: CompletionSender) -> Result<(), ServiceError> {
        let command = ShellCommand::new("pm").arg("uninstall").arg(package);
        let output = call(self.shell.as_ref(), &command).await?;
        let text = output.combined();
        if parse::is_success_reply(&text) {
            sender.deliver(CompletionStatus::Success);
        } else {
            sender.deliver(CompletionStatus::Failure {
                message: Some(failure_text(&output)),
            });
        }
        Ok(())
    }

    async fn set_installer(&self, package: &str, installer: &str) -> Result<(), ServiceError> {
        let command = ShellCommand::new("pm")
            .arg("set-installer")
            .arg(package)
            .arg(installer);
        let output = call(self.shell.as_ref(), &command).await?;
        if output.is_success() && !output.combined().contains("Failure") {
            Ok(())
        } else {
            Err(ServiceError::CallFailed {
                call: "pm set-installer".to_string(),
                message: failure_text(&output),
            })
        }
    }
}

/// Installer session driven through `pm install-*`
pub struct ShellInstallSession {
    id: SessionId,
    shell: Arc<dyn Shell>,
    write_mode: WriteMode,
}

impl ShellInstallSession {
    fn session_command(&self, verb: &str) -> ShellCommand {
        ShellCommand::new("pm").arg(verb).arg(self.id.to_string())
    }
}

#[async_trait]
impl InstallSession for ShellInstallSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn write(&self, name: &str, path: &Path, size: u64) -> Result<(), ServiceError> {
        let command = ShellCommand::new("pm")
            .arg("install-write")
            .arg("-S")
            .arg(size.to_string())
            .arg(self.id.to_string())
            .arg(name);
        let output = match self.write_mode {
            WriteMode::Stdin => {
                self.shell
                    .run_with_input(&command.arg("-").to_string(), path)
                    .await?
            }
            WriteMode::Path => call(self.shell.as_ref(), &command.path_arg(path)).await?,
        };
        if output.is_success() && !output.combined().contains("Failure") {
            Ok(())
        } else {
            Err(ServiceError::CallFailed {
                call: "pm install-write".to_string(),
                message: failure_text(&output),
            })
        }
    }

    async fn fsync(&self, _name: &str) -> Result<(), ServiceError> {
        // install-write returns only after the part is persisted
        Ok(())
    }

    async fn commit(&self, sender: CompletionSender) -> Result<(), ServiceError> {
        let output = call(self.shell.as_ref(), &self.session_command("install-commit")).await?;
        let text = output.combined();
        if parse::is_success_reply(&text) {
            sender.deliver(CompletionStatus::Success);
        } else {
            sender.deliver(CompletionStatus::Failure {
                message: Some(failure_text(&output)),
            });
        }
        Ok(())
    }

    async fn abandon(&self) -> Result<(), ServiceError> {
        call_checked(
            self.shell.as_ref(),
            "pm install-abandon",
            &self.session_command("install-abandon"),
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{Completion, CompletionBridge, Delivery};
    use droidpm_platform::testing::ScriptedShell;
    use droidpm_platform::ShellOutput;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn service(shell: &Arc<ScriptedShell>) -> ShellPackageService {
        ShellPackageService::new(shell.clone())
    }

    #[tokio::test]
    async fn absent_package_has_no_info() {
        let shell = Arc::new(
            ScriptedShell::new().on("dumpsys", ShellOutput::success(&["Unable to find package: com.gone"])),
        );
        assert_eq!(service(&shell).package_info("com.gone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn info_falls_back_to_pm_path() {
        let shell = Arc::new(
            ScriptedShell::new()
                .on(
                    "dumpsys",
                    ShellOutput::success(&["  Package [com.a] (1):", "    versionCode=12 minSdk=21"]),
                )
                .on("pm path", ShellOutput::success(&["package:/data/app/com.a-1/base.apk"])),
        );
        let info = service(&shell).package_info("com.a").await.unwrap().unwrap();
        assert_eq!(info.version_code, 12);
        assert_eq!(info.install_dir.as_deref(), Some(Path::new("/data/app/com.a-1")));
    }

    #[tokio::test]
    async fn create_session_flags_and_id() {
        let shell = Arc::new(ScriptedShell::new().on(
            "install-create",
            ShellOutput::success(&["Success: created install session [77]"]),
        ));
        let params = SessionParams::privileged().with_total_size(10);
        let id = service(&shell).create_session(&params).await.unwrap();
        assert_eq!(id, 77);
        assert_eq!(shell.commands(), vec!["pm install-create -r -d -t -S 10"]);
    }

    #[tokio::test]
    async fn create_session_without_id_is_unexpected() {
        let shell = Arc::new(
            ScriptedShell::new().on("install-create", ShellOutput::success(&["Error: nope"])),
        );
        let err = service(&shell)
            .create_session(&SessionParams::replacing())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnexpectedReply { .. }));
    }

    #[tokio::test]
    async fn stdin_write_streams_file() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("base.apk");
        std::fs::write(&apk, b"0123456789").unwrap();

        let shell = Arc::new(ScriptedShell::new());
        let session = service(&shell).open_session(5).await.unwrap();
        session.write("base.apk", &apk, 10).await.unwrap();

        let recorded = shell.recorded();
        assert_eq!(recorded[0].command, "pm install-write -S 10 5 base.apk -");
        assert_eq!(recorded[0].input_len, Some(10));
    }

    #[tokio::test]
    async fn path_write_passes_path() {
        let shell = Arc::new(ScriptedShell::new());
        let session = service(&shell)
            .with_write_mode(WriteMode::Path)
            .open_session(5)
            .await
            .unwrap();
        session
            .write("split_0.apk", Path::new("/data/local/tmp/part.apk"), 3)
            .await
            .unwrap();
        assert_eq!(
            shell.commands(),
            vec!["pm install-write -S 3 5 split_0.apk /data/local/tmp/part.apk"]
        );
    }

    #[tokio::test]
    async fn commit_failure_is_delivered() {
        let shell = Arc::new(ScriptedShell::new().on(
            "install-commit",
            ShellOutput::success(&["Failure [INSTALL_FAILED_INVALID_APK: bad zip]"]),
        ));
        let session = service(&shell).open_session(9).await.unwrap();
        let (sender, awaiter) = CompletionBridge::open();
        session.commit(sender).await.unwrap();

        let completion = awaiter
            .wait(Duration::from_secs(1), &CancellationToken::new())
            .await;
        assert_eq!(
            completion,
            Completion::Delivered(Delivery {
                success: false,
                message: Some("Failure [INSTALL_FAILED_INVALID_APK: bad zip]".into()),
            })
        );
    }

    #[tokio::test]
    async fn invalid_session_ids_are_rejected() {
        let shell = Arc::new(ScriptedShell::new());
        assert!(matches!(
            service(&shell).open_session(0).await,
            Err(ServiceError::InvalidSession { session_id: 0 })
        ));
    }
}
