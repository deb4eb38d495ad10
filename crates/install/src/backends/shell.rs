use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::{ErrorCode, OpResult, OperationError, ResultExt};
use droidpm_events::EventEmitter;
use droidpm_platform::{Shell, ShellCommand};
use droidpm_system::parse::{classify_install_failure, is_success_reply};
use droidpm_system::{
    ActivityService, PackageService, SessionParams, ShellActivityService, ShellPackageService,
    WriteMode,
};
use droidpm_types::{PrivilegeMode, VersionCode};

use crate::context::InstallerContext;
use crate::manager::PackageManager;
use crate::session::{package_info, uninstall_via, CommitFailure, SessionInstall};

/// Backend issuing `pm` commands through a root shell
///
/// Single apks are streamed straight into `pm install`; split sets go
/// through `pm install-create/-write/-commit`, each part staged as a
/// world-readable copy first because the package service does not run as
/// the shell's user.
pub struct ShellInstaller {
    shell: Arc<dyn Shell>,
    packages: ShellPackageService,
    activity: ShellActivityService,
    ctx: InstallerContext,
}

impl ShellInstaller {
    pub fn new(shell: Arc<dyn Shell>, ctx: InstallerContext) -> Self {
        Self {
            packages: ShellPackageService::new(Arc::clone(&shell)).with_write_mode(WriteMode::Path),
            activity: ShellActivityService::new(Arc::clone(&shell)),
            shell,
            ctx,
        }
    }

    async fn stream_install(&self, apk: &Path) -> OpResult<()> {
        let size = tokio::fs::metadata(apk)
            .await
            .map_err(|e| {
                OperationError::new(
                    ErrorCode::InstallFailedInvalidApk,
                    format!("{}: {e}", apk.display()),
                )
            })?
            .len();
        let command = ShellCommand::new("pm")
            .arg("install")
            .arg("-r")
            .arg("-S")
            .arg(size.to_string());

        let output = self
            .shell
            .run_with_input(&command.to_string(), apk)
            .await
            .or_code(ErrorCode::InstallFailedUnknown)?;
        let text = output.combined();
        if output.is_success() && is_success_reply(&text) {
            Ok(())
        } else {
            Err(OperationError::new(classify_install_failure(&text), text))
        }
    }
}

#[async_trait]
impl PackageManager for ShellInstaller {
    fn mode(&self) -> PrivilegeMode {
        PrivilegeMode::Shell
    }

    async fn version_code(&self, package: &str) -> OpResult<VersionCode> {
        let info = package_info(&self.packages, package, ErrorCode::GetFailedPackageVersionCode)
            .await?;
        Ok(info.version_code)
    }

    async fn version_name(&self, package: &str) -> OpResult<String> {
        let code = ErrorCode::GetFailedPackageVersionName;
        package_info(&self.packages, package, code)
            .await?
            .version_name
            .ok_or_else(|| OperationError::new(code, format!("{package} has no version name")))
    }

    /// Lists every installed package and tests membership.
    async fn is_installed(&self, package: &str) -> bool {
        match self.packages.installed_packages().await {
            Ok(installed) => installed.iter().any(|name| name == package),
            Err(err) => {
                self.ctx
                    .emit_debug(format!("listing packages failed: {err}"));
                false
            }
        }
    }

    async fn installation_dir(&self, package: &str) -> OpResult<PathBuf> {
        let code = ErrorCode::GetFailedPackageDir;
        package_info(&self.packages, package, code)
            .await?
            .install_dir
            .ok_or_else(|| OperationError::new(code, format!("no code path for {package}")))
    }

    async fn set_installer(&self, _package: &str, _installer: &str) -> OpResult<()> {
        Err(OperationError::unsupported(ErrorCode::SetFailedInstaller))
    }

    async fn force_stop(&self, package: &str) -> OpResult<()> {
        self.activity
            .force_stop(package)
            .await
            .or_code(ErrorCode::AppFailedForceStop)
    }

    async fn install_app(&self, apk: &Path) -> OpResult<()> {
        let result = self.stream_install(apk).await;
        self.ctx.broadcast_install(self.mode(), None, &result);
        result
    }

    async fn install_split_app(&self, apks: &[PathBuf]) -> OpResult<()> {
        if let [apk] = apks {
            return self.install_app(apk).await;
        }
        let result = SessionInstall {
            service: &self.packages,
            ctx: &self.ctx,
            mode: self.mode(),
            params: SessionParams::replacing(),
            staging_dir: Some(&self.ctx.staging_dir),
            commit_failure: CommitFailure::Session,
        }
        .run(apks)
        .await;
        self.ctx.broadcast_install(self.mode(), None, &result);
        result
    }

    async fn uninstall(&self, package: &str) -> OpResult<()> {
        let result = uninstall_via(&self.packages, &self.ctx, package).await;
        self.ctx.broadcast_uninstall(self.mode(), package, &result);
        result
    }

    async fn launch(&self, package: &str) -> OpResult<()> {
        self.activity
            .launch(package)
            .await
            .or_code(ErrorCode::LaunchFailed)
    }
}
