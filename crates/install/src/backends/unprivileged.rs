use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::{ErrorCode, OpResult, OperationError, ResultExt};
use droidpm_system::{ActivityService, PackageService, SessionParams};
use droidpm_types::{PrivilegeMode, VersionCode};

use crate::context::InstallerContext;
use crate::manager::PackageManager;
use crate::session::{package_info, uninstall_via, CommitFailure, SessionInstall};

/// Backend running with the caller's own rights
///
/// Installs go through a system installer session; when the system pauses
/// the commit for user confirmation the intent is forwarded to
/// [`InstallerContext::confirmations`]. Force-stop and set-installer need
/// rights this backend does not have and always fail as unsupported.
pub struct UnprivilegedInstaller {
    packages: Arc<dyn PackageService>,
    activity: Arc<dyn ActivityService>,
    ctx: InstallerContext,
}

impl UnprivilegedInstaller {
    pub fn new(
        packages: Arc<dyn PackageService>,
        activity: Arc<dyn ActivityService>,
        ctx: InstallerContext,
    ) -> Self {
        Self {
            packages,
            activity,
            ctx,
        }
    }
}

#[async_trait]
impl PackageManager for UnprivilegedInstaller {
    fn mode(&self) -> PrivilegeMode {
        PrivilegeMode::Unprivileged
    }

    async fn version_code(&self, package: &str) -> OpResult<VersionCode> {
        let info = package_info(
            self.packages.as_ref(),
            package,
            ErrorCode::GetFailedPackageVersionCode,
        )
        .await?;
        Ok(info.version_code)
    }

    async fn version_name(&self, package: &str) -> OpResult<String> {
        let code = ErrorCode::GetFailedPackageVersionName;
        package_info(self.packages.as_ref(), package, code)
            .await?
            .version_name
            .ok_or_else(|| OperationError::new(code, format!("{package} has no version name")))
    }

    async fn is_installed(&self, package: &str) -> bool {
        matches!(self.packages.package_info(package).await, Ok(Some(_)))
    }

    async fn installation_dir(&self, package: &str) -> OpResult<PathBuf> {
        let code = ErrorCode::GetFailedPackageDir;
        package_info(self.packages.as_ref(), package, code)
            .await?
            .install_dir
            .ok_or_else(|| OperationError::new(code, format!("no code path for {package}")))
    }

    async fn set_installer(&self, _package: &str, _installer: &str) -> OpResult<()> {
        Err(OperationError::unsupported(ErrorCode::SetFailedInstaller))
    }

    async fn force_stop(&self, _package: &str) -> OpResult<()> {
        Err(OperationError::unsupported(ErrorCode::AppFailedForceStop))
    }

    async fn install_split_app(&self, apks: &[PathBuf]) -> OpResult<()> {
        let result = SessionInstall {
            service: self.packages.as_ref(),
            ctx: &self.ctx,
            mode: self.mode(),
            params: SessionParams::replacing(),
            staging_dir: None,
            commit_failure: CommitFailure::Classify,
        }
        .run(apks)
        .await;
        self.ctx.broadcast_install(self.mode(), None, &result);
        result
    }

    async fn uninstall(&self, package: &str) -> OpResult<()> {
        let result = uninstall_via(self.packages.as_ref(), &self.ctx, package).await;
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
