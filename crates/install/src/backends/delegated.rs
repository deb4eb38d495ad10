use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::{ErrorCode, OpResult, OperationError, ResultExt};
use droidpm_events::EventEmitter;
use droidpm_system::{
    ActivityService, BrokerState, PackageService, PrivilegeBroker, SessionParams,
};
use droidpm_types::{PrivilegeMode, VersionCode};

use crate::context::InstallerContext;
use crate::manager::PackageManager;
use crate::session::{package_info, uninstall_via, CommitFailure, SessionInstall};

/// Backend borrowing the rights of an out-of-process privilege broker
///
/// Every operation probes the broker first and fails immediately with
/// `GET_FAILED_BROKER` when it is missing or not running, so a dead broker
/// never leaves a caller waiting.
pub struct DelegatedInstaller {
    broker: Arc<dyn PrivilegeBroker>,
    ctx: InstallerContext,
}

impl DelegatedInstaller {
    pub fn new(broker: Arc<dyn PrivilegeBroker>, ctx: InstallerContext) -> Self {
        Self { broker, ctx }
    }

    async fn ready(&self) -> OpResult<()> {
        match self.broker.state().await {
            BrokerState::Ready => Ok(()),
            BrokerState::NotInstalled => Err(OperationError::new(
                ErrorCode::GetFailedBroker,
                "privilege broker is not installed",
            )),
            BrokerState::NotRunning => Err(OperationError::new(
                ErrorCode::GetFailedBroker,
                "privilege broker is not running",
            )),
        }
    }

    async fn packages(&self) -> OpResult<Arc<dyn PackageService>> {
        self.ready().await?;
        Ok(self.broker.package_service())
    }

    async fn activity(&self) -> OpResult<Arc<dyn ActivityService>> {
        self.ready().await?;
        Ok(self.broker.activity_service())
    }
}

#[async_trait]
impl PackageManager for DelegatedInstaller {
    fn mode(&self) -> PrivilegeMode {
        PrivilegeMode::Delegated
    }

    async fn version_code(&self, package: &str) -> OpResult<VersionCode> {
        let packages = self.packages().await?;
        let info = package_info(
            packages.as_ref(),
            package,
            ErrorCode::GetFailedPackageVersionCode,
        )
        .await?;
        Ok(info.version_code)
    }

    async fn version_name(&self, package: &str) -> OpResult<String> {
        let code = ErrorCode::GetFailedPackageVersionName;
        let packages = self.packages().await?;
        package_info(packages.as_ref(), package, code)
            .await?
            .version_name
            .ok_or_else(|| OperationError::new(code, format!("{package} has no version name")))
    }

    async fn is_installed(&self, package: &str) -> bool {
        let Ok(packages) = self.packages().await else {
            return false;
        };
        matches!(packages.package_info(package).await, Ok(Some(_)))
    }

    async fn installation_dir(&self, package: &str) -> OpResult<PathBuf> {
        let code = ErrorCode::GetFailedPackageDir;
        let packages = self.packages().await?;
        package_info(packages.as_ref(), package, code)
            .await?
            .install_dir
            .ok_or_else(|| OperationError::new(code, format!("no code path for {package}")))
    }

    async fn set_installer(&self, package: &str, installer: &str) -> OpResult<()> {
        self.packages()
            .await?
            .set_installer(package, installer)
            .await
            .or_code(ErrorCode::SetFailedInstaller)
    }

    async fn force_stop(&self, package: &str) -> OpResult<()> {
        self.activity()
            .await?
            .force_stop(package)
            .await
            .or_code(ErrorCode::AppFailedForceStop)
    }

    async fn install_split_app(&self, apks: &[PathBuf]) -> OpResult<()> {
        let result = match self.packages().await {
            Ok(packages) => {
                SessionInstall {
                    service: packages.as_ref(),
                    ctx: &self.ctx,
                    mode: self.mode(),
                    params: SessionParams::privileged(),
                    staging_dir: None,
                    commit_failure: CommitFailure::Classify,
                }
                .run(apks)
                .await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            self.ctx
                .emit_debug(format!("delegated install failed: {err}"));
        }
        self.ctx.broadcast_install(self.mode(), None, &result);
        result
    }

    async fn uninstall(&self, package: &str) -> OpResult<()> {
        let result = match self.packages().await {
            Ok(packages) => uninstall_via(packages.as_ref(), &self.ctx, package).await,
            Err(err) => Err(err),
        };
        self.ctx.broadcast_uninstall(self.mode(), package, &result);
        result
    }

    async fn launch(&self, package: &str) -> OpResult<()> {
        self.activity()
            .await?
            .launch(package)
            .await
            .or_code(ErrorCode::LaunchFailed)
    }
}
