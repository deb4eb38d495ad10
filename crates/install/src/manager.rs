//! The capability contract and backend selection

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_config::Config;
use droidpm_errors::OpResult;
use droidpm_platform::{PlatformContext, ShellExecutor};
use droidpm_system::{ShellActivityService, ShellBroker, ShellPackageService};
use droidpm_types::{PrivilegeMode, VersionCode};

use crate::backends::{DelegatedInstaller, ShellInstaller, UnprivilegedInstaller};
use crate::context::InstallerContext;

/// Privileged operations on installed applications
///
/// Every backend implements every operation. Capabilities a backend lacks
/// fail with their operation's code and the message `Unsupported` instead
/// of silently succeeding.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// The privilege model this backend runs under
    fn mode(&self) -> PrivilegeMode;

    /// Installed version code; `GET_FAILED_PACKAGE_VERSION_CODE` when the
    /// package is absent or unreadable
    async fn version_code(&self, package: &str) -> OpResult<VersionCode>;

    /// Installed version name; `GET_FAILED_PACKAGE_VERSION_NAME` when the
    /// package is absent or has none
    async fn version_name(&self, package: &str) -> OpResult<String>;

    /// Never fails: anything that prevents an answer counts as not installed
    async fn is_installed(&self, package: &str) -> bool;

    async fn installation_dir(&self, package: &str) -> OpResult<PathBuf>;

    /// Record `installer` as the installer of `package`
    async fn set_installer(&self, package: &str, installer: &str) -> OpResult<()>;

    async fn force_stop(&self, package: &str) -> OpResult<()>;

    async fn install_app(&self, apk: &Path) -> OpResult<()> {
        self.install_split_app(&[apk.to_path_buf()]).await
    }

    /// Install a base apk together with its split apks as one package
    async fn install_split_app(&self, apks: &[PathBuf]) -> OpResult<()>;

    async fn uninstall(&self, package: &str) -> OpResult<()>;

    async fn launch(&self, package: &str) -> OpResult<()>;
}

/// Build the backend for `mode`, wired to the shells named in `config`
#[must_use]
pub fn for_mode(
    mode: PrivilegeMode,
    config: &Config,
    ctx: InstallerContext,
) -> Box<dyn PackageManager> {
    let platform = PlatformContext::new(ctx.event_sender.clone());
    match mode {
        PrivilegeMode::Unprivileged => {
            let shell = Arc::new(ShellExecutor::with_program(
                config.shell.user_binary.clone(),
                platform,
            ));
            Box::new(UnprivilegedInstaller::new(
                Arc::new(ShellPackageService::new(shell.clone())),
                Arc::new(ShellActivityService::new(shell)),
                ctx,
            ))
        }
        PrivilegeMode::Shell => {
            let shell = Arc::new(ShellExecutor::root(config.shell.root_binary.clone(), platform));
            Box::new(ShellInstaller::new(shell, ctx))
        }
        PrivilegeMode::Delegated => {
            let shell = Arc::new(ShellExecutor::with_program(
                config.shell.broker_binary.clone(),
                platform,
            ));
            Box::new(DelegatedInstaller::new(
                Arc::new(ShellBroker::new(shell)),
                ctx,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_follows_mode() {
        let config = Config::default();
        for mode in [
            PrivilegeMode::Unprivileged,
            PrivilegeMode::Shell,
            PrivilegeMode::Delegated,
        ] {
            let manager = for_mode(mode, &config, InstallerContext::new());
            assert_eq!(manager.mode(), mode);
        }
    }
}
