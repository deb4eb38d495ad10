//! Contracts of the system services the package backends drive

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::ServiceError;
use droidpm_types::PackageInfo;

use crate::completion::CompletionSender;

/// Identifier the package service assigns to an installer session
pub type SessionId = i32;

/// Flags an installer session is created with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub replace_existing: bool,
    pub allow_downgrade: bool,
    /// Accept packages flagged as test-only
    pub allow_test: bool,
    /// Ask the system not to prompt the user when it can avoid it
    pub unattended: bool,
    pub installer_package: Option<String>,
    /// Sum of all part sizes, when known up front
    pub total_size: Option<u64>,
}

impl SessionParams {
    /// Parameters for an ordinary update-or-install
    #[must_use]
    pub fn replacing() -> Self {
        Self {
            replace_existing: true,
            unattended: true,
            ..Self::default()
        }
    }

    /// Parameters for a caller holding elevated rights: replace, downgrade
    /// and test packages are all allowed.
    #[must_use]
    pub fn privileged() -> Self {
        Self {
            replace_existing: true,
            allow_downgrade: true,
            allow_test: true,
            unattended: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_total_size(mut self, size: u64) -> Self {
        self.total_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_installer(mut self, installer: impl Into<String>) -> Self {
        self.installer_package = Some(installer.into());
        self
    }
}

/// An open installer session
///
/// Parts are written, synced, then the whole session is committed once.
/// The outcome of the commit arrives through the [`CompletionSender`], not
/// through the return value of [`InstallSession::commit`], which only
/// reports whether the commit could be issued at all.
#[async_trait]
pub trait InstallSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Stream `size` bytes of the file at `path` into the part called `name`
    async fn write(&self, name: &str, path: &Path, size: u64) -> Result<(), ServiceError>;

    async fn fsync(&self, name: &str) -> Result<(), ServiceError>;

    async fn commit(&self, sender: CompletionSender) -> Result<(), ServiceError>;

    async fn abandon(&self) -> Result<(), ServiceError>;

    /// Release the local handle without abandoning the session
    async fn close(&self) -> Result<(), ServiceError>;
}

/// Package queries, installer sessions and uninstalls
#[async_trait]
pub trait PackageService: Send + Sync {
    /// `Ok(None)` when the package is not installed
    async fn package_info(&self, package: &str) -> Result<Option<PackageInfo>, ServiceError>;

    async fn installed_packages(&self) -> Result<Vec<String>, ServiceError>;

    async fn create_session(&self, params: &SessionParams) -> Result<SessionId, ServiceError>;

    async fn open_session(&self, id: SessionId) -> Result<Arc<dyn InstallSession>, ServiceError>;

    /// Start an uninstall; the outcome is delivered through `sender`
    async fn uninstall(&self, package: &str, sender: CompletionSender) -> Result<(), ServiceError>;

    async fn set_installer(&self, package: &str, installer: &str) -> Result<(), ServiceError>;
}

/// App process control
#[async_trait]
pub trait ActivityService: Send + Sync {
    async fn force_stop(&self, package: &str) -> Result<(), ServiceError>;

    /// Start the package's launcher activity
    async fn launch(&self, package: &str) -> Result<(), ServiceError>;
}

/// Availability of an out-of-process privilege broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    NotInstalled,
    NotRunning,
    Ready,
}

impl BrokerState {
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Helper process with elevated rights that hands out service proxies
#[async_trait]
pub trait PrivilegeBroker: Send + Sync {
    /// Probe the broker. Must return promptly even when the broker is dead.
    async fn state(&self) -> BrokerState;

    fn package_service(&self) -> Arc<dyn PackageService>;

    fn activity_service(&self) -> Arc<dyn ActivityService>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_params_force_every_override() {
        let params = SessionParams::privileged().with_total_size(42);
        assert!(params.replace_existing);
        assert!(params.allow_downgrade);
        assert!(params.allow_test);
        assert_eq!(params.total_size, Some(42));
    }

    #[test]
    fn replacing_params_do_not_downgrade() {
        let params = SessionParams::replacing();
        assert!(params.replace_existing);
        assert!(!params.allow_downgrade);
        assert!(!params.allow_test);
    }
}
