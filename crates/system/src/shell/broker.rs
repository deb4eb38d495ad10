use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use droidpm_errors::PlatformError;
use droidpm_platform::Shell;

use super::{ShellActivityService, ShellPackageService};
use crate::services::{ActivityService, BrokerState, PackageService, PrivilegeBroker};

/// How long a liveness probe may take before the broker counts as not running
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`PrivilegeBroker`] reached through a broker client shell such as `rish`
///
/// The broker is probed by running `true` through its shell: a missing
/// client binary means the broker is not installed, a failing or hanging
/// probe means it is not running.
#[derive(Clone)]
pub struct ShellBroker {
    shell: Arc<dyn Shell>,
    probe_timeout: Duration,
}

impl ShellBroker {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self {
            shell,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

#[async_trait]
impl PrivilegeBroker for ShellBroker {
    async fn state(&self) -> BrokerState {
        match tokio::time::timeout(self.probe_timeout, self.shell.run("true")).await {
            Ok(Ok(output)) if output.is_success() => BrokerState::Ready,
            Ok(Err(PlatformError::CommandNotFound { .. })) => BrokerState::NotInstalled,
            _ => BrokerState::NotRunning,
        }
    }

    fn package_service(&self) -> Arc<dyn PackageService> {
        Arc::new(ShellPackageService::new(Arc::clone(&self.shell)))
    }

    fn activity_service(&self) -> Arc<dyn ActivityService> {
        Arc::new(ShellActivityService::new(Arc::clone(&self.shell)))
    }
}
