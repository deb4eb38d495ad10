use std::path::PathBuf;
use std::time::Duration;

use droidpm_config::Config;
use droidpm_errors::OpResult;
use droidpm_events::{AppEvent, EventEmitter, EventSender, PackageEvent};
use droidpm_system::ConfirmationIntent;
use droidpm_types::PrivilegeMode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything a backend needs besides its services
#[derive(Clone, Debug)]
pub struct InstallerContext {
    /// Diagnostics and completion broadcasts
    pub event_sender: Option<EventSender>,
    /// Upper bound on waiting for a commit or uninstall result
    pub completion_timeout: Duration,
    /// Cancels in-flight completion waits; the session is still released
    pub cancel: CancellationToken,
    /// Foreground receiver for installs paused on user confirmation
    pub confirmations: Option<mpsc::UnboundedSender<ConfirmationIntent>>,
    /// World-readable directory for parts handed to another principal
    pub staging_dir: PathBuf,
}

impl InstallerContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            event_sender: None,
            completion_timeout: Duration::from_secs(
                droidpm_config::constants::DEFAULT_COMPLETION_TIMEOUT_SECS,
            ),
            cancel: CancellationToken::new(),
            confirmations: None,
            staging_dir: PathBuf::from(droidpm_config::constants::DEFAULT_STAGING_DIR),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_completion_timeout(config.completion_timeout())
            .with_staging_dir(config.module.staging_dir.clone())
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_confirmations(mut self, tx: mpsc::UnboundedSender<ConfirmationIntent>) -> Self {
        self.confirmations = Some(tx);
        self
    }

    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Publish the install completion broadcast for `result`
    pub(crate) fn broadcast_install(
        &self,
        mode: PrivilegeMode,
        package: Option<&str>,
        result: &OpResult<()>,
    ) {
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.message.as_str());
        self.emit(AppEvent::Package(PackageEvent::app_install(
            package.map(str::to_string),
            mode,
            outcome,
        )));
    }

    /// Publish the uninstall completion broadcast for `result`
    pub(crate) fn broadcast_uninstall(
        &self,
        mode: PrivilegeMode,
        package: &str,
        result: &OpResult<()>,
    ) {
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.message.as_str());
        self.emit(AppEvent::Package(PackageEvent::app_uninstall(
            package, mode, outcome,
        )));
    }
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter for InstallerContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}
