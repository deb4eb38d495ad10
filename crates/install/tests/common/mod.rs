#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use droidpm_errors::ServiceError;
use droidpm_events::{AppEvent, EventReceiver, PackageEvent};
use droidpm_system::{
    ActivityService, BrokerState, CompletionSender, CompletionStatus, ConfirmationIntent,
    InstallSession, PackageService, PrivilegeBroker, SessionId, SessionParams,
};
use droidpm_types::PackageInfo;

pub type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// What a fake session does when committed
#[derive(Clone)]
pub enum CommitBehavior {
    Deliver(CompletionStatus),
    /// Ask for confirmation, then deliver
    ConfirmThen(CompletionStatus),
    /// Keep the sender alive and never call back
    Never,
}

#[derive(Clone)]
pub struct FakePackageService {
    pub packages: HashMap<String, PackageInfo>,
    pub log: Log,
    pub params: Arc<Mutex<Vec<SessionParams>>>,
    pub fail_write: bool,
    pub commit: CommitBehavior,
    pub uninstall: CompletionStatus,
    held: Arc<Mutex<Vec<CompletionSender>>>,
}

impl FakePackageService {
    pub fn new() -> Self {
        Self {
            packages: HashMap::new(),
            log: Log::default(),
            params: Arc::default(),
            fail_write: false,
            commit: CommitBehavior::Deliver(CompletionStatus::Success),
            uninstall: CompletionStatus::Success,
            held: Arc::default(),
        }
    }

    pub fn with_package(mut self, info: PackageInfo) -> Self {
        self.packages.insert(info.package_name.clone(), info);
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn committing(mut self, behavior: CommitBehavior) -> Self {
        self.commit = behavior;
        self
    }

    pub fn uninstalling(mut self, status: CompletionStatus) -> Self {
        self.uninstall = status;
        self
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

#[async_trait]
impl PackageService for FakePackageService {
    async fn package_info(&self, package: &str) -> Result<Option<PackageInfo>, ServiceError> {
        Ok(self.packages.get(package).cloned())
    }

    async fn installed_packages(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.packages.keys().cloned().collect())
    }

    async fn create_session(&self, params: &SessionParams) -> Result<SessionId, ServiceError> {
        push(&self.log, "create");
        self.params.lock().unwrap().push(params.clone());
        Ok(41)
    }

    async fn open_session(&self, id: SessionId) -> Result<Arc<dyn InstallSession>, ServiceError> {
        push(&self.log, format!("open {id}"));
        Ok(Arc::new(FakeSession {
            id,
            service: self.clone(),
        }))
    }

    async fn uninstall(&self, package: &str, sender: CompletionSender) -> Result<(), ServiceError> {
        push(&self.log, format!("uninstall {package}"));
        sender.deliver(self.uninstall.clone());
        Ok(())
    }

    async fn set_installer(&self, package: &str, installer: &str) -> Result<(), ServiceError> {
        push(&self.log, format!("set-installer {package} {installer}"));
        Ok(())
    }
}

pub struct FakeSession {
    id: SessionId,
    service: FakePackageService,
}

#[async_trait]
impl InstallSession for FakeSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn write(&self, name: &str, path: &Path, size: u64) -> Result<(), ServiceError> {
        assert_eq!(std::fs::metadata(path).unwrap().len(), size);
        push(&self.service.log, format!("write {name}"));
        if self.service.fail_write {
            return Err(ServiceError::CallFailed {
                call: "write".into(),
                message: "broken pipe".into(),
            });
        }
        Ok(())
    }

    async fn fsync(&self, name: &str) -> Result<(), ServiceError> {
        push(&self.service.log, format!("fsync {name}"));
        Ok(())
    }

    async fn commit(&self, sender: CompletionSender) -> Result<(), ServiceError> {
        push(&self.service.log, "commit");
        match &self.service.commit {
            CommitBehavior::Deliver(status) => {
                sender.deliver(status.clone());
            }
            CommitBehavior::ConfirmThen(status) => {
                sender.deliver(CompletionStatus::PendingUserAction(ConfirmationIntent {
                    session_id: Some(self.id),
                    action: "confirm-install".into(),
                }));
                sender.deliver(status.clone());
            }
            CommitBehavior::Never => self.service.held.lock().unwrap().push(sender),
        }
        Ok(())
    }

    async fn abandon(&self) -> Result<(), ServiceError> {
        push(&self.service.log, "abandon");
        Ok(())
    }

    async fn close(&self) -> Result<(), ServiceError> {
        push(&self.service.log, "close");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeActivity {
    pub log: Log,
}

#[async_trait]
impl ActivityService for FakeActivity {
    async fn force_stop(&self, package: &str) -> Result<(), ServiceError> {
        push(&self.log, format!("force-stop {package}"));
        Ok(())
    }

    async fn launch(&self, package: &str) -> Result<(), ServiceError> {
        push(&self.log, format!("launch {package}"));
        Ok(())
    }
}

pub struct FakeBroker {
    pub state: BrokerState,
    pub packages: FakePackageService,
    pub activity: FakeActivity,
}

#[async_trait]
impl PrivilegeBroker for FakeBroker {
    async fn state(&self) -> BrokerState {
        self.state
    }

    fn package_service(&self) -> Arc<dyn PackageService> {
        Arc::new(self.packages.clone())
    }

    fn activity_service(&self) -> Arc<dyn ActivityService> {
        Arc::new(self.activity.clone())
    }
}

/// Write a fake apk of `len` bytes into `dir`
pub fn apk(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0x50_u8; len]).unwrap();
    path
}

pub fn drain(rx: &mut EventReceiver) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(message.event);
    }
    events
}

pub fn installs(events: &[AppEvent]) -> Vec<PackageEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Package(p @ PackageEvent::AppInstall { .. }) => Some(p.clone()),
            _ => None,
        })
        .collect()
}

pub fn uninstalls(events: &[AppEvent]) -> Vec<PackageEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Package(p @ PackageEvent::AppUninstall { .. }) => Some(p.clone()),
            _ => None,
        })
        .collect()
}
