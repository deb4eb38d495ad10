//! Session-protocol install and bridge-awaited uninstall shared by backends

use std::path::{Path, PathBuf};

use droidpm_errors::{ErrorCode, OpResult, OperationError, ResultExt, ServiceError};
use droidpm_events::{AppEvent, EventEmitter, PackageEvent};
use droidpm_system::parse::classify_install_failure;
use droidpm_system::{
    Completion, CompletionBridge, InstallSession, PackageService, SessionParams,
};
use droidpm_types::{PackageInfo, PrivilegeMode};

use crate::context::InstallerContext;
use crate::guard::SessionGuard;

/// How commit failures reported through the bridge are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitFailure {
    /// Pick the install code from the failure text
    Classify,
    /// Always `SESSION_FAILED_COMMIT`
    Session,
}

/// One run of the create, write, commit, release protocol
pub(crate) struct SessionInstall<'a> {
    pub service: &'a dyn PackageService,
    pub ctx: &'a InstallerContext,
    pub mode: PrivilegeMode,
    pub params: SessionParams,
    /// Copy each part into a world-readable file here before writing it
    pub staging_dir: Option<&'a Path>,
    pub commit_failure: CommitFailure,
}

struct Part {
    name: String,
    path: PathBuf,
    size: u64,
}

impl SessionInstall<'_> {
    pub(crate) async fn run(self, apks: &[PathBuf]) -> OpResult<()> {
        if apks.is_empty() {
            return Err(OperationError::new(
                ErrorCode::InstallFailedInvalidApk,
                "no apk files given",
            ));
        }

        let mut parts = Vec::with_capacity(apks.len());
        for (index, apk) in apks.iter().enumerate() {
            let size = tokio::fs::metadata(apk)
                .await
                .map_err(|e| {
                    OperationError::new(
                        ErrorCode::SessionFailedCopy,
                        format!("{}: {e}", apk.display()),
                    )
                })?
                .len();
            parts.push(Part {
                name: part_name(index, apk),
                path: apk.clone(),
                size,
            });
        }
        let total: u64 = parts.iter().map(|p| p.size).sum();

        let params = self.params.clone().with_total_size(total);
        let id = self
            .service
            .create_session(&params)
            .await
            .or_code(ErrorCode::SessionFailedCreate)?;
        let session = self.service.open_session(id).await.map_err(|e| {
            let code = match e {
                ServiceError::InvalidSession { .. } => ErrorCode::SessionInvalidId,
                _ => ErrorCode::SessionFailedOpen,
            };
            OperationError::new(code, e.to_string())
        })?;
        let guard = SessionGuard::new(session, self.ctx.event_sender.clone());
        self.ctx.emit(AppEvent::Package(PackageEvent::SessionCreated {
            session_id: id,
            mode: self.mode,
            parts: parts.len(),
        }));

        let result = self.write_and_commit(guard.session(), &parts).await;
        guard
            .release(result.as_ref().err().map(|e| e.message.as_str()))
            .await;
        result
    }

    async fn write_and_commit(&self, session: &dyn InstallSession, parts: &[Part]) -> OpResult<()> {
        for part in parts {
            self.write_part(session, part).await?;
            session
                .fsync(&part.name)
                .await
                .or_code(ErrorCode::SessionFailedWrite)?;
        }

        let (sender, awaiter) =
            CompletionBridge::open_with_confirmations(self.ctx.confirmations.clone());
        session
            .commit(sender)
            .await
            .or_code(ErrorCode::SessionFailedCommit)?;
        self.ctx.emit(AppEvent::Package(PackageEvent::SessionCommitted {
            session_id: session.id(),
        }));

        match awaiter
            .wait(self.ctx.completion_timeout, &self.ctx.cancel)
            .await
        {
            Completion::Delivered(delivery) if delivery.success => Ok(()),
            Completion::Delivered(delivery) => {
                let message = delivery
                    .message
                    .unwrap_or_else(|| "installation failed".to_string());
                let code = match self.commit_failure {
                    CommitFailure::Classify => classify_install_failure(&message),
                    CommitFailure::Session => ErrorCode::SessionFailedCommit,
                };
                Err(OperationError::new(code, message))
            }
            Completion::TimedOut => Err(OperationError::new(
                ErrorCode::InstallFailedTimeout,
                format!(
                    "no result for session {} within {}s",
                    session.id(),
                    self.ctx.completion_timeout.as_secs()
                ),
            )),
            Completion::Cancelled => Err(OperationError::new(
                ErrorCode::InstallFailedAborted,
                "installation cancelled",
            )),
            Completion::Dropped => Err(OperationError::new(
                ErrorCode::SessionFailedCommit,
                "the system dropped the completion callback",
            )),
        }
    }

    async fn write_part(&self, session: &dyn InstallSession, part: &Part) -> OpResult<()> {
        let Some(dir) = self.staging_dir else {
            return session
                .write(&part.name, &part.path, part.size)
                .await
                .or_code(ErrorCode::SessionFailedWrite);
        };
        // The temp copy is deleted when `staged` drops, on every exit path.
        let staged = stage(&part.path, dir).await?;
        session
            .write(&part.name, &staged, part.size)
            .await
            .or_code(ErrorCode::SessionFailedWrite)
    }
}

/// Copy `apk` to a world-readable temp file in `dir`
async fn stage(apk: &Path, dir: &Path) -> OpResult<tempfile::TempPath> {
    let staged = tempfile::Builder::new()
        .prefix("droidpm-")
        .suffix(".apk")
        .tempfile_in(dir)
        .or_code(ErrorCode::SessionFailedCopy)?
        .into_temp_path();
    tokio::fs::copy(apk, &staged)
        .await
        .or_code(ErrorCode::SessionFailedCopy)?;
    make_world_readable(&staged)
        .await
        .or_code(ErrorCode::SessionFailedCopy)?;
    Ok(staged)
}

#[cfg(unix)]
async fn make_world_readable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await
}

#[cfg(not(unix))]
async fn make_world_readable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Session part name: index-prefixed so duplicate file names stay distinct
fn part_name(index: usize, apk: &Path) -> String {
    let file = apk
        .file_name()
        .map_or_else(|| "base.apk".into(), |name| name.to_string_lossy());
    format!("{index}_{file}")
}

/// Start an uninstall and wait for the system's verdict
pub(crate) async fn uninstall_via(
    service: &dyn PackageService,
    ctx: &InstallerContext,
    package: &str,
) -> OpResult<()> {
    let (sender, awaiter) = CompletionBridge::open();
    service
        .uninstall(package, sender)
        .await
        .or_code(ErrorCode::UninstallFailed)?;
    match awaiter.wait(ctx.completion_timeout, &ctx.cancel).await {
        Completion::Delivered(delivery) if delivery.success => Ok(()),
        Completion::Delivered(delivery) => Err(OperationError::new(
            ErrorCode::UninstallFailed,
            delivery
                .message
                .unwrap_or_else(|| format!("failed to uninstall {package}")),
        )),
        Completion::TimedOut => Err(OperationError::new(
            ErrorCode::UninstallFailedTimeout,
            format!(
                "no uninstall result for {package} within {}s",
                ctx.completion_timeout.as_secs()
            ),
        )),
        Completion::Cancelled => Err(OperationError::new(
            ErrorCode::UninstallFailed,
            "uninstall cancelled",
        )),
        Completion::Dropped => Err(OperationError::new(
            ErrorCode::UninstallFailed,
            "the system dropped the completion callback",
        )),
    }
}

/// Installed package metadata, with `code` on absence or a failed query
pub(crate) async fn package_info(
    service: &dyn PackageService,
    package: &str,
    code: ErrorCode,
) -> OpResult<PackageInfo> {
    service
        .package_info(package)
        .await
        .or_code(code)?
        .ok_or_else(|| OperationError::new(code, format!("{package} is not installed")))
}
