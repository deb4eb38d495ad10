//! The patch-install pipeline and module maintenance

use std::path::{Path, PathBuf};
use std::sync::Arc;

use droidpm_config::Config;
use droidpm_errors::{BootScript, ModuleError, MountStep};
use droidpm_events::{AppEvent, EventEmitter, EventSender, FailureContext, ModuleEvent};
use droidpm_platform::{Shell, ShellCommand, ShellOutput};
use droidpm_system::parse::{parse_dumpsys_package, parse_package_path};
use droidpm_types::{
    is_valid_package_name, InstallRequest, InstallStep, ModuleInstallStatus, VersionCode,
};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::guard::BootGuard;
use crate::layout::ModuleLayout;
use crate::script;
use crate::UNKNOWN_VERSION;

const APK_SELINUX_CONTEXT: &str = "u:object_r:apk_data_file:s0";
const APK_OWNER: &str = "system:system";

/// Snapshot of one mounted package's boot guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub package: String,
    /// Version the patch was made for, when the mount script is readable
    pub expected_version: Option<VersionCode>,
    pub live_version: Option<VersionCode>,
    pub guard: BootGuard,
}

/// Maintains the root module and drives patch-installs through a root shell
///
/// At most one patch-install per package may be in flight; concurrent
/// installs of different packages are fine.
#[derive(Clone)]
pub struct ModuleManager {
    shell: Arc<dyn Shell>,
    layout: ModuleLayout,
    module_id: String,
    module_name: String,
    staging_dir: PathBuf,
    event_sender: Option<EventSender>,
}

impl EventEmitter for ModuleManager {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Sends status updates to the stream handed out by [`ModuleManager::install`]
struct Progress {
    tx: mpsc::Sender<ModuleInstallStatus>,
}

impl Progress {
    async fn step(&self, step: InstallStep, message: impl Into<String>) {
        // A dropped stream only stops the reporting, not the install.
        let _ = self
            .tx
            .send(ModuleInstallStatus::in_progress(step, message))
            .await;
    }
}

impl ModuleManager {
    pub fn new(shell: Arc<dyn Shell>, layout: ModuleLayout) -> Self {
        Self {
            shell,
            layout,
            module_id: droidpm_config::constants::MODULE_ID.to_string(),
            module_name: droidpm_config::constants::MODULE_NAME.to_string(),
            staging_dir: PathBuf::from(droidpm_config::constants::DEFAULT_STAGING_DIR),
            event_sender: None,
        }
    }

    /// Manager for the module described by `config`
    pub fn from_config(shell: Arc<dyn Shell>, config: &Config) -> Self {
        Self::new(shell, ModuleLayout::new(config.module.root.clone()))
            .with_identity(config.module.id.clone(), config.module.name.clone())
            .with_staging_dir(config.module.staging_dir.clone())
    }

    #[must_use]
    pub fn with_identity(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.module_id = id.into();
        self.module_name = name.into();
        self
    }

    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    /// Patch-install `request`, reporting progress as a stream.
    ///
    /// The stream yields `InProgress` updates and ends with exactly one
    /// `Success` or `Failed`. The work runs on a spawned task, so this must
    /// be called from within a Tokio runtime; dropping the stream does not
    /// cancel the install.
    pub fn install(
        &self,
        request: InstallRequest,
    ) -> impl Stream<Item = ModuleInstallStatus> + Send + 'static {
        let (tx, rx) = mpsc::channel(16);
        let manager = self.clone();
        tokio::spawn(async move {
            let progress = Progress { tx };
            let status = match manager.run_install(&request, &progress).await {
                Ok(version) => {
                    manager.emit(AppEvent::Module(ModuleEvent::Installed {
                        package: request.package_name().to_string(),
                        expected_version: version,
                    }));
                    ModuleInstallStatus::Success
                }
                Err(err) => ModuleInstallStatus::Failed(err),
            };
            let _ = progress.tx.send(status).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_install(
        &self,
        request: &InstallRequest,
        progress: &Progress,
    ) -> Result<VersionCode, ModuleError> {
        let package = request.package_name();
        progress
            .step(InstallStep::Starting, format!("Patching {package}"))
            .await;

        progress
            .step(
                InstallStep::EnsuringRootModuleExists,
                "Checking the root module",
            )
            .await;
        self.tracked(package, InstallStep::EnsuringRootModuleExists, self.ensure_root())
            .await?;

        progress
            .step(InstallStep::CreatingAppFolder, format!("Creating folder for {package}"))
            .await;
        self.tracked(package, InstallStep::CreatingAppFolder, self.create_app_folder(package))
            .await?;

        let version = self.live_version(package).await.unwrap_or(UNKNOWN_VERSION);
        progress
            .step(
                InstallStep::WritingMountScript,
                format!("Writing mount script for version {version}"),
            )
            .await;
        self.tracked(
            package,
            InstallStep::WritingMountScript,
            self.write_mount_script(package, version),
        )
        .await?;

        progress
            .step(InstallStep::CopyingPatchedApk, "Copying patched apk")
            .await;
        self.tracked(
            package,
            InstallStep::CopyingPatchedApk,
            self.copy_patched_apk(package, request.file_path()),
        )
        .await?;

        progress
            .step(InstallStep::Remounting, format!("Mounting patch over {package}"))
            .await;
        self.tracked(package, InstallStep::Remounting, self.remount(package))
            .await?;

        Ok(version)
    }

    /// Run one pipeline step, reporting its start and outcome as events
    async fn tracked<T>(
        &self,
        package: &str,
        step: InstallStep,
        work: impl std::future::Future<Output = Result<T, ModuleError>>,
    ) -> Result<T, ModuleError> {
        self.emit(AppEvent::Module(ModuleEvent::StepStarted {
            package: package.to_string(),
            step: step.to_string(),
        }));
        let result = work.await;
        let event = match &result {
            Ok(_) => ModuleEvent::StepCompleted {
                package: package.to_string(),
                step: step.to_string(),
            },
            Err(err) => ModuleEvent::StepFailed {
                package: package.to_string(),
                step: step.to_string(),
                failure: FailureContext::from_error(err),
            },
        };
        self.emit(AppEvent::Module(event));
        result
    }

    /// Run `command`, returning the output of a zero exit or the failure text
    async fn run(&self, command: &ShellCommand) -> Result<ShellOutput, String> {
        match self.shell.run(&command.to_string()).await {
            Ok(output) if output.is_success() => Ok(output),
            Ok(output) => {
                let text = output.combined();
                Err(if text.trim().is_empty() {
                    format!("`{command}` exited with {:?}", output.code)
                } else {
                    text
                })
            }
            Err(err) => Err(err.to_string()),
        }
    }

    /// Write `content` to `dest` through the shell
    async fn write_file(&self, dest: &Path, content: &str, mode: &str) -> Result<(), String> {
        let command = ShellCommand::new("printf")
            .arg("%s")
            .arg(content)
            .raw(">")
            .path_arg(dest)
            .and(ShellCommand::new("chmod").arg(mode).path_arg(dest));
        self.run(&command).await.map(|_| ())
    }

    async fn exists(&self, flag: &str, path: &Path) -> bool {
        let command = ShellCommand::new("test").arg(flag).path_arg(path);
        self.run(&command).await.is_ok()
    }

    async fn ensure_root(&self) -> Result<(), ModuleError> {
        let prop = self.layout.module_prop();
        let service = self.layout.boot_script(BootScript::Service);
        if self.exists("-f", &prop).await && self.exists("-f", &service).await {
            return Ok(());
        }
        self.emit_info(format!(
            "creating root module at {}",
            self.layout.root().display()
        ));

        let mkdir = ShellCommand::new("mkdir")
            .arg("-p")
            .path_arg(&self.layout.apps_dir());
        self.run(&mkdir)
            .await
            .map_err(|message| ModuleError::CreateModule { message })?;
        self.write_file(
            &prop,
            &script::module_prop(&self.module_id, &self.module_name),
            "644",
        )
        .await
        .map_err(|message| ModuleError::CreateModule { message })?;

        for (boot_script, content) in [
            (BootScript::PostFsData, script::post_fs_data_script()),
            (BootScript::Service, script::service_script()),
        ] {
            self.write_file(&self.layout.boot_script(boot_script), &content, "755")
                .await
                .map_err(|message| ModuleError::SetupScript {
                    script: boot_script,
                    message,
                })?;
        }
        Ok(())
    }

    async fn create_app_folder(&self, package: &str) -> Result<(), ModuleError> {
        if !is_valid_package_name(package) {
            return Err(ModuleError::CreateAppFolder {
                package: package.to_string(),
                message: "invalid package name".to_string(),
            });
        }
        let command = ShellCommand::new("mkdir")
            .arg("-p")
            .path_arg(&self.layout.app_dir(package));
        self.run(&command)
            .await
            .map(|_| ())
            .map_err(|message| ModuleError::CreateAppFolder {
                package: package.to_string(),
                message,
            })
    }

    async fn write_mount_script(
        &self,
        package: &str,
        version: VersionCode,
    ) -> Result<(), ModuleError> {
        let content = script::mount_script(package, version);
        self.write_file(&self.layout.mount_script(package), &content, "755")
            .await
            .map_err(|message| ModuleError::WriteMountScript {
                package: package.to_string(),
                message,
            })
    }

    async fn copy_patched_apk(&self, package: &str, source: &Path) -> Result<(), ModuleError> {
        let copy_error = |message: String| ModuleError::CopyApk {
            package: package.to_string(),
            message,
        };
        // Removed when `staged` drops, whatever happens below.
        let staged = self.stage(source).await.map_err(copy_error)?;
        let command = ShellCommand::new("cp")
            .path_arg(&staged)
            .path_arg(&self.layout.patched_apk(package));
        self.run(&command).await.map(|_| ()).map_err(copy_error)
    }

    /// World-readable copy of `source` the root shell can read
    async fn stage(&self, source: &Path) -> Result<tempfile::TempPath, String> {
        let staged = tempfile::Builder::new()
            .prefix("droidpm-patch-")
            .suffix(".apk")
            .tempfile_in(&self.staging_dir)
            .map_err(|e| format!("cannot stage in {}: {e}", self.staging_dir.display()))?
            .into_temp_path();
        tokio::fs::copy(source, &staged)
            .await
            .map_err(|e| format!("{}: {e}", source.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(staged)
    }

    async fn remount(&self, package: &str) -> Result<(), ModuleError> {
        let remount_error = |step: MountStep| {
            move |message: String| ModuleError::Remount {
                package: package.to_string(),
                step,
                message,
            }
        };

        let stop = ShellCommand::new("am").arg("force-stop").arg(package);
        if let Err(message) = self.run(&stop).await {
            self.emit_warning_with_context(format!("could not stop {package}"), message);
        }

        let base = self
            .base_apk_path(package)
            .await
            .ok_or_else(|| format!("cannot resolve the installed apk of {package}"))
            .map_err(remount_error(MountStep::Mount))?;

        self.unmount_stale(package, &base).await;

        let patched = self.layout.patched_apk(package);
        let fixups = [
            (MountStep::Chmod, ShellCommand::new("chmod").arg("644").path_arg(&patched)),
            (MountStep::Chown, ShellCommand::new("chown").arg(APK_OWNER).path_arg(&patched)),
            (
                MountStep::Chcon,
                ShellCommand::new("chcon").arg(APK_SELINUX_CONTEXT).path_arg(&patched),
            ),
            (
                MountStep::Mount,
                ShellCommand::new("mount")
                    .arg("-o")
                    .arg("bind")
                    .path_arg(&patched)
                    .path_arg(&base),
            ),
        ];
        for (step, command) in fixups {
            self.run(&command).await.map_err(remount_error(step))?;
        }
        Ok(())
    }

    /// Drop a previous bind mount over `base`, if there is one
    async fn unmount_stale(&self, package: &str, base: &Path) {
        let command = ShellCommand::new("umount").arg("-l").path_arg(base);
        if let Err(reason) = self.run(&command).await {
            self.emit(AppEvent::Module(ModuleEvent::UnmountSkipped {
                package: package.to_string(),
                reason,
            }));
        }
    }

    /// Path of the installed `base.apk`, the mount target
    async fn base_apk_path(&self, package: &str) -> Option<PathBuf> {
        let command = ShellCommand::new("pm").arg("path").arg(package);
        let output = self.run(&command).await.ok()?;
        parse_package_path(&output.out_text()).map(|dir| dir.join("base.apk"))
    }

    /// Installed version code, read through `dumpsys`
    async fn live_version(&self, package: &str) -> Option<VersionCode> {
        let command = ShellCommand::new("dumpsys").arg("package").arg(package);
        let output = self.run(&command).await.ok()?;
        parse_dumpsys_package(package, &output.out_text()).map(|info| info.version_code)
    }

    /// Remove the module of `package` and, once that succeeded, its mount.
    ///
    /// Returns whether the folder was removed.
    pub async fn delete(&self, package: &str) -> bool {
        if !is_valid_package_name(package) {
            return false;
        }
        let command = ShellCommand::new("rm")
            .arg("-rf")
            .path_arg(&self.layout.app_dir(package));
        let success = match self.run(&command).await {
            Ok(_) => {
                if let Some(base) = self.base_apk_path(package).await {
                    self.unmount_stale(package, &base).await;
                }
                true
            }
            Err(message) => {
                let err = ModuleError::Destroy {
                    package: package.to_string(),
                    message,
                };
                self.emit_error_with_details(format!("failed to delete module of {package}"), err.to_string());
                false
            }
        };
        self.emit(AppEvent::Module(ModuleEvent::Deleted {
            package: package.to_string(),
            success,
        }));
        success
    }

    /// Whether a module folder exists for `package`. No side effects.
    pub async fn check_module_exist(&self, package: &str) -> bool {
        is_valid_package_name(package) && self.exists("-d", &self.layout.app_dir(package)).await
    }

    /// Evaluate the boot guard of `package` against the installed version.
    ///
    /// `None` when the package has no module.
    pub async fn module_status(&self, package: &str) -> Option<ModuleStatus> {
        if !self.check_module_exist(package).await {
            return None;
        }
        let cat = ShellCommand::new("cat").path_arg(&self.layout.mount_script(package));
        let expected = self
            .run(&cat)
            .await
            .ok()
            .and_then(|output| script::parse_expected_version(&output.out_text()));
        let live = self.live_version(package).await;
        let guard = BootGuard::evaluate(package, expected.unwrap_or(UNKNOWN_VERSION), live);
        Some(ModuleStatus {
            package: package.to_string(),
            expected_version: expected,
            live_version: live,
            guard,
        })
    }

    /// Packages that currently have a module folder
    pub async fn installed_modules(&self) -> Vec<String> {
        let command = ShellCommand::new("ls").path_arg(&self.layout.apps_dir());
        let Ok(output) = self.run(&command).await else {
            return Vec::new();
        };
        let mut packages: Vec<String> = output
            .stdout
            .iter()
            .map(|line| line.trim())
            .filter(|name| is_valid_package_name(name))
            .map(str::to_string)
            .collect();
        packages.sort();
        packages
    }

    /// Delete every package module, then the module root itself.
    ///
    /// # Errors
    ///
    /// Fails with the boot script or root that could not be removed.
    pub async fn remove_root(&self) -> Result<(), ModuleError> {
        for package in self.installed_modules().await {
            self.delete(&package).await;
        }
        for boot_script in [BootScript::PostFsData, BootScript::Service] {
            let command = ShellCommand::new("rm")
                .arg("-f")
                .path_arg(&self.layout.boot_script(boot_script));
            self.run(&command)
                .await
                .map_err(|message| ModuleError::DestroyScript {
                    script: boot_script,
                    message,
                })?;
        }
        let command = ShellCommand::new("rm")
            .arg("-rf")
            .path_arg(self.layout.root());
        self.run(&command)
            .await
            .map(|_| ())
            .map_err(|message| ModuleError::Destroy {
                package: self.module_id.clone(),
                message,
            })
    }
}
