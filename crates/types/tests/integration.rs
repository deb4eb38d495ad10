//! Integration tests for types

#[cfg(test)]
mod tests {
    use droidpm_errors::{ErrorCode, ModuleError, OperationError};
    use droidpm_types::*;

    #[test]
    fn test_only_final_statuses_are_terminal() {
        let progress = ModuleInstallStatus::in_progress(InstallStep::CopyingPatchedApk, "copying");
        assert!(!progress.is_terminal());
        assert!(ModuleInstallStatus::Success.is_terminal());

        let failed = ModuleInstallStatus::Failed(ModuleError::CopyApk {
            package: "com.example.app".into(),
            message: "No space left on device".into(),
        });
        assert!(failed.is_terminal());
    }

    #[test]
    fn test_failed_status_keeps_code() {
        let err = ModuleError::CreateAppFolder {
            package: "com.example.app".into(),
            message: "Read-only file system".into(),
        };
        let op: OperationError = err.into();
        assert_eq!(op.code, ErrorCode::PatchFailedFolder);
    }

    #[test]
    fn test_steps_are_ordered() {
        let steps = [
            InstallStep::Starting,
            InstallStep::EnsuringRootModuleExists,
            InstallStep::CreatingAppFolder,
            InstallStep::WritingMountScript,
            InstallStep::CopyingPatchedApk,
            InstallStep::Remounting,
        ];
        assert!(steps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(InstallStep::Remounting.to_string(), "remounting");
    }

    #[test]
    fn test_request_accessors() {
        let request = InstallRequest::new("com.example.app", "/sdcard/patched.apk").unwrap();
        assert_eq!(request.package_name(), "com.example.app");
        assert_eq!(
            request.file_path(),
            std::path::Path::new("/sdcard/patched.apk")
        );
    }
}
