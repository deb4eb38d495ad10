mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    apk, drain, installs, uninstalls, CommitBehavior, FakeActivity, FakeBroker,
    FakePackageService,
};
use droidpm_events::{channel, PackageEvent};
use droidpm_install::{
    DelegatedInstaller, ErrorCode, InstallerContext, PackageManager, PrivilegeMode,
    ShellInstaller, UnprivilegedInstaller,
};
use droidpm_platform::testing::ScriptedShell;
use droidpm_platform::ShellOutput;
use droidpm_system::{BrokerState, CompletionStatus};
use droidpm_types::PackageInfo;
use tokio_util::sync::CancellationToken;

fn unprivileged(service: &FakePackageService, ctx: InstallerContext) -> UnprivilegedInstaller {
    UnprivilegedInstaller::new(
        Arc::new(service.clone()),
        Arc::new(FakeActivity::default()),
        ctx,
    )
}

fn delegated(state: BrokerState, service: &FakePackageService) -> DelegatedInstaller {
    DelegatedInstaller::new(
        Arc::new(FakeBroker {
            state,
            packages: service.clone(),
            activity: FakeActivity::default(),
        }),
        InstallerContext::new(),
    )
}

#[tokio::test]
async fn unprivileged_uninstall_success_broadcasts_once() {
    let (tx, mut rx) = channel();
    let service = FakePackageService::new();
    let manager = unprivileged(&service, InstallerContext::new().with_event_sender(tx));

    manager.uninstall("com.example.app").await.unwrap();

    let broadcasts = uninstalls(&drain(&mut rx));
    assert_eq!(
        broadcasts,
        vec![PackageEvent::AppUninstall {
            package: "com.example.app".into(),
            mode: PrivilegeMode::Unprivileged,
            success: true,
            status_message: None,
        }]
    );
}

#[tokio::test]
async fn failed_uninstall_carries_message() {
    let (tx, mut rx) = channel();
    let service = FakePackageService::new().uninstalling(CompletionStatus::Failure {
        message: Some("DELETE_FAILED_DEVICE_POLICY_MANAGER".into()),
    });
    let manager = unprivileged(&service, InstallerContext::new().with_event_sender(tx));

    let err = manager.uninstall("com.example.app").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UninstallFailed);

    let broadcasts = uninstalls(&drain(&mut rx));
    assert_eq!(broadcasts.len(), 1);
    assert!(matches!(
        &broadcasts[0],
        PackageEvent::AppUninstall { success: false, status_message: Some(m), .. }
            if m == "DELETE_FAILED_DEVICE_POLICY_MANAGER"
    ));
}

#[tokio::test]
async fn absent_package_queries_fail_on_every_backend() {
    let service = FakePackageService::new();
    let shell = Arc::new(
        ScriptedShell::new().on("dumpsys", ShellOutput::success(&["Unable to find package: com.gone"])),
    );
    let managers: Vec<Box<dyn PackageManager>> = vec![
        Box::new(unprivileged(&service, InstallerContext::new())),
        Box::new(ShellInstaller::new(shell, InstallerContext::new())),
        Box::new(delegated(BrokerState::Ready, &service)),
    ];

    for manager in managers {
        let code = manager.version_code("com.gone").await.unwrap_err().code;
        assert_eq!(code, ErrorCode::GetFailedPackageVersionCode, "{}", manager.mode());
        let name = manager.version_name("com.gone").await.unwrap_err().code;
        assert_eq!(name, ErrorCode::GetFailedPackageVersionName, "{}", manager.mode());
        assert!(!manager.is_installed("com.gone").await);
    }
}

#[tokio::test]
async fn queries_read_installed_metadata() {
    let service = FakePackageService::new().with_package(
        PackageInfo::new("com.example.app", 5)
            .with_version_name("1.0")
            .with_install_dir("/data/app/com.example.app-1"),
    );
    let manager = delegated(BrokerState::Ready, &service);

    assert_eq!(manager.version_code("com.example.app").await.unwrap(), 5);
    assert_eq!(manager.version_name("com.example.app").await.unwrap(), "1.0");
    assert_eq!(
        manager.installation_dir("com.example.app").await.unwrap(),
        std::path::PathBuf::from("/data/app/com.example.app-1")
    );
    assert!(manager.is_installed("com.example.app").await);
}

#[tokio::test]
async fn capability_gaps_are_reported_not_skipped() {
    let service = FakePackageService::new();
    let manager = unprivileged(&service, InstallerContext::new());

    let err = manager.set_installer("com.a", "com.android.vending").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SetFailedInstaller);
    assert_eq!(err.message, "Unsupported");

    let err = manager.force_stop("com.a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AppFailedForceStop);
    assert_eq!(err.message, "Unsupported");

    let shell = ShellInstaller::new(Arc::new(ScriptedShell::new()), InstallerContext::new());
    let err = shell.set_installer("com.a", "com.android.vending").await.unwrap_err();
    assert_eq!(err.message, "Unsupported");

    let broker = delegated(BrokerState::Ready, &service);
    broker.set_installer("com.a", "com.android.vending").await.unwrap();
    assert_eq!(service.count("set-installer com.a"), 1);
}

#[tokio::test]
async fn session_install_writes_commits_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 64);
    let split = apk(dir.path(), "split_config.arm64_v8a.apk", 16);
    let (tx, mut rx) = channel();
    let service = FakePackageService::new();
    let manager = unprivileged(&service, InstallerContext::new().with_event_sender(tx));

    manager.install_split_app(&[base, split]).await.unwrap();

    assert_eq!(
        service.entries(),
        vec![
            "create",
            "open 41",
            "write 0_base.apk",
            "fsync 0_base.apk",
            "write 1_split_config.arm64_v8a.apk",
            "fsync 1_split_config.arm64_v8a.apk",
            "commit",
            "abandon",
            "close",
        ]
    );
    assert_eq!(service.params.lock().unwrap()[0].total_size, Some(80));

    let events = drain(&mut rx);
    let broadcasts = installs(&events);
    assert_eq!(broadcasts.len(), 1);
    assert!(matches!(
        broadcasts[0],
        PackageEvent::AppInstall { success: true, status_message: None, .. }
    ));
}

#[tokio::test]
async fn write_failure_abandons_without_commit() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new().failing_writes();
    let manager = unprivileged(&service, InstallerContext::new());

    let err = manager.install_app(&base).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::SessionFailedWrite);
    assert_eq!(service.count("commit"), 0);
    assert_eq!(service.count("abandon"), 1);
}

#[tokio::test]
async fn commit_failure_is_classified() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new().committing(CommitBehavior::Deliver(
        CompletionStatus::Failure {
            message: Some("INSTALL_FAILED_VERSION_DOWNGRADE".into()),
        },
    ));
    let manager = unprivileged(&service, InstallerContext::new());

    let err = manager.install_app(&base).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InstallFailedVersionDowngrade);
    assert_eq!(service.count("abandon"), 1);
}

#[tokio::test(start_paused = true)]
async fn silent_commit_times_out_and_still_releases() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new().committing(CommitBehavior::Never);
    let ctx = InstallerContext::new().with_completion_timeout(Duration::from_secs(30));
    let manager = unprivileged(&service, ctx);

    let err = manager.install_app(&base).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InstallFailedTimeout);
    assert_eq!(service.count("abandon"), 1);
    assert_eq!(service.count("close"), 1);
}

#[tokio::test]
async fn cancelled_install_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new().committing(CommitBehavior::Never);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let manager = unprivileged(&service, InstallerContext::new().with_cancellation(cancel));

    let err = manager.install_app(&base).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InstallFailedAborted);
    assert_eq!(service.count("abandon"), 1);
}

#[tokio::test]
async fn confirmation_is_forwarded_to_foreground() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let (confirm_tx, mut confirm_rx) = tokio::sync::mpsc::unbounded_channel();
    let service = FakePackageService::new()
        .committing(CommitBehavior::ConfirmThen(CompletionStatus::Success));
    let manager = unprivileged(
        &service,
        InstallerContext::new().with_confirmations(confirm_tx),
    );

    manager.install_app(&base).await.unwrap();

    let intent = confirm_rx.try_recv().unwrap();
    assert_eq!(intent.session_id, Some(41));
}

#[tokio::test]
async fn dead_broker_fails_fast() {
    let (tx, mut rx) = channel();
    let service = FakePackageService::new();
    let manager = DelegatedInstaller::new(
        Arc::new(FakeBroker {
            state: BrokerState::NotRunning,
            packages: service.clone(),
            activity: FakeActivity::default(),
        }),
        InstallerContext::new().with_event_sender(tx),
    );

    let err = manager.version_code("com.a").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::GetFailedBroker);
    assert_eq!(
        manager.force_stop("com.a").await.unwrap_err().code,
        ErrorCode::GetFailedBroker
    );
    assert!(!manager.is_installed("com.a").await);

    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let err = manager.install_app(&base).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::GetFailedBroker);
    assert!(service.entries().is_empty());
    assert_eq!(installs(&drain(&mut rx)).len(), 1);
}

#[tokio::test]
async fn delegated_sessions_force_privileged_flags() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new();
    let manager = delegated(BrokerState::Ready, &service);

    manager.install_app(&base).await.unwrap();

    let params = service.params.lock().unwrap()[0].clone();
    assert!(params.replace_existing && params.allow_downgrade && params.allow_test);
}

#[tokio::test]
async fn shell_install_maps_insufficient_storage() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "com.example.app-5.apk", 32);
    let raw = "Failure [INSTALL_FAILED_INSUFFICIENT_STORAGE]";
    let shell = Arc::new(ScriptedShell::new().on("pm install", ShellOutput::failure(1, &[raw])));
    let (tx, mut rx) = channel();
    let manager = ShellInstaller::new(shell.clone(), InstallerContext::new().with_event_sender(tx));

    let err = manager.install_app(&base).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InstallFailedInsufficientStorage);
    assert_eq!(err.message, raw);
    let recorded = shell.recorded();
    assert_eq!(recorded[0].command, "pm install -r -S 32");
    assert_eq!(recorded[0].input_len, Some(32));

    let broadcasts = installs(&drain(&mut rx));
    assert_eq!(
        broadcasts,
        vec![PackageEvent::AppInstall {
            package: None,
            mode: PrivilegeMode::Shell,
            success: false,
            status_message: Some(raw.into()),
        }]
    );
}

#[tokio::test]
async fn shell_split_write_failure_abandons_session() {
    let apks_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let parts = vec![
        apk(apks_dir.path(), "base.apk", 8),
        apk(apks_dir.path(), "split.apk", 8),
    ];
    let shell = Arc::new(
        ScriptedShell::new()
            .on(
                "install-create",
                ShellOutput::success(&["Success: created install session [3]"]),
            )
            .on(
                "install-write",
                ShellOutput::failure(1, &["Error: Unable to open file"]),
            ),
    );
    let ctx = InstallerContext::new().with_staging_dir(staging.path());
    let manager = ShellInstaller::new(shell.clone(), ctx);

    let err = manager.install_split_app(&parts).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::SessionFailedWrite);
    assert!(shell.ran("pm install-abandon 3"));
    assert!(!shell.ran("install-commit"));
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn shell_split_install_runs_session_protocol() {
    let apks_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let parts = vec![
        apk(apks_dir.path(), "base.apk", 8),
        apk(apks_dir.path(), "split.apk", 4),
    ];
    let shell = Arc::new(
        ScriptedShell::new()
            .on(
                "install-create",
                ShellOutput::success(&["Success: created install session [3]"]),
            )
            .on("install-commit", ShellOutput::success(&["Success"])),
    );
    let ctx = InstallerContext::new().with_staging_dir(staging.path());
    let manager = ShellInstaller::new(shell.clone(), ctx);

    manager.install_split_app(&parts).await.unwrap();

    let create = shell.position("install-create -r -S 12").unwrap();
    let first = shell.position("install-write -S 8 3 0_base.apk").unwrap();
    let second = shell.position("install-write -S 4 3 1_split.apk").unwrap();
    let commit = shell.position("install-commit 3").unwrap();
    assert!(create < first && first < second && second < commit);
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn shell_split_commit_failure_is_session_failure() {
    let apks_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let parts = vec![
        apk(apks_dir.path(), "base.apk", 8),
        apk(apks_dir.path(), "split.apk", 4),
    ];
    let shell = Arc::new(
        ScriptedShell::new()
            .on(
                "install-create",
                ShellOutput::success(&["Success: created install session [3]"]),
            )
            .on(
                "install-commit",
                ShellOutput::success(&["Failure [INSTALL_FAILED_MISSING_SPLIT]"]),
            ),
    );
    let manager =
        ShellInstaller::new(shell.clone(), InstallerContext::new().with_staging_dir(staging.path()));

    let err = manager.install_split_app(&parts).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionFailedCommit);
    assert!(shell.ran("pm install-abandon 3"));
}

#[tokio::test]
async fn shell_split_rejects_invalid_session_id() {
    let apks_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let parts = vec![
        apk(apks_dir.path(), "base.apk", 8),
        apk(apks_dir.path(), "split.apk", 4),
    ];
    let shell = Arc::new(ScriptedShell::new().on(
        "install-create",
        ShellOutput::success(&["Success: created install session [-1]"]),
    ));
    let manager =
        ShellInstaller::new(shell.clone(), InstallerContext::new().with_staging_dir(staging.path()));

    let err = manager.install_split_app(&parts).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionInvalidId);
    assert!(!shell.ran("install-write"));
    assert!(!shell.ran("install-commit"));
}

#[tokio::test]
async fn shell_membership_uses_full_package_list() {
    let shell = Arc::new(ScriptedShell::new().on(
        "pm list packages",
        ShellOutput::success(&["package:com.android.settings", "package:com.example.app"]),
    ));
    let manager = ShellInstaller::new(shell.clone(), InstallerContext::new());

    assert!(manager.is_installed("com.example.app").await);
    assert!(!manager.is_installed("com.example").await);
    assert_eq!(shell.commands(), vec!["pm list packages", "pm list packages"]);
}

#[tokio::test]
async fn dropped_install_still_abandons_session() {
    let dir = tempfile::tempdir().unwrap();
    let base = apk(dir.path(), "base.apk", 8);
    let service = FakePackageService::new().committing(CommitBehavior::Never);
    let manager = unprivileged(&service, InstallerContext::new());

    let task = tokio::spawn(async move { manager.install_app(&base).await });
    for _ in 0..100 {
        if service.count("commit") == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.count("commit"), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    for _ in 0..100 {
        if service.count("abandon") == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.count("abandon"), 1);
}
