use std::sync::Arc;

use async_trait::async_trait;
use droidpm_errors::ServiceError;
use droidpm_platform::{Shell, ShellCommand};

use super::{call_checked, failure_text};
use crate::services::ActivityService;

const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";

/// [`ActivityService`] over `am` and `monkey`
#[derive(Clone)]
pub struct ShellActivityService {
    shell: Arc<dyn Shell>,
}

impl ShellActivityService {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl ActivityService for ShellActivityService {
    async fn force_stop(&self, package: &str) -> Result<(), ServiceError> {
        let command = ShellCommand::new("am").arg("force-stop").arg(package);
        call_checked(self.shell.as_ref(), "am force-stop", &command).await?;
        Ok(())
    }

    async fn launch(&self, package: &str) -> Result<(), ServiceError> {
        let command = ShellCommand::new("monkey")
            .arg("-p")
            .arg(package)
            .arg("-c")
            .arg(LAUNCHER_CATEGORY)
            .arg("1");
        let output = call_checked(self.shell.as_ref(), "monkey", &command).await?;
        // monkey exits 0 even when the package has no launcher activity
        if output.combined().contains("monkey aborted") {
            return Err(ServiceError::CallFailed {
                call: "monkey".to_string(),
                message: failure_text(&output),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidpm_platform::testing::ScriptedShell;
    use droidpm_platform::ShellOutput;

    #[tokio::test]
    async fn force_stop_quotes_package() {
        let shell = Arc::new(ScriptedShell::new());
        let service = ShellActivityService::new(shell.clone());
        service.force_stop("com.example.app").await.unwrap();
        assert_eq!(shell.commands(), vec!["am force-stop com.example.app"]);
    }

    #[tokio::test]
    async fn launch_without_launcher_activity_fails() {
        let shell = Arc::new(ScriptedShell::new().on(
            "monkey",
            ShellOutput::success(&["** No activities found to run, monkey aborted."]),
        ));
        let service = ShellActivityService::new(shell);
        let err = service.launch("com.example.app").await.unwrap_err();
        assert!(matches!(err, ServiceError::CallFailed { .. }));
    }
}
