//! droidpm - privileged package management for Android
//!
//! Loads configuration, builds the backend for the selected privilege mode
//! and runs one command while draining library events into the log.

mod cli;
mod display;
mod error;
mod logging;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use droidpm_config::Config;
use droidpm_events::{EventReceiver, EventSender};
use droidpm_install::{for_mode, InstallerContext, PackageManager};
use droidpm_module::ModuleManager;
use droidpm_platform::{PlatformContext, ShellExecutor};
use droidpm_system::ConfirmationIntent;
use droidpm_types::{InstallRequest, ModuleInstallStatus};
use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::cli::{Cli, Commands, ModuleCommands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    logging::init_tracing(json_mode, cli.global.debug);

    let renderer = OutputRenderer::new(json_mode);
    if let Err(e) = run(cli, renderer).await {
        error!("{e}");
        renderer.render_error(e.code(), &e.to_string());
        process::exit(1);
    }
}

async fn run(cli: Cli, renderer: OutputRenderer) -> Result<(), CliError> {
    debug!("Starting droidpm v{}", env!("CARGO_PKG_VERSION"));

    // File (or defaults), then environment, then flags.
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(mode) = cli.global.mode {
        config.general.privilege_mode = mode;
    }

    let (event_sender, event_receiver) = droidpm_events::channel();
    let (confirm_tx, confirm_rx) = mpsc::unbounded_channel();

    let ctx = InstallerContext::from_config(&config)
        .with_event_sender(event_sender.clone())
        .with_confirmations(confirm_tx);

    // Ctrl-C stops waiting for the system; sessions are still released.
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let command = execute_command(cli.command, &config, ctx, event_sender, renderer);
    let result = drain_events(command, event_receiver, confirm_rx, renderer).await?;

    renderer.render_result(&result)?;
    debug!("Command completed successfully");
    Ok(())
}

/// Run `command` while logging events and surfacing confirmation prompts
async fn drain_events(
    command: impl std::future::Future<Output = Result<CommandOutput, CliError>>,
    mut events: EventReceiver,
    mut confirmations: mpsc::UnboundedReceiver<ConfirmationIntent>,
    renderer: OutputRenderer,
) -> Result<CommandOutput, CliError> {
    let mut command = Box::pin(command);
    loop {
        select! {
            result = &mut command => {
                while let Ok(message) = events.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result;
            }
            Some(message) = events.recv() => {
                logging::log_event_with_tracing(&message);
            }
            Some(intent) = confirmations.recv() => {
                renderer.render_confirmation(&intent.action);
            }
        }
    }
}

async fn execute_command(
    command: Commands,
    config: &Config,
    ctx: InstallerContext,
    event_sender: EventSender,
    renderer: OutputRenderer,
) -> Result<CommandOutput, CliError> {
    let mode = config.general.privilege_mode;
    let module_command = match command {
        Commands::Module(module_command) => module_command,
        command => {
            let manager = for_mode(mode, config, ctx);
            return execute_package_command(command, manager.as_ref()).await;
        }
    };

    let platform = PlatformContext::new(Some(event_sender.clone()));
    let shell = Arc::new(ShellExecutor::root(config.shell.root_binary.clone(), platform));
    let modules = ModuleManager::from_config(shell, config).with_event_sender(event_sender);
    execute_module_command(module_command, &modules, renderer).await
}

async fn execute_package_command(
    command: Commands,
    manager: &dyn PackageManager,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Info { package } => {
            let version_code = manager.version_code(&package).await?;
            let version_name = manager.version_name(&package).await?;
            let installation_dir = manager.installation_dir(&package).await?;
            let installed = manager.is_installed(&package).await;
            Ok(CommandOutput::PackageInfo {
                package,
                installed,
                version_code,
                version_name,
                installation_dir,
            })
        }

        Commands::Install { apks } => {
            match apks.as_slice() {
                [] => {
                    return Err(CliError::InvalidArguments(
                        "at least one apk is required".to_string(),
                    ))
                }
                [apk] => manager.install_app(apk).await?,
                parts => manager.install_split_app(parts).await?,
            }
            Ok(CommandOutput::success(format!(
                "Installed {} through {}",
                describe(&apks),
                manager.mode()
            )))
        }

        Commands::Uninstall { package } => {
            manager.uninstall(&package).await?;
            Ok(CommandOutput::success(format!("Uninstalled {package}")))
        }

        Commands::Launch { package } => {
            manager.launch(&package).await?;
            Ok(CommandOutput::success(format!("Launched {package}")))
        }

        Commands::Stop { package } => {
            manager.force_stop(&package).await?;
            Ok(CommandOutput::success(format!("Stopped {package}")))
        }

        Commands::SetInstaller { package, installer } => {
            manager.set_installer(&package, &installer).await?;
            Ok(CommandOutput::success(format!(
                "Installer of {package} set to {installer}"
            )))
        }

        Commands::Module(_) => Err(CliError::InvalidArguments(
            "module commands do not use a package backend".to_string(),
        )),
    }
}

async fn execute_module_command(
    command: ModuleCommands,
    modules: &ModuleManager,
    renderer: OutputRenderer,
) -> Result<CommandOutput, CliError> {
    match command {
        ModuleCommands::Install { package, apk } => {
            let request = InstallRequest::new(package.as_str(), apk.as_path()).ok_or_else(|| {
                CliError::InvalidArguments(format!(
                    "expected a package name and an .apk file, got {package} and {}",
                    apk.display()
                ))
            })?;
            let mut statuses = Box::pin(modules.install(request));
            while let Some(status) = statuses.next().await {
                match status {
                    ModuleInstallStatus::InProgress { step, message } => {
                        renderer.render_step(step, &message);
                    }
                    ModuleInstallStatus::Success => {
                        return Ok(CommandOutput::success(format!("Patched {package}")));
                    }
                    ModuleInstallStatus::Failed(err) => return Err(err.into()),
                }
            }
            Err(CliError::Operation(droidpm_errors::OperationError::new(
                droidpm_errors::ErrorCode::PatchFailedModule,
                "patch-install ended without a result",
            )))
        }

        ModuleCommands::Delete { package } => {
            if modules.delete(&package).await {
                Ok(CommandOutput::success(format!("Removed patch of {package}")))
            } else {
                Err(CliError::Operation(droidpm_errors::OperationError::new(
                    droidpm_errors::ErrorCode::PatchFailedDestroy,
                    format!("failed to remove the patch of {package}"),
                )))
            }
        }

        ModuleCommands::Exists { package } => {
            let exists = modules.check_module_exist(&package).await;
            Ok(CommandOutput::Exists { package, exists })
        }

        ModuleCommands::Status { package } => match modules.module_status(&package).await {
            Some(status) => Ok(status.into()),
            None => Err(CliError::InvalidArguments(format!("{package} has no patch"))),
        },

        ModuleCommands::List => Ok(CommandOutput::Modules {
            packages: modules.installed_modules().await,
        }),

        ModuleCommands::RemoveRoot => {
            modules.remove_root().await?;
            Ok(CommandOutput::success(format!(
                "Removed module at {}",
                modules.layout().root().display()
            )))
        }
    }
}

fn describe(apks: &[PathBuf]) -> String {
    match apks {
        [apk] => apk.display().to_string(),
        parts => format!("{} split parts", parts.len()),
    }
}
