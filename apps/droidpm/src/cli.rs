//! Command line interface definition

use clap::{Parser, Subcommand};
use droidpm_types::PrivilegeMode;
use std::path::PathBuf;

/// droidpm - privileged package management for Android
#[derive(Parser)]
#[command(name = "droidpm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install, remove and patch Android apps with elevated privileges")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Backend used for package operations
    #[arg(long, global = true, value_enum)]
    pub mode: Option<PrivilegeMode>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show version and location of an installed package
    Info {
        /// Package name
        package: String,
    },

    /// Install an apk, or a split set when several are given
    #[command(alias = "i")]
    Install {
        /// Apk files; all parts of one app
        #[arg(required = true)]
        apks: Vec<PathBuf>,
    },

    /// Uninstall a package
    #[command(alias = "rm")]
    Uninstall {
        /// Package name
        package: String,
    },

    /// Start the launcher activity of a package
    Launch {
        /// Package name
        package: String,
    },

    /// Force-stop a package
    Stop {
        /// Package name
        package: String,
    },

    /// Record `installer` as the installer of `package`
    SetInstaller {
        /// Package name
        package: String,
        /// Installer package name
        installer: String,
    },

    /// Patch mounts through the root module
    #[command(subcommand)]
    Module(ModuleCommands),
}

/// Root module commands
#[derive(Subcommand)]
pub enum ModuleCommands {
    /// Mount a patched apk over an installed app, now and at every boot
    Install {
        /// Package the patch is for
        package: String,
        /// Patched apk
        apk: PathBuf,
    },

    /// Remove the patch of a package
    Delete {
        /// Package name
        package: String,
    },

    /// Check whether a package has a patch
    Exists {
        /// Package name
        package: String,
    },

    /// Compare a patch with the installed version
    Status {
        /// Package name
        package: String,
    },

    /// List patched packages
    #[command(alias = "ls")]
    List,

    /// Remove every patch and the module itself
    RemoveRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["droidpm", "uninstall", "com.example.app", "--mode", "root"])
                .unwrap();
        assert_eq!(cli.global.mode, Some(PrivilegeMode::Shell));
        assert!(matches!(cli.command, Commands::Uninstall { package } if package == "com.example.app"));
    }

    #[test]
    fn install_needs_an_apk() {
        assert!(Cli::try_parse_from(["droidpm", "install"]).is_err());
    }

    #[test]
    fn module_subcommands() {
        let cli = Cli::try_parse_from(["droidpm", "module", "remove-root"]).unwrap();
        assert!(matches!(cli.command, Commands::Module(ModuleCommands::RemoveRoot)));
    }
}
