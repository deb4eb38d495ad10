//! Structured logging integration for events
//!
//! Library crates report through the event channel; this module turns each
//! [`EventMessage`] into a tracing record at the level chosen by the event,
//! with the event's fields as structured fields.

use droidpm_events::{
    AppEvent, EventMessage, GeneralEvent, ModuleEvent, PackageEvent, PlatformEvent,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Emit a tracing event at a level only known at runtime
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            Level::TRACE => tracing::trace!($($arg)+),
        }
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--debug`.
/// Logs go to stderr so stdout only ever carries command results.
pub fn init_tracing(json_mode: bool, debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let level = meta.tracing_level();
    let source = meta.source.as_str();
    let correlation = meta.correlation_id.as_deref();

    match &message.event {
        AppEvent::General(event) => match event {
            GeneralEvent::Warning { message, context } => {
                event_at!(level, source, correlation, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                event_at!(level, source, correlation, details = ?details, "{message}");
            }
            GeneralEvent::Info { message } => {
                event_at!(level, source, correlation, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                event_at!(level, source, correlation, context = ?context, "{message}");
            }
        },

        AppEvent::Package(event) => match event {
            PackageEvent::AppInstall {
                package,
                mode,
                success,
                status_message,
            } => {
                event_at!(
                    level,
                    source,
                    package = ?package,
                    %mode,
                    success,
                    status_message = ?status_message,
                    "install finished"
                );
            }
            PackageEvent::AppUninstall {
                package,
                mode,
                success,
                status_message,
            } => {
                event_at!(
                    level,
                    source,
                    %package,
                    %mode,
                    success,
                    status_message = ?status_message,
                    "uninstall finished"
                );
            }
            PackageEvent::SessionCreated {
                session_id,
                mode,
                parts,
            } => {
                event_at!(level, source, session_id, %mode, parts, "installer session created");
            }
            PackageEvent::SessionCommitted { session_id } => {
                event_at!(level, source, session_id, "installer session committed");
            }
            PackageEvent::UserActionRequired { session_id } => {
                event_at!(level, source, session_id, "install waits for user confirmation");
            }
            PackageEvent::SessionAbandoned { session_id, reason } => {
                event_at!(level, source, session_id, %reason, "installer session abandoned");
            }
        },

        AppEvent::Platform(event) => match event {
            PlatformEvent::CommandStarted { shell, command } => {
                event_at!(level, source, correlation, %shell, %command, "command started");
            }
            PlatformEvent::CommandCompleted {
                shell,
                command,
                exit_code,
                duration_ms,
                stdout_lines,
                stderr_lines,
            } => {
                event_at!(
                    level,
                    source,
                    correlation,
                    %shell,
                    %command,
                    exit_code = ?exit_code,
                    duration_ms,
                    stdout_lines,
                    stderr_lines,
                    "command completed"
                );
            }
            PlatformEvent::CommandFailed {
                shell,
                command,
                failure,
                duration_ms,
            } => {
                event_at!(
                    level,
                    source,
                    correlation,
                    %shell,
                    %command,
                    code = ?failure.code,
                    hint = ?failure.hint,
                    duration_ms,
                    "command could not run: {}",
                    failure.message
                );
            }
        },

        AppEvent::Module(event) => match event {
            ModuleEvent::StepStarted { package, step } => {
                event_at!(level, source, %package, %step, "patch step started");
            }
            ModuleEvent::StepCompleted { package, step } => {
                event_at!(level, source, %package, %step, "patch step completed");
            }
            ModuleEvent::StepFailed {
                package,
                step,
                failure,
            } => {
                event_at!(
                    level,
                    source,
                    %package,
                    %step,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    hint = ?failure.hint,
                    "patch step failed: {}",
                    failure.message
                );
            }
            ModuleEvent::Installed {
                package,
                expected_version,
            } => {
                event_at!(level, source, %package, expected_version, "patch mounted");
            }
            ModuleEvent::Deleted { package, success } => {
                event_at!(level, source, %package, success, "patch deleted");
            }
            ModuleEvent::UnmountSkipped { package, reason } => {
                event_at!(level, source, %package, %reason, "stale mount left in place");
            }
        },
    }
}
