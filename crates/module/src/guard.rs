use droidpm_types::VersionCode;

/// Boot-time decision for one mounted package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootGuard {
    /// Installed version matches the patch; mount it
    Mount,
    /// The app changed since patching; warn instead of mounting
    Skip { warning: String },
}

impl BootGuard {
    /// Decide from the version captured at patch time and the live one.
    /// An unreadable live version never mounts.
    #[must_use]
    pub fn evaluate(package: &str, expected: VersionCode, live: Option<VersionCode>) -> Self {
        match live {
            Some(live) if live == expected => Self::Mount,
            Some(live) => Self::Skip {
                warning: warning_text(package, expected, &live.to_string()),
            },
            None => Self::Skip {
                warning: warning_text(package, expected, "unknown"),
            },
        }
    }

    #[must_use]
    pub fn mounts(&self) -> bool {
        matches!(self, Self::Mount)
    }
}

/// Notification text for a skipped mount.
///
/// The boot script renders the same text with the live version taken from
/// a shell variable, so it is built from a prefix and a suffix around it.
pub(crate) fn warning_text(package: &str, expected: VersionCode, live: &str) -> String {
    let (prefix, suffix) = warning_parts(package, expected);
    format!("{prefix}{live}{suffix}")
}

pub(crate) fn warning_parts(package: &str, expected: VersionCode) -> (String, String) {
    (
        format!("Patch for {package} was made for version {expected}, but version "),
        " is installed. The patch was not mounted; reinstall it for this version.".to_string(),
    )
}
