//! Parsers for the text replies of `pm`, `cmd package` and `dumpsys package`

use std::path::{Path, PathBuf};

use droidpm_errors::ErrorCode;
use droidpm_types::{PackageInfo, VersionCode};

const PACKAGE_PREFIX: &str = "package:";

/// Whether a `pm` reply reports success. `pm` prints `Success` on its own
/// line and usually still exits 0 on failure, so the text is authoritative.
#[must_use]
pub fn is_success_reply(text: &str) -> bool {
    text.lines().any(|line| line.trim() == "Success")
}

/// Session id out of `Success: created install session [1234567]`
#[must_use]
pub fn parse_session_id(text: &str) -> Option<i32> {
    text.lines()
        .filter(|line| line.contains("install session"))
        .find_map(|line| {
            let start = line.find('[')? + 1;
            let end = start + line[start..].find(']')?;
            line[start..end].trim().parse().ok()
        })
}

/// Value of `key=` in whitespace separated `key=value` text
fn token_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.split_whitespace()
        .find_map(|token| token.strip_prefix(key)?.strip_prefix('='))
}

/// Rest of the line after `key=`; version names may contain spaces
fn line_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let trimmed = line.trim_start();
        trimmed
            .strip_prefix(key)?
            .strip_prefix('=')
            .map(str::trim_end)
    })
}

/// Package metadata out of `dumpsys package <package>`
///
/// Returns `None` when the dump does not describe `package` or has no
/// readable version code.
#[must_use]
pub fn parse_dumpsys_package(package: &str, text: &str) -> Option<PackageInfo> {
    let header = format!("Package [{package}]");
    let section = &text[text.find(&header)?..];

    let version_code: VersionCode = token_value(section, "versionCode")?.parse().ok()?;
    let mut info = PackageInfo::new(package, version_code);
    if let Some(name) = line_value(section, "versionName").filter(|n| !n.is_empty()) {
        info = info.with_version_name(name);
    }
    if let Some(code_path) = token_value(section, "codePath") {
        info = info.with_install_dir(code_path);
    }
    Some(info)
}

/// Package names out of `pm list packages`
#[must_use]
pub fn parse_package_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix(PACKAGE_PREFIX))
        .map(|rest| {
            // `pm list packages -f` appends the name after the apk path
            rest.rsplit_once('=').map_or(rest, |(_, name)| name)
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Install directory out of `pm path <package>`: the parent of the first
/// (base) apk listed.
#[must_use]
pub fn parse_package_path(text: &str) -> Option<PathBuf> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix(PACKAGE_PREFIX))
        .and_then(|apk| Path::new(apk).parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Contents of the `Failure [...]` bracket, if the reply carries one
#[must_use]
pub fn failure_reason(text: &str) -> Option<&str> {
    let start = text.find("Failure [")? + "Failure [".len();
    let end = start + text[start..].find(']')?;
    Some(text[start..end].trim())
}

/// Map install failure output onto the install error taxonomy.
///
/// Unrecognised text falls back to [`ErrorCode::InstallFailedUnknown`].
#[must_use]
pub fn classify_install_failure(text: &str) -> ErrorCode {
    const PATTERNS: &[(&str, ErrorCode)] = &[
        ("ALREADY_EXISTS", ErrorCode::InstallFailedAlreadyExists),
        (
            "INSUFFICIENT_STORAGE",
            ErrorCode::InstallFailedInsufficientStorage,
        ),
        ("VERSION_DOWNGRADE", ErrorCode::InstallFailedVersionDowngrade),
        ("NO_CERTIFICATES", ErrorCode::InstallFailedParseNoCertificates),
        (
            "CPU_ABI_INCOMPATIBLE",
            ErrorCode::InstallFailedCpuAbiIncompatible,
        ),
        ("NO_MATCHING_ABIS", ErrorCode::InstallFailedCpuAbiIncompatible),
        ("INVALID_APK", ErrorCode::InstallFailedInvalidApk),
        ("NOT_APK", ErrorCode::InstallFailedInvalidApk),
        ("ABORTED", ErrorCode::InstallFailedAborted),
    ];

    PATTERNS
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map_or(ErrorCode::InstallFailedUnknown, |(_, code)| *code)
}
