//! Generated module files

use droidpm_platform::quote;
use droidpm_types::VersionCode;

use crate::guard::warning_parts;

/// `version` written to `module.prop`
pub const MODULE_VERSION: &str = "1";

const EXPECTED_VERSION_KEY: &str = "EXPECTED_VERSION=";

pub(crate) fn module_prop(id: &str, name: &str) -> String {
    format!(
        "id={id}\n\
         name={name}\n\
         version={MODULE_VERSION}\n\
         versionCode={MODULE_VERSION}\n\
         author=droidpm\n\
         description=Mounts patched apks over installed apps at boot\n"
    )
}

pub(crate) fn post_fs_data_script() -> String {
    "#!/system/bin/sh\n\
     # Generated by droidpm. Mounts happen in service.sh once the package\n\
     # manager is up; this only keeps the per-app scripts executable.\n\
     MODDIR=\"${0%/*}\"\n\
     chmod 755 \"$MODDIR\"/apps/*/mount.sh 2>/dev/null\n\
     exit 0\n"
        .to_string()
}

pub(crate) fn service_script() -> String {
    "#!/system/bin/sh\n\
     # Generated by droidpm.\n\
     MODDIR=\"${0%/*}\"\n\
     until [ \"$(getprop sys.boot_completed)\" = \"1\" ]; do\n\
     \x20   sleep 1\n\
     done\n\
     for script in \"$MODDIR\"/apps/*/mount.sh; do\n\
     \x20   [ -f \"$script\" ] && sh \"$script\"\n\
     done\n"
        .to_string()
}

/// Boot-time mount script for `package`, guarded by the version code the
/// patch was made for.
#[must_use]
pub fn mount_script(package: &str, expected: VersionCode) -> String {
    let (prefix, suffix) = warning_parts(package, expected);
    let package = quote(package);
    let prefix = quote(&prefix);
    let suffix = quote(&suffix);
    format!(
        r#"#!/system/bin/sh
# Generated by droidpm. Overwritten on every patch install.
MODDIR="${{0%/*}}"
PACKAGE={package}
{EXPECTED_VERSION_KEY}{expected}
PATCHED="$MODDIR/base.apk"

VERSION=$(dumpsys package "$PACKAGE" | sed -n 's/.*versionCode=\([0-9]*\).*/\1/p' | head -n 1)
[ -n "$VERSION" ] || VERSION=unknown
if [ "$VERSION" != "$EXPECTED_VERSION" ]; then
    MESSAGE={prefix}"$VERSION"{suffix}
    cmd notification post -S bigtext -t droidpm "droidpm_$PACKAGE" "$MESSAGE" >/dev/null 2>&1
    exit 0
fi

BASE=$(pm path "$PACKAGE" | sed -n 's/^package://p' | grep '/base\.apk$' | head -n 1)
[ -n "$BASE" ] || exit 1
umount -l "$BASE" 2>/dev/null
chmod 644 "$PATCHED" || exit 1
chown system:system "$PATCHED" || exit 1
chcon u:object_r:apk_data_file:s0 "$PATCHED" || exit 1
mount -o bind "$PATCHED" "$BASE"
"#
    )
}

/// Version code embedded in a generated mount script
#[must_use]
pub fn parse_expected_version(script: &str) -> Option<VersionCode> {
    script
        .lines()
        .find_map(|line| line.trim().strip_prefix(EXPECTED_VERSION_KEY))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_script_embeds_package_and_version() {
        let script = mount_script("com.example.app", 5);
        assert!(script.contains("PACKAGE=com.example.app\n"));
        assert!(script.contains("EXPECTED_VERSION=5\n"));
        assert_eq!(parse_expected_version(&script), Some(5));
    }

    #[test]
    fn mount_script_orders_fixups_before_mount() {
        let script = mount_script("com.example.app", 5);
        let chmod = script.find("chmod 644").unwrap();
        let chown = script.find("chown system:system").unwrap();
        let chcon = script.find("chcon ").unwrap();
        let mount = script.find("mount -o bind").unwrap();
        assert!(chmod < chown && chown < chcon && chcon < mount);
    }

    #[test]
    fn sentinel_version_round_trips() {
        let script = mount_script("com.example.app", VersionCode::MAX);
        assert_eq!(parse_expected_version(&script), Some(VersionCode::MAX));
    }

    #[test]
    fn module_prop_identity() {
        let prop = module_prop("droidpm", "droidpm mounts");
        assert!(prop.starts_with("id=droidpm\nname=droidpm mounts\n"));
    }
}
