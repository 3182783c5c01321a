use std::path::{Component, Path, PathBuf};

use crate::models::{AppScope, ApplicationIdentity};
use crate::utils::is_web_app_bundle;
use crate::utils::plist_parser::{get_string, read_info_plist, read_plist_dict};

/// Builds the identity of an installed app from its bundle.
///
/// Returns `None` when no readable Info.plist exists. iOS apps wrapped for
/// the Mac are resolved to the inner bundle under `Wrapper/`.
pub fn read_identity(app_path: &Path) -> Option<ApplicationIdentity> {
    let (bundle_path, dict, mobile) = if let Some(inner) = wrapped_inner_bundle(app_path) {
        let dict = read_plist_dict(&inner.join("Info.plist")).ok()?;
        (inner, dict, true)
    } else if is_inside_wrapper(app_path) {
        let dict = read_plist_dict(&app_path.join("Info.plist"))
            .or_else(|_| read_info_plist(app_path))
            .ok()?;
        (app_path.to_path_buf(), dict, true)
    } else {
        (app_path.to_path_buf(), read_info_plist(app_path).ok()?, false)
    };

    let bundle_id = get_string(&dict, "CFBundleIdentifier").unwrap_or_default();
    let display_name = get_string(&dict, "CFBundleDisplayName")
        .or_else(|| get_string(&dict, "CFBundleName"))
        .unwrap_or_else(|| stem_of(&bundle_path));

    Some(ApplicationIdentity {
        is_web_wrapper: is_web_app_bundle(&bundle_id),
        is_mobile_wrapper: mobile,
        scope: scope_of(&bundle_path),
        bundle_id,
        display_name,
        app_path: bundle_path,
    })
}

/// [`read_identity`], or a name-only identity built from the path when the
/// bundle metadata can't be read.
pub fn identity_for(app_path: &Path) -> ApplicationIdentity {
    read_identity(app_path).unwrap_or_else(|| {
        log::debug!("No Info.plist for {}, matching by name only", app_path.display());
        ApplicationIdentity::new("", stem_of(app_path), app_path).with_scope(scope_of(app_path))
    })
}

/// Apps under the user's home are user-scoped; everything else is system-wide.
pub fn scope_of(path: &Path) -> AppScope {
    match dirs::home_dir() {
        Some(home) if path.starts_with(&home) => AppScope::User,
        _ => AppScope::System,
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn is_inside_wrapper(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name == "Wrapper" || name == "WrappedBundle",
        _ => false,
    })
}

fn wrapped_inner_bundle(outer: &Path) -> Option<PathBuf> {
    ["Wrapper", "WrappedBundle"].iter().find_map(|dir| {
        std::fs::read_dir(outer.join(dir))
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.extension().is_some_and(|ext| ext == "app"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.foo.myapp</string>
    <key>CFBundleName</key>
    <string>MyApp</string>
</dict>
</plist>"#;

    #[test]
    fn reads_identity_from_info_plist() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("My App.app");
        fs::create_dir_all(app.join("Contents")).unwrap();
        fs::write(app.join("Contents/Info.plist"), PLIST).unwrap();

        let identity = read_identity(&app).unwrap();
        assert_eq!(identity.bundle_id, "com.foo.myapp");
        assert_eq!(identity.display_name, "MyApp");
        assert_eq!(identity.app_path, app);
        assert!(!identity.is_mobile_wrapper);
        assert!(!identity.is_web_wrapper);
    }

    #[test]
    fn resolves_wrapped_ios_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("Game.app");
        let inner = outer.join("Wrapper/Game.app");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("Info.plist"), PLIST).unwrap();

        let identity = read_identity(&outer).unwrap();
        assert!(identity.is_mobile_wrapper);
        assert_eq!(identity.app_path, inner);
        assert_eq!(identity.bundle_root(), outer);
    }

    #[test]
    fn missing_plist_falls_back_to_name() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("Tool.app");
        fs::create_dir_all(&app).unwrap();

        assert!(read_identity(&app).is_none());
        let identity = identity_for(&app);
        assert_eq!(identity.bundle_id, "");
        assert_eq!(identity.display_name, "Tool");
    }
}
