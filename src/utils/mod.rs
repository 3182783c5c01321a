pub mod app_lifecycle;
pub mod brew;
pub mod command;
pub mod error;
pub mod plist_parser;
pub mod sanitize;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

pub use error::{AppError, AppResult};

/// Browser-generated app shim bundle ID prefixes (Chrome, Brave, Edge, Chromium).
const WEB_APP_PREFIXES: &[&str] = &[
    "com.google.Chrome.app.",
    "com.brave.Browser.app.",
    "com.microsoft.Edge.app.",
    "org.chromium.Chromium.app.",
];

/// Returns true if the bundle ID belongs to a browser-generated web app.
pub fn is_web_app_bundle(bundle_id: &str) -> bool {
    WEB_APP_PREFIXES.iter().any(|p| bundle_id.starts_with(p))
}

/// Expand `~` prefix to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// True when any component of `path` is a trash directory (`.Trash`,
/// `.Trashes`, or the freedesktop `Trash` under `~/.local/share`).
pub fn is_in_trash(path: &Path) -> bool {
    let mut previous: Option<&std::ffi::OsStr> = None;
    for component in path.components() {
        if let Component::Normal(name) = component {
            if name == ".Trash" || name == ".Trashes" {
                return true;
            }
            if name == "Trash" && previous.is_some_and(|p| p == "share") {
                return true;
            }
            previous = Some(name);
        }
    }
    false
}

/// Hex digest of a path, used to name cache files.
pub fn path_hash(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_hash_is_stable_per_path() {
        let a = path_hash(Path::new("/Users/a/Library/Caches/Foo"));
        assert_eq!(a, path_hash(Path::new("/Users/a/Library/Caches/Foo")));
        assert_ne!(a, path_hash(Path::new("/Users/a/Library/Caches/Bar")));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn detects_trash_components() {
        assert!(is_in_trash(Path::new("/Users/a/.Trash/Foo.app")));
        assert!(is_in_trash(Path::new("/Volumes/Ext/.Trashes/501/x")));
        assert!(is_in_trash(Path::new("/home/a/.local/share/Trash/files/x")));
        assert!(!is_in_trash(Path::new("/Users/a/Library/Caches/Trash Tool")));
        assert!(!is_in_trash(Path::new("/Users/a/Trash/x")));
    }

    #[test]
    fn web_app_prefixes() {
        assert!(is_web_app_bundle("com.google.Chrome.app.abcdef"));
        assert!(!is_web_app_bundle("com.google.Chrome"));
    }

    #[test]
    fn tilde_expansion_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/Library/Caches"), PathBuf::from("/Library/Caches"));
    }
}
