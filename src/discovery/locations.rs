use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::AppScope;
use crate::utils::expand_tilde;

/// Which applications a root is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootScope {
    User,
    System,
    Any,
}

impl RootScope {
    pub fn admits(&self, scope: AppScope) -> bool {
        match self {
            RootScope::Any => true,
            RootScope::User => scope == AppScope::User,
            RootScope::System => scope == AppScope::System,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSpec {
    pub path: PathBuf,
    pub scope: RootScope,
    /// How many levels below the root are listed; 1 means direct children only.
    pub depth: usize,
}

impl RootSpec {
    pub fn new(path: impl Into<PathBuf>, scope: RootScope, depth: usize) -> Self {
        Self {
            path: path.into(),
            scope,
            depth: depth.max(1),
        }
    }
}

/// The fixed set of places residue is searched for. Built once at start-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathCatalog {
    roots: Vec<RootSpec>,
}

impl PathCatalog {
    pub fn new(roots: Vec<RootSpec>) -> Self {
        let mut seen = HashSet::new();
        let roots = roots
            .into_iter()
            .filter(|root| seen.insert(root.path.clone()))
            .collect();
        Self { roots }
    }

    pub fn platform_default() -> Self {
        Self::new(default_roots(dirs::home_dir().as_deref()))
    }

    /// Appends user-configured directories, scanned one level deep.
    pub fn with_extra_locations(mut self, extra: &[String]) -> Self {
        for loc in extra {
            let path = expand_tilde(loc);
            if self.roots.iter().any(|r| r.path == path) {
                continue;
            }
            self.roots.push(RootSpec::new(path, RootScope::Any, 1));
        }
        self
    }

    pub fn roots(&self) -> &[RootSpec] {
        &self.roots
    }

    pub fn roots_for(&self, scope: AppScope) -> Vec<RootSpec> {
        self.roots
            .iter()
            .filter(|root| root.scope.admits(scope))
            .cloned()
            .collect()
    }
}

#[cfg(target_os = "macos")]
fn default_roots(home: Option<&Path>) -> Vec<RootSpec> {
    let mut roots = Vec::new();

    if let Some(home) = home {
        let library = home.join("Library");
        roots.push(RootSpec::new(&library, RootScope::Any, 1));
        for (sub, depth) in [
            ("Application Scripts", 1),
            ("Application Support", 2),
            ("Application Support/CrashReporter", 1),
            ("Containers", 1),
            ("Group Containers", 1),
            ("Caches", 2),
            ("HTTPStorages", 1),
            ("Internet Plug-Ins", 1),
            ("LaunchAgents", 1),
            ("Logs", 2),
            ("Logs/DiagnosticReports", 1),
            ("Preferences", 1),
            ("Preferences/ByHost", 1),
            ("Saved Application State", 1),
            ("WebKit", 1),
            ("Cookies", 1),
            (
                "Application Support/com.apple.sharedfilelist/com.apple.LSSharedFileList.ApplicationRecentDocuments",
                1,
            ),
        ] {
            roots.push(RootSpec::new(library.join(sub), RootScope::Any, depth));
        }
    }

    for (path, depth) in [
        ("/Library/Application Support", 2),
        ("/Library/Caches", 1),
        ("/Library/Extensions", 1),
        ("/Library/Internet Plug-Ins", 1),
        ("/Library/LaunchAgents", 1),
        ("/Library/LaunchDaemons", 1),
        ("/Library/Logs", 2),
        ("/Library/Preferences", 1),
        ("/Library/PrivilegedHelperTools", 1),
        ("/Library/Audio/Plug-Ins/Components", 1),
        ("/Library/Audio/Plug-Ins/VST", 1),
        ("/Library/Audio/Plug-Ins/VST3", 1),
    ] {
        roots.push(RootSpec::new(path, RootScope::System, depth));
    }

    roots.push(RootSpec::new("/private/var/db/receipts", RootScope::Any, 1));
    for temp_root in temp_roots() {
        roots.push(RootSpec::new(temp_root, RootScope::Any, 1));
    }

    roots
}

#[cfg(not(target_os = "macos"))]
fn default_roots(home: Option<&Path>) -> Vec<RootSpec> {
    let mut roots = Vec::new();

    if let Some(home) = home {
        for (sub, depth) in [
            (".config", 1),
            (".cache", 2),
            (".local/share", 2),
            (".local/state", 1),
            (".local/share/applications", 1),
            (".config/autostart", 1),
            (".var/app", 1),
        ] {
            roots.push(RootSpec::new(home.join(sub), RootScope::Any, depth));
        }
    }

    for (path, depth) in [("/etc", 1), ("/var/cache", 1), ("/var/lib", 1), ("/var/log", 1)] {
        roots.push(RootSpec::new(path, RootScope::System, depth));
    }
    for temp_root in temp_roots() {
        roots.push(RootSpec::new(temp_root, RootScope::Any, 1));
    }

    roots
}

/// The per-user temp directory and, on macOS, its `C`/`T` sibling under
/// `/var/folders`.
fn temp_roots() -> Vec<PathBuf> {
    let temp_root = std::env::temp_dir();
    let mut roots = vec![temp_root.clone()];
    if !temp_root.to_string_lossy().contains("/var/folders/") {
        return roots;
    }
    let (Some(parent), Some(leaf)) = (
        temp_root.parent(),
        temp_root.file_name().and_then(|value| value.to_str()),
    ) else {
        return roots;
    };
    if leaf.eq_ignore_ascii_case("t") {
        roots.push(parent.join("C"));
    } else if leaf.eq_ignore_ascii_case("c") {
        roots.push(parent.join("T"));
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PathCatalog {
        PathCatalog::new(
            vec![
                RootSpec::new("/u/Library/Caches", RootScope::Any, 2),
                RootSpec::new("/Library/Caches", RootScope::System, 1),
                RootSpec::new("/u/Applications/Tools", RootScope::User, 1),
                RootSpec::new("/u/Library/Caches", RootScope::Any, 1),
            ],
        )
    }

    #[test]
    fn duplicate_roots_collapse() {
        assert_eq!(catalog().roots().len(), 3);
    }

    #[test]
    fn scope_filters_roots() {
        let c = catalog();
        let user: Vec<_> = c.roots_for(AppScope::User).into_iter().map(|r| r.path).collect();
        assert_eq!(
            user,
            vec![PathBuf::from("/u/Library/Caches"), PathBuf::from("/u/Applications/Tools")]
        );
        let system: Vec<_> = c.roots_for(AppScope::System).into_iter().map(|r| r.path).collect();
        assert_eq!(
            system,
            vec![PathBuf::from("/u/Library/Caches"), PathBuf::from("/Library/Caches")]
        );
    }

    #[test]
    fn extra_locations_are_appended_once() {
        let c = catalog().with_extra_locations(&["/data/apps".into(), "/data/apps".into()]);
        assert_eq!(c.roots().len(), 4);
        assert_eq!(c.roots()[3].scope, RootScope::Any);
    }
}
