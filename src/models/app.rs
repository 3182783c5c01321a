use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppScope {
    #[default]
    User,
    System,
}

impl AppScope {
    pub fn as_str(&self) -> &str {
        match self {
            AppScope::User => "user",
            AppScope::System => "system",
        }
    }
}

/// Who an application is, as handed over by the enumeration layer.
/// Discovery only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationIdentity {
    /// Empty for browser-generated web apps.
    pub bundle_id: String,
    pub display_name: String,
    pub app_path: PathBuf,
    pub scope: AppScope,
    pub is_web_wrapper: bool,
    pub is_mobile_wrapper: bool,
}

impl ApplicationIdentity {
    pub fn new(bundle_id: impl Into<String>, display_name: impl Into<String>, app_path: impl Into<PathBuf>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            display_name: display_name.into(),
            app_path: app_path.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: AppScope) -> Self {
        self.scope = scope;
        self
    }

    /// The path that stands for the whole install. For an iOS app wrapped
    /// for the Mac the reported path sits inside `Wrapper/`, so the outer
    /// bundle two levels up is what gets removed.
    pub fn bundle_root(&self) -> PathBuf {
        if self.is_mobile_wrapper {
            if let Some(outer) = self.app_path.parent().and_then(Path::parent) {
                return outer.to_path_buf();
            }
        }
        self.app_path.clone()
    }

    /// Short tag shown next to the name for apps that aren't plain Mac bundles.
    pub fn badge(&self) -> Option<&'static str> {
        if self.is_web_wrapper {
            Some("web")
        } else if self.is_mobile_wrapper {
            Some("iOS")
        } else {
            None
        }
    }
}

/// A rendered icon, cached on disk as a PNG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileIcon {
    pub png_path: PathBuf,
}

/// Review annotations attached to a discovered path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResidueFlags {
    /// Matched only through a short application name; needs a human look.
    pub ambiguous: bool,
    /// Sits inside a directory shared with other content; never auto-removed.
    pub nested: bool,
}

/// Everything discovery found for one application.
///
/// `files`, the size map and the icon map always hold the same key set;
/// the only way in is [`ApplicationProfile::insert`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProfile {
    pub identity: ApplicationIdentity,
    files: BTreeSet<PathBuf>,
    file_size: HashMap<PathBuf, u64>,
    file_icon: HashMap<PathBuf, Option<FileIcon>>,
    flags: HashMap<PathBuf, ResidueFlags>,
    total_size: u64,
}

impl ApplicationProfile {
    pub fn new(identity: ApplicationIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    /// The blank profile left behind in the registry after an app's residue is trashed.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.identity == ApplicationIdentity::default() && self.files.is_empty()
    }

    pub fn insert(&mut self, path: PathBuf, size: u64, icon: Option<FileIcon>, flags: ResidueFlags) {
        self.file_size.insert(path.clone(), size);
        self.file_icon.insert(path.clone(), icon);
        self.flags.insert(path.clone(), flags);
        self.files.insert(path);
    }

    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn size_of(&self, path: &Path) -> Option<u64> {
        self.file_size.get(path).copied()
    }

    pub fn icon_of(&self, path: &Path) -> Option<&FileIcon> {
        self.file_icon.get(path).and_then(Option::as_ref)
    }

    pub fn file_sizes(&self) -> &HashMap<PathBuf, u64> {
        &self.file_size
    }

    pub fn file_icons(&self) -> &HashMap<PathBuf, Option<FileIcon>> {
        &self.file_icon
    }

    pub fn flags_of(&self, path: &Path) -> ResidueFlags {
        self.flags.get(path).copied().unwrap_or_default()
    }

    pub fn is_nested(&self, path: &Path) -> bool {
        self.flags_of(path).nested
    }

    pub fn is_ambiguous(&self, path: &Path) -> bool {
        self.flags_of(path).ambiguous
    }

    /// Paths that may be handed to the trash: everything except nested
    /// entries and entries already inside the trash.
    pub fn deletable(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.files
            .iter()
            .filter(|p| !self.is_nested(p) && !crate::utils::is_in_trash(p))
    }

    /// Deletable paths that are also confident matches; the preselection
    /// offered to the user.
    pub fn default_selection(&self) -> BTreeSet<PathBuf> {
        self.deletable()
            .filter(|p| !self.is_ambiguous(p))
            .cloned()
            .collect()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn recompute_total(&mut self) {
        self.total_size = self
            .files
            .iter()
            .filter_map(|p| self.file_size.get(p))
            .sum();
    }

    pub fn has_ambiguous(&self) -> bool {
        self.flags.values().any(|f| f.ambiguous)
    }

    /// Drops the file list and sizes but keeps the identity, as done once
    /// an app's residue has been trashed.
    pub fn clear_files(&mut self) {
        self.files.clear();
        self.file_size.clear();
        self.file_icon.clear();
        self.flags.clear();
        self.total_size = 0;
    }

    pub fn is_lockstep(&self) -> bool {
        self.files.len() == self.file_size.len()
            && self.files.len() == self.file_icon.len()
            && self
                .files
                .iter()
                .all(|p| self.file_size.contains_key(p) && self.file_icon.contains_key(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ApplicationProfile {
        let mut p = ApplicationProfile::new(ApplicationIdentity::new(
            "com.foo.myapp",
            "MyApp",
            "/Applications/MyApp.app",
        ));
        p.insert(PathBuf::from("/a"), 10, None, ResidueFlags::default());
        p.insert(
            PathBuf::from("/b"),
            5,
            None,
            ResidueFlags { ambiguous: true, nested: false },
        );
        p.insert(
            PathBuf::from("/c"),
            7,
            None,
            ResidueFlags { ambiguous: false, nested: true },
        );
        p
    }

    #[test]
    fn wrapper_badges() {
        let mut identity = ApplicationIdentity::new("com.foo.myapp", "MyApp", "/Applications/MyApp.app");
        assert_eq!(identity.badge(), None);
        identity.is_mobile_wrapper = true;
        assert_eq!(identity.badge(), Some("iOS"));
        identity.is_web_wrapper = true;
        assert_eq!(identity.badge(), Some("web"));
    }

    #[test]
    fn insert_keeps_maps_in_lockstep() {
        let mut p = profile();
        p.recompute_total();
        assert!(p.is_lockstep());
        assert_eq!(p.total_size(), 22);
        assert_eq!(p.files().len(), 3);
    }

    #[test]
    fn nested_paths_are_not_deletable() {
        let p = profile();
        let deletable: Vec<_> = p.deletable().cloned().collect();
        assert_eq!(deletable, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(p.contains(Path::new("/c")));
    }

    #[test]
    fn default_selection_skips_ambiguous() {
        let p = profile();
        let selection = p.default_selection();
        assert!(selection.contains(Path::new("/a")));
        assert!(!selection.contains(Path::new("/b")));
        assert!(!selection.contains(Path::new("/c")));
    }

    #[test]
    fn clear_files_keeps_identity() {
        let mut p = profile();
        p.recompute_total();
        p.clear_files();
        assert!(p.files().is_empty());
        assert!(p.file_sizes().is_empty());
        assert_eq!(p.total_size(), 0);
        assert_eq!(p.identity.display_name, "MyApp");
    }

    #[test]
    fn mobile_wrapper_bundle_root_is_outer_bundle() {
        let mut identity = ApplicationIdentity::new(
            "com.foo.ios",
            "Ios",
            "/Applications/Ios.app/Wrapper/Ios.app",
        );
        identity.is_mobile_wrapper = true;
        assert_eq!(identity.bundle_root(), PathBuf::from("/Applications/Ios.app"));
    }
}
