use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::commands::hooks::RemovalHook;
use crate::commands::registry::{apply_removal, ApplicationRegistry, RemovalOutcome, TrashedHistory};
use crate::discovery::{AppPathFinder, ProgressFn, ScanHandle, ScanResult};
use crate::models::{
    ApplicationIdentity, ApplicationProfile, RemovalReport, SweepSettings, TrashedRecord,
};
use crate::platform::trash::TrashStore;
use crate::scheduler::Sentinel;
use crate::utils::is_in_trash;

pub type SharedSession = Arc<Mutex<Session>>;

/// A removal batch captured from the session before any path is touched.
#[derive(Debug, Clone)]
pub struct RemovalPlan {
    pub profile: ApplicationProfile,
    pub paths: Vec<PathBuf>,
}

/// Everything one running instance knows: the known apps, what was removed,
/// the profile being reviewed and which of its paths are selected.
///
/// Built once at start-up and handed around as a [`SharedSession`].
pub struct Session {
    settings: SweepSettings,
    finder: AppPathFinder,
    trash: Arc<dyn TrashStore>,
    hooks: Vec<Arc<dyn RemovalHook>>,
    sentinel: Option<Arc<Sentinel>>,
    registry: ApplicationRegistry,
    history: TrashedHistory,
    current: ApplicationProfile,
    selection: BTreeSet<PathBuf>,
}

impl Session {
    pub fn new(settings: SweepSettings, finder: AppPathFinder, trash: Arc<dyn TrashStore>) -> Self {
        Self {
            settings,
            finder,
            trash,
            hooks: Vec::new(),
            sentinel: None,
            registry: ApplicationRegistry::default(),
            history: TrashedHistory::default(),
            current: ApplicationProfile::placeholder(),
            selection: BTreeSet::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn RemovalHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_sentinel(mut self, sentinel: Arc<Sentinel>) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    pub fn with_registry(mut self, registry: ApplicationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_history(mut self, history: TrashedHistory) -> Self {
        self.history = history;
        self
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    pub fn finder(&self) -> &AppPathFinder {
        &self.finder
    }

    pub fn trash_store(&self) -> Arc<dyn TrashStore> {
        Arc::clone(&self.trash)
    }

    pub fn hooks(&self) -> &[Arc<dyn RemovalHook>] {
        &self.hooks
    }

    pub fn sentinel(&self) -> Option<&Arc<Sentinel>> {
        self.sentinel.as_ref()
    }

    pub fn registry(&self) -> &ApplicationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ApplicationRegistry {
        &mut self.registry
    }

    pub fn trashed(&self) -> &[TrashedRecord] {
        self.history.records()
    }

    pub fn current(&self) -> &ApplicationProfile {
        &self.current
    }

    pub fn selection(&self) -> &BTreeSet<PathBuf> {
        &self.selection
    }

    /// Starts a scan for `identity`. The current profile is reset at once
    /// and any scan still running becomes stale.
    pub fn scan(&mut self, identity: ApplicationIdentity, on_progress: Option<ProgressFn>) -> ScanHandle {
        self.current = ApplicationProfile::new(identity.clone());
        self.selection.clear();
        self.finder.find(identity, on_progress)
    }

    /// Installs a finished scan as the current profile unless a newer scan
    /// has started since. Returns whether it was installed.
    pub fn commit_scan(&mut self, result: ScanResult) -> bool {
        if !self.finder.generation().is_current(result.generation) {
            log::debug!(
                "Dropping stale scan {} for {}",
                result.generation,
                result.profile.identity.display_name
            );
            return false;
        }
        let profile = result.profile;
        self.registry
            .replace_by_path(&profile.identity.app_path, profile.clone());
        self.selection = profile.default_selection();
        self.current = profile;
        true
    }

    /// Adds a path to the selection. Only deletable paths of the current
    /// profile are accepted.
    pub fn select(&mut self, path: &Path) -> bool {
        if !self.current.contains(path) || self.current.is_nested(path) || is_in_trash(path) {
            return false;
        }
        self.selection.insert(path.to_path_buf())
    }

    pub fn deselect(&mut self, path: &Path) -> bool {
        self.selection.remove(path)
    }

    pub fn select_default(&mut self) {
        self.selection = self.current.default_selection();
    }

    /// Every deletable path, ambiguous ones included.
    pub fn select_all(&mut self) {
        self.selection = self.current.deletable().cloned().collect();
    }

    /// Copies the selection out for a removal batch. `None` when empty.
    pub fn begin_removal(&self) -> Option<RemovalPlan> {
        if self.selection.is_empty() {
            return None;
        }
        Some(RemovalPlan {
            profile: self.current.clone(),
            paths: self.selection.iter().cloned().collect(),
        })
    }

    /// Applies a finished batch to the registry and history, then resets the
    /// current profile if it still belongs to the same app.
    pub fn finish_removal(&mut self, plan: RemovalPlan, report: &RemovalReport) -> RemovalOutcome {
        let same_app = self.current.identity == plan.profile.identity;
        let outcome = apply_removal(&mut self.registry, &mut self.history, plan.profile, report);
        if same_app {
            self.current = ApplicationProfile::placeholder();
            self.selection.clear();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::uninstall::uninstall_selection;
    use crate::db::Database;
    use crate::discovery::{DiskInfoProvider, PathCatalog, RootScope, RootSpec};
    use crate::models::RegistryChange;
    use crate::platform::trash::fakes::RecordingTrash;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        app: PathBuf,
        prefs: PathBuf,
        cache: PathBuf,
        nested: PathBuf,
        unrelated: PathBuf,
        roots: Vec<RootSpec>,
        bin: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_path_buf();
        let app = base.join("Applications/MyApp.app");
        fs::create_dir_all(app.join("Contents")).unwrap();
        let lib = base.join("Library");
        fs::create_dir_all(lib.join("Preferences")).unwrap();
        fs::create_dir_all(lib.join("Caches/MyApp")).unwrap();
        fs::create_dir_all(lib.join("Caches/Shared/MyApp")).unwrap();
        fs::write(lib.join("Preferences/com.foo.myapp.plist"), "p").unwrap();
        fs::write(lib.join("Caches/MyApp/blob"), vec![0u8; 64]).unwrap();
        fs::create_dir_all(base.join("Other")).unwrap();
        Fixture {
            prefs: lib.join("Preferences/com.foo.myapp.plist"),
            cache: lib.join("Caches/MyApp"),
            nested: lib.join("Caches/Shared/MyApp"),
            unrelated: base.join("Other"),
            roots: vec![
                RootSpec::new(lib.join("Preferences"), RootScope::Any, 1),
                RootSpec::new(lib.join("Caches"), RootScope::Any, 2),
            ],
            bin: base.join("bin"),
            app,
            _dir: dir,
        }
    }

    fn session(fx: &Fixture, store: Arc<RecordingTrash>) -> Session {
        let settings = SweepSettings {
            quit_running_app: false,
            ..SweepSettings::default()
        };
        let finder = AppPathFinder::new(
            PathCatalog::new(fx.roots.clone()),
            Arc::new(DiskInfoProvider::without_icons()),
            &settings,
        );
        Session::new(settings, finder, store)
    }

    fn identity(fx: &Fixture) -> ApplicationIdentity {
        ApplicationIdentity::new("com.foo.myapp", "MyApp", fx.app.clone())
    }

    async fn scanned(fx: &Fixture, store: Arc<RecordingTrash>) -> SharedSession {
        let mut s = session(fx, store);
        s.registry_mut().upsert(ApplicationProfile::new(identity(fx)));
        let shared = s.into_shared();
        let handle = shared.lock().await.scan(identity(fx), None);
        let result = handle.wait().await;
        assert!(shared.lock().await.commit_scan(result));
        shared
    }

    #[tokio::test]
    async fn commit_installs_profile_and_default_selection() {
        let fx = fixture();
        let shared = scanned(&fx, Arc::new(RecordingTrash::new(fx.bin.clone()))).await;
        let s = shared.lock().await;

        assert!(s.current().contains(&fx.app));
        assert!(s.current().contains(&fx.prefs));
        assert!(s.current().contains(&fx.cache));
        assert!(s.current().is_nested(&fx.nested));
        assert!(s.selection().contains(&fx.cache));
        assert!(!s.selection().contains(&fx.nested));
        assert_eq!(s.registry().entries()[0].files(), s.current().files());
    }

    #[tokio::test]
    async fn selection_refuses_nested_trash_and_unknown_paths() {
        let fx = fixture();
        let shared = scanned(&fx, Arc::new(RecordingTrash::new(fx.bin.clone()))).await;
        let mut s = shared.lock().await;

        assert!(!s.select(&fx.nested));
        assert!(!s.select(&fx.unrelated));
        assert!(!s.select(Path::new("/Users/a/.Trash/MyApp")));
        assert!(s.deselect(&fx.cache));
        assert!(s.select(&fx.cache));
        s.select_default();
        assert_eq!(s.selection(), &s.current().default_selection());
    }

    #[tokio::test]
    async fn newer_scan_wins_regardless_of_finish_order() {
        let fx = fixture();
        let shared = session(&fx, Arc::new(RecordingTrash::new(fx.bin.clone()))).into_shared();
        let other = ApplicationIdentity::new("com.bar.otherapp", "OtherApp", "/Applications/OtherApp.app");

        let first = shared.lock().await.scan(identity(&fx), None);
        let second = shared.lock().await.scan(other.clone(), None);
        let second = second.wait().await;
        let first = first.wait().await;

        let mut s = shared.lock().await;
        assert!(s.commit_scan(second));
        assert!(!s.commit_scan(first));
        assert_eq!(s.current().identity, other);
        assert!(!s.current().contains(&fx.app));
    }

    #[tokio::test]
    async fn uninstalling_with_bundle_removes_the_app() {
        let fx = fixture();
        let store = Arc::new(RecordingTrash::new(fx.bin.clone()));
        let shared = scanned(&fx, store.clone()).await;

        let summary = uninstall_selection(&shared, None).await.unwrap();

        assert!(summary.report.all_succeeded());
        assert_eq!(
            summary.outcome.change,
            RegistryChange::Removed {
                app_path: fx.app.clone()
            }
        );
        assert!(!fx.app.exists());
        assert!(fx.nested.exists());
        let s = shared.lock().await;
        assert!(s.registry().is_empty());
        assert!(s.trashed().is_empty());
        assert!(s.current().is_placeholder());
        assert!(s.selection().is_empty());
    }

    #[tokio::test]
    async fn residue_only_uninstall_archives_and_persists() {
        let fx = fixture();
        let store = Arc::new(RecordingTrash::new(fx.bin.clone()));
        let shared = scanned(&fx, store.clone()).await;
        shared.lock().await.deselect(&fx.app);
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));

        let summary = uninstall_selection(&shared, Some(&db)).await.unwrap();

        assert!(matches!(summary.outcome.change, RegistryChange::Archived { .. }));
        assert!(fx.app.exists());
        assert!(!fx.cache.exists());
        let record = summary.outcome.record.unwrap();
        assert_eq!(record.reclaimed_bytes, 65);
        assert_eq!(record.removed_count, 2);

        let s = shared.lock().await;
        assert_eq!(s.trashed().len(), 1);
        assert!(s.registry().entries()[0].is_placeholder());
        drop(s);

        let history = db.lock().await.get_trashed_history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].app_name, "MyApp");
    }

    #[tokio::test]
    async fn failed_path_is_reported_and_others_still_move() {
        let fx = fixture();
        let store = Arc::new(RecordingTrash::new(fx.bin.clone()).refusing(fx.prefs.clone()));
        let shared = scanned(&fx, store.clone()).await;

        let summary = uninstall_selection(&shared, None).await.unwrap();

        let failed = summary.report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, fx.prefs.as_path());
        assert!(!fx.cache.exists());
        assert!(fx.prefs.exists());
    }

    #[tokio::test]
    async fn enabled_trash_watch_is_paused_and_rearmed() {
        let fx = fixture();
        let trash_dir = fx.bin.with_file_name("watched-trash");
        fs::create_dir_all(&trash_dir).unwrap();
        let settings = SweepSettings {
            sentinel_enabled: true,
            ..SweepSettings::default()
        };
        let sentinel = crate::scheduler::arm_if_enabled(
            &settings,
            Some(trash_dir),
            Arc::new(|_: crate::models::SentinelEvent| {}),
        )
        .unwrap();
        let hooks: Vec<Arc<dyn RemovalHook>> = vec![Arc::new(
            crate::commands::hooks::SentinelRearm::new(Arc::clone(&sentinel)),
        )];

        let shared = session(&fx, Arc::new(RecordingTrash::new(fx.bin.clone())))
            .with_sentinel(Arc::clone(&sentinel))
            .with_hooks(hooks)
            .into_shared();
        let handle = shared.lock().await.scan(identity(&fx), None);
        let result = handle.wait().await;
        assert!(shared.lock().await.commit_scan(result));

        uninstall_selection(&shared, None).await.unwrap();

        let mut rearmed = false;
        for _ in 0..100 {
            if sentinel.is_active() {
                rearmed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(rearmed);
        sentinel.stop();
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let fx = fixture();
        let shared = session(&fx, Arc::new(RecordingTrash::new(fx.bin.clone()))).into_shared();
        assert!(uninstall_selection(&shared, None).await.is_err());
    }
}
