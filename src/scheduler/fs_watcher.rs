use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

use crate::models::{SentinelEvent, SweepSettings};
use crate::utils::AppResult;

pub type SentinelCallback = Arc<dyn Fn(SentinelEvent) + Send + Sync>;

/// Watches the user trash and reports application bundles as they land
/// in it, so their leftovers can be offered for removal.
///
/// Stopped while a removal batch runs so the batch's own bundle isn't
/// reported back; the post-removal hook starts it again.
pub struct Sentinel {
    trash_dir: PathBuf,
    on_event: SentinelCallback,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl Sentinel {
    pub fn new(trash_dir: PathBuf, on_event: SentinelCallback) -> Self {
        Self {
            trash_dir,
            on_event,
            watcher: Mutex::new(None),
        }
    }

    pub fn for_user_trash(on_event: SentinelCallback) -> Option<Self> {
        default_trash_dir().map(|dir| Self::new(dir, on_event))
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    pub fn is_active(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Registers the watch. Does nothing when already running.
    pub fn start(&self) -> AppResult<()> {
        let mut slot = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&self.trash_dir, RecursiveMode::NonRecursive)?;

        let trash_dir = self.trash_dir.clone();
        let on_event = Arc::clone(&self.on_event);
        // Ends when the watcher, and with it the sender, is dropped.
        std::thread::spawn(move || {
            for result in rx {
                match result {
                    Ok(event) => {
                        for path in trashed_apps(&event, &trash_dir) {
                            log::info!("App moved to trash: {}", path.display());
                            on_event(SentinelEvent::AppTrashed(path));
                        }
                    }
                    Err(e) => log::warn!("Trash watch error: {:?}", e),
                }
            }
            log::debug!("Trash watcher for {} stopped", trash_dir.display());
        });

        *slot = Some(watcher);
        log::info!("Watching {} for trashed apps", self.trash_dir.display());
        Ok(())
    }

    /// Drops the watch. Returns whether it was running.
    pub fn stop(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .is_some()
    }
}

/// Starts a watch on `trash_dir` when `sentinel_enabled` is set. A watch
/// that can't be registered is logged and left out.
pub fn arm_if_enabled(
    settings: &SweepSettings,
    trash_dir: Option<PathBuf>,
    on_event: SentinelCallback,
) -> Option<Arc<Sentinel>> {
    if !settings.sentinel_enabled {
        return None;
    }
    let sentinel = Sentinel::new(trash_dir?, on_event);
    if let Err(e) = sentinel.start() {
        log::warn!("Trash watch on {} unavailable: {}", sentinel.trash_dir().display(), e);
        return None;
    }
    Some(Arc::new(sentinel))
}

#[cfg(target_os = "macos")]
pub fn default_trash_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".Trash"))
}

#[cfg(not(target_os = "macos"))]
pub fn default_trash_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|data| data.join("Trash").join("files"))
}

/// `.app` bundles an event places directly in `trash_dir`.
pub fn trashed_apps(event: &Event, trash_dir: &Path) -> Vec<PathBuf> {
    let arriving = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Name(mode)) => mode != notify::event::RenameMode::From,
        _ => false,
    };
    if !arriving {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| p.parent() == Some(trash_dir))
        .filter(|p| p.extension().is_some_and(|e| e == "app"))
        .cloned()
        .collect()
}
