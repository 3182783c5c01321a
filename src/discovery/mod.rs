pub mod locations;
pub mod matcher;
pub mod size;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use crate::models::{
    ApplicationIdentity, ApplicationProfile, FileIcon, ResidueFlags, ScanComplete, ScanProgress,
    SweepSettings,
};
use crate::utils::is_in_trash;

pub use locations::{PathCatalog, RootScope, RootSpec};
pub use matcher::{MatchOptions, MatchReason, MatchTarget, MatchVerdict};
pub use size::{DiskInfoProvider, FileInfoProvider};

/// Monotonic scan counter. Each new scan takes the next value; a result is
/// only worth committing while its value is still the latest.
#[derive(Debug, Default)]
pub struct ScanGeneration(AtomicU64);

impl ScanGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

pub type ProgressFn = Arc<dyn Fn(ScanProgress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub generation: u64,
    pub profile: ApplicationProfile,
    pub unreadable_roots: Vec<PathBuf>,
    pub duration: Duration,
}

impl ScanResult {
    fn empty(identity: ApplicationIdentity, generation: u64) -> Self {
        Self {
            generation,
            profile: ApplicationProfile::new(identity),
            unreadable_roots: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn summary(&self) -> ScanComplete {
        ScanComplete {
            generation: self.generation,
            file_count: self.profile.files().len(),
            total_size: self.profile.total_size(),
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}

/// A scan running in the background.
pub struct ScanHandle {
    generation: u64,
    identity: ApplicationIdentity,
    task: JoinHandle<ScanResult>,
}

impl ScanHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the scan. A scan task that died yields an empty profile
    /// rather than an error.
    pub async fn wait(self) -> ScanResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                log::error!(
                    "Scan task for {} failed: {}",
                    self.identity.app_path.display(),
                    e
                );
                ScanResult::empty(self.identity, self.generation)
            }
        }
    }
}

/// One matched path on its way from a root worker to the aggregator.
#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    /// Resolved path used for de-duplication; falls back to `path`.
    key: PathBuf,
    flags: ResidueFlags,
    is_link: bool,
}

impl Candidate {
    fn new(path: PathBuf, flags: ResidueFlags) -> Self {
        let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        let is_link = std::fs::symlink_metadata(&path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        Self {
            path,
            key,
            flags,
            is_link,
        }
    }

    /// Among aliases of one file the lowest rank is kept: real paths before
    /// symlinks, then the lexically smallest path.
    fn rank(&self) -> (bool, &Path) {
        (self.is_link, &self.path)
    }
}

#[derive(Debug)]
enum WorkerMessage {
    Found(Candidate),
    RootDone { root: PathBuf, readable: bool },
}

/// Aggregator-side collection; only the receiving loop touches it.
///
/// The outcome does not depend on the order candidates arrive in.
#[derive(Debug, Default)]
struct Collected {
    index: HashMap<PathBuf, usize>,
    entries: Vec<Candidate>,
}

impl Collected {
    fn add(&mut self, candidate: Candidate) {
        match self.index.get(&candidate.key) {
            Some(&i) => {
                // Seen through another root or alias; keep the stronger verdict.
                let kept = &mut self.entries[i];
                let flags = ResidueFlags {
                    ambiguous: kept.flags.ambiguous && candidate.flags.ambiguous,
                    nested: kept.flags.nested && candidate.flags.nested,
                };
                if candidate.rank() < kept.rank() {
                    kept.path = candidate.path;
                    kept.is_link = candidate.is_link;
                }
                kept.flags = flags;
            }
            None => {
                self.index.insert(candidate.key.clone(), self.entries.len());
                self.entries.push(candidate);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn into_entries(self) -> Vec<(PathBuf, ResidueFlags)> {
        self.entries
            .into_iter()
            .map(|candidate| (candidate.path, candidate.flags))
            .collect()
    }
}

struct Measured {
    path: PathBuf,
    flags: ResidueFlags,
    size: u64,
    icon: Option<FileIcon>,
}

/// Finds everything on disk that belongs to an application.
///
/// Every catalog root is listed on its own blocking worker. Workers send
/// matches over a channel to a single aggregator, which de-duplicates them.
/// Once all workers are done the set is collapsed and each survivor is
/// sized and given an icon, again concurrently.
#[derive(Clone)]
pub struct AppPathFinder {
    catalog: Arc<PathCatalog>,
    provider: Arc<dyn FileInfoProvider>,
    options: MatchOptions,
    nested_depth: usize,
    info_timeout: Duration,
    concurrency: usize,
    generation: Arc<ScanGeneration>,
}

impl AppPathFinder {
    pub fn new(
        catalog: PathCatalog,
        provider: Arc<dyn FileInfoProvider>,
        settings: &SweepSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            provider,
            options: MatchOptions::from(settings),
            nested_depth: settings.nested_depth.max(1),
            info_timeout: Duration::from_secs(settings.size_timeout_secs.max(1)),
            concurrency: settings.worker_concurrency.max(1),
            generation: Arc::new(ScanGeneration::new()),
        }
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &PathCatalog {
        &self.catalog
    }

    pub fn generation(&self) -> &Arc<ScanGeneration> {
        &self.generation
    }

    /// Starts a scan in the background. Must be called inside a tokio runtime.
    ///
    /// Starting a scan makes every earlier one stale; stale scans stop early
    /// and their results should be dropped by the caller.
    pub fn find(&self, identity: ApplicationIdentity, on_progress: Option<ProgressFn>) -> ScanHandle {
        let generation = self.generation.begin();
        let finder = self.clone();
        let scan_identity = identity.clone();
        let task = tokio::spawn(async move { finder.scan(scan_identity, generation, on_progress).await });
        ScanHandle {
            generation,
            identity,
            task,
        }
    }

    /// Like [`find`](Self::find), but hands the result to `on_complete`,
    /// which runs exactly once.
    pub fn find_with<F>(
        &self,
        identity: ApplicationIdentity,
        on_progress: Option<ProgressFn>,
        on_complete: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(ScanResult) + Send + 'static,
    {
        let handle = self.find(identity, on_progress);
        tokio::spawn(async move { on_complete(handle.wait().await) })
    }

    pub async fn scan(
        &self,
        identity: ApplicationIdentity,
        generation: u64,
        on_progress: Option<ProgressFn>,
    ) -> ScanResult {
        let started = Instant::now();
        let target = Arc::new(MatchTarget::new(&identity, &self.options));
        let roots = if target.is_empty() {
            log::warn!(
                "{} has neither a bundle ID nor a name; only the bundle is listed",
                identity.app_path.display()
            );
            Vec::new()
        } else {
            self.catalog.roots_for(identity.scope)
        };
        let roots_total = roots.len();

        let mut collected = Collected::default();
        if let Some(bundle) = bundle_entry(&identity) {
            collected.add(bundle);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let workers: Vec<_> = roots
            .into_iter()
            .map(|root| {
                let tx = tx.clone();
                let target = Arc::clone(&target);
                let scans = Arc::clone(&self.generation);
                let nested_depth = self.nested_depth;
                tokio::task::spawn_blocking(move || {
                    scan_root(&root, &target, nested_depth, &scans, generation, &tx)
                })
            })
            .collect();
        drop(tx);

        let mut roots_done = 0;
        let mut unreadable_roots = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Found(candidate) => collected.add(candidate),
                WorkerMessage::RootDone { root, readable } => {
                    roots_done += 1;
                    if !readable {
                        unreadable_roots.push(root.clone());
                    }
                    if let Some(report) = &on_progress {
                        report(ScanProgress {
                            root,
                            roots_done,
                            roots_total,
                            candidates: collected.len(),
                        });
                    }
                }
            }
        }

        // The channel only closes once every worker has returned; this
        // surfaces the ones that panicked.
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                log::warn!("Root worker failed: {}", e);
            }
        }

        let mut profile = ApplicationProfile::new(identity);
        if !self.generation.is_current(generation) {
            log::debug!("Scan {} superseded, dropping its matches", generation);
            return ScanResult {
                generation,
                profile,
                unreadable_roots,
                duration: started.elapsed(),
            };
        }

        let entries = finalize(collected.into_entries());
        for measured in self.measure(entries).await {
            profile.insert(measured.path, measured.size, measured.icon, measured.flags);
        }
        profile.recompute_total();

        let result = ScanResult {
            generation,
            profile,
            unreadable_roots,
            duration: started.elapsed(),
        };
        let summary = result.summary();
        log::info!(
            "Scan {} of {}: {} paths, {} bytes in {}ms",
            generation,
            result.profile.identity.display_name,
            summary.file_count,
            summary.total_size,
            summary.duration_ms
        );
        result
    }

    async fn measure(&self, entries: Vec<(PathBuf, ResidueFlags)>) -> Vec<Measured> {
        let results = Arc::new(Mutex::new(Vec::with_capacity(entries.len())));
        let limit = self.info_timeout;

        stream::iter(entries)
            .for_each_concurrent(self.concurrency, |(path, flags)| {
                let provider = Arc::clone(&self.provider);
                let results = Arc::clone(&results);
                async move {
                    let size_lookup = {
                        let provider = Arc::clone(&provider);
                        let path = path.clone();
                        move || provider.size(&path)
                    };
                    let icon_lookup = {
                        let path = path.clone();
                        move || provider.icon(&path)
                    };
                    let (size, icon) = tokio::join!(
                        bounded_lookup(limit, &path, "Size", size_lookup),
                        bounded_lookup(limit, &path, "Icon", icon_lookup),
                    );
                    results.lock().await.push(Measured {
                        path,
                        flags,
                        size: size.unwrap_or(0),
                        icon,
                    });
                }
            })
            .await;

        match Arc::try_unwrap(results) {
            Ok(results) => results.into_inner(),
            Err(shared) => std::mem::take(&mut *shared.lock().await),
        }
    }
}

/// Runs one provider lookup on a blocking thread, giving up on it after
/// `limit`. A lookup that times out keeps its thread until it returns on its
/// own, so `worker_concurrency` bounds the lookups being waited on, not the
/// blocking threads still busy with abandoned ones.
async fn bounded_lookup<T, F>(limit: Duration, path: &Path, what: &str, lookup: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> Option<T> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(lookup)).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            log::warn!("{} lookup for {} failed: {}", what, path.display(), e);
            None
        }
        Err(_) => {
            log::warn!("{} lookup for {} timed out after {:?}", what, path.display(), limit);
            None
        }
    }
}

/// The install itself, listed first. Skipped when it is already in the
/// trash or gone.
fn bundle_entry(identity: &ApplicationIdentity) -> Option<Candidate> {
    let bundle = identity.bundle_root();
    if bundle.as_os_str().is_empty() || is_in_trash(&bundle) {
        return None;
    }
    if std::fs::symlink_metadata(&bundle).is_err() {
        log::debug!("Bundle {} not on disk", bundle.display());
        return None;
    }
    Some(Candidate::new(bundle, ResidueFlags::default()))
}

fn scan_root(
    root: &RootSpec,
    target: &MatchTarget,
    nested_depth: usize,
    scans: &ScanGeneration,
    generation: u64,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
) {
    let readable = match std::fs::read_dir(&root.path) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("Skipping {}: {}", root.path.display(), e);
            false
        }
    };
    if readable {
        walk_root(root, target, nested_depth, scans, generation, tx);
    }
    let _ = tx.send(WorkerMessage::RootDone {
        root: root.path.clone(),
        readable,
    });
}

fn walk_root(
    root: &RootSpec,
    target: &MatchTarget,
    nested_depth: usize,
    scans: &ScanGeneration,
    generation: u64,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
) {
    let mut walker = WalkDir::new(&root.path)
        .min_depth(1)
        .max_depth(root.depth)
        .follow_links(false)
        .into_iter();

    while let Some(next) = walker.next() {
        if !scans.is_current(generation) {
            return;
        }
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Unreadable entry under {}: {}", root.path.display(), e);
                continue;
            }
        };

        let is_dir = entry.file_type().is_dir();
        let verdict = {
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
            target.classify(&name)
        };
        if !verdict.is_match() {
            continue;
        }
        // A matched directory is taken whole.
        if is_dir {
            walker.skip_current_dir();
        }

        let flags = ResidueFlags {
            ambiguous: verdict.is_ambiguous(),
            nested: entry.depth() > nested_depth,
        };
        if tx.send(WorkerMessage::Found(Candidate::new(entry.into_path(), flags))).is_err() {
            return;
        }
    }
}

/// Sorts, drops paths inside an already-listed directory, and discards a
/// result whose only entry sits in the trash.
fn finalize(mut entries: Vec<(PathBuf, ResidueFlags)>) -> Vec<(PathBuf, ResidueFlags)> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut kept: Vec<(PathBuf, ResidueFlags)> = Vec::with_capacity(entries.len());
    for (path, flags) in entries {
        if kept.last().is_some_and(|(parent, _)| path.starts_with(parent)) {
            continue;
        }
        kept.push((path, flags));
    }

    if kept.len() == 1 && is_in_trash(&kept[0].0) {
        kept.clear();
    }
    kept
}
