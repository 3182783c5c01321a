use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::FileIcon;
use crate::platform::icon_extractor;

/// Per-path metadata lookups used after matching. Implementations are
/// called from blocking worker threads and may be slow.
pub trait FileInfoProvider: Send + Sync {
    /// Logical size in bytes, summed over a directory's contents.
    /// `None` when the path can't be read at all.
    fn size(&self, path: &Path) -> Option<u64>;

    fn icon(&self, path: &Path) -> Option<FileIcon>;
}

/// Reads sizes from disk and renders icons into a cache directory.
#[derive(Debug, Clone, Default)]
pub struct DiskInfoProvider {
    icon_dir: Option<PathBuf>,
    thumbnail_all_files: bool,
}

impl DiskInfoProvider {
    pub fn new(icon_dir: Option<PathBuf>, thumbnail_all_files: bool) -> Self {
        Self {
            icon_dir,
            thumbnail_all_files,
        }
    }

    /// Sizes only; no icon work.
    pub fn without_icons() -> Self {
        Self::default()
    }
}

impl FileInfoProvider for DiskInfoProvider {
    fn size(&self, path: &Path) -> Option<u64> {
        path_size(path)
    }

    fn icon(&self, path: &Path) -> Option<FileIcon> {
        let dir = self.icon_dir.as_ref()?;
        icon_extractor::extract_icon_png(path, dir, self.thumbnail_all_files)
            .map(|png_path| FileIcon { png_path })
    }
}

/// Total byte size of a file or directory tree. Symlinks count as their
/// own length and are never followed; unreadable children are skipped.
pub fn path_size(path: &Path) -> Option<u64> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    if !meta.is_dir() {
        return Some(meta.len());
    }

    let total = WalkDir::new(path)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum();
    Some(total)
}
