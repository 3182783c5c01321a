use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::app::ApplicationProfile;

/// Why a single path could not be moved to the trash.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrashFailure {
    #[error("path no longer exists")]
    Missing,

    #[error("path is already inside the trash")]
    InsideTrash,

    #[error("path is a mount point")]
    MountPoint,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("trash refused the move: {0}")]
    Store(String),
}

impl Serialize for TrashFailure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashOutcome {
    pub path: PathBuf,
    pub error: Option<TrashFailure>,
}

impl TrashOutcome {
    pub fn is_moved(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-path result of one removal batch, in the order the paths were given.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub outcomes: Vec<TrashOutcome>,
}

impl RemovalReport {
    pub fn moved(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| o.is_moved())
            .map(|o| o.path.as_path())
            .collect()
    }

    pub fn failed(&self) -> Vec<(&Path, &TrashFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (o.path.as_path(), e)))
            .collect()
    }

    pub fn was_moved(&self, path: &Path) -> bool {
        self.outcomes.iter().any(|o| o.path == path && o.is_moved())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(TrashOutcome::is_moved)
    }
}

/// Snapshot of a profile whose residue was trashed while the app itself
/// stayed installed. Appended to the history and never changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedRecord {
    pub profile: ApplicationProfile,
    pub reclaimed_bytes: u64,
    pub removed_count: usize,
    pub failed_count: usize,
    pub trashed_at: DateTime<Utc>,
}

/// What the registry reconciliation did after a removal batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryChange {
    /// The main bundle went to the trash; the app left the registry.
    Removed { app_path: PathBuf },
    /// Only residue went; a history record was appended.
    Archived { app_path: PathBuf },
}
