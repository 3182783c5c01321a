use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub root: PathBuf,
    pub roots_done: usize,
    pub roots_total: usize,
    pub candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanComplete {
    pub generation: u64,
    pub file_count: usize,
    pub total_size: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelEvent {
    /// An application bundle arrived in the trash.
    AppTrashed(PathBuf),
}
