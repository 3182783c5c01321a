use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SweepSettings {
    /// Canonical app names shorter than this only produce ambiguous matches.
    pub ambiguous_name_len: usize,
    /// Matches deeper than this many levels below their scan root are nested.
    pub nested_depth: usize,
    /// Additional directories scanned one level deep for every app.
    pub extra_locations: Vec<String>,
    /// Canonical entry-name prefixes that never match (unless the target's
    /// own bundle ID shares the prefix).
    pub skip_prefixes: Vec<String>,
    pub sentinel_enabled: bool,
    pub brew_cleanup: bool,
    pub quit_running_app: bool,
    pub size_timeout_secs: u64,
    pub worker_concurrency: usize,
    pub thumbnail_all_files: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            ambiguous_name_len: 5,
            nested_depth: 1,
            extra_locations: Vec::new(),
            skip_prefixes: vec!["comapple".into()],
            sentinel_enabled: false,
            brew_cleanup: false,
            quit_running_app: true,
            size_timeout_secs: 10,
            worker_concurrency: 16,
            thumbnail_all_files: false,
        }
    }
}
