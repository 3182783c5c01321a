use serde::Serialize;
use std::path::Path;

use crate::models::{ApplicationIdentity, SweepSettings};
use crate::utils::sanitize::{canonical_bundle_stem, canonical_name};

/// Bundle stems this short are too generic to use as an alias.
const MIN_STEM_ALIAS_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    pub ambiguous_name_len: usize,
    pub skip_prefixes: Vec<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from(&SweepSettings::default())
    }
}

impl From<&SweepSettings> for MatchOptions {
    fn from(settings: &SweepSettings) -> Self {
        Self {
            ambiguous_name_len: settings.ambiguous_name_len,
            skip_prefixes: settings
                .skip_prefixes
                .iter()
                .map(|p| canonical_name(p))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    BundleId,
    AppName,
    BundleStem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum MatchVerdict {
    NoMatch,
    Confident(MatchReason),
    Ambiguous(MatchReason),
}

impl MatchVerdict {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchVerdict::NoMatch)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, MatchVerdict::Ambiguous(_))
    }
}

/// Pre-computed canonical keys for one application. Built once per scan
/// and shared read-only by every root worker.
#[derive(Debug, Clone)]
pub struct MatchTarget {
    bundle_key: String,
    name_keys: Vec<(String, MatchReason)>,
    skip_prefixes: Vec<String>,
    ambiguous_name_len: usize,
}

impl MatchTarget {
    pub fn new(identity: &ApplicationIdentity, options: &MatchOptions) -> Self {
        let bundle_key = canonical_name(&identity.bundle_id);

        let mut name_keys = Vec::new();
        let name = canonical_name(&identity.display_name);
        if !name.is_empty() {
            name_keys.push((name, MatchReason::AppName));
        }
        let stem = canonical_bundle_stem(&identity.app_path);
        if stem.len() >= MIN_STEM_ALIAS_LEN && !name_keys.iter().any(|(k, _)| *k == stem) {
            name_keys.push((stem, MatchReason::BundleStem));
        }

        // A prefix the app's own identifier starts with can't be used to
        // exclude that app's files.
        let skip_prefixes = options
            .skip_prefixes
            .iter()
            .filter(|p| bundle_key.is_empty() || !bundle_key.starts_with(p.as_str()))
            .cloned()
            .collect();

        Self {
            bundle_key,
            name_keys,
            skip_prefixes,
            ambiguous_name_len: options.ambiguous_name_len,
        }
    }

    /// True when the target has nothing to match against.
    pub fn is_empty(&self) -> bool {
        self.bundle_key.is_empty() && self.name_keys.is_empty()
    }

    /// Classifies one directory entry by its file name. Location plays no part.
    pub fn classify(&self, entry_name: &str) -> MatchVerdict {
        if entry_name.starts_with('.') {
            return MatchVerdict::NoMatch;
        }
        let entry = canonical_name(entry_name);
        if entry.is_empty() {
            return MatchVerdict::NoMatch;
        }
        if self.skip_prefixes.iter().any(|p| entry.starts_with(p.as_str())) {
            return MatchVerdict::NoMatch;
        }

        if !self.bundle_key.is_empty() && entry.contains(&self.bundle_key) {
            return MatchVerdict::Confident(MatchReason::BundleId);
        }

        let mut ambiguous = None;
        for (key, reason) in &self.name_keys {
            if entry == *key {
                return MatchVerdict::Confident(*reason);
            }
            if entry.contains(key.as_str()) {
                if key.len() >= self.ambiguous_name_len {
                    return MatchVerdict::Confident(*reason);
                }
                ambiguous.get_or_insert(*reason);
            }
        }
        ambiguous.map_or(MatchVerdict::NoMatch, MatchVerdict::Ambiguous)
    }

    pub fn classify_path(&self, path: &Path) -> MatchVerdict {
        match path.file_name() {
            Some(name) => self.classify(&name.to_string_lossy()),
            None => MatchVerdict::NoMatch,
        }
    }
}

/// One-off form of [`MatchTarget::classify_path`] that only answers yes or no.
pub fn matches(path: &Path, identity: &ApplicationIdentity, options: &MatchOptions) -> bool {
    MatchTarget::new(identity, options).classify_path(path).is_match()
}
