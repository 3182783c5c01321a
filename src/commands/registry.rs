use chrono::Utc;
use serde::Serialize;
use std::path::Path;

use crate::models::{ApplicationProfile, RegistryChange, RemovalReport, TrashedRecord};

/// Known applications, in enumeration order. Entries are keyed by install
/// path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationRegistry {
    entries: Vec<ApplicationProfile>,
}

impl ApplicationRegistry {
    pub fn new(entries: Vec<ApplicationProfile>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ApplicationProfile] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_path(&self, app_path: &Path) -> Option<&ApplicationProfile> {
        self.entries.iter().find(|p| p.identity.app_path == app_path)
    }

    /// Adds the profile, or replaces the entry with the same install path.
    pub fn upsert(&mut self, profile: ApplicationProfile) {
        match self.position(&profile.identity.app_path) {
            Some(i) => self.entries[i] = profile,
            None => self.entries.push(profile),
        }
    }

    /// Replaces the entry at `app_path` in place. Returns false when absent.
    pub fn replace_by_path(&mut self, app_path: &Path, profile: ApplicationProfile) -> bool {
        match self.position(app_path) {
            Some(i) => {
                self.entries[i] = profile;
                true
            }
            None => false,
        }
    }

    pub fn remove_by_path(&mut self, app_path: &Path) -> Option<ApplicationProfile> {
        self.position(app_path).map(|i| self.entries.remove(i))
    }

    fn position(&self, app_path: &Path) -> Option<usize> {
        self.entries
            .iter()
            .position(|p| p.identity.app_path == app_path)
    }
}

/// Recently removed apps, oldest first. Append-only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrashedHistory {
    records: Vec<TrashedRecord>,
}

impl TrashedHistory {
    pub fn new(records: Vec<TrashedRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: TrashedRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrashedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    pub change: RegistryChange,
    pub record: Option<TrashedRecord>,
}

/// Reconciles the registry after a removal batch.
///
/// When the main bundle reached the trash the app leaves the registry.
/// Otherwise the profile's file list is cleared, a snapshot is appended to
/// `history`, and the registry entry at the install path becomes a
/// placeholder.
pub fn apply_removal(
    registry: &mut ApplicationRegistry,
    history: &mut TrashedHistory,
    mut profile: ApplicationProfile,
    report: &RemovalReport,
) -> RemovalOutcome {
    let app_path = profile.identity.app_path.clone();

    if report.was_moved(&profile.identity.bundle_root()) {
        if registry.remove_by_path(&app_path).is_none() {
            log::debug!("{} was not in the registry", app_path.display());
        }
        log::info!("{} uninstalled", profile.identity.display_name);
        return RemovalOutcome {
            change: RegistryChange::Removed { app_path },
            record: None,
        };
    }

    let moved = report.moved();
    let reclaimed_bytes = moved.iter().filter_map(|p| profile.size_of(p)).sum();
    let removed_count = moved.len();
    let failed_count = report.failed().len();

    profile.clear_files();
    let record = TrashedRecord {
        profile,
        reclaimed_bytes,
        removed_count,
        failed_count,
        trashed_at: Utc::now(),
    };
    history.push(record.clone());
    registry.replace_by_path(&app_path, ApplicationProfile::placeholder());
    log::info!(
        "Archived {}: {} removed, {} failed",
        record.profile.identity.display_name,
        removed_count,
        failed_count
    );

    RemovalOutcome {
        change: RegistryChange::Archived { app_path },
        record: Some(record),
    }
}
