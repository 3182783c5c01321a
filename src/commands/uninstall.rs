use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::commands::hooks::{spawn_hooks, HookContext};
use crate::commands::registry::RemovalOutcome;
use crate::commands::session::SharedSession;
use crate::db::Database;
use crate::models::{RemovalReport, TrashFailure, TrashOutcome};
use crate::platform::trash::{is_mount_point, TrashStore};
use crate::utils::app_lifecycle::quit_app_gracefully;
use crate::utils::{is_in_trash, AppError, AppResult};

/// Moves one path to the trash after the checks every path must pass.
pub fn trash_path(store: &dyn TrashStore, path: &Path) -> Result<(), TrashFailure> {
    if is_in_trash(path) {
        return Err(TrashFailure::InsideTrash);
    }
    match std::fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(TrashFailure::Missing),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(TrashFailure::PermissionDenied(e.to_string()))
        }
        Err(e) => return Err(TrashFailure::Store(e.to_string())),
    }
    if is_mount_point(path) {
        return Err(TrashFailure::MountPoint);
    }
    store.move_to_trash(path)
}

/// Tries every path in order. A failure is recorded and the batch moves on;
/// earlier moves are never undone.
pub async fn move_files_to_trash(store: Arc<dyn TrashStore>, paths: Vec<PathBuf>) -> RemovalReport {
    let mut outcomes = Vec::with_capacity(paths.len());

    for path in paths {
        let store = Arc::clone(&store);
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || trash_path(store.as_ref(), &target))
            .await
            .unwrap_or_else(|e| Err(TrashFailure::Store(format!("task join: {}", e))));

        match &result {
            Ok(()) => log::info!("Moved to trash: {}", path.display()),
            Err(e) => log::warn!("Could not trash {}: {}", path.display(), e),
        }
        outcomes.push(TrashOutcome {
            path,
            error: result.err(),
        });
    }

    RemovalReport { outcomes }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallSummary {
    pub report: RemovalReport,
    pub outcome: RemovalOutcome,
}

/// Trashes the session's current selection and reconciles the registry.
///
/// The selection is copied before any path is touched. When the main bundle
/// is part of it the app is asked to quit first. The trash watch is paused
/// for the batch and re-armed by its hook. An archived record is also
/// written to `db` when one is given.
pub async fn uninstall_selection(
    session: &SharedSession,
    db: Option<&Arc<Mutex<Database>>>,
) -> AppResult<UninstallSummary> {
    let (plan, store, settings, hooks, sentinel) = {
        let mut session = session.lock().await;
        let plan = session
            .begin_removal()
            .ok_or_else(|| AppError::NotFound("Nothing selected".into()))?;
        (
            plan,
            session.trash_store(),
            session.settings().clone(),
            session.hooks().to_vec(),
            session.sentinel().cloned(),
        )
    };

    let identity = plan.profile.identity.clone();
    let bundle = identity.bundle_root();
    if settings.quit_running_app && plan.paths.contains(&bundle) {
        let bundle_id = identity.bundle_id.clone();
        let quit = tokio::task::spawn_blocking(move || quit_app_gracefully(&bundle, &bundle_id))
            .await
            .unwrap_or(false);
        if !quit {
            log::warn!("{} may still be running", identity.display_name);
        }
    }

    let sentinel_was_active = sentinel.as_ref().is_some_and(|s| s.stop());
    let report = move_files_to_trash(store, plan.paths.clone()).await;

    let outcome = session.lock().await.finish_removal(plan, &report);

    if let (Some(record), Some(db)) = (&outcome.record, db) {
        if let Err(e) = db.lock().await.record_trashed(record) {
            log::warn!("Failed to persist trash record: {}", e);
        }
    }

    let ctx = HookContext {
        bundle_removed: report.was_moved(&identity.bundle_root()),
        identity,
        sentinel_was_active,
    };
    drop(spawn_hooks(&hooks, &settings, ctx));

    Ok(UninstallSummary { report, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::trash::fakes::RecordingTrash;
    use std::fs;

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A");
        let b = dir.path().join("B");
        let c = dir.path().join("C");
        for p in [&a, &b, &c] {
            fs::write(p, "x").unwrap();
        }
        let store = Arc::new(RecordingTrash::new(dir.path().join("bin")).refusing(b.clone()));

        let report = move_files_to_trash(store.clone(), vec![a.clone(), b.clone(), c.clone()]).await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.moved(), vec![a.as_path(), c.as_path()]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, b.as_path());
        assert!(matches!(failed[0].1, TrashFailure::PermissionDenied(_)));
        assert!(!report.all_succeeded());
        assert_eq!(store.moved(), vec![a.clone(), c.clone()]);
        assert!(!a.exists() && b.exists() && !c.exists());
    }

    #[tokio::test]
    async fn missing_and_trashed_paths_are_rejected_before_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let in_trash = dir.path().join(".Trash/old.plist");
        fs::create_dir_all(in_trash.parent().unwrap()).unwrap();
        fs::write(&in_trash, "x").unwrap();
        let missing = dir.path().join("gone");
        let store = Arc::new(RecordingTrash::new(dir.path().join("bin")));

        let report = move_files_to_trash(store.clone(), vec![missing.clone(), in_trash.clone()]).await;

        assert_eq!(report.outcomes[0].error, Some(TrashFailure::Missing));
        assert_eq!(report.outcomes[1].error, Some(TrashFailure::InsideTrash));
        assert!(store.moved().is_empty());
        assert!(in_trash.exists());
    }

    #[tokio::test]
    async fn empty_batch_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingTrash::new(dir.path().join("bin")));
        let report = move_files_to_trash(store, Vec::new()).await;
        assert!(report.outcomes.is_empty());
        assert!(report.all_succeeded());
    }

    #[cfg(unix)]
    #[test]
    fn filesystem_root_is_refused_as_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingTrash::new(dir.path().join("bin"));
        assert_eq!(trash_path(&store, Path::new("/")), Err(TrashFailure::MountPoint));
    }
}
