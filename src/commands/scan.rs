use crate::commands::session::SharedSession;
use crate::discovery::{ProgressFn, ScanResult};
use crate::models::ApplicationIdentity;

/// Scans `identity` and commits the result to the session.
///
/// The session lock is only held to start and to commit, never across the
/// walk. Returns the result together with whether it was committed; a
/// result overtaken by a newer scan is returned but not installed.
pub async fn scan_app(
    session: &SharedSession,
    identity: ApplicationIdentity,
    on_progress: Option<ProgressFn>,
) -> (ScanResult, bool) {
    let handle = session.lock().await.scan(identity, on_progress);
    let result = handle.wait().await;
    let committed = session.lock().await.commit_scan(result.clone());
    (result, committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::session::Session;
    use crate::discovery::{AppPathFinder, DiskInfoProvider, PathCatalog, RootScope, RootSpec};
    use crate::models::SweepSettings;
    use crate::platform::trash::fakes::RecordingTrash;
    use std::sync::Arc;

    #[tokio::test]
    async fn scan_app_commits_latest_result() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = dir.path().join("Preferences");
        std::fs::create_dir_all(&prefs).unwrap();
        std::fs::write(prefs.join("com.foo.myapp.plist"), "x").unwrap();

        let settings = SweepSettings::default();
        let finder = AppPathFinder::new(
            PathCatalog::new(vec![RootSpec::new(&prefs, RootScope::Any, 1)]),
            Arc::new(DiskInfoProvider::without_icons()),
            &settings,
        );
        let session = Session::new(
            settings,
            finder,
            Arc::new(RecordingTrash::new(dir.path().join("bin"))),
        )
        .into_shared();
        let identity = ApplicationIdentity::new("com.foo.myapp", "MyApp", dir.path().join("MyApp.app"));

        let (result, committed) = scan_app(&session, identity, None).await;

        assert!(committed);
        assert_eq!(result.profile.files().len(), 1);
        assert_eq!(session.lock().await.current().files(), result.profile.files());
    }
}
