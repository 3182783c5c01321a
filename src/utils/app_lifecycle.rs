use std::path::Path;
use std::process::Command;

/// Check if an app is currently running by its bundle path.
pub fn is_app_running(app_path: &Path) -> bool {
    let output = Command::new("pgrep")
        .current_dir(std::env::temp_dir())
        .args(["-f", &app_path.to_string_lossy()])
        .output();
    match output {
        Ok(o) => o.status.success(),
        Err(_) => false,
    }
}

/// Quit an app gracefully via AppleScript, falling back to pkill if needed.
/// Returns true if the app was successfully quit (or wasn't running).
pub fn quit_app_gracefully(app_path: &Path, bundle_id: &str) -> bool {
    if !is_app_running(app_path) {
        return true;
    }

    if !bundle_id.is_empty() {
        let _ = Command::new("osascript")
            .current_dir(std::env::temp_dir())
            .args(["-e", &format!("tell application id \"{}\" to quit", bundle_id)])
            .output();

        std::thread::sleep(std::time::Duration::from_secs(3));

        if !is_app_running(app_path) {
            return true;
        }
    }

    log::info!("{} still running, sending pkill", app_path.display());
    let _ = Command::new("pkill")
        .current_dir(std::env::temp_dir())
        .args(["-f", &app_path.to_string_lossy()])
        .output();

    std::thread::sleep(std::time::Duration::from_millis(500));

    !is_app_running(app_path)
}
