use std::path::Path;

use crate::models::TrashFailure;

/// Where removed paths go. Moves must be recoverable; nothing here deletes.
pub trait TrashStore: Send + Sync {
    fn move_to_trash(&self, path: &Path) -> Result<(), TrashFailure>;
}

/// The platform trash, via the `trash` crate. On macOS a refused move is
/// retried through Finder, which can prompt for admin rights.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashStore for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> Result<(), TrashFailure> {
        match trash::delete(path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = e.to_string();
                log::debug!("trash::delete failed for {}: {}", path.display(), msg);

                #[cfg(target_os = "macos")]
                {
                    match finder_move_to_trash(path) {
                        Ok(()) => return Ok(()),
                        Err(finder_err) => log::debug!(
                            "Finder fallback failed for {}: {}",
                            path.display(),
                            finder_err
                        ),
                    }
                }

                if msg.to_lowercase().contains("permission") {
                    Err(TrashFailure::PermissionDenied(msg))
                } else {
                    Err(TrashFailure::Store(msg))
                }
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn finder_move_to_trash(path: &Path) -> Result<(), String> {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    let script = format!(
        "tell application \"Finder\" to delete (POSIX file \"{}\" as alias)",
        escaped
    );
    let output = std::process::Command::new("osascript")
        .current_dir(std::env::temp_dir())
        .args(["-e", &script])
        .output()
        .map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// True when `path` is the root of a mounted volume.
#[cfg(unix)]
pub fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if !meta.is_dir() {
        return false;
    }
    match path.parent() {
        None => true,
        Some(parent) if parent.as_os_str().is_empty() => false,
        Some(parent) => match std::fs::metadata(parent) {
            Ok(parent_meta) => parent_meta.dev() != meta.dev(),
            Err(_) => false,
        },
    }
}

#[cfg(not(unix))]
pub fn is_mount_point(path: &Path) -> bool {
    path.parent().is_none()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_a_mount_point() {
        assert!(is_mount_point(Path::new("/")));
    }

    #[test]
    fn plain_directories_are_not_mount_points() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        assert!(!is_mount_point(&sub));
        assert!(!is_mount_point(&dir.path().join("missing")));
    }
}
