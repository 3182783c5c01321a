use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::utils::{path_hash, plist_parser};

/// Render an icon for a discovered path into `output_dir` as a 128px PNG.
///
/// Application bundles go through the full chain:
/// 1. `sips` on the bundle's `CFBundleIconFile`
/// 2. `sips` on any `.icns` in `Contents/Resources/`
/// 3. `qlmanage` thumbnail
///
/// Other paths only get the `qlmanage` step, and only when `thumbnail_all`
/// is set. Output files are named by a hash of the source path so repeat
/// scans reuse them.
pub fn extract_icon_png(path: &Path, output_dir: &Path, thumbnail_all: bool) -> Option<PathBuf> {
    let is_bundle = is_app_bundle(path);
    if !is_bundle && !thumbnail_all {
        return None;
    }

    let key = path_hash(path);
    let output_path = output_dir.join(format!("{}.png", key));
    if output_path.exists() {
        log::debug!("Icon already cached for {}", path.display());
        return Some(output_path);
    }

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        log::debug!("Cannot create icon cache {}: {}", output_dir.display(), e);
        return None;
    }

    if is_bundle {
        if let Some(found) = try_sips_cfbundle_icon_file(path, &output_path, &key) {
            return Some(found);
        }
        if let Some(found) = try_glob_icns(path, &output_path, &key) {
            return Some(found);
        }
    }

    if let Some(found) = try_qlmanage(path, &output_path, &key) {
        return Some(found);
    }

    log::debug!("No icon could be rendered for {}", path.display());
    None
}

fn is_app_bundle(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("app")) && path.is_dir()
}

fn try_sips_cfbundle_icon_file(app_path: &Path, output_path: &Path, key: &str) -> Option<PathBuf> {
    let dict = plist_parser::read_info_plist(app_path).ok()?;
    // CFBundleIconName points into an asset catalog, which sips can't read.
    let icon_name = plist_parser::get_string(&dict, "CFBundleIconFile")?;

    let mut icon_path = app_path.join("Contents/Resources").join(&icon_name);
    if icon_path.extension().is_none() {
        icon_path.set_extension("icns");
    }

    if !icon_path.exists() {
        log::debug!("[{}] CFBundleIconFile '{}' not found at {}", key, icon_name, icon_path.display());
        return None;
    }

    convert_icns_with_sips(&icon_path, output_path, key)
}

fn try_glob_icns(app_path: &Path, output_path: &Path, key: &str) -> Option<PathBuf> {
    let resources_dir = app_path.join("Contents/Resources");
    let mut icns: Vec<PathBuf> = std::fs::read_dir(&resources_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("icns")))
        .collect();

    if icns.is_empty() {
        log::debug!("[{}] No .icns files in {}", key, resources_dir.display());
        return None;
    }

    // AppIcon.icns wins, otherwise the first by name.
    icns.sort();
    let chosen = icns
        .iter()
        .find(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("AppIcon.icns"))
        })
        .unwrap_or(&icns[0]);

    convert_icns_with_sips(chosen, output_path, key)
}

fn try_qlmanage(path: &Path, output_path: &Path, key: &str) -> Option<PathBuf> {
    let tmp_dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            log::debug!("[{}] qlmanage: failed to create temp dir: {}", key, e);
            return None;
        }
    };

    let output = Command::new("qlmanage")
        .args([
            "-t",
            "-s",
            "128",
            "-o",
            &tmp_dir.path().to_string_lossy(),
            &path.to_string_lossy(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let png = std::fs::read_dir(tmp_dir.path())
                .ok()?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .find(|p| p.extension().is_some_and(|ext| ext == "png"))?;
            match std::fs::copy(&png, output_path) {
                Ok(_) => Some(output_path.to_path_buf()),
                Err(e) => {
                    log::debug!("[{}] qlmanage: copy failed: {}", key, e);
                    None
                }
            }
        }
        Ok(_) => {
            log::debug!("[{}] qlmanage exited with non-zero status", key);
            None
        }
        Err(e) => {
            log::debug!("[{}] qlmanage failed to execute: {}", key, e);
            None
        }
    }
}

fn convert_icns_with_sips(icns_path: &Path, output_path: &Path, key: &str) -> Option<PathBuf> {
    let output = Command::new("sips")
        .args([
            "-s",
            "format",
            "png",
            "-z",
            "128",
            "128",
            &icns_path.to_string_lossy(),
            "--out",
            &output_path.to_string_lossy(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => Some(output_path.to_path_buf()),
        Ok(_) => {
            log::debug!("[{}] sips failed for {}", key, icns_path.display());
            None
        }
        Err(e) => {
            log::debug!("[{}] sips command error: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_files_are_skipped_without_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(extract_icon_png(&file, &dir.path().join("icons"), false), None);
    }

    #[test]
    fn cached_png_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("Foo.app");
        std::fs::create_dir_all(&bundle).unwrap();
        let icons = dir.path().join("icons");
        std::fs::create_dir_all(&icons).unwrap();
        let cached = icons.join(format!("{}.png", path_hash(&bundle)));
        std::fs::write(&cached, b"png").unwrap();

        assert_eq!(extract_icon_png(&bundle, &icons, false), Some(cached));
    }
}
