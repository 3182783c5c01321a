use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use crate::utils::sanitize::canonical_name;

static BREW_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Returns the absolute path to the `brew` binary, resolved once and cached.
///
/// Checks well-known locations first (works when launched with a minimal PATH),
/// then falls back to `which brew` for non-standard installs.
pub fn brew_path() -> Option<&'static PathBuf> {
    BREW_PATH
        .get_or_init(|| {
            // Apple Silicon
            let apple_silicon = PathBuf::from("/opt/homebrew/bin/brew");
            if apple_silicon.exists() {
                log::info!("Found brew at {}", apple_silicon.display());
                return Some(apple_silicon);
            }

            // Intel Mac
            let intel = PathBuf::from("/usr/local/bin/brew");
            if intel.exists() {
                log::info!("Found brew at {}", intel.display());
                return Some(intel);
            }

            if let Ok(output) = Command::new("/usr/bin/which")
                .current_dir(std::env::temp_dir())
                .arg("brew")
                .output()
            {
                if output.status.success() {
                    let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path_str.is_empty() {
                        let path = PathBuf::from(&path_str);
                        if path.exists() {
                            log::info!("Found brew via which: {}", path.display());
                            return Some(path);
                        }
                    }
                }
            }

            log::debug!("Homebrew not found on this system");
            None
        })
        .as_ref()
}

/// Guess the cask token Homebrew would use for an app name.
///
/// Casks are lower-case and hyphenated (`Visual Studio Code` ->
/// `visual-studio-code`), so each word is canonicalized on its own and the
/// non-empty pieces joined with `-`.
pub fn cask_token_for(app_name: &str) -> Option<String> {
    let token = app_name
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(canonical_name)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cask_token_is_hyphenated_lowercase() {
        assert_eq!(cask_token_for("Visual Studio Code").as_deref(), Some("visual-studio-code"));
        assert_eq!(cask_token_for("iTerm2").as_deref(), Some("iterm2"));
        assert_eq!(cask_token_for("Foo_Bar-Baz").as_deref(), Some("foo-bar-baz"));
    }

    #[test]
    fn cask_token_empty_name() {
        assert_eq!(cask_token_for("  ...  "), None);
    }
}
