//! Browser-backed implementations of the engine's target surface.

pub mod chromium;

use std::path::PathBuf;

pub use chromium::{ChromiumSurface, LaunchOptions};

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&std::path::Path>) -> Option<PathBuf> {
    // 1. --chrome flag or CRUMB_CHROMIUM_PATH, already resolved into `explicit`
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "configured browser binary does not exist");
    }

    // 2. ~/.crumb/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".crumb/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".crumb/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".crumb/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".crumb/chromium/chrome-linux64/chrome"),
                home.join(".crumb/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_binary_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(find_chromium(Some(&fake)), Some(fake));
    }

    #[test]
    fn test_missing_explicit_binary_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_ne!(find_chromium(Some(&missing)), Some(missing));
    }
}
