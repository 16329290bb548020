//! Chromium executable discovery.
//!
//! Resolution order: `STOCKWATCH_CHROME` override, then `PATH` lookup, then
//! well-known OS install locations.

use std::env;
use std::path::PathBuf;

use which::which;

const CHROME_ENV: &str = "STOCKWATCH_CHROME";

pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var(CHROME_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    let root = PathBuf::from(trimmed);
                    paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                    paths.push(root.join("Chromium/Application/chrome.exe"));
                }
            }
        }
        paths
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn env_override_wins() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();

        let original = env::var(CHROME_ENV).ok();
        env::set_var(CHROME_ENV, exe_path.to_string_lossy().to_string());
        let detected = detect_chrome_executable();
        if let Some(value) = original {
            env::set_var(CHROME_ENV, value);
        } else {
            env::remove_var(CHROME_ENV);
        }

        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn missing_override_path_is_ignored() {
        let original = env::var(CHROME_ENV).ok();
        env::set_var(CHROME_ENV, "/definitely/not/a/browser");
        let detected = detect_chrome_executable();
        if let Some(value) = original {
            env::set_var(CHROME_ENV, value);
        } else {
            env::remove_var(CHROME_ENV);
        }

        // Either nothing is installed or a real system browser was found;
        // the bogus override must not leak through.
        if let Some(path) = detected {
            assert_ne!(path, PathBuf::from("/definitely/not/a/browser"));
        }
    }
}
