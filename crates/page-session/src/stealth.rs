//! Fingerprint profiles applied before navigation.
//!
//! Retail sites gate their stock endpoints behind bot heuristics, so each run
//! picks one desktop Chrome profile and presents it consistently: the HTTP
//! user agent, the navigator surface, and the `webdriver` flag all agree.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

#[derive(Clone, Debug)]
pub struct FingerprintProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub platform: &'static str,
    pub accept_language: &'static str,
    pub languages: &'static [&'static str],
    pub hardware_concurrency: u32,
    pub device_memory: u32,
}

static CATALOG: Lazy<Vec<FingerprintProfile>> = Lazy::new(|| {
    vec![
        FingerprintProfile {
            name: "chrome-win10",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            platform: "Win32",
            accept_language: "en-AU,en;q=0.9",
            languages: &["en-AU", "en"],
            hardware_concurrency: 8,
            device_memory: 8,
        },
        FingerprintProfile {
            name: "chrome-win11",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
            platform: "Win32",
            accept_language: "en-AU,en-US;q=0.9,en;q=0.8",
            languages: &["en-AU", "en-US", "en"],
            hardware_concurrency: 12,
            device_memory: 16,
        },
        FingerprintProfile {
            name: "chrome-macos",
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
            platform: "MacIntel",
            accept_language: "en-AU,en;q=0.9",
            languages: &["en-AU", "en"],
            hardware_concurrency: 10,
            device_memory: 8,
        },
    ]
});

impl FingerprintProfile {
    pub fn catalog() -> &'static [FingerprintProfile] {
        &CATALOG
    }

    /// Pick one profile for the lifetime of a session.
    pub fn pick() -> FingerprintProfile {
        CATALOG
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| CATALOG[0].clone())
    }

    /// Script injected on every new document before any page script runs.
    pub fn init_script(&self) -> String {
        let languages = serde_json::to_string(self.languages).unwrap_or_else(|_| "[]".into());
        format!(
            r#"Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
Object.defineProperty(navigator, 'platform', {{ get: () => '{platform}' }});
Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});
Object.defineProperty(navigator, 'hardwareConcurrency', {{ get: () => {cores} }});
Object.defineProperty(navigator, 'deviceMemory', {{ get: () => {memory} }});
window.chrome = window.chrome || {{ runtime: {{}} }};"#,
            platform = self.platform,
            languages = languages,
            cores = self.hardware_concurrency,
            memory = self.device_memory,
        )
    }
}
