use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::dates;
use crate::state::carousel::CarouselOptions;

const APP_DIR: &str = "apod-viewer";
const CONFIG_FILE: &str = "config.json";

/// How the archive credential is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Stored key, asking the user when there is none
    #[default]
    Prompt,
    /// Public demo key, nothing stored
    Demo,
}

impl FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(Self::Prompt),
            "demo" => Ok(Self::Demo),
            other => Err(format!("unknown credential mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive_url: String,
    pub credential_mode: CredentialMode,
    pub demo_key: String,
    /// Directory scanned for placeholder images
    pub fallback_dir: PathBuf,
    pub startup_window_years: u32,
    pub archive_launch: NaiveDate,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_url: "https://api.nasa.gov/planetary/apod".to_string(),
            credential_mode: CredentialMode::Prompt,
            demo_key: "DEMO_KEY".to_string(),
            fallback_dir: PathBuf::from("assets/fallback"),
            startup_window_years: 5,
            archive_launch: dates::archive_launch(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Config file, then environment overrides; defaults when neither is usable
    ///
    /// A missing file is created with the defaults so users have one to edit.
    pub fn load() -> Self {
        let path = Self::config_path();
        let config = match path.as_deref() {
            Some(path) if path.exists() => Self::from_file(path).unwrap_or_default(),
            _ => {
                let config = Self::default();
                if let Err(e) = config.save() {
                    log::warn!("Could not write default config: {}", e);
                }
                config
            }
        };
        config.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => {
                log::debug!("Loaded configuration from {}", path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Apply `APOD_*` variables looked up through `var`
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("APOD_ARCHIVE_URL") {
            self.archive_url = url;
        }
        if let Some(mode) = var("APOD_CREDENTIAL_MODE") {
            match mode.parse() {
                Ok(mode) => self.credential_mode = mode,
                Err(e) => log::warn!("Ignoring APOD_CREDENTIAL_MODE: {}", e),
            }
        }
        if let Some(dir) = var("APOD_FALLBACK_DIR") {
            self.fallback_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join(APP_DIR);
            std::fs::create_dir_all(&app_dir)?;
            let content = serde_json::to_string_pretty(self)?;
            std::fs::write(app_dir.join(CONFIG_FILE), content)?;
        }
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn carousel_options(&self) -> CarouselOptions {
        CarouselOptions {
            startup_window_years: self.startup_window_years,
            archive_launch: self.archive_launch,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
