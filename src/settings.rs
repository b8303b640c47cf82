//! Harvest settings
//!
//! Settings are plain values read once at the start of a harvest. They are
//! persisted as camelCase JSON so a file written by an older release keeps
//! loading: missing keys fall back to their defaults.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Directory name under the platform config/cache directories
const APP_DIR: &str = "wp-harvest";

pub const DEFAULT_PER_PAGE_LIMIT: usize = 1000;
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 3600;

/// User-configurable harvest settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Check every item URL with a HEAD request and drop dead ones
    pub validate_urls: bool,
    /// Ceiling on items harvested per content type
    pub per_page_limit: usize,
    /// Read and write the per-content-type cache
    pub enable_cache: bool,
    /// Cache entry lifetime in seconds
    pub cache_expiry: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            validate_urls: false,
            per_page_limit: DEFAULT_PER_PAGE_LIMIT,
            enable_cache: true,
            cache_expiry: DEFAULT_CACHE_EXPIRY_SECS,
        }
    }
}

impl Settings {
    /// Per-page limit, never below one
    pub fn effective_per_page_limit(&self) -> usize {
        self.per_page_limit.max(1)
    }

    /// Identifies which settings produced a cached result
    pub fn fingerprint(&self) -> SettingsFingerprint {
        SettingsFingerprint {
            per_page_limit: self.effective_per_page_limit(),
            validate_urls: self.validate_urls,
        }
    }

    /// Cache switch and TTL derived from these settings
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            enabled: self.enable_cache,
            ttl: Duration::from_secs(self.cache_expiry),
        }
    }
}

/// The part of [`Settings`] that changes harvest output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFingerprint {
    pub per_page_limit: usize,
    pub validate_urls: bool,
}

impl fmt::Display for SettingsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.per_page_limit, self.validate_urls)
    }
}

/// Whether and how long harvest results are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Settings::default().cache_policy()
    }
}

/// Supplies settings to the harvester
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Current settings; failures degrade to defaults
    async fn load(&self) -> Settings;
}

#[async_trait]
impl SettingsProvider for Settings {
    async fn load(&self) -> Settings {
        self.clone()
    }
}

/// Settings persisted in a JSON file
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// Settings stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` in the platform config directory
    pub fn default_location() -> Self {
        Self::new(default_config_dir().join("settings.json"))
    }

    /// Location of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, failing on I/O or parse errors
    pub async fn read(&self) -> Result<Settings> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the settings atomically (temp file + rename)
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        crate::storage::write_atomic(&self.path, json.as_bytes()).await?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for SettingsFile {
    async fn load(&self) -> Settings {
        match self.read().await {
            Ok(settings) => settings,
            Err(crate::Error::Storage(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load settings, using defaults");
                Settings::default()
            }
        }
    }
}

/// Platform configuration directory for wp-harvest
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Platform cache directory for wp-harvest
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}
