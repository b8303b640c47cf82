//! Per-content-type result cache
//!
//! Entries are keyed by origin, settings fingerprint and content type, so a
//! result harvested under one configuration is never served under another.
//! Expired entries are removed lazily when read. Storage failures never fail
//! a harvest: reads degrade to misses and writes to no-ops.

use crate::error::Result;
use crate::model::SectionResult;
use crate::origin::Origin;
use crate::settings::{CachePolicy, SettingsFingerprint};
use crate::storage::KeyValueStore;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reserved prefix of every key this cache owns
pub const CACHE_KEY_PREFIX: &str = "cache_";

/// Stored form of a cached section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: SectionResult,
    pub timestamp: DateTime<Utc>,
    pub origin: String,
    pub content_type: String,
    pub settings: SettingsFingerprint,
}

impl CacheEntry {
    fn is_expired(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        match self.timestamp.checked_add_signed(ttl) {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}

/// Introspection figures for the cache namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Entries owned by the cache
    pub total_entries: usize,
    /// Bytes used by the whole storage area
    pub bytes_in_use: u64,
}

impl StoreStats {
    /// Storage size in MiB
    pub fn megabytes_in_use(&self) -> f64 {
        self.bytes_in_use as f64 / 1024.0 / 1024.0
    }
}

/// Build the storage key for one cached section
///
/// Any character outside `[A-Za-z0-9_]` is replaced with `_`.
pub fn cache_key(origin: &Origin, fingerprint: &SettingsFingerprint, content_type: &str) -> String {
    let raw = format!(
        "{}{}_{}_{}_{}",
        CACHE_KEY_PREFIX,
        origin.as_str(),
        fingerprint.per_page_limit,
        fingerprint.validate_urls,
        content_type
    );
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Cache of harvested sections on top of a [`KeyValueStore`]
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    policy: CachePolicy,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Cache over `store`, governed by `policy`
    pub fn new(store: Arc<dyn KeyValueStore>, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    /// Whether the cache is enabled and how long entries live
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up a cached section; `None` on miss, expiry, or storage failure
    pub async fn get(
        &self,
        origin: &Origin,
        content_type: &str,
        fingerprint: &SettingsFingerprint,
    ) -> Option<SectionResult> {
        if !self.policy.enabled {
            return None;
        }

        let key = cache_key(origin, fingerprint, content_type);
        let value = match self.store.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(%origin, content_type, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(%origin, content_type, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%origin, content_type, error = %e, "unreadable cache entry, discarding");
                self.evict(&key).await;
                return None;
            }
        };

        if entry.origin != origin.as_str()
            || entry.content_type != content_type
            || entry.settings != *fingerprint
        {
            debug!(%origin, content_type, key = %key, "cache key collision, treating as miss");
            return None;
        }

        let now = Utc::now();
        let age = (now - entry.timestamp).num_seconds();
        if entry.is_expired(self.policy.ttl, now) {
            debug!(%origin, content_type, age_secs = age, "cache entry expired");
            self.evict(&key).await;
            return None;
        }

        debug!(%origin, content_type, age_secs = age, "cache hit");
        Some(entry.data)
    }

    /// Store a section, replacing any previous entry for the same key
    pub async fn put(
        &self,
        origin: &Origin,
        content_type: &str,
        fingerprint: &SettingsFingerprint,
        result: &SectionResult,
    ) {
        if !self.policy.enabled {
            return;
        }

        let key = cache_key(origin, fingerprint, content_type);
        let entry = CacheEntry {
            data: result.clone(),
            timestamp: Utc::now(),
            origin: origin.as_str().to_string(),
            content_type: content_type.to_string(),
            settings: *fingerprint,
        };

        let written = match serde_json::to_value(&entry) {
            Ok(value) => self.store.set(&key, value).await,
            Err(e) => Err(e.into()),
        };
        match written {
            Ok(()) => debug!(%origin, content_type, items = result.count, "cached section"),
            Err(e) => warn!(%origin, content_type, error = %e, "cache write failed"),
        }
    }

    /// Remove every cache-owned entry, leaving other keys alone
    pub async fn clear_all(&self) -> Result<usize> {
        let keys = self.owned_keys().await?;
        if keys.is_empty() {
            debug!("no cached data to clear");
            return Ok(0);
        }
        let removed = self.store.remove(&keys).await?;
        debug!(removed, "cleared cache");
        Ok(removed)
    }

    /// Number of cache entries and the size of the whole storage area
    pub async fn stats(&self) -> Result<StoreStats> {
        let total_entries = self.owned_keys().await?.len();
        let bytes_in_use = self.store.bytes_in_use().await?;
        Ok(StoreStats {
            total_entries,
            bytes_in_use,
        })
    }

    async fn owned_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(CACHE_KEY_PREFIX))
            .collect())
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(&[key.to_string()]).await {
            warn!(key, error = %e, "failed to remove cache entry");
        }
    }
}
