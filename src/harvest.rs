//! Harvest orchestration
//!
//! Drives the pipeline for one origin: detect WordPress, list content types,
//! then per type read the cache or fetch, optionally validate, and write the
//! result back. Only detection and the type listing can fail a harvest; a
//! failing content type is logged and skipped.

use crate::cache::CacheStore;
use crate::detect::{ApiPrefix, Detection, SiteDetector};
use crate::error::{Error, Result};
use crate::http;
use crate::model::{CacheStats, ContentTypeDescriptor, HarvestResult, Item, SectionResult, TypeInfo};
use crate::origin::Origin;
use crate::paginate::Paginator;
use crate::settings::{Settings, SettingsFingerprint, SettingsProvider};
use crate::status::{NoStatus, StatusSink};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::validate::UrlValidator;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// State owned by one in-flight harvest
#[derive(Debug, Clone)]
pub struct HarvestSession {
    pub origin: Origin,
    pub prefix: ApiPrefix,
    pub settings: Settings,
}

impl HarvestSession {
    /// Cache fingerprint of the session's settings
    pub fn fingerprint(&self) -> SettingsFingerprint {
        self.settings.fingerprint()
    }
}

/// What happened to one content type
#[derive(Debug)]
enum SectionOutcome {
    Cached(SectionResult),
    Fresh(SectionResult),
    /// Fetched, but nothing worth keeping
    Empty,
    Failed(Error),
}

/// Builder for configuring a [`Harvester`]
pub struct HarvesterBuilder {
    allow_private: bool,
    store: Option<Arc<dyn KeyValueStore>>,
    settings: Option<Arc<dyn SettingsProvider>>,
    status: Option<Arc<dyn StatusSink>>,
    initial_page_size: Option<usize>,
}

impl HarvesterBuilder {
    /// Builder with public-only origins and in-memory defaults
    pub fn new() -> Self {
        Self {
            allow_private: false,
            store: None,
            settings: None,
            status: None,
            initial_page_size: None,
        }
    }

    /// Allow harvesting private/internal IP addresses (localhost, 192.168.x.x, etc.)
    pub fn allow_private(mut self, allow: bool) -> Self {
        self.allow_private = allow;
        self
    }

    /// Storage area for the result cache (in-memory by default)
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Source of settings, read once per harvest (defaults otherwise)
    pub fn settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Receiver of progress text
    pub fn status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    /// See [`Paginator::with_initial_page_size`]
    pub fn initial_page_size(mut self, size: usize) -> Self {
        self.initial_page_size = Some(size);
        self
    }

    /// Build the harvester and its shared HTTP client
    pub fn build(self) -> Result<Harvester> {
        let client = http::build_client()?;

        let mut paginator = Paginator::new(client.clone());
        if let Some(size) = self.initial_page_size {
            paginator = paginator.with_initial_page_size(size);
        }

        Ok(Harvester {
            detector: SiteDetector::new(client.clone()),
            paginator,
            validator: UrlValidator::new(client.clone()),
            client,
            allow_private: self.allow_private,
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            settings: self.settings.unwrap_or_else(|| Arc::new(Settings::default())),
            status: self.status.unwrap_or_else(|| Arc::new(NoStatus)),
        })
    }
}

impl Default for HarvesterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Harvests every public content type of a WordPress site
pub struct Harvester {
    client: reqwest::Client,
    detector: SiteDetector,
    paginator: Paginator,
    validator: UrlValidator,
    allow_private: bool,
    store: Arc<dyn KeyValueStore>,
    settings: Arc<dyn SettingsProvider>,
    status: Arc<dyn StatusSink>,
}

impl Harvester {
    /// Harvester with default settings and an in-memory cache
    pub fn new() -> Result<Self> {
        HarvesterBuilder::new().build()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> HarvesterBuilder {
        HarvesterBuilder::new()
    }

    /// Cache view over this harvester's store with the given settings
    pub fn cache(&self, settings: &Settings) -> CacheStore {
        CacheStore::new(self.store.clone(), settings.cache_policy())
    }

    /// Run the whole pipeline for `origin`
    #[instrument(skip_all, fields(origin = %origin))]
    pub async fn harvest(&self, origin: &Origin) -> Result<HarvestResult> {
        if !self.allow_private {
            origin.ensure_public().await?;
        }

        self.status.set_status("Checking if site is WordPress...");
        let prefix = match self.detector.detect(origin).await {
            Detection::RestApi(prefix) => prefix,
            Detection::MarkupOnly => {
                return Err(Error::RestApiUnavailable {
                    origin: origin.to_string(),
                });
            }
            Detection::NotWordPress => {
                return Err(Error::NotWordPress {
                    origin: origin.to_string(),
                });
            }
        };
        info!(%prefix, "WordPress detected");

        self.status.set_status("WordPress detected! Fetching content types...");
        let content_types = self.fetch_content_types(origin, prefix).await?;

        let session = HarvestSession {
            origin: origin.clone(),
            prefix,
            settings: self.settings.load().await,
        };
        let cache = self.cache(&session.settings);
        debug!(
            content_types = content_types.len(),
            fingerprint = %session.fingerprint(),
            "harvesting"
        );

        let mut result = HarvestResult {
            sections: Vec::with_capacity(content_types.len()),
            cache_stats: CacheStats {
                total_content_types: content_types.len(),
                ..CacheStats::default()
            },
        };

        for content_type in &content_types {
            let outcome = self.harvest_section(&session, &cache, content_type).await;
            match outcome {
                SectionOutcome::Cached(section) => {
                    result.cache_stats.cached_count += 1;
                    result.sections.push(section);
                }
                SectionOutcome::Fresh(section) => {
                    result.cache_stats.fresh_count += 1;
                    result.sections.push(section);
                }
                SectionOutcome::Empty => {
                    result.cache_stats.fresh_count += 1;
                    debug!(content_type = %content_type.rest_base, "no items, skipping");
                }
                SectionOutcome::Failed(e) => {
                    result.cache_stats.fresh_count += 1;
                    warn!(content_type = %content_type.rest_base, error = %e, "content type failed, skipping");
                }
            }
        }

        info!(
            sections = result.sections.len(),
            urls = result.total_urls(),
            cached = result.cache_stats.cached_count,
            fresh = result.cache_stats.fresh_count,
            "harvest complete"
        );
        Ok(result)
    }

    /// Content types that expose a REST collection, in listing order
    ///
    /// Types sharing a `rest_base` collapse into the first one listed.
    pub async fn fetch_content_types(
        &self,
        origin: &Origin,
        prefix: ApiPrefix,
    ) -> Result<Vec<ContentTypeDescriptor>> {
        let url = prefix.endpoint(origin, "wp/v2/types");
        let listing: Map<String, Value> = http::fetch_json(&self.client, &url).await?;

        let mut descriptors = Vec::with_capacity(listing.len());
        let mut seen = HashSet::new();
        for (key, value) in listing {
            let info = match serde_json::from_value::<TypeInfo>(value) {
                Ok(info) => info,
                Err(e) => {
                    debug!(key = %key, error = %e, "unreadable type entry, skipping");
                    continue;
                }
            };
            let Some(rest_base) = info.rest_base() else {
                debug!(key = %key, "type has no REST collection, skipping");
                continue;
            };
            if !seen.insert(rest_base.to_string()) {
                debug!(key = %key, rest_base, "duplicate REST collection, skipping");
                continue;
            }
            let rest_base = rest_base.to_string();
            descriptors.push(ContentTypeDescriptor { key, rest_base });
        }
        Ok(descriptors)
    }

    async fn harvest_section(
        &self,
        session: &HarvestSession,
        cache: &CacheStore,
        content_type: &ContentTypeDescriptor,
    ) -> SectionOutcome {
        let rest_base = content_type.rest_base.as_str();
        let fingerprint = session.fingerprint();

        self.status
            .set_status(&format!("Checking cache for {}...", rest_base));
        if let Some(section) = cache.get(&session.origin, rest_base, &fingerprint).await {
            self.status.set_status(&format!(
                "Using cached {} ({} items)",
                rest_base, section.count
            ));
            return SectionOutcome::Cached(section);
        }

        match self.fetch_section(session, rest_base).await {
            Ok(Some(section)) => {
                cache
                    .put(&session.origin, rest_base, &fingerprint, &section)
                    .await;
                SectionOutcome::Fresh(section)
            }
            Ok(None) => SectionOutcome::Empty,
            Err(e) => SectionOutcome::Failed(e),
        }
    }

    /// Fetch and optionally validate one content type
    async fn fetch_section(
        &self,
        session: &HarvestSession,
        rest_base: &str,
    ) -> Result<Option<SectionResult>> {
        self.status.set_status(&format!("Fetching {}...", rest_base));
        let raw = self
            .paginator
            .fetch_all(
                &session.origin,
                session.prefix,
                rest_base,
                session.settings.effective_per_page_limit(),
            )
            .await?;

        let mut items: Vec<Item> = raw.into_iter().filter_map(Item::from_raw).collect();

        if session.settings.validate_urls && !items.is_empty() {
            self.status
                .set_status(&format!("Validating {} URLs for {}...", items.len(), rest_base));
            items = self.validator.validate_all(items, self.status.as_ref()).await;
        }

        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(SectionResult::new(rest_base, items)))
    }
}
