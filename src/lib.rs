//! WP Harvest - collect every public URL of a WordPress site
//!
//! Discovers a site's REST API, enumerates the content types it exposes,
//! paginates through each of them and caches the results per content type.
//!
//! # Example
//!
//! ```no_run
//! use wp_harvest::{Harvester, Origin};
//!
//! #[tokio::main]
//! async fn main() -> wp_harvest::Result<()> {
//!     let harvester = Harvester::new()?;
//!     let origin = Origin::parse("https://example.com")?;
//!     let result = harvester.harvest(&origin).await?;
//!     for section in &result.sections {
//!         println!("{}: {} URLs", section.content_type, section.count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod detect;
pub mod error;
pub mod harvest;
pub mod http;
pub mod model;
pub mod origin;
pub mod output;
pub mod paginate;
pub mod settings;
pub mod status;
pub mod storage;
pub mod validate;

pub use cache::{CACHE_KEY_PREFIX, CacheEntry, CacheStore, StoreStats, cache_key};
pub use detect::{ApiPrefix, DETECTION_STRATEGIES, Detection, DetectionStrategy, SiteDetector};
pub use error::{Error, Result};
pub use harvest::{HarvestSession, Harvester, HarvesterBuilder};
pub use model::{CacheStats, ContentTypeDescriptor, HarvestResult, Item, RawItem, SectionResult};
pub use origin::Origin;
pub use output::{OutputFormat, format_url_list, output_cache_stats, output_harvest};
pub use paginate::{Paginator, WP_MAX_PER_PAGE};
pub use settings::{CachePolicy, Settings, SettingsFile, SettingsFingerprint, SettingsProvider};
pub use status::{LogStatus, NoStatus, StatusSink};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use validate::UrlValidator;
