//! Data carried through the harvest pipeline

use scraper::Html;
use serde::{Deserialize, Serialize};

/// A registered content type that exposes a REST collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeDescriptor {
    /// Key in the `wp/v2/types` listing (e.g. `post`)
    pub key: String,
    /// REST collection slug (e.g. `posts`)
    pub rest_base: String,
}

/// Entry of the `wp/v2/types` listing
#[derive(Debug, Deserialize)]
pub(crate) struct TypeInfo {
    #[serde(default)]
    pub rest_base: Option<serde_json::Value>,
}

impl TypeInfo {
    /// Collection slug, if the type is served over REST
    pub fn rest_base(&self) -> Option<&str> {
        match &self.rest_base {
            Some(serde_json::Value::String(base)) if !base.trim().is_empty() => Some(base.trim()),
            _ => None,
        }
    }
}

/// One resource as returned by a REST collection
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<RenderedField>,
}

/// `{ "rendered": "..." }` wrapper used by WordPress for HTML fields
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedField {
    #[serde(default)]
    pub rendered: String,
}

/// A harvested resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    /// Canonical permalink
    pub url: String,
    /// Plain-text title
    pub title: String,
}

impl Item {
    /// Convert a raw item, dropping it when it has no link
    pub fn from_raw(raw: RawItem) -> Option<Self> {
        let url = raw.link.filter(|link| !link.trim().is_empty())?;
        let title = raw
            .title
            .map(|t| plain_text(&t.rendered))
            .unwrap_or_default();

        Some(Self {
            id: raw.id,
            url,
            title,
        })
    }
}

/// Reduce rendered HTML to its text content
fn plain_text(rendered: &str) -> String {
    if !rendered.contains(['<', '&']) {
        return rendered.trim().to_string();
    }
    let fragment = Html::parse_fragment(rendered);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// All items harvested for one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    /// REST collection slug the items came from
    pub content_type: String,
    /// Always `items.len()`
    pub count: usize,
    pub items: Vec<Item>,
}

impl SectionResult {
    /// Section whose `count` matches `items`
    pub fn new(content_type: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            content_type: content_type.into(),
            count: items.len(),
            items,
        }
    }
}

/// How many content types were served from cache versus fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub cached_count: usize,
    pub fresh_count: usize,
    pub total_content_types: usize,
}

/// Terminal artifact of a harvest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestResult {
    pub sections: Vec<SectionResult>,
    pub cache_stats: CacheStats,
}

impl HarvestResult {
    /// Total number of URLs across all sections
    pub fn total_urls(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}
