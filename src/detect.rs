//! WordPress site detection
//!
//! Detection walks an ordered list of strategies and stops at the first one
//! that succeeds: the three REST entry points WordPress can be mounted under,
//! then a scan of the homepage markup for WordPress fingerprints. Probe
//! failures of any kind only mean "try the next strategy".

use crate::http;
use crate::origin::Origin;
use regex::RegexSet;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Case-insensitive markup fingerprints of a WordPress site
const WP_MARKUP_INDICATORS: &[&str] = &[
    r"(?i)wp-content",
    r"(?i)wp-includes",
    r"(?i)wordpress",
    r"(?i)wp-json",
    r"(?i)generator.*wordpress",
];

static MARKUP_INDICATORS: LazyLock<Option<RegexSet>> =
    LazyLock::new(|| RegexSet::new(WP_MARKUP_INDICATORS).ok());

/// Where the REST API is mounted on a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiPrefix {
    /// `/wp-json/` (pretty permalinks)
    WpJson,
    /// `/index.php/wp-json/` (PATHINFO permalinks)
    IndexPhp,
    /// `/?rest_route=/` (plain permalinks)
    RestRoute,
}

impl ApiPrefix {
    /// All mount points, most common first
    pub const ALL: [ApiPrefix; 3] = [Self::WpJson, Self::IndexPhp, Self::RestRoute];

    /// Path (and query) the REST root is served under
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WpJson => "/wp-json/",
            Self::IndexPhp => "/index.php/wp-json/",
            Self::RestRoute => "/?rest_route=/",
        }
    }

    /// URL of a REST route (e.g. `wp/v2/types`) under this prefix
    ///
    /// Further query parameters can be appended to the returned URL with
    /// `query_pairs_mut` for every prefix style.
    pub fn endpoint(&self, origin: &Origin, route: &str) -> Url {
        let route = route.trim_start_matches('/');
        let mut url = origin.url().clone();
        match self {
            Self::WpJson | Self::IndexPhp => {
                url.set_path(&format!("{}{}", self.as_str(), route));
            }
            Self::RestRoute => {
                url.set_path("/");
                url.query_pairs_mut()
                    .append_pair("rest_route", &format!("/{}", route));
            }
        }
        url
    }
}

impl fmt::Display for ApiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of recognising a WordPress site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    /// GET a REST entry point and expect a 2xx JSON document
    RestEntryPoint(ApiPrefix),
    /// Scan the homepage HTML for WordPress fingerprints
    Markup,
}

/// Strategies in the order they are tried
pub const DETECTION_STRATEGIES: [DetectionStrategy; 4] = [
    DetectionStrategy::RestEntryPoint(ApiPrefix::WpJson),
    DetectionStrategy::RestEntryPoint(ApiPrefix::IndexPhp),
    DetectionStrategy::RestEntryPoint(ApiPrefix::RestRoute),
    DetectionStrategy::Markup,
];

/// Outcome of detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// REST API answered under this prefix
    RestApi(ApiPrefix),
    /// Markup looks like WordPress but no REST entry point answered
    MarkupOnly,
    NotWordPress,
}

impl Detection {
    /// True for both REST and markup-only detections
    pub fn is_wordpress(&self) -> bool {
        !matches!(self, Self::NotWordPress)
    }

    /// Prefix for REST requests; present only for [`Detection::RestApi`]
    pub fn api_prefix(&self) -> Option<ApiPrefix> {
        match self {
            Self::RestApi(prefix) => Some(*prefix),
            _ => None,
        }
    }
}

/// Determines whether an origin runs WordPress
#[derive(Debug, Clone)]
pub struct SiteDetector {
    client: Client,
}

impl SiteDetector {
    /// Detector sending its probes through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Run the strategies in order until one recognises the site
    pub async fn detect(&self, origin: &Origin) -> Detection {
        debug!(%origin, "starting WordPress detection");

        for strategy in DETECTION_STRATEGIES {
            if let Some(detection) = self.try_strategy(strategy, origin).await {
                debug!(%origin, ?detection, "WordPress detected");
                return detection;
            }
        }

        debug!(%origin, "no WordPress indicators found");
        Detection::NotWordPress
    }

    async fn try_strategy(&self, strategy: DetectionStrategy, origin: &Origin) -> Option<Detection> {
        match strategy {
            DetectionStrategy::RestEntryPoint(prefix) => self
                .probe_rest(origin, prefix)
                .await
                .then_some(Detection::RestApi(prefix)),
            DetectionStrategy::Markup => self
                .probe_markup(origin)
                .await
                .then_some(Detection::MarkupOnly),
        }
    }

    /// Whether the entry point answers with a JSON document
    async fn probe_rest(&self, origin: &Origin, prefix: ApiPrefix) -> bool {
        let url = prefix.endpoint(origin, "");
        match http::fetch_json::<serde_json::Value>(&self.client, &url).await {
            Ok(_) => {
                debug!(%prefix, "found working REST API path");
                true
            }
            Err(e) => {
                debug!(%prefix, error = %e, "REST entry point probe failed");
                false
            }
        }
    }

    /// Whether the homepage carries any WordPress fingerprint
    async fn probe_markup(&self, origin: &Origin) -> bool {
        let html = match http::fetch_text(&self.client, origin.url()).await {
            Ok(html) => html,
            Err(e) => {
                debug!(error = %e, "homepage check failed");
                return false;
            }
        };

        let found = markup_indicators(&html);
        debug!(indicators = ?found, "WordPress indicators found in HTML");
        !found.is_empty()
    }
}

/// Indicators present in `html`
fn markup_indicators(html: &str) -> Vec<&'static str> {
    let Some(set) = MARKUP_INDICATORS.as_ref() else {
        return Vec::new();
    };
    set.matches(html)
        .into_iter()
        .map(|i| WP_MARKUP_INDICATORS[i].trim_start_matches("(?i)"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin::parse("https://example.com").unwrap()
    }

    #[test]
    fn endpoints_for_path_prefixes() {
        assert_eq!(
            ApiPrefix::WpJson.endpoint(&origin(), "wp/v2/types").as_str(),
            "https://example.com/wp-json/wp/v2/types"
        );
        assert_eq!(
            ApiPrefix::IndexPhp.endpoint(&origin(), "wp/v2/posts").as_str(),
            "https://example.com/index.php/wp-json/wp/v2/posts"
        );
        assert_eq!(
            ApiPrefix::WpJson.endpoint(&origin(), "").as_str(),
            "https://example.com/wp-json/"
        );
    }

    #[test]
    fn rest_route_endpoint_uses_query() {
        let url = ApiPrefix::RestRoute.endpoint(&origin(), "wp/v2/types");
        assert_eq!(url.path(), "/");
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "rest_route");
        assert_eq!(pairs[0].1, "/wp/v2/types");
    }

    #[test]
    fn endpoint_accepts_extra_query_pairs() {
        let mut url = ApiPrefix::RestRoute.endpoint(&origin(), "wp/v2/posts");
        url.query_pairs_mut().append_pair("per_page", "100");
        let pairs: Vec<_> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(
            pairs,
            vec![
                ("rest_route".to_string(), "/wp/v2/posts".to_string()),
                ("per_page".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn strategy_order() {
        assert_eq!(
            DETECTION_STRATEGIES[0],
            DetectionStrategy::RestEntryPoint(ApiPrefix::WpJson)
        );
        assert_eq!(DETECTION_STRATEGIES[3], DetectionStrategy::Markup);
    }

    #[test]
    fn detection_prefix_only_with_rest_api() {
        assert_eq!(
            Detection::RestApi(ApiPrefix::IndexPhp).api_prefix(),
            Some(ApiPrefix::IndexPhp)
        );
        assert!(Detection::MarkupOnly.is_wordpress());
        assert_eq!(Detection::MarkupOnly.api_prefix(), None);
        assert!(!Detection::NotWordPress.is_wordpress());
    }

    #[test]
    fn markup_indicators_are_case_insensitive() {
        let html = r#"<link rel="stylesheet" href="/WP-CONTENT/themes/x/style.css">"#;
        assert_eq!(markup_indicators(html), vec!["wp-content"]);
    }

    #[test]
    fn generator_meta_matches() {
        let html = r#"<meta name="generator" content="WordPress 6.4.2" />"#;
        let found = markup_indicators(html);
        assert!(found.contains(&"wordpress"));
        assert!(found.contains(&"generator.*wordpress"));
    }

    #[test]
    fn plain_html_has_no_indicators() {
        assert!(markup_indicators("<html><body>Hello Drupal</body></html>").is_empty());
    }
}
