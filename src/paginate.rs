//! Pagination over a REST collection

use crate::detect::ApiPrefix;
use crate::error::{Error, Result};
use crate::http;
use crate::model::RawItem;
use crate::origin::Origin;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Largest `per_page` stock WordPress accepts
pub const WP_MAX_PER_PAGE: usize = 100;

/// Page sizes at or below this are never reduced further
pub const MIN_RECOVERABLE_PAGE_SIZE: usize = 10;

/// Fetches every item of one content type, page by page
#[derive(Debug, Clone)]
pub struct Paginator {
    client: Client,
    initial_page_size: Option<usize>,
}

impl Paginator {
    /// Paginator starting at [`WP_MAX_PER_PAGE`] items per page
    pub fn new(client: Client) -> Self {
        Self {
            client,
            initial_page_size: None,
        }
    }

    /// Start with pages of `size` items instead of [`WP_MAX_PER_PAGE`]
    ///
    /// For sites that raised the collection limit. A server that rejects the
    /// size is retried once with [`WP_MAX_PER_PAGE`].
    pub fn with_initial_page_size(mut self, size: usize) -> Self {
        self.initial_page_size = Some(size.max(1));
        self
    }

    /// Fetch up to `desired_limit` items of the collection at `rest_base`
    ///
    /// Stops on an empty page, on a short page, on an out-of-range page
    /// number after the first page, or once the limit is reached.
    pub async fn fetch_all(
        &self,
        origin: &Origin,
        prefix: ApiPrefix,
        rest_base: &str,
        desired_limit: usize,
    ) -> Result<Vec<RawItem>> {
        let mut page_size = self
            .initial_page_size
            .unwrap_or(WP_MAX_PER_PAGE)
            .min(desired_limit);
        let mut items: Vec<RawItem> = Vec::new();
        let mut page = 1;
        let mut recovered_page = None;

        while items.len() < desired_limit {
            let per_page = page_size.min(desired_limit - items.len());
            let url = page_url(origin, prefix, rest_base, per_page, page);
            debug!(content_type = rest_base, page, per_page, "fetching page");

            let batch: Vec<RawItem> = match http::fetch_json(&self.client, &url).await {
                Ok(batch) => batch,
                Err(e) if e.is_page_size_rejection() => {
                    if recovered_page == Some(page) {
                        return Err(Error::PageSizeRejected { per_page });
                    }
                    if page_size <= MIN_RECOVERABLE_PAGE_SIZE {
                        return Err(e);
                    }
                    warn!(
                        content_type = rest_base,
                        page,
                        per_page,
                        "page size rejected, retrying with {}",
                        WP_MAX_PER_PAGE
                    );
                    page_size = page_size.min(WP_MAX_PER_PAGE);
                    recovered_page = Some(page);
                    continue;
                }
                // Collections of exactly k pages answer page k+1 with a 400
                Err(e) if page > 1 && e.is_invalid_page_number() => {
                    debug!(content_type = rest_base, page, "page past the end, end of collection");
                    break;
                }
                Err(e) => return Err(e),
            };

            let received = batch.len();
            if received == 0 {
                break;
            }
            items.extend(batch);
            if received < per_page {
                debug!(content_type = rest_base, page, received, "short page, end of collection");
                break;
            }
            page += 1;
        }

        items.truncate(desired_limit);
        debug!(content_type = rest_base, total = items.len(), "pagination complete");
        Ok(items)
    }
}

fn page_url(origin: &Origin, prefix: ApiPrefix, rest_base: &str, per_page: usize, page: usize) -> Url {
    let mut url = prefix.endpoint(origin, &format!("wp/v2/{}", rest_base));
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_pair("page", &page.to_string());
    url
}
