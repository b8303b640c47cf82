//! Liveness checks for harvested URLs

use crate::model::Item;
use crate::status::StatusSink;
use reqwest::Client;
use tracing::debug;

/// Batches larger than this report progress
const PROGRESS_THRESHOLD: usize = 10;

/// Progress is reported every this many items
const PROGRESS_INTERVAL: usize = 10;

/// Checks that item URLs still resolve
#[derive(Debug, Clone)]
pub struct UrlValidator {
    client: Client,
}

impl UrlValidator {
    /// Validator sending its HEAD requests through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// HEAD the item's URL; true only for a 2xx answer
    pub async fn validate(&self, item: &Item) -> bool {
        match self.client.head(&item.url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(url = %item.url, status = response.status().as_u16(), "URL failed validation");
                false
            }
            Err(e) => {
                debug!(url = %item.url, error = %e, "URL failed validation");
                false
            }
        }
    }

    /// Keep the items whose URL validates, in their original order
    ///
    /// Items are checked one after another. Batches above the progress
    /// threshold report `Validating URLs: n/total` to `status`.
    pub async fn validate_all(&self, items: Vec<Item>, status: &dyn StatusSink) -> Vec<Item> {
        let total = items.len();
        let report = total > PROGRESS_THRESHOLD;
        let mut valid = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            if self.validate(&item).await {
                valid.push(item);
            }

            let checked = index + 1;
            if report && (checked % PROGRESS_INTERVAL == 0 || checked == total) {
                status.set_status(&format!("Validating URLs: {}/{}", checked, total));
            }
        }

        debug!(checked = total, valid = valid.len(), "validation complete");
        valid
    }
}
