//! HTTP plumbing shared by the pipeline stages

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// User agent for requests
const USER_AGENT: &str = concat!("wp-harvest/", env!("CARGO_PKG_VERSION"));

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 30;

/// Longest error body kept on [`Error::HttpStatus`]
const MAX_ERROR_BODY: usize = 2048;

/// Build the unauthenticated client used for every request of a harvest
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .danger_accept_invalid_certs(false)
        .build()
        .map_err(|e| Error::HttpClient(e.to_string()))
}

/// Send a GET request and require a 2xx status
async fn get_ok(client: &Client, url: &Url) -> Result<Response> {
    debug!(url = %url, "GET");
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| request_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
        debug!(url = %url, status = status.as_u16(), body = %body, "error response");
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Fetch a URL and decode its JSON body
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &Url) -> Result<T> {
    let response = get_ok(client, url).await?;
    response.json().await.map_err(|e| Error::InvalidResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Fetch a page and return its text
pub async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = get_ok(client, url).await?;
    response.text().await.map_err(|e| request_error(url, e))
}

fn request_error(url: &Url, err: reqwest::Error) -> Error {
    Error::HttpRequest {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds() {
        assert!(build_client().is_ok());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "aé";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 3), 3);
        assert_eq!(floor_char_boundary("abc", 10), 3);
    }
}
