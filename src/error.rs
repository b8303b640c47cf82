//! Error types for wp-harvest

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while harvesting a WordPress site
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid URL provided
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to create HTTP client
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// HTTP request failed before a response arrived
    #[error("request to {url} failed: {message}")]
    HttpRequest { url: String, message: String },

    /// HTTP response error status
    #[error("failed to fetch {url}: status {status}")]
    HttpStatus {
        url: String,
        status: u16,
        /// Response body, kept for error classification
        body: String,
    },

    /// Response body could not be decoded
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Site does not appear to be WordPress
    #[error("{origin} doesn't appear to be a WordPress site, no WordPress REST API detected")]
    NotWordPress { origin: String },

    /// WordPress markers were found but no REST entry point answered
    #[error("WordPress detected at {origin}, but its REST API could not be located")]
    RestApiUnavailable { origin: String },

    /// Server kept rejecting the page size after the one-time clamp
    #[error("server rejected per_page={per_page} even after reducing the page size")]
    PageSizeRejected { per_page: usize },

    /// Persisted storage failed
    #[error("storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid output format specified
    #[error("invalid output format: '{0}' (valid: human, json, urls, none)")]
    InvalidOutputFormat(String),

    /// Output operation failed
    #[error("output failed: {0}")]
    OutputFailed(#[source] std::io::Error),

    /// JSON could not be encoded or decoded
    #[error("JSON error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is a 400 response complaining about `per_page`.
    pub fn is_page_size_rejection(&self) -> bool {
        match self {
            Self::HttpStatus { status, body, .. } => *status == 400 && body.contains("per_page"),
            Self::PageSizeRejected { .. } => true,
            _ => false,
        }
    }

    /// Whether this is the 400 WordPress answers for a page past the last one.
    pub fn is_invalid_page_number(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { status: 400, body, .. } if body.contains("rest_post_invalid_page_number")
        )
    }

    /// Situational advice for a user-facing error message.
    ///
    /// Chosen by inspecting the error description so that transport errors
    /// carrying the same hints (status codes, CORS notes) are classified alike.
    pub fn guidance(&self) -> Option<&'static str> {
        let description = self.to_string();

        if matches!(self, Self::NotWordPress { .. }) {
            Some("This tool only works on WordPress sites with the REST API enabled.")
        } else if matches!(self, Self::RestApiUnavailable { .. }) {
            Some(
                "Possible causes:\n  - WordPress REST API is disabled\n  - A security plugin blocks anonymous REST access",
            )
        } else if description.contains("404") {
            Some(
                "Possible causes:\n  - Site is not WordPress\n  - WordPress REST API is disabled\n  - Different API path structure",
            )
        } else if description.contains("CORS") {
            Some("This might be a CORS (cross-origin) issue. Try again from the site's own origin.")
        } else {
            None
        }
    }
}
