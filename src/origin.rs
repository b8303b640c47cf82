//! Site origin handling
//!
//! An [`Origin`] is the scheme, host and port of the harvested site. Every
//! request of a harvest is built relative to it.

use crate::error::{Error, Result};
use std::fmt;
use std::net::IpAddr;
use url::Url;

/// Allowed URL schemes
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Normalized base URL of a site (scheme + host + port)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    url: Url,
    serialized: String,
}

impl Origin {
    /// Parse a URL or bare domain and reduce it to its origin
    ///
    /// Paths, queries and fragments are discarded, `https://` is assumed when
    /// no scheme is given.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let with_scheme = if !input.contains("://") {
            format!("https://{}", input)
        } else {
            input.to_string()
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err(Error::InvalidUrl(format!(
                "scheme '{}' not allowed (use http or https)",
                parsed.scheme()
            )));
        }

        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(Error::InvalidUrl("missing host".to_string()));
        }
        let serialized = origin.ascii_serialization();
        let url = Url::parse(&serialized).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self { url, serialized })
    }

    /// Root URL of the site (`scheme://host[:port]/`)
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Origin without trailing slash, as used in cache keys
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Reject internal/private hosts (SSRF protection)
    ///
    /// Hosts that don't resolve pass; the first request reports them.
    pub async fn ensure_public(&self) -> Result<()> {
        let host = self
            .url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("missing host".to_string()))?;

        if host == "localhost" || host.ends_with(".localhost") {
            return Err(Error::InvalidUrl("localhost not allowed".to_string()));
        }

        let port = self.url.port_or_known_default().unwrap_or(443);
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if let Ok(addrs) = tokio::net::lookup_host((host, port)).await {
            for addr in addrs {
                if is_internal_ip(addr.ip()) {
                    return Err(Error::InvalidUrl(format!(
                        "internal/private IP address not allowed: {}",
                        addr.ip()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

/// Check if an IP address is internal/private (RFC 1918, link-local, loopback, etc.)
fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let [a, b, ..] = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Shared address space 100.64.0.0/10
                || (a == 100 && (64..=127).contains(&b))
                || (a == 192 && b == 0)
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn strips_path_and_query() {
        let origin = Origin::parse("https://example.com/blog/post?x=1#top").unwrap();
        assert_eq!(origin.as_str(), "https://example.com");
        assert_eq!(origin.url().as_str(), "https://example.com/");
    }

    #[test]
    fn adds_https_scheme() {
        let origin = Origin::parse("example.com").unwrap();
        assert_eq!(origin.as_str(), "https://example.com");
    }

    #[test]
    fn keeps_non_default_port() {
        let origin = Origin::parse("http://127.0.0.1:8080/wp-admin/").unwrap();
        assert_eq!(origin.as_str(), "http://127.0.0.1:8080");
    }

    #[test]
    fn drops_default_port() {
        let origin = Origin::parse("https://example.com:443/").unwrap();
        assert_eq!(origin.as_str(), "https://example.com");
    }

    #[test]
    fn lowercases_host() {
        let origin = Origin::parse("https://Example.COM").unwrap();
        assert_eq!(origin.to_string(), "https://example.com");
    }

    #[test]
    fn parse_invalid_url() {
        assert!(Origin::parse("not a url").is_err());
    }

    #[test]
    fn reject_file_scheme() {
        let err = Origin::parse("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn reject_ftp_scheme() {
        let err = Origin::parse("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[tokio::test]
    async fn reject_localhost() {
        let origin = Origin::parse("http://localhost").unwrap();
        let err = origin.ensure_public().await.unwrap_err();
        assert!(err.to_string().contains("localhost"));
    }

    #[tokio::test]
    async fn reject_localhost_subdomain() {
        let origin = Origin::parse("http://foo.localhost").unwrap();
        assert!(origin.ensure_public().await.is_err());
    }

    #[tokio::test]
    async fn reject_loopback_address() {
        let origin = Origin::parse("http://127.0.0.1:8080").unwrap();
        assert!(origin.ensure_public().await.is_err());
    }

    #[tokio::test]
    async fn public_literal_address_passes() {
        let origin = Origin::parse("http://93.184.216.34").unwrap();
        assert!(origin.ensure_public().await.is_ok());
    }

    #[tokio::test]
    async fn reject_private_literal_address() {
        let origin = Origin::parse("http://192.168.1.10:8080").unwrap();
        let err = origin.ensure_public().await.unwrap_err();
        assert!(err.to_string().contains("192.168.1.10"));
    }

    #[test]
    fn internal_ip_detection() {
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))));
        assert!(is_internal_ip(IpAddr::V4(Ipv4Addr::new(100, 64, 0, 1))));

        assert!(!is_internal_ip(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
        assert!(!is_internal_ip(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
    }
}
