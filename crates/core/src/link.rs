//! Encoding of user-facing proxy connection links.
//!
//! The secret field is prefixed `dd` (padded-intermediate mode) or, when a
//! fake-TLS domain is configured, `ee` followed by the hex-encoded domain.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Which URL surface a link targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkScheme {
    /// `tg://proxy` deep link, opens the client directly.
    Deep,
    /// `https://t.me/proxy` web link.
    Web,
}

impl LinkScheme {
    fn base(self) -> &'static str {
        match self {
            LinkScheme::Deep => "tg://proxy",
            LinkScheme::Web => "https://t.me/proxy",
        }
    }
}

/// Encode a secret for the link's `secret` query parameter.
pub fn encode_secret(secret: &str, tls_domain: Option<&str>) -> String {
    match tls_domain {
        Some(domain) => format!("ee{secret}{}", hex::encode(domain.as_bytes())),
        None => format!("dd{secret}"),
    }
}

/// Build a shareable proxy URL.
pub fn proxy_url(
    scheme: LinkScheme,
    server: Ipv4Addr,
    port: u16,
    secret: &str,
    tls_domain: Option<&str>,
) -> Url {
    let mut url = Url::parse(scheme.base()).expect("static base URL is valid");
    url.query_pairs_mut()
        .append_pair("server", &server.to_string())
        .append_pair("port", &port.to_string())
        .append_pair("secret", &encode_secret(secret, tls_domain));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_secret_gets_dd_prefix() {
        assert_eq!(encode_secret("abc123", None), "ddabc123");
    }

    #[test]
    fn tls_secret_gets_ee_prefix_and_hex_domain() {
        let encoded = encode_secret("abc123", Some("example.com"));
        assert_eq!(encoded, format!("eeabc123{}", hex::encode("example.com")));
        assert_eq!(&encoded[..2], "ee");
        // Hex encoding is lowercase.
        assert_eq!(encoded, encoded.to_lowercase());
    }

    #[test]
    fn builds_deep_link() {
        let url = proxy_url(
            LinkScheme::Deep,
            Ipv4Addr::new(203, 0, 113, 7),
            443,
            "abc123",
            None,
        );
        assert_eq!(
            url.as_str(),
            "tg://proxy?server=203.0.113.7&port=443&secret=ddabc123"
        );
    }

    #[test]
    fn builds_web_link_with_tls_domain() {
        let url = proxy_url(
            LinkScheme::Web,
            Ipv4Addr::new(198, 51, 100, 2),
            8443,
            "abc123",
            Some("example.com"),
        );
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("t.me"));
        let secret = url
            .query_pairs()
            .find(|(k, _)| k == "secret")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(secret.starts_with("eeabc123"));
    }
}
