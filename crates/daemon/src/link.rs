//! Renders shareable proxy links

use std::sync::Arc;

use mtpanel_core::{link, LinkScheme};
use url::Url;

use crate::ip::IpResolver;

/// Builds user-facing links from a secret plus the live port/TLS settings.
pub struct LinkBuilder {
    resolver: Arc<dyn IpResolver>,
    scheme: LinkScheme,
}

impl LinkBuilder {
    pub fn new(resolver: Arc<dyn IpResolver>, scheme: LinkScheme) -> Self {
        Self { resolver, scheme }
    }

    pub async fn build(&self, secret: &str, port: u16, tls_domain: Option<&str>) -> Url {
        let server = self.resolver.public_ipv4().await;
        link::proxy_url(self.scheme, server, port, secret, tls_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FixedIpResolver;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn builds_link_from_resolved_address() {
        let builder = LinkBuilder::new(
            Arc::new(FixedIpResolver(Ipv4Addr::new(203, 0, 113, 7))),
            LinkScheme::Deep,
        );
        let url = builder.build("abc123", 443, None).await;
        assert_eq!(
            url.as_str(),
            "tg://proxy?server=203.0.113.7&port=443&secret=ddabc123"
        );
    }

    #[tokio::test]
    async fn tls_domain_switches_encoding() {
        let builder = LinkBuilder::new(
            Arc::new(FixedIpResolver(Ipv4Addr::LOCALHOST)),
            LinkScheme::Web,
        );
        let url = builder.build("abc123", 443, Some("example.com")).await;
        assert!(url.as_str().contains("secret=eeabc123"));
    }
}
