//! Public IPv4 discovery for link rendering
//!
//! Lookup failures never block proxy creation: any error degrades to the
//! loopback address, producing a link the operator can spot and fix rather
//! than a failed operation.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::Result;

/// Address substituted when the lookup fails.
pub const FALLBACK_ADDR: Ipv4Addr = Ipv4Addr::LOCALHOST;

#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Best-effort public IPv4 address; never fails.
    async fn public_ipv4(&self) -> Ipv4Addr;
}

/// Resolver backed by a plain-text IPv4 echo endpoint.
pub struct HttpIpResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIpResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch(&self) -> anyhow::Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(body.trim().parse()?)
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn public_ipv4(&self) -> Ipv4Addr {
        match self.fetch().await {
            Ok(ip) => ip,
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "public IP lookup failed, using fallback address");
                FALLBACK_ADDR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_loopback() {
        // Nothing listens on this port; the request errors immediately.
        let resolver = HttpIpResolver::new("http://127.0.0.1:9", Duration::from_millis(500))
            .unwrap();
        assert_eq!(resolver.public_ipv4().await, FALLBACK_ADDR);
    }

    #[tokio::test]
    async fn garbage_body_falls_back_to_loopback() {
        // An endpoint returning a non-IP body must also degrade, not error.
        let resolver =
            HttpIpResolver::new("not a url at all", Duration::from_millis(500)).unwrap();
        assert_eq!(resolver.public_ipv4().await, FALLBACK_ADDR);
    }
}
