//! Admin-facing operations behind the authorization gate
//!
//! This is the surface a chat bot or CLI shell calls. Every entry point
//! checks the caller against the configured allow-list first and returns
//! [`DaemonError::Unauthorized`](crate::DaemonError::Unauthorized) otherwise;
//! surfaces are expected to stay silent on that error.
//!
//! Ordering discipline: the live service configuration is always mutated
//! before the record store, so a failure in between leaves an extra live
//! secret rather than a record pointing at nothing.

use std::sync::Arc;

use mtpanel_core::{Admin, ProxyRecord, ProxyStore};
use tracing::{info, warn};
use url::Url;

use crate::config::{AdminConfig, PanelConfig};
use crate::link::LinkBuilder;
use crate::manager::SecretLifecycleManager;
use crate::{DaemonError, Result};

const MAX_TAG_LEN: usize = 32;

/// Result of `start_session`: the admin row plus what is still missing.
#[derive(Debug, Clone)]
pub struct Session {
    pub admin: Admin,
    /// Proxy creation is blocked until a tag prefix is set.
    pub needs_tag: bool,
}

#[derive(Debug, Clone)]
pub struct ProxyEntry {
    pub record: ProxyRecord,
    pub link: Url,
}

/// One page of an admin's proxies.
#[derive(Debug, Clone)]
pub struct ProxyPage {
    pub entries: Vec<ProxyEntry>,
    /// Zero-based page index after clamping.
    pub page: u32,
    pub page_count: u32,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct CreatedProxy {
    pub record: ProxyRecord,
    pub link: Url,
}

pub struct Panel {
    store: Arc<dyn ProxyStore>,
    manager: Arc<SecretLifecycleManager>,
    links: LinkBuilder,
    admins: AdminConfig,
    page_size: u32,
}

impl Panel {
    pub fn new(
        store: Arc<dyn ProxyStore>,
        manager: Arc<SecretLifecycleManager>,
        links: LinkBuilder,
        admins: AdminConfig,
        panel: &PanelConfig,
    ) -> Self {
        Self {
            store,
            manager,
            links,
            admins,
            page_size: panel.page_size.max(1),
        }
    }

    fn authorize(&self, telegram_id: i64) -> Result<()> {
        if self.admins.is_allowed(telegram_id) {
            Ok(())
        } else {
            warn!(telegram_id, "rejected unauthorized caller");
            Err(DaemonError::Unauthorized)
        }
    }

    async fn require_admin(&self, telegram_id: i64) -> Result<Admin> {
        self.authorize(telegram_id)?;
        Ok(self
            .store
            .ensure_admin(telegram_id, None, self.admins.is_owner(telegram_id))
            .await?)
    }

    /// Register or refresh the caller's admin row.
    pub async fn start_session(&self, telegram_id: i64, display_name: &str) -> Result<Session> {
        self.authorize(telegram_id)?;
        let name = Some(display_name).filter(|n| !n.trim().is_empty());
        let admin = self
            .store
            .ensure_admin(telegram_id, name, self.admins.is_owner(telegram_id))
            .await?;
        Ok(Session {
            needs_tag: admin.tag_prefix.is_none(),
            admin,
        })
    }

    /// One-time tag prefix assignment. A second call is an idempotent no-op
    /// that returns the admin unchanged.
    pub async fn set_tag(&self, telegram_id: i64, tag: &str) -> Result<Admin> {
        let admin = self.require_admin(telegram_id).await?;
        if admin.tag_prefix.is_some() {
            return Ok(admin);
        }

        let tag = tag.trim();
        if tag.is_empty() || tag.len() > MAX_TAG_LEN {
            return Err(DaemonError::InvalidTag(tag.to_string()));
        }

        self.store.set_admin_tag(admin.id, tag).await?;
        info!(telegram_id, tag, "tag prefix set");
        Ok(Admin {
            tag_prefix: Some(tag.to_string()),
            ..admin
        })
    }

    /// One page of the caller's active proxies with freshly computed links.
    /// Out-of-range pages clamp to the last valid page.
    pub async fn list_proxies(&self, telegram_id: i64, page: u32) -> Result<ProxyPage> {
        let admin = self.require_admin(telegram_id).await?;

        let total = self.store.count_active(admin.id).await?;
        let page_count = (total.div_ceil(u64::from(self.page_size)) as u32).max(1);
        let page = page.min(page_count - 1);

        let records = self
            .store
            .list_page(admin.id, self.page_size, page * self.page_size)
            .await?;

        // One unit read for the whole page; the IP lookup inside the link
        // builder runs outside the manager's write lock.
        let (port, tls_domain) = self.manager.link_params().await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let link = self
                .links
                .build(&record.secret, port, tls_domain.as_deref())
                .await;
            entries.push(ProxyEntry { record, link });
        }

        Ok(ProxyPage {
            entries,
            page,
            page_count,
            total,
        })
    }

    /// Provision a new proxy: install a fresh secret into the live
    /// configuration, then persist the record, then render the link.
    pub async fn create_proxy(&self, telegram_id: i64) -> Result<CreatedProxy> {
        let admin = self.require_admin(telegram_id).await?;
        let tag = admin.tag_prefix.ok_or(DaemonError::TagRequired)?;

        let secret = self.manager.add_secret(None).await?;

        let count = self.store.count_active(admin.id).await?;
        let label = format!("{tag} {}", count + 1);
        let record = self.store.create_proxy(admin.id, &label, &secret).await?;

        let (port, tls_domain) = self.manager.link_params().await?;
        let link = self.links.build(&secret, port, tls_domain.as_deref()).await;

        info!(telegram_id, proxy_id = record.id, label = %record.label, "proxy created");
        Ok(CreatedProxy { record, link })
    }

    /// Revoke a proxy: drop its secret from the live configuration and
    /// retire the record. Missing or already-retired records return
    /// `Ok(false)`. Owners may delete any proxy; admins only their own.
    pub async fn delete_proxy(&self, telegram_id: i64, proxy_id: i64) -> Result<bool> {
        let admin = self.require_admin(telegram_id).await?;

        let Some(record) = self.store.get_proxy(proxy_id).await? else {
            return Ok(false);
        };
        if !record.is_active {
            return Ok(false);
        }
        if record.admin_id != admin.id && !admin.is_owner {
            return Err(DaemonError::Unauthorized);
        }

        let removed = self.manager.remove_secret(&record.secret).await?;
        if !removed {
            // Already gone from the live config (removed out-of-band);
            // retiring the record is still the right thing to do.
            warn!(proxy_id, "secret was already absent from the live configuration");
        }
        self.store.deactivate_proxy(proxy_id).await?;

        info!(telegram_id, proxy_id, "proxy deleted");
        Ok(true)
    }
}
