//! Persistence trait for admins and issued proxies

use crate::{Admin, ProxyRecord, Result};
use async_trait::async_trait;

/// Storage backend for admin and proxy records.
///
/// Deactivation is one-way; rows are never deleted. Active proxies are the
/// source of truth reconciled against the live service configuration.
#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Fetch the admin for a Telegram id, creating the row on first contact.
    async fn ensure_admin(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        is_owner: bool,
    ) -> Result<Admin>;

    async fn admin_by_telegram(&self, telegram_id: i64) -> Result<Option<Admin>>;

    /// Set the admin's tag prefix used to label new proxies.
    async fn set_admin_tag(&self, admin_id: i64, tag_prefix: &str) -> Result<()>;

    async fn create_proxy(&self, admin_id: i64, label: &str, secret: &str) -> Result<ProxyRecord>;

    async fn get_proxy(&self, proxy_id: i64) -> Result<Option<ProxyRecord>>;

    /// Active proxies, oldest first, optionally filtered to one admin.
    async fn list_active(&self, admin_id: Option<i64>) -> Result<Vec<ProxyRecord>>;

    /// One page of an admin's active proxies, oldest first.
    async fn list_page(&self, admin_id: i64, limit: u32, offset: u32) -> Result<Vec<ProxyRecord>>;

    async fn count_active(&self, admin_id: i64) -> Result<u64>;

    /// Retire a proxy record; the row is kept for history.
    async fn deactivate_proxy(&self, proxy_id: i64) -> Result<()>;
}
