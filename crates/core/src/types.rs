//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An admin allowed to manage proxies, created on first interaction.
///
/// Admins are never hard-deleted; `is_active = false` retires the row.
/// `tag_prefix` is unset until the admin picks one, and proxy creation is
/// blocked until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub telegram_id: i64,
    pub tag_prefix: Option<String>,
    pub display_name: Option<String>,
    pub is_owner: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One issued proxy credential.
///
/// `secret` is the hex token installed into the live service configuration.
/// Deactivation flips `is_active`; the row is retained for history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub id: i64,
    pub admin_id: i64,
    pub label: String,
    pub secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
