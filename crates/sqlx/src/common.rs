//! Row types and timestamp helpers shared by store queries

use chrono::{DateTime, Utc};
use mtpanel_core::{Admin, Error, ProxyRecord, Result};
use sqlx::FromRow;

// Helper functions for timestamp conversion
pub fn datetime_to_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn string_to_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::StateError(format!("Invalid timestamp format: {e}")))
}

#[derive(FromRow)]
pub struct AdminRow {
    pub id: i64,
    pub telegram_id: i64,
    pub tag_prefix: Option<String>,
    pub display_name: Option<String>,
    pub is_owner: i64, // SQLite uses INTEGER for boolean
    pub is_active: i64,
    pub created_at: String, // RFC 3339
}

#[derive(FromRow)]
pub struct ProxyRow {
    pub id: i64,
    pub admin_id: i64,
    pub label: String,
    pub secret: String,
    pub is_active: i64,
    pub created_at: String, // RFC 3339
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            telegram_id: row.telegram_id,
            tag_prefix: row.tag_prefix,
            display_name: row.display_name,
            is_owner: row.is_owner != 0,
            is_active: row.is_active != 0,
            created_at: string_to_datetime(&row.created_at).unwrap_or_else(|_| Utc::now()),
        }
    }
}

impl From<ProxyRow> for ProxyRecord {
    fn from(row: ProxyRow) -> Self {
        ProxyRecord {
            id: row.id,
            admin_id: row.admin_id,
            label: row.label,
            secret: row.secret,
            is_active: row.is_active != 0,
            created_at: string_to_datetime(&row.created_at).unwrap_or_else(|_| Utc::now()),
        }
    }
}
