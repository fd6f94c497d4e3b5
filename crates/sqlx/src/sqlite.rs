use crate::common::{datetime_to_string, AdminRow, ProxyRow};
use async_trait::async_trait;
use chrono::Utc;
use mtpanel_core::{Admin, Error, ProxyRecord, ProxyStore, Result};
use sqlx::{Pool, Sqlite};

pub struct SqliteProxyStore {
    pool: Pool<Sqlite>,
}

impl SqliteProxyStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        use sqlx::sqlite::SqliteConnectOptions;
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::StateError(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        let pool = sqlx::SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::StateError(format!("Failed to connect to database: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to run migrations: {e}")))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl ProxyStore for SqliteProxyStore {
    async fn ensure_admin(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        is_owner: bool,
    ) -> Result<Admin> {
        if let Some(existing) = self.admin_by_telegram(telegram_id).await? {
            return Ok(existing);
        }

        let created_at = datetime_to_string(Utc::now());
        let result = sqlx::query(
            "INSERT INTO admins (telegram_id, display_name, is_owner, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(telegram_id)
        .bind(display_name)
        .bind(is_owner as i64)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to create admin: {e}")))?;

        tracing::debug!(telegram_id, "registered new admin");

        Ok(Admin {
            id: result.last_insert_rowid(),
            telegram_id,
            tag_prefix: None,
            display_name: display_name.map(str::to_string),
            is_owner,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    async fn admin_by_telegram(&self, telegram_id: i64) -> Result<Option<Admin>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, telegram_id, tag_prefix, display_name, is_owner, is_active, created_at
             FROM admins WHERE telegram_id = ?1 AND is_active = 1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to get admin: {e}")))?;

        Ok(row.map(Admin::from))
    }

    async fn set_admin_tag(&self, admin_id: i64, tag_prefix: &str) -> Result<()> {
        sqlx::query("UPDATE admins SET tag_prefix = ?2 WHERE id = ?1")
            .bind(admin_id)
            .bind(tag_prefix)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to set admin tag: {e}")))?;

        Ok(())
    }

    async fn create_proxy(&self, admin_id: i64, label: &str, secret: &str) -> Result<ProxyRecord> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO proxies (admin_id, label, secret, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
        )
        .bind(admin_id)
        .bind(label)
        .bind(secret)
        .bind(datetime_to_string(created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to create proxy: {e}")))?;

        Ok(ProxyRecord {
            id: result.last_insert_rowid(),
            admin_id,
            label: label.to_string(),
            secret: secret.to_string(),
            is_active: true,
            created_at,
        })
    }

    async fn get_proxy(&self, proxy_id: i64) -> Result<Option<ProxyRecord>> {
        let row = sqlx::query_as::<_, ProxyRow>(
            "SELECT id, admin_id, label, secret, is_active, created_at
             FROM proxies WHERE id = ?1",
        )
        .bind(proxy_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to get proxy: {e}")))?;

        Ok(row.map(ProxyRecord::from))
    }

    async fn list_active(&self, admin_id: Option<i64>) -> Result<Vec<ProxyRecord>> {
        let rows = match admin_id {
            Some(admin_id) => {
                sqlx::query_as::<_, ProxyRow>(
                    "SELECT id, admin_id, label, secret, is_active, created_at
                     FROM proxies WHERE admin_id = ?1 AND is_active = 1 ORDER BY id ASC",
                )
                .bind(admin_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ProxyRow>(
                    "SELECT id, admin_id, label, secret, is_active, created_at
                     FROM proxies WHERE is_active = 1 ORDER BY id ASC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| Error::StateError(format!("Failed to list proxies: {e}")))?;

        Ok(rows.into_iter().map(ProxyRecord::from).collect())
    }

    async fn list_page(&self, admin_id: i64, limit: u32, offset: u32) -> Result<Vec<ProxyRecord>> {
        let rows = sqlx::query_as::<_, ProxyRow>(
            "SELECT id, admin_id, label, secret, is_active, created_at
             FROM proxies WHERE admin_id = ?1 AND is_active = 1
             ORDER BY id ASC LIMIT ?2 OFFSET ?3",
        )
        .bind(admin_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to list proxy page: {e}")))?;

        Ok(rows.into_iter().map(ProxyRecord::from).collect())
    }

    async fn count_active(&self, admin_id: i64) -> Result<u64> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM proxies WHERE admin_id = ?1 AND is_active = 1",
        )
        .bind(admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to count proxies: {e}")))?;

        Ok(result.0 as u64)
    }

    async fn deactivate_proxy(&self, proxy_id: i64) -> Result<()> {
        sqlx::query("UPDATE proxies SET is_active = 0 WHERE id = ?1")
            .bind(proxy_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to deactivate proxy: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteProxyStore {
        SqliteProxyStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = memory_store().await;

        let first = store.ensure_admin(42, Some("Alice"), true).await.unwrap();
        let second = store.ensure_admin(42, Some("Alice again"), true).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name.as_deref(), Some("Alice"));
        assert!(second.is_owner);
    }

    #[tokio::test]
    async fn tag_prefix_starts_unset_and_persists() {
        let store = memory_store().await;

        let admin = store.ensure_admin(42, None, false).await.unwrap();
        assert!(admin.tag_prefix.is_none());

        store.set_admin_tag(admin.id, "hproxy").await.unwrap();
        let reloaded = store.admin_by_telegram(42).await.unwrap().unwrap();
        assert_eq!(reloaded.tag_prefix.as_deref(), Some("hproxy"));
    }

    #[tokio::test]
    async fn create_list_and_count_proxies() {
        let store = memory_store().await;
        let admin = store.ensure_admin(42, None, false).await.unwrap();

        for i in 0..3 {
            store
                .create_proxy(admin.id, &format!("tag {}", i + 1), &format!("{i:032x}"))
                .await
                .unwrap();
        }

        assert_eq!(store.count_active(admin.id).await.unwrap(), 3);

        let all = store.list_active(Some(admin.id)).await.unwrap();
        assert_eq!(all.len(), 3);
        // Oldest first.
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn pagination_uses_limit_and_offset() {
        let store = memory_store().await;
        let admin = store.ensure_admin(42, None, false).await.unwrap();

        for i in 0..13 {
            store
                .create_proxy(admin.id, &format!("tag {}", i + 1), &format!("{i:032x}"))
                .await
                .unwrap();
        }

        let page0 = store.list_page(admin.id, 6, 0).await.unwrap();
        let page2 = store.list_page(admin.id, 6, 12).await.unwrap();
        assert_eq!(page0.len(), 6);
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].label, "tag 13");
    }

    #[tokio::test]
    async fn deactivate_keeps_the_row() {
        let store = memory_store().await;
        let admin = store.ensure_admin(42, None, false).await.unwrap();
        let record = store.create_proxy(admin.id, "tag 1", "aa").await.unwrap();

        store.deactivate_proxy(record.id).await.unwrap();

        assert_eq!(store.count_active(admin.id).await.unwrap(), 0);
        let kept = store.get_proxy(record.id).await.unwrap().unwrap();
        assert!(!kept.is_active);
        assert_eq!(kept.secret, "aa");
    }

    #[tokio::test]
    async fn missing_proxy_is_none() {
        let store = memory_store().await;
        assert!(store.get_proxy(999).await.unwrap().is_none());
    }
}
