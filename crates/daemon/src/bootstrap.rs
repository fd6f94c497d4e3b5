//! Wires settings into a ready-to-use panel and reconciler

use std::sync::Arc;
use std::time::Duration;

use mtpanel_sqlx::SqliteProxyStore;
use tracing::debug;

use crate::config::Settings;
use crate::ip::HttpIpResolver;
use crate::link::LinkBuilder;
use crate::manager::SecretLifecycleManager;
use crate::panel::Panel;
use crate::reconcile::Reconciler;
use crate::systemd::SystemdUnitStore;
use crate::Result;

/// Build the panel and its reconciler from loaded settings.
pub async fn build(settings: &Settings) -> Result<(Panel, Reconciler)> {
    debug!(database = %settings.database.url, service = %settings.proxy.service_name, "bootstrapping");

    let store = Arc::new(SqliteProxyStore::new(&settings.database.url).await?);
    let unit = Arc::new(SystemdUnitStore::new(&settings.proxy.service_name));
    let manager = Arc::new(SecretLifecycleManager::new(unit, &settings.proxy));

    let resolver = Arc::new(HttpIpResolver::new(
        &settings.proxy.ip_echo_url,
        Duration::from_secs(settings.proxy.lookup_timeout_secs),
    )?);
    let links = LinkBuilder::new(resolver, settings.proxy.link_scheme);

    let panel = Panel::new(
        store.clone(),
        manager.clone(),
        links,
        settings.admins.clone(),
        &settings.panel,
    );
    let reconciler = Reconciler::new(store, manager);

    Ok((panel, reconciler))
}
