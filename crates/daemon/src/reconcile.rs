//! Consistency scan between the record store and the live configuration
//!
//! The unit file and the record store are two resources with no shared
//! transaction, so a crash between the two writes can leave them divergent.
//! The scan reports both directions; repair re-installs record secrets that
//! fell out of the live configuration. Orphaned live secrets are only
//! reported, never removed automatically, since they may be managed by hand.

use std::sync::Arc;

use mtpanel_core::{ProxyRecord, ProxyStore, Result};
use tracing::{info, warn};

use crate::manager::SecretLifecycleManager;

#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Active records whose secret is missing from the live configuration.
    pub missing_from_unit: Vec<ProxyRecord>,
    /// Live secrets with no active record behind them.
    pub orphaned_secrets: Vec<String>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_from_unit.is_empty() && self.orphaned_secrets.is_empty()
    }
}

/// First eight characters of a secret, safe on any char boundary. Secrets
/// are normally lowercase hex, but the exec line accepts arbitrary quoted
/// tokens, so hand-edited values can carry multi-byte characters.
pub fn secret_prefix(secret: &str) -> &str {
    match secret.char_indices().nth(8) {
        Some((idx, _)) => &secret[..idx],
        None => secret,
    }
}

pub struct Reconciler {
    store: Arc<dyn ProxyStore>,
    manager: Arc<SecretLifecycleManager>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ProxyStore>, manager: Arc<SecretLifecycleManager>) -> Self {
        Self { store, manager }
    }

    /// Compare active records against the live secret set.
    pub async fn scan(&self) -> Result<ReconcileReport> {
        let live = self.manager.exec_config().await?.secrets;
        let records = self.store.list_active(None).await?;

        let missing_from_unit: Vec<ProxyRecord> = records
            .iter()
            .filter(|r| !live.contains(&r.secret))
            .cloned()
            .collect();
        let orphaned_secrets: Vec<String> = live
            .into_iter()
            .filter(|s| !records.iter().any(|r| &r.secret == s))
            .collect();

        for record in &missing_from_unit {
            warn!(
                proxy_id = record.id,
                label = %record.label,
                "active record has no live secret"
            );
        }
        for secret in &orphaned_secrets {
            warn!(
                secret_prefix = %secret_prefix(secret),
                "live secret has no active record"
            );
        }

        Ok(ReconcileReport {
            missing_from_unit,
            orphaned_secrets,
        })
    }

    /// Scan, then re-install missing record secrets with a single
    /// write+reload. Orphans are left in place.
    pub async fn repair(&self) -> Result<ReconcileReport> {
        let report = self.scan().await?;

        if !report.missing_from_unit.is_empty() {
            let secrets: Vec<String> = report
                .missing_from_unit
                .iter()
                .map(|r| r.secret.clone())
                .collect();
            let added = self.manager.add_secrets(&secrets).await?;
            info!(added, "re-installed missing proxy secrets");
        }

        Ok(report)
    }
}
