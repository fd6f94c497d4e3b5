//! Secret lifecycle: mutating the live proxy configuration
//!
//! Every operation re-reads the unit file; the manager never caches the
//! parsed command line. Mutations are serialized through an internal mutex
//! because the unit file offers no locking of its own. The mutex is never
//! held across network lookups.

use std::sync::Arc;

use mtpanel_core::{execline, ExecConfig, Result};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ProxyConfig;
use crate::systemd::UnitStore;

pub struct SecretLifecycleManager {
    unit: Arc<dyn UnitStore>,
    default_port: u16,
    default_tls_domain: Option<String>,
    write_lock: Mutex<()>,
}

impl SecretLifecycleManager {
    pub fn new(unit: Arc<dyn UnitStore>, proxy: &ProxyConfig) -> Self {
        Self {
            unit,
            default_port: proxy.default_port,
            default_tls_domain: proxy.tls_domain.clone(),
            write_lock: Mutex::new(()),
        }
    }

    /// Generate a fresh 128-bit secret as 32 lowercase hex characters.
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Current parsed command line, re-read from disk.
    pub async fn exec_config(&self) -> Result<ExecConfig> {
        let unit_text = self.unit.read_unit().await?;
        let line = execline::exec_start(&unit_text)?;
        execline::parse_exec_line(line)
    }

    /// Effective port and fake-TLS domain for link rendering, with
    /// configured defaults applied.
    pub async fn link_params(&self) -> Result<(u16, Option<String>)> {
        let cfg = self.exec_config().await?;
        let port = cfg.port.unwrap_or(self.default_port);
        let tls_domain = cfg.tls_domain.or_else(|| self.default_tls_domain.clone());
        Ok((port, tls_domain))
    }

    /// Install a secret into the live configuration.
    ///
    /// Generates one when `explicit` is `None`. Idempotent: a secret that is
    /// already installed is returned unchanged without touching the unit.
    pub async fn add_secret(&self, explicit: Option<String>) -> Result<String> {
        let secret = explicit.unwrap_or_else(Self::generate_secret);
        let installed = self.add_secrets(std::slice::from_ref(&secret)).await?;
        if installed == 0 {
            debug!("secret already installed, nothing to do");
        }
        Ok(secret)
    }

    /// Install every missing secret from `secrets` with a single
    /// write+reload. Returns how many were actually added.
    pub async fn add_secrets(&self, secrets: &[String]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let unit_text = self.unit.read_unit().await?;
        let line = execline::exec_start(&unit_text)?;
        let mut cfg = execline::parse_exec_line(line)?;

        let mut added = 0;
        for secret in secrets {
            if !cfg.secrets.contains(secret) {
                cfg.secrets.push(secret.clone());
                added += 1;
            }
        }
        if added == 0 {
            return Ok(0);
        }

        self.rewrite(&unit_text, &cfg).await?;
        info!(added, total = cfg.secrets.len(), "installed proxy secrets");
        Ok(added)
    }

    /// Remove a secret from the live configuration.
    ///
    /// Returns `false` without writing when the secret is not installed.
    pub async fn remove_secret(&self, secret: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let unit_text = self.unit.read_unit().await?;
        let line = execline::exec_start(&unit_text)?;
        let mut cfg = execline::parse_exec_line(line)?;

        let before = cfg.secrets.len();
        cfg.secrets.retain(|s| s != secret);
        if cfg.secrets.len() == before {
            return Ok(false);
        }

        self.rewrite(&unit_text, &cfg).await?;
        info!(total = cfg.secrets.len(), "removed proxy secret");
        Ok(true)
    }

    async fn rewrite(&self, unit_text: &str, cfg: &ExecConfig) -> Result<()> {
        let new_line = execline::build_exec_line(cfg);
        let new_unit = execline::replace_exec_start(unit_text, &new_line)?;
        self.unit.write_unit(&new_unit).await?;
        self.unit.reload_and_restart().await
    }
}
