//! Locating and rewriting the proxy's systemd unit, and restarting it
//!
//! Writes take effect only after `systemctl daemon-reload` followed by
//! `systemctl restart <service>`; callers must treat write+reload as one
//! logical step.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use mtpanel_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Standard unit search locations, in lookup order.
pub const UNIT_SEARCH_PATHS: &[&str] = &[
    "/etc/systemd/system",
    "/lib/systemd/system",
    "/usr/lib/systemd/system",
];

/// Bound on each systemctl invocation.
const SERVICE_CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

/// Allowed service name characters: alphanumeric, hyphen, underscore, dot.
/// Prevents argument injection via the service name field.
fn is_safe_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Access to the service definition file and the service manager.
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Whole-file read of the unit definition.
    async fn read_unit(&self) -> Result<String>;

    /// Whole-file replace of the unit definition.
    async fn write_unit(&self, content: &str) -> Result<()>;

    /// Reload unit definitions and restart the managed service.
    async fn reload_and_restart(&self) -> Result<()>;
}

/// systemd-backed [`UnitStore`] for one named service on the local host.
pub struct SystemdUnitStore {
    service_name: String,
    search_paths: Vec<PathBuf>,
}

impl SystemdUnitStore {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            search_paths: UNIT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Override the search paths, for tests or non-standard installations.
    pub fn with_search_paths(
        service_name: impl Into<String>,
        search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            search_paths,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Find the unit file, also trying the lowercased service name.
    pub fn locate(&self) -> Result<PathBuf> {
        let candidates = [
            format!("{}.service", self.service_name),
            format!("{}.service", self.service_name.to_lowercase()),
        ];
        for base in &self.search_paths {
            for name in &candidates {
                let path = base.join(name);
                if path.is_file() {
                    debug!(path = %path.display(), "located service unit");
                    return Ok(path);
                }
            }
        }
        Err(Error::ServiceNotFound(self.service_name.clone()))
    }

    async fn systemctl(&self, args: &[&str]) -> Result<()> {
        let command = format!("systemctl {}", args.join(" "));

        let output: Output = tokio::time::timeout(
            SERVICE_CONTROL_TIMEOUT,
            Command::new("systemctl").args(args).output(),
        )
        .await
        .map_err(|_| Error::service_control(&command, "timed out"))?
        .map_err(|e| Error::service_control(&command, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                output.status.to_string()
            } else {
                format!("{} ({})", stderr.trim(), output.status)
            };
            return Err(Error::service_control(&command, message));
        }

        Ok(())
    }
}

#[async_trait]
impl UnitStore for SystemdUnitStore {
    async fn read_unit(&self) -> Result<String> {
        let path = self.locate()?;
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    async fn write_unit(&self, content: &str) -> Result<()> {
        let path = self.locate()?;
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn reload_and_restart(&self) -> Result<()> {
        if !is_safe_service_name(&self.service_name) {
            return Err(Error::service_control(
                "systemctl restart",
                format!("invalid service name {:?}", self.service_name),
            ));
        }

        self.systemctl(&["daemon-reload"]).await?;
        self.systemctl(&["restart", &self.service_name]).await?;
        info!(service = %self.service_name, "service restarted");
        Ok(())
    }
}
