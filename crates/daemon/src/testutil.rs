//! In-memory fakes shared by unit tests

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mtpanel_core::Result;

use crate::ip::IpResolver;
use crate::systemd::UnitStore;

/// A unit store over an in-memory string, counting writes and reloads.
pub struct MemoryUnitStore {
    unit: Mutex<String>,
    writes: AtomicUsize,
    reloads: AtomicUsize,
}

impl MemoryUnitStore {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: Mutex::new(unit.into()),
            writes: AtomicUsize::new(0),
            reloads: AtomicUsize::new(0),
        }
    }

    /// A realistic unit file carrying the given secrets.
    pub fn with_secrets(secrets: &[&str]) -> Self {
        let mut exec = "/usr/bin/mtproto-proxy -u nobody -p 443 -H 443".to_string();
        for s in secrets {
            exec.push_str(&format!(" -S {s}"));
        }
        Self::new(format!(
            "[Unit]\nDescription=MTProxy\n\n[Service]\nExecStart={exec}\nRestart=on-failure\n"
        ))
    }

    pub fn unit_text(&self) -> String {
        self.unit.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitStore for MemoryUnitStore {
    async fn read_unit(&self) -> Result<String> {
        Ok(self.unit.lock().unwrap().clone())
    }

    async fn write_unit(&self, content: &str) -> Result<()> {
        *self.unit.lock().unwrap() = content.to_string();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reload_and_restart(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Resolver pinned to one address; no network involved.
pub struct FixedIpResolver(pub Ipv4Addr);

#[async_trait]
impl IpResolver for FixedIpResolver {
    async fn public_ipv4(&self) -> Ipv4Addr {
        self.0
    }
}
