//! Configuration management for the mtpanel daemon

use crate::Result;
use mtpanel_core::LinkScheme;
use serde::{Deserialize, Serialize};

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Who may use the panel
    pub admins: AdminConfig,

    /// Managed proxy service and link rendering
    pub proxy: ProxyConfig,

    /// Record store location
    pub database: DatabaseConfig,

    /// Presentation-layer knobs
    pub panel: PanelConfig,
}

/// Admin allow-list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Telegram id of the owner; always authorized
    pub owner_id: i64,

    /// Additional authorized Telegram ids
    pub admin_ids: Vec<i64>,
}

impl AdminConfig {
    pub fn is_allowed(&self, telegram_id: i64) -> bool {
        telegram_id == self.owner_id || self.admin_ids.contains(&telegram_id)
    }

    pub fn is_owner(&self, telegram_id: i64) -> bool {
        telegram_id == self.owner_id
    }
}

/// Managed proxy service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// systemd service name (unit file `<service_name>.service`)
    pub service_name: String,

    /// Port used when the command line does not carry one
    pub default_port: u16,

    /// Fake-TLS domain used when the command line does not carry one
    pub tls_domain: Option<String>,

    /// Link surface: `deep` (tg://) or `web` (https://t.me/)
    pub link_scheme: LinkScheme,

    /// Plain-text IPv4 echo endpoint for public address discovery
    pub ip_echo_url: String,

    /// Public-IP lookup timeout in seconds
    pub lookup_timeout_secs: u64,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    pub url: String,
}

/// Presentation-layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Proxies per page in listings
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admins: AdminConfig::default(),
            proxy: ProxyConfig::default(),
            database: DatabaseConfig::default(),
            panel: PanelConfig::default(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            owner_id: 0,
            admin_ids: vec![],
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            service_name: "MTProxy".to_string(),
            default_port: 443,
            tls_domain: None,
            link_scheme: LinkScheme::Web,
            ip_echo_url: "https://api.ipify.org".to_string(),
            lookup_timeout_secs: 10,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://mtpanel.db".to_string(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { page_size: 6 }
    }
}

impl Settings {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("MTPANEL").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("admins.owner_id", defaults.admins.owner_id)?
            .set_default("admins.admin_ids", defaults.admins.admin_ids)?
            .set_default("proxy.service_name", defaults.proxy.service_name)?
            .set_default("proxy.default_port", i64::from(defaults.proxy.default_port))?
            .set_default("proxy.link_scheme", "web")?
            .set_default("proxy.ip_echo_url", defaults.proxy.ip_echo_url)?
            .set_default(
                "proxy.lookup_timeout_secs",
                defaults.proxy.lookup_timeout_secs as i64,
            )?
            .set_default("database.url", defaults.database.url)?
            .set_default("panel.page_size", i64::from(defaults.panel.page_size))?
            .add_source(config::Environment::with_prefix("MTPANEL").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
