//! Admin panel daemon for an MTProto proxy managed through systemd
//!
//! The daemon owns the proxy-secret lifecycle: it rewrites the proxy
//! service's `ExecStart=` command line, restarts the service, keeps the
//! persisted proxy records in sync with it, and renders shareable links.

pub mod bootstrap;
pub mod config;
pub mod ip;
pub mod link;
pub mod manager;
pub mod panel;
pub mod reconcile;
pub mod systemd;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Settings;
pub use manager::SecretLifecycleManager;
pub use panel::Panel;
pub use reconcile::Reconciler;

/// Result type for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Daemon error types
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error(transparent)]
    Core(#[from] mtpanel_core::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller is not on the admin allow-list. Surfaces are expected to
    /// stay silent on this one.
    #[error("caller is not an authorized admin")]
    Unauthorized,

    /// Proxy creation requires the admin's tag prefix to be set first.
    #[error("a tag prefix must be set before creating proxies")]
    TagRequired,

    #[error("invalid tag prefix: {0}")]
    InvalidTag(String),
}
