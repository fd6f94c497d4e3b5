//! Error taxonomy shared across the workspace crates

/// Standard result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The unit file exists but its command line cannot be understood.
    #[error("malformed service configuration: {0}")]
    MalformedConfig(String),

    /// No unit file for the service exists in any search path.
    #[error("service unit not found: {0}")]
    ServiceNotFound(String),

    /// Reload or restart failed. The unit file may already carry the new
    /// secret set while the live process still runs the old one; callers
    /// must surface this as a degraded state.
    #[error("service control command `{command}` failed: {message}")]
    ServiceControl { command: String, message: String },

    #[error("state error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a malformed-config error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedConfig(message.into())
    }

    /// Create a service-control error
    pub fn service_control(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceControl {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::StateError(message.into())
    }
}
