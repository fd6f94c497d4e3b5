//! Core domain types for the MTProto proxy admin panel

pub mod error;
pub mod execline;
pub mod link;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use execline::ExecConfig;
pub use link::LinkScheme;
pub use state::ProxyStore;
pub use types::{Admin, ProxyRecord};
