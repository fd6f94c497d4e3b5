//! SQLx/SQLite implementation of the core `ProxyStore` trait

mod common;
mod sqlite;

pub use sqlite::SqliteProxyStore;
