//! Persistence core of a multi-tenant media store.
//!
//! # Layers
//!
//! - [`entity`] / [`dto`]: table records and join projections.
//! - [`Role`]: access levels on files and folders; [`secret`] hashes link
//!   tokens and link passwords.
//! - [`table`]: one gateway per table over a shared
//!   [`Adapter`](table_gateway::Adapter).
//! - [`service`]: tenant-scoped use cases for an authenticated [`Actor`].
//! - [`Store`]: wires the gateways and hands out services.
//!
//! ```text
//! let adapter = PgAdapter::connect(DatabaseConfig::from_env()?).await?;
//! adapter.initialize(&media_store::migrations(Dialect::Postgres)).await?;
//! let store = Store::new(Arc::new(adapter));
//! let tags = store.tags().list_tags(&actor).await?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod actor;
pub mod dto;
pub mod entity;
mod error;
mod role;
pub mod secret;
pub mod service;
mod store;
pub mod table;

pub use actor::Actor;
pub use error::ServiceError;
pub use role::Role;
pub use store::Store;

use std::path::PathBuf;

use table_gateway::Dialect;

/// Schema migrations for the tables addressed here, one directory per
/// dialect.
pub fn migrations(dialect: Dialect) -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    match dialect {
        Dialect::Postgres => root.join("postgres"),
        Dialect::MySql => root.join("mysql"),
    }
}

/// A new time-ordered record id.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
