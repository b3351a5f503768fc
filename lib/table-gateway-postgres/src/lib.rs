//! PostgreSQL adapter for table-gateway.
//!
//! # Usage
//!
//! ```text
//! use std::sync::Arc;
//! use table_gateway::{AdapterConnection, DatabaseConfig};
//! use table_gateway_postgres::PgAdapter;
//!
//! let adapter = PgAdapter::connect(DatabaseConfig::from_env()?).await?;
//! adapter.initialize(Path::new("migrations")).await?;
//! let store = Store::new(Arc::new(adapter));
//! ```
//!
//! Statements with `RETURNING` (and every SELECT) fetch rows; everything
//! else reports the affected row count. Column values are decoded by their
//! PostgreSQL type name.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod adapter;
mod row;

pub use adapter::{PgAdapter, PgTransaction};
pub use row::{bind_params, decode_row};

// Re-export sqlx migration types
pub use sqlx::migrate;
pub use sqlx::migrate::Migrator;
