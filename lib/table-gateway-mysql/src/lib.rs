//! MySQL adapter for table-gateway.
//!
//! MySQL has no `RETURNING`; inserts report `last_insert_id` instead and
//! table gateways re-read inserted rows by key.
//!
//! ```text
//! use table_gateway::AdapterConnection;
//! use table_gateway_mysql::MySqlAdapter;
//!
//! let adapter = MySqlAdapter::connect("mysql://localhost/media").await?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod adapter;
mod row;

pub use adapter::MySqlAdapter;
pub use row::{bind_params, decode_row};
