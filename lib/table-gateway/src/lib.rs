//! Table Gateway - typed data access over pluggable SQL backends.
//!
//! # Core Concepts
//!
//! - **Query builders** ([`Select`], [`Insert`], [`Update`], [`Delete`]):
//!   by-value builders rendering parameterized SQL for a [`Dialect`].
//! - **Adapter** ([`Adapter`]): executes a [`Statement`] and normalizes the
//!   driver's result into a [`QueryResult`].
//! - **Hydration** ([`Hydrate`], [`HydratingResultSet`]): raw [`Row`]s into
//!   entities and DTOs.
//! - **Entities and DTOs** ([`Entity`], [`Dto`]): schema-bound records and
//!   flat query projections, usually derived.
//! - **Table gateway** ([`TableGateway`]): per-table fetches and writes.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

// Derived impls refer to `table_gateway::...`, including inside this crate.
extern crate self as table_gateway;

mod adapter;
mod config;
mod entity;
mod error;
mod gateway;
mod hydrator;
mod pagination;
mod query;
pub mod time;
mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::{Adapter, Dialect, QueryResult, Statement, StatementKind, WriteResult};
pub use config::{AdapterConnection, ConnectionConfig, DatabaseConfig};
pub use entity::{Dto, Entity, TrimFilter, ValidatedEntity, validation_messages};
pub use error::{BoxError, GatewayError, PlaceholderMismatch};
pub use gateway::TableGateway;
pub use hydrator::{Hydrate, HydratingResultSet};
pub use pagination::Page;
pub use query::{
    Column, Conditional, Conditions, Delete, Insert, OnConflict, Order, Select, Update,
};
pub use value::{FromValue, Row, Value};

// Re-export derive macros
pub use table_gateway_derive::{Dto, Entity};
