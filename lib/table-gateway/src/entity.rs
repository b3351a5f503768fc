//! Schema-bound entities and projection DTOs.
//!
//! Implement with `#[derive(Entity)]` / `#[derive(Dto)]`:
//!
//! ```text
//! #[derive(Debug, Clone, Default, Entity, Validate)]
//! #[entity(table = "tag")]
//! pub struct Tag {
//!     #[column(key)]
//!     pub tag_id: String,
//!     pub tenant_id: String,
//!     #[column(trim)]
//!     #[validate(length(min = 1, max = 255))]
//!     pub name: String,
//!     pub created_dt: Option<DateTime<Utc>>,
//! }
//! ```
//!
//! Use `#[column(name = "custom_name")]` to override the column name and
//! `#[column(skip)]` to keep a field out of the schema.

use std::collections::BTreeMap;

use validator::{Validate, ValidationErrors};

use crate::{GatewayError, Hydrate, Row, Value};

/// A record mirroring one table row.
///
/// The schema is the ordered column list; an entity never carries values
/// outside it.
pub trait Entity: Hydrate + Default + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    /// Primary key columns, in key order.
    const PRIMARY_KEY: &'static [&'static str];

    /// Schema columns, in declaration order.
    fn columns() -> &'static [&'static str];

    /// Value of a schema column; `None` for names outside the schema.
    fn get(&self, column: &str) -> Option<Value>;

    /// Assign a schema column.
    fn set(&mut self, column: &str, value: Value) -> Result<(), GatewayError>;

    /// Copy of the entity with exactly the schema's columns, in order.
    fn object_copy(&self) -> Row;

    /// Apply the declared input filters (trimming) in place.
    fn apply_filters(&mut self) {}

    /// Reset to schema defaults, then take every schema column present in
    /// `row`. Columns outside the schema are ignored.
    fn exchange_object(&mut self, row: &Row) -> Result<(), GatewayError> {
        let mut fresh = Self::default();
        for (column, value) in row.iter() {
            if Self::columns().contains(&column) {
                fresh.set(column, value.clone())?;
            }
        }
        *self = fresh;
        Ok(())
    }

    fn from_row(row: &Row) -> Result<Self, GatewayError> {
        let mut entity = Self::default();
        entity.exchange_object(row)?;
        Ok(entity)
    }

    /// Primary key values in key order.
    fn primary_key(&self) -> Vec<Value> {
        Self::PRIMARY_KEY
            .iter()
            .map(|column| self.get(column).unwrap_or(Value::Null))
            .collect()
    }
}

/// A flat projection of a join or aggregate query.
pub trait Dto: Hydrate {
    /// Output column aliases, one per field.
    fn fields() -> &'static [&'static str];
}

/// Entity validation over the `validator` rule set, after input filters.
pub trait ValidatedEntity: Entity + Validate {
    /// Filtered copy of the entity, or the failed rules.
    fn validated(&self) -> Result<Self, ValidationErrors> {
        let mut filtered = self.clone();
        filtered.apply_filters();
        filtered.validate()?;
        Ok(filtered)
    }

    fn is_valid(&self) -> bool {
        self.validated().is_ok()
    }

    /// Field name to failure messages; empty when valid.
    fn messages(&self) -> BTreeMap<String, Vec<String>> {
        match self.validated() {
            Ok(_) => BTreeMap::new(),
            Err(errors) => validation_messages(&errors),
        }
    }
}

impl<T: Entity + Validate> ValidatedEntity for T {}

/// Flatten `validator` errors into field name to message lists.
pub fn validation_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, failures)| {
            let messages = failures
                .iter()
                .map(|failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => failure.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// In-place trimming used by `#[column(trim)]`.
#[doc(hidden)]
pub trait TrimFilter {
    fn trim_in_place(&mut self);
}

impl TrimFilter for String {
    fn trim_in_place(&mut self) {
        let trimmed = self.trim();
        if trimmed.len() != self.len() {
            *self = trimmed.to_string();
        }
    }
}

impl TrimFilter for Option<String> {
    fn trim_in_place(&mut self) {
        if let Some(value) = self {
            value.trim_in_place();
        }
    }
}
