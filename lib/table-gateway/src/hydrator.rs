//! Row to typed value conversion.

use std::marker::PhantomData;

use crate::{GatewayError, Row};

/// Builds a typed value from one result row.
///
/// Generated by `#[derive(Entity)]` and `#[derive(Dto)]` as an explicit
/// column to field map. Entities ignore columns outside their schema; DTOs
/// reject them with [`GatewayError::UnmappedColumn`].
pub trait Hydrate: Sized {
    /// Type name used in hydration errors.
    const TARGET: &'static str;

    fn hydrate(row: &Row) -> Result<Self, GatewayError>;
}

/// Raw rows plus the type they hydrate into.
///
/// Rows are kept as fetched; every read hydrates fresh values in the
/// original row order.
#[derive(Debug, Clone)]
pub struct HydratingResultSet<T> {
    rows: Vec<Row>,
    _target: PhantomData<fn() -> T>,
}

impl<T: Hydrate> HydratingResultSet<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            _target: PhantomData,
        }
    }

    pub fn initialize(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Option<T>, GatewayError> {
        self.rows.get(index).map(T::hydrate).transpose()
    }

    pub fn first(&self) -> Result<Option<T>, GatewayError> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<T, GatewayError>> + '_ {
        self.rows.iter().map(T::hydrate)
    }

    pub fn to_vec(&self) -> Result<Vec<T>, GatewayError> {
        self.iter().collect()
    }

    pub fn into_vec(self) -> Result<Vec<T>, GatewayError> {
        self.rows.iter().map(T::hydrate).collect()
    }
}

impl<T: Hydrate> Default for HydratingResultSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
