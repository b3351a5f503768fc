//! Per-table façade over the query builders, an adapter and hydration.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    Adapter, Conditional, Delete, Entity, GatewayError, Hydrate, HydratingResultSet, Insert, Row,
    Select, Update, Value, WriteResult,
};

/// Generic gateway for one entity's table.
///
/// Table-specific gateways wrap one of these and add their own fetches.
pub struct TableGateway<E> {
    adapter: Arc<dyn Adapter>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for TableGateway<E> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> TableGateway<E> {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        E::TABLE
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// `SELECT <entity columns> FROM <table>`, ready for conditions.
    pub fn select(&self) -> Select {
        Select::new()
            .from(E::TABLE)
            .columns(E::columns().iter().copied())
    }

    pub async fn fetch_entities(&self, select: Select) -> Result<Vec<E>, GatewayError> {
        self.fetch_projection(select).await
    }

    /// First row of `select`, if any.
    pub async fn fetch_entity(&self, select: Select) -> Result<Option<E>, GatewayError> {
        let rows = select.limit(1).execute(self.adapter()).await?;
        HydratingResultSet::<E>::new().initialize(rows).first()
    }

    /// Rows of an arbitrary query hydrated into `T`, in result order.
    pub async fn fetch_projection<T: Hydrate>(
        &self,
        select: Select,
    ) -> Result<Vec<T>, GatewayError> {
        let rows = select.execute(self.adapter()).await?;
        tracing::trace!(table = E::TABLE, rows = rows.len(), into = T::TARGET, "hydrating");
        HydratingResultSet::<T>::new().initialize(rows).into_vec()
    }

    fn check_key(key: &[Value]) -> Result<(), GatewayError> {
        if key.len() != E::PRIMARY_KEY.len() {
            return Err(GatewayError::KeyArity {
                table: E::TABLE,
                expected: E::PRIMARY_KEY.len(),
                actual: key.len(),
            });
        }
        Ok(())
    }

    fn filter_by_key<C: Conditional>(builder: C, key: &[Value]) -> C {
        E::PRIMARY_KEY
            .iter()
            .zip(key)
            .fold(builder, |builder, (column, value)| {
                builder.eq(column, value.clone())
            })
    }

    pub async fn fetch_by_id(&self, id: impl Into<Value>) -> Result<Option<E>, GatewayError> {
        self.fetch_by_key(&[id.into()]).await
    }

    /// Fetch by a full primary key, one value per key column.
    pub async fn fetch_by_key(&self, key: &[Value]) -> Result<Option<E>, GatewayError> {
        Self::check_key(key)?;
        self.fetch_entity(Self::filter_by_key(self.select(), key))
            .await
    }

    /// All rows where `column = value`.
    pub async fn fetch_by(
        &self,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<E>, GatewayError> {
        self.fetch_entities(self.select().eq(column, value)).await
    }

    /// Insert `row` and read the stored entity back.
    ///
    /// `NULL` columns are left out of the statement so the table's defaults
    /// apply. Returns `None` when the backend reports no inserted row. Without
    /// `RETURNING` the row is re-read by the primary key found in `row`, or by
    /// the backend's last insert id for a single generated key.
    pub async fn insert(&self, mut row: Row) -> Result<Option<E>, GatewayError> {
        row.retain(|_, value| !value.is_null());
        let result = Insert::into_table(E::TABLE)
            .set(row.clone())
            .returning(E::columns().iter().copied())
            .execute(self.adapter())
            .await?;

        if !result.success() {
            return Ok(None);
        }
        if let Some(record) = result.inserted_record() {
            return E::hydrate(record).map(Some);
        }

        match Self::inserted_key(&row, &result) {
            Some(key) => self.fetch_by_key(&key).await,
            None => {
                tracing::warn!(
                    table = E::TABLE,
                    "inserted row has no readable key; returning the written values"
                );
                E::from_row(&row).map(Some)
            }
        }
    }

    fn inserted_key(row: &Row, result: &WriteResult) -> Option<Vec<Value>> {
        let key: Vec<Value> = E::PRIMARY_KEY
            .iter()
            .filter_map(|column| row.get(column).filter(|v| !v.is_null()).cloned())
            .collect();
        if key.len() == E::PRIMARY_KEY.len() {
            return Some(key);
        }
        match (E::PRIMARY_KEY.len(), result.inserted_id) {
            (1, Some(id)) => i64::try_from(id).ok().map(|id| vec![Value::Int(id)]),
            _ => None,
        }
    }

    pub async fn update_by_id(
        &self,
        id: impl Into<Value>,
        row: Row,
    ) -> Result<WriteResult, GatewayError> {
        self.update_by_key(&[id.into()], row).await
    }

    pub async fn update_by_key(
        &self,
        key: &[Value],
        row: Row,
    ) -> Result<WriteResult, GatewayError> {
        Self::check_key(key)?;
        Self::filter_by_key(Update::for_table(E::TABLE).set_row(row), key)
            .execute(self.adapter())
            .await
    }

    pub async fn delete_by_id(&self, id: impl Into<Value>) -> Result<WriteResult, GatewayError> {
        self.delete_by_key(&[id.into()]).await
    }

    pub async fn delete_by_key(&self, key: &[Value]) -> Result<WriteResult, GatewayError> {
        Self::check_key(key)?;
        Self::filter_by_key(Delete::for_table(E::TABLE), key)
            .execute(self.adapter())
            .await
    }
}
