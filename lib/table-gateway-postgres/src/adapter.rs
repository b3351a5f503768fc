//! PostgreSQL implementation of `Adapter`.

use std::ops::Deref;
use std::path::Path;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Postgres, Transaction};
use table_gateway::{
    Adapter, AdapterConnection, DatabaseConfig, Dialect, GatewayError, QueryResult, Statement,
};
use tokio::sync::Mutex;

use crate::{bind_params, decode_row};

/// Run one statement on any PostgreSQL executor.
async fn run<'c, E>(executor: E, statement: &Statement) -> Result<QueryResult, GatewayError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let args = bind_params(&statement.params)?;
    tracing::debug!(
        sql = %statement.sql,
        params = statement.params.len(),
        kind = statement.kind.as_str(),
        "executing statement"
    );

    if statement.returns_rows() {
        let rows = sqlx::query_with(&statement.sql, args)
            .fetch_all(executor)
            .await
            .map_err(GatewayError::database)?;
        let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult::with_rows(rows))
    } else {
        let result = sqlx::query_with(&statement.sql, args)
            .execute(executor)
            .await
            .map_err(GatewayError::database)?;
        Ok(QueryResult::affected(result.rows_affected()))
    }
}

/// Wrapper around sqlx::PgPool that implements `Adapter`.
#[derive(Clone, Debug)]
pub struct PgAdapter(sqlx::PgPool);

impl PgAdapter {
    /// Create a new adapter from an sqlx PgPool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self(pool)
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.0
    }

    /// Begin a transaction. Gateways built over the returned adapter run
    /// inside it until `commit` or `rollback`.
    pub async fn begin(&self) -> Result<PgTransaction, GatewayError> {
        let tx = self.0.begin().await.map_err(GatewayError::database)?;
        Ok(PgTransaction {
            tx: Mutex::new(Some(tx)),
        })
    }
}

impl Deref for PgAdapter {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl Adapter for PgAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult, GatewayError> {
        run(&self.0, statement).await
    }
}

#[async_trait]
impl AdapterConnection for PgAdapter {
    async fn connect(config: impl Into<DatabaseConfig> + Send) -> Result<Self, GatewayError> {
        let config = config.into();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(config.connection.url())
            .await
            .map_err(GatewayError::database)?;
        tracing::info!(
            max_connections = config.max_connections,
            "connected to PostgreSQL"
        );
        Ok(Self(pool))
    }

    async fn initialize(&self, migrations: &Path) -> Result<(), GatewayError> {
        let migrator = Migrator::new(migrations.to_path_buf())
            .await
            .map_err(|e| GatewayError::Migration(e.to_string()))?;
        migrator
            .run(&self.0)
            .await
            .map_err(|e| GatewayError::Migration(e.to_string()))?;
        tracing::info!(path = %migrations.display(), "migrations applied");
        Ok(())
    }
}

/// An open PostgreSQL transaction usable as an `Adapter`.
///
/// Dropping it without `commit` rolls back.
pub struct PgTransaction {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

fn finished() -> GatewayError {
    GatewayError::Configuration("transaction already committed or rolled back".to_string())
}

impl PgTransaction {
    pub async fn commit(&self) -> Result<(), GatewayError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit().await.map_err(GatewayError::database)
    }

    pub async fn rollback(&self) -> Result<(), GatewayError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.rollback().await.map_err(GatewayError::database)
    }
}

#[async_trait]
impl Adapter for PgTransaction {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult, GatewayError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        run(&mut **tx, statement).await
    }
}
