//! MySQL implementation of `Adapter`.

use std::ops::Deref;
use std::path::Path;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::mysql::MySqlPoolOptions;
use table_gateway::{
    Adapter, AdapterConnection, DatabaseConfig, Dialect, GatewayError, QueryResult, Statement,
};

use crate::{bind_params, decode_row};

/// Wrapper around sqlx::MySqlPool that implements `Adapter`.
#[derive(Clone, Debug)]
pub struct MySqlAdapter(sqlx::MySqlPool);

impl MySqlAdapter {
    /// Create a new adapter from an sqlx MySqlPool.
    pub fn new(pool: sqlx::MySqlPool) -> Self {
        Self(pool)
    }

    /// Get the inner sqlx::MySqlPool.
    pub fn inner(&self) -> &sqlx::MySqlPool {
        &self.0
    }
}

impl Deref for MySqlAdapter {
    type Target = sqlx::MySqlPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl Adapter for MySqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult, GatewayError> {
        let args = bind_params(&statement.params)?;
        tracing::debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            kind = statement.kind.as_str(),
            "executing statement"
        );

        if statement.returns_rows() {
            let rows = sqlx::query_with(&statement.sql, args)
                .fetch_all(&self.0)
                .await
                .map_err(GatewayError::database)?;
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
            return Ok(QueryResult::with_rows(rows));
        }

        let result = sqlx::query_with(&statement.sql, args)
            .execute(&self.0)
            .await
            .map_err(GatewayError::database)?;
        let mut normalized = QueryResult::affected(result.rows_affected());
        // 0 means the table has no AUTO_INCREMENT column
        normalized.last_insert_id = Some(result.last_insert_id()).filter(|id| *id != 0);
        Ok(normalized)
    }
}

#[async_trait]
impl AdapterConnection for MySqlAdapter {
    async fn connect(config: impl Into<DatabaseConfig> + Send) -> Result<Self, GatewayError> {
        let config = config.into();
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(config.connection.url())
            .await
            .map_err(GatewayError::database)?;
        tracing::info!(max_connections = config.max_connections, "connected to MySQL");
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
