//! Connection configuration and the adapter connection lifecycle.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Adapter, GatewayError};

/// Connection configuration for database backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// Connect using a database URL string.
    Url(String),
}

impl ConnectionConfig {
    pub fn url(&self) -> &str {
        match self {
            ConnectionConfig::Url(url) => url,
        }
    }
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

/// Pool settings for an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub connection: ConnectionConfig,
    /// Upper bound on pooled connections (default: `16`).
    pub max_connections: u32,
    /// How long to wait for a free connection (default: `30s`).
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

    pub fn new(connection: impl Into<ConnectionConfig>) -> Self {
        Self {
            connection: connection.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(Self::DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                         | Default    |
    /// |---------------------------------|------------|
    /// | `DATABASE_URL`                  | (required) |
    /// | `DATABASE_MAX_CONNECTIONS`      | `16`       |
    /// | `DATABASE_ACQUIRE_TIMEOUT_SECS` | `30`       |
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| GatewayError::Configuration("DATABASE_URL is not set".to_string()))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                GatewayError::Configuration(format!("DATABASE_MAX_CONNECTIONS: {e}"))
            })?,
            None => Self::DEFAULT_MAX_CONNECTIONS,
        };

        let acquire_timeout_secs = match lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                GatewayError::Configuration(format!("DATABASE_ACQUIRE_TIMEOUT_SECS: {e}"))
            })?,
            None => Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
        };

        Ok(Self::new(url)
            .with_max_connections(max_connections)
            .with_acquire_timeout(Duration::from_secs(acquire_timeout_secs)))
    }
}

impl From<ConnectionConfig> for DatabaseConfig {
    fn from(connection: ConnectionConfig) -> Self {
        Self::new(connection)
    }
}

impl From<&str> for DatabaseConfig {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for DatabaseConfig {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// Connection and schema lifecycle of a pooled adapter.
#[async_trait]
pub trait AdapterConnection: Adapter + Sized {
    /// Open a pool using the provided configuration.
    async fn connect(config: impl Into<DatabaseConfig> + Send) -> Result<Self, GatewayError>;

    /// Apply the migrations found in `migrations`.
    async fn initialize(&self, migrations: &Path) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config =
            DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/media")]))
                .unwrap();

        assert_eq!(config.connection.url(), "postgres://localhost/media");
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/media"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("DATABASE_ACQUIRE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_url_and_bad_numbers_fail() {
        assert_matches!(
            DatabaseConfig::from_lookup(lookup(&[])),
            Err(GatewayError::Configuration(_))
        );
        assert_matches!(
            DatabaseConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/media"),
                ("DATABASE_MAX_CONNECTIONS", "many"),
            ])),
            Err(GatewayError::Configuration(msg)) if msg.starts_with("DATABASE_MAX_CONNECTIONS")
        );
    }
}
