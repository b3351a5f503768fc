use thiserror::Error;

/// Boxed driver error carried unmodified through the gateway layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A condition whose `?` placeholders do not line up with its bound values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMismatch {
    pub condition: String,
    pub placeholders: usize,
    pub values: usize,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Placeholder mismatch in `{}`: {} placeholder(s) for {} value(s)",
        .0.condition, .0.placeholders, .0.values
    )]
    Placeholder(PlaceholderMismatch),

    #[error("Refusing {statement} on {table} without a WHERE clause")]
    UnboundedWrite {
        statement: &'static str,
        table: String,
    },

    #[error("Unknown field `{field}` on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("Column `{column}` has no matching field on {target}")]
    UnmappedColumn { target: &'static str, column: String },

    #[error("Column `{column}`: expected {expected}, found {found}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Key for {table} needs {expected} column(s), got {actual}")]
    KeyArity {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Database error: {0}")]
    Database(#[source] BoxError),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl GatewayError {
    /// Wrap a driver error without altering it.
    pub fn database<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GatewayError::Database(Box::new(error))
    }

    /// The driver error behind a `Database` failure, if it is of type `E`.
    pub fn database_source<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            GatewayError::Database(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
