//! The contract between built statements and a database backend.

use async_trait::async_trait;

use crate::{GatewayError, Row, Value};

/// SQL dialect spoken by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// Positional placeholder for the `n`th (1-based) bound parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::MySql => "?".to_string(),
        }
    }

    /// Whether `INSERT/UPDATE/DELETE ... RETURNING` is available.
    pub fn supports_returning(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

/// A fully rendered, parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: StatementKind,
    /// The statement carries a `RETURNING` clause.
    pub returning: bool,
}

impl Statement {
    /// Whether the backend should fetch rows rather than only execute.
    pub fn returns_rows(&self) -> bool {
        self.kind == StatementKind::Select || self.returning
    }
}

/// Normalized result of running one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Auto-increment id reported by backends without `RETURNING`.
    pub last_insert_id: Option<u64>,
}

impl QueryResult {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            rows,
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
            last_insert_id: None,
        }
    }
}

/// Outcome of an INSERT, UPDATE or DELETE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteResult {
    /// Rows produced by `RETURNING`, empty otherwise.
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub inserted_id: Option<u64>,
}

impl WriteResult {
    pub fn success(&self) -> bool {
        self.affected_rows > 0
    }

    /// First returned row, when the statement asked for one.
    pub fn inserted_record(&self) -> Option<&Row> {
        self.rows.first()
    }
}

impl From<QueryResult> for WriteResult {
    fn from(result: QueryResult) -> Self {
        // RETURNING rows count as affected when the driver reports zero
        let affected_rows = result.rows_affected.max(result.rows.len() as u64);
        Self {
            rows: result.rows,
            affected_rows,
            inserted_id: result.last_insert_id,
        }
    }
}

/// Executes parameterized SQL against one backend.
///
/// Implemented by pooled connections and by open transactions, so gateways
/// can be built over either.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn query(&self, statement: &Statement) -> Result<QueryResult, GatewayError>;
}
