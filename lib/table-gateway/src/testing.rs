//! In-memory adapter for unit tests.
//!
//! Queue the results the code under test should see, run it, then inspect
//! the statements it sent:
//!
//! ```text
//! let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![row]));
//! let tags = TagTable::new(mock.clone());
//! tags.fetch_by_id("t1").await?;
//! assert_eq!(mock.statements()[0].sql, "SELECT ...");
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::{Adapter, Dialect, GatewayError, QueryResult, Row, Statement};

/// Driver error produced by [`MockAdapter::append_error`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct MockError(pub String);

#[derive(Debug)]
pub struct MockAdapter {
    dialect: Dialect,
    results: Mutex<VecDeque<Result<QueryResult, MockError>>>,
    log: Mutex<Vec<Statement>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAdapter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            results: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result. Once the queue is drained every statement gets an
    /// empty result.
    pub fn append_result(self, result: QueryResult) -> Self {
        lock(&self.results).push_back(Ok(result));
        self
    }

    pub fn append_rows(self, rows: Vec<Row>) -> Self {
        self.append_result(QueryResult::with_rows(rows))
    }

    pub fn append_exec(self, rows_affected: u64, last_insert_id: Option<u64>) -> Self {
        self.append_result(QueryResult {
            rows: Vec::new(),
            rows_affected,
            last_insert_id,
        })
    }

    pub fn append_error(self, message: impl Into<String>) -> Self {
        lock(&self.results).push_back(Err(MockError(message.into())));
        self
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        lock(&self.log).clone()
    }

    pub fn last_statement(&self) -> Option<Statement> {
        lock(&self.log).last().cloned()
    }

    /// Results queued but not yet consumed.
    pub fn pending(&self) -> usize {
        lock(&self.results).len()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult, GatewayError> {
        lock(&self.log).push(statement.clone());
        match lock(&self.results).pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(error)) => Err(GatewayError::database(error)),
            None => Ok(QueryResult::default()),
        }
    }
}
