//! Parameterized SQL builders.
//!
//! Builders are consumed by value: every call takes the builder and hands it
//! back, so a half-built query can be cloned and specialized. Nothing touches
//! the database until `execute`.
//!
//! Conditions use `?` for bound values. At `build` time every `?` is rewritten
//! to the adapter's placeholder syntax and the values are collected, in text
//! order, into [`Statement::params`](crate::Statement). Values are never
//! written into the SQL text, with one exception: [`Value::Null`] renders as
//! the literal `NULL` so that backends never have to guess its column type.

mod condition;
mod delete;
mod insert;
mod select;
mod update;

pub use condition::{Conditional, Conditions};
pub use delete::Delete;
pub use insert::{Insert, OnConflict};
pub use select::{Column, Select};
pub use update::Update;

use crate::{Dialect, Statement, StatementKind, Value};

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Counts `?` placeholders outside single-quoted literals.
pub(crate) fn count_placeholders(fragment: &str) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for c in fragment.chars() {
        match c {
            '\'' => quoted = !quoted,
            '?' if !quoted => count += 1,
            _ => {}
        }
    }
    count
}

/// Accumulates SQL text and bound parameters for one statement.
pub(crate) struct SqlWriter {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Writes a placeholder for `value`, or `NULL`.
    pub(crate) fn bind(&mut self, value: &Value) {
        if value.is_null() {
            self.sql.push_str("NULL");
            return;
        }
        self.params.push(value.clone());
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    /// Writes `fragment`, binding `values` to its `?` placeholders in order.
    ///
    /// Callers check the placeholder count beforehand; surplus values are
    /// ignored and surplus placeholders are left as written.
    pub(crate) fn push_fragment(&mut self, fragment: &str, values: &[Value]) {
        let mut values = values.iter();
        let mut quoted = false;
        for c in fragment.chars() {
            match c {
                '\'' => {
                    quoted = !quoted;
                    self.sql.push(c);
                }
                '?' if !quoted => match values.next() {
                    Some(value) => self.bind(value),
                    None => self.sql.push(c),
                },
                _ => self.sql.push(c),
            }
        }
    }

    pub(crate) fn push_list<'a, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push_str(item);
        }
    }

    pub(crate) fn finish(self, kind: StatementKind, returning: bool) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            kind,
            returning,
        }
    }
}
