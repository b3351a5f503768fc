use super::{Conditional, Conditions, SqlWriter};
use crate::{Adapter, Dialect, GatewayError, Row, Statement, StatementKind, Value, WriteResult};

#[derive(Debug, Clone)]
enum Assignment {
    Bound(Value),
    Raw(String),
}

/// An UPDATE builder. Building without a condition is refused.
#[derive(Debug, Clone, Default)]
pub struct Update {
    table: Option<String>,
    assignments: Vec<(String, Assignment)>,
    conditions: Conditions,
    returning: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    fn assign(mut self, column: String, assignment: Assignment) -> Self {
        match self.assignments.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = assignment,
            None => self.assignments.push((column, assignment)),
        }
        self
    }

    pub fn set(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assign(column.into(), Assignment::Bound(value.into()))
    }

    pub fn set_row(self, row: Row) -> Self {
        row.into_iter()
            .fold(self, |update, (column, value)| update.set(column, value))
    }

    /// `column = expression`, written verbatim.
    pub fn set_raw(self, column: impl Into<String>, expression: impl Into<String>) -> Self {
        self.assign(column.into(), Assignment::Raw(expression.into()))
    }

    pub fn increment(self, column: &str, amount: i64) -> Self {
        self.set_raw(column, format!("{column} + {amount}"))
    }

    pub fn decrement(self, column: &str, amount: i64) -> Self {
        self.set_raw(column, format!("{column} - {amount}"))
    }

    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn build(&self, dialect: Dialect) -> Result<Statement, GatewayError> {
        let table = self.table.as_deref().ok_or_else(|| {
            GatewayError::Configuration("UPDATE requires a table".to_string())
        })?;
        if self.assignments.is_empty() {
            return Err(GatewayError::Configuration(format!(
                "UPDATE {table} requires at least one SET column"
            )));
        }
        self.conditions.check()?;
        if self.conditions.is_empty() {
            return Err(GatewayError::UnboundedWrite {
                statement: "UPDATE",
                table: table.to_string(),
            });
        }

        let mut writer = SqlWriter::new(dialect);
        writer.push("UPDATE ");
        writer.push(table);
        writer.push(" SET ");
        for (i, (column, assignment)) in self.assignments.iter().enumerate() {
            if i > 0 {
                writer.push(", ");
            }
            writer.push(column);
            writer.push(" = ");
            match assignment {
                Assignment::Bound(value) => writer.bind(value),
                Assignment::Raw(expression) => writer.push(expression),
            }
        }
        self.conditions.write("WHERE", &mut writer);

        let returning = writer.dialect().supports_returning() && !self.returning.is_empty();
        if returning {
            writer.push(" RETURNING ");
            writer.push_list(self.returning.iter().map(String::as_str));
        }

        Ok(writer.finish(StatementKind::Update, returning))
    }

    pub async fn execute(&self, adapter: &dyn Adapter) -> Result<WriteResult, GatewayError> {
        let statement = self.build(adapter.dialect())?;
        Ok(adapter.query(&statement).await?.into())
    }
}

impl Conditional for Update {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}
