use super::{Conditional, Conditions, SqlWriter};
use crate::{Adapter, Dialect, GatewayError, Statement, StatementKind, WriteResult};

/// A DELETE builder. Building without a condition is refused.
#[derive(Debug, Clone, Default)]
pub struct Delete {
    table: Option<String>,
    conditions: Conditions,
    returning: Vec<String>,
}

impl Delete {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
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
            GatewayError::Configuration("DELETE requires a table".to_string())
        })?;
        self.conditions.check()?;
        if self.conditions.is_empty() {
            return Err(GatewayError::UnboundedWrite {
                statement: "DELETE",
                table: table.to_string(),
            });
        }

        let mut writer = SqlWriter::new(dialect);
        writer.push("DELETE FROM ");
        writer.push(table);
        self.conditions.write("WHERE", &mut writer);

        let returning = dialect.supports_returning() && !self.returning.is_empty();
        if returning {
            writer.push(" RETURNING ");
            writer.push_list(self.returning.iter().map(String::as_str));
        }

        Ok(writer.finish(StatementKind::Delete, returning))
    }

    pub async fn execute(&self, adapter: &dyn Adapter) -> Result<WriteResult, GatewayError> {
        let statement = self.build(adapter.dialect())?;
        Ok(adapter.query(&statement).await?.into())
    }
}

impl Conditional for Delete {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}
