use super::SqlWriter;
use crate::{Adapter, Dialect, GatewayError, Row, Statement, StatementKind, WriteResult};

/// What to do when an inserted row collides with a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflict {
    DoNothing,
    /// Overwrite `set` on the existing row. PostgreSQL needs the conflicting
    /// `target` columns; MySQL infers them from the violated key.
    Update { target: Vec<String>, set: Row },
}

/// An INSERT builder.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    table: Option<String>,
    rows: Vec<Row>,
    returning: Vec<String>,
    on_conflict: Option<OnConflict>,
}

impl Insert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Insert exactly `row`, discarding previously added rows.
    pub fn set(mut self, row: Row) -> Self {
        self.rows = vec![row];
        self
    }

    /// Append a row. Every row must carry the first row's columns.
    pub fn values(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Columns to read back. Ignored by dialects without `RETURNING`.
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn on_conflict(mut self, action: OnConflict) -> Self {
        self.on_conflict = Some(action);
        self
    }

    pub fn build(&self, dialect: Dialect) -> Result<Statement, GatewayError> {
        let table = self.table.as_deref().ok_or_else(|| {
            GatewayError::Configuration("INSERT requires a table".to_string())
        })?;
        let columns: Vec<&str> = match self.rows.first() {
            Some(row) if !row.is_empty() => row.columns().collect(),
            _ => {
                return Err(GatewayError::Configuration(format!(
                    "INSERT into {table} requires at least one column"
                )));
            }
        };

        let mut writer = SqlWriter::new(dialect);
        match (&self.on_conflict, dialect) {
            (Some(OnConflict::DoNothing), Dialect::MySql) => writer.push("INSERT IGNORE INTO "),
            _ => writer.push("INSERT INTO "),
        }
        writer.push(table);
        writer.push(" (");
        writer.push_list(columns.iter().copied());
        writer.push(") VALUES ");

        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(GatewayError::Configuration(format!(
                    "INSERT into {table}: row {i} has {} column(s), expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            if i > 0 {
                writer.push(", ");
            }
            writer.push("(");
            for (j, column) in columns.iter().enumerate() {
                let value = row.get(column).ok_or_else(|| {
                    GatewayError::Configuration(format!(
                        "INSERT into {table}: row {i} is missing column {column}"
                    ))
                })?;
                if j > 0 {
                    writer.push(", ");
                }
                writer.bind(value);
            }
            writer.push(")");
        }

        match &self.on_conflict {
            None => {}
            Some(OnConflict::DoNothing) => {
                if dialect == Dialect::Postgres {
                    writer.push(" ON CONFLICT DO NOTHING");
                }
            }
            Some(OnConflict::Update { target, set }) => {
                if set.is_empty() {
                    return Err(GatewayError::Configuration(format!(
                        "INSERT into {table}: conflict update sets no columns"
                    )));
                }
                match dialect {
                    Dialect::Postgres => {
                        if target.is_empty() {
                            return Err(GatewayError::Configuration(format!(
                                "INSERT into {table}: conflict update needs target columns"
                            )));
                        }
                        writer.push(" ON CONFLICT (");
                        writer.push_list(target.iter().map(String::as_str));
                        writer.push(") DO UPDATE SET ");
                    }
                    Dialect::MySql => writer.push(" ON DUPLICATE KEY UPDATE "),
                }
                for (i, (column, value)) in set.iter().enumerate() {
                    if i > 0 {
                        writer.push(", ");
                    }
                    writer.push(column);
                    writer.push(" = ");
                    writer.bind(value);
                }
            }
        }

        let returning = dialect.supports_returning() && !self.returning.is_empty();
        if returning {
            writer.push(" RETURNING ");
            writer.push_list(self.returning.iter().map(String::as_str));
        }

        Ok(writer.finish(StatementKind::Insert, returning))
    }

    pub async fn execute(&self, adapter: &dyn Adapter) -> Result<WriteResult, GatewayError> {
        let statement = self.build(adapter.dialect())?;
        Ok(adapter.query(&statement).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use assert_matches::assert_matches;

    fn tag_row() -> Row {
        Row::new()
            .with("tag_id", "t1")
            .with("tenant_id", "x")
            .with("name", "News")
    }

    #[test]
    fn insert_with_returning_on_postgres() {
        let statement = Insert::into_table("tag")
            .set(tag_row())
            .returning(["tag_id", "tenant_id", "name", "created_dt"])
            .build(Dialect::Postgres)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO tag (tag_id, tenant_id, name) VALUES ($1, $2, $3) \
             RETURNING tag_id, tenant_id, name, created_dt"
        );
        assert!(statement.returning);
        assert!(statement.returns_rows());
    }

    #[test]
    fn returning_is_dropped_on_mysql() {
        let statement = Insert::into_table("tag")
            .set(tag_row())
            .returning(["tag_id"])
            .build(Dialect::MySql)
            .unwrap();

        assert_eq!(statement.sql, "INSERT INTO tag (tag_id, tenant_id, name) VALUES (?, ?, ?)");
        assert!(!statement.returns_rows());
    }

    #[test]
    fn null_values_are_inlined() {
        let row = Row::new()
            .with("folder_id", "f1")
            .with("parent_folder_id", Value::Null);
        let statement = Insert::into_table("folder")
            .set(row)
            .build(Dialect::Postgres)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO folder (folder_id, parent_folder_id) VALUES ($1, NULL)"
        );
        assert_eq!(statement.params, vec![Value::from("f1")]);
    }

    #[test]
    fn batch_rows_follow_first_row_columns() {
        let statement = Insert::into_table("asset_tag")
            .values(Row::new().with("file_id", "a").with("tag_id", "t"))
            .values(Row::new().with("tag_id", "t").with("file_id", "b"))
            .build(Dialect::Postgres)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO asset_tag (file_id, tag_id) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(statement.params[2], Value::from("b"));
    }

    #[test]
    fn conflict_handling_per_dialect() {
        let ignore = Insert::into_table("asset_tag")
            .set(Row::new().with("file_id", "a").with("tag_id", "t"))
            .on_conflict(OnConflict::DoNothing);

        assert_eq!(
            ignore.build(Dialect::Postgres).unwrap().sql,
            "INSERT INTO asset_tag (file_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        assert_eq!(
            ignore.build(Dialect::MySql).unwrap().sql,
            "INSERT IGNORE INTO asset_tag (file_id, tag_id) VALUES (?, ?)"
        );

        let upsert = Insert::into_table("usage_daily")
            .set(Row::new().with("usage_id", "u").with("uploads_count", 1i64))
            .on_conflict(OnConflict::Update {
                target: vec!["usage_id".into()],
                set: Row::new().with("uploads_count", 2i64),
            });
        assert_eq!(
            upsert.build(Dialect::Postgres).unwrap().sql,
            "INSERT INTO usage_daily (usage_id, uploads_count) VALUES ($1, $2) \
             ON CONFLICT (usage_id) DO UPDATE SET uploads_count = $3"
        );
    }

    #[test]
    fn insert_without_columns_fails() {
        assert_matches!(
            Insert::into_table("tag").build(Dialect::Postgres),
            Err(GatewayError::Configuration(_))
        );
        assert_matches!(
            Insert::new().set(tag_row()).build(Dialect::Postgres),
            Err(GatewayError::Configuration(_))
        );
    }
}
