use super::{Conditional, Conditions, Order, SqlWriter};
use crate::{Adapter, Dialect, GatewayError, Page, Row, Statement, StatementKind, Value};

/// A projected column: a raw expression, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    expression: String,
    alias: Option<String>,
}

impl Column {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            alias: None,
        }
    }

    pub fn aliased(alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            alias: Some(alias.into()),
        }
    }

    fn is_star(&self) -> bool {
        self.alias.is_none() && self.expression == "*"
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expression, alias),
            None => self.expression.clone(),
        }
    }
}

impl From<&str> for Column {
    fn from(expression: &str) -> Self {
        Column::new(expression)
    }
}

impl From<String> for Column {
    fn from(expression: String) -> Self {
        Column::new(expression)
    }
}

impl From<&String> for Column {
    fn from(expression: &String) -> Self {
        Column::new(expression.clone())
    }
}

/// `(alias, expression)`
impl From<(&str, &str)> for Column {
    fn from((alias, expression): (&str, &str)) -> Self {
        Column::aliased(alias, expression)
    }
}

impl From<(String, String)> for Column {
    fn from((alias, expression): (String, String)) -> Self {
        Column::aliased(alias, expression)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    relation: String,
    on: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnionKind {
    Distinct,
    All,
}

/// A SELECT query builder.
///
/// ```ignore
/// let rows = Select::new()
///     .from_as("t", "tag", ["t.tag_id", "t.name"])
///     .columns([("asset_count", "COUNT(at.file_id)::BIGINT")])
///     .join_left("at", "asset_tag", "at.tag_id = t.tag_id")
///     .eq("t.tenant_id", tenant_id)
///     .group_by("t.tag_id")
///     .group_by("t.name")
///     .order("t.name", Order::Asc)
///     .execute(adapter)
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Select {
    from: Option<String>,
    columns: Vec<Column>,
    joins: Vec<Join>,
    conditions: Conditions,
    group_by: Vec<String>,
    having: Conditions,
    order: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    unions: Vec<(UnionKind, Select)>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select from `table`. Without explicit columns the projection is `*`.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Select from `table AS alias` projecting `columns`.
    pub fn from_as<I, C>(mut self, alias: &str, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.from = Some(format!("{table} AS {alias}"));
        self.columns(columns)
    }

    /// Add projected columns. Repeated expressions are kept once.
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        for column in columns.into_iter().map(Into::into) {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        if self.columns.iter().any(Column::is_star) {
            self.columns.retain(Column::is_star);
        }
        self
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        alias: &str,
        table: &str,
        on: impl Into<String>,
    ) -> Self {
        self.joins.push(Join {
            kind,
            relation: format!("{table} AS {alias}"),
            on: on.into(),
        });
        self
    }

    /// `INNER JOIN table AS alias ON on`. The join condition binds nothing.
    pub fn join(self, alias: &str, table: &str, on: impl Into<String>) -> Self {
        self.push_join(JoinKind::Inner, alias, table, on)
    }

    pub fn join_left(self, alias: &str, table: &str, on: impl Into<String>) -> Self {
        self.push_join(JoinKind::Left, alias, table, on)
    }

    pub fn join_right(self, alias: &str, table: &str, on: impl Into<String>) -> Self {
        self.push_join(JoinKind::Right, alias, table, on)
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// AND a HAVING condition with exactly one `?`.
    pub fn having(mut self, condition: impl Into<String>, value: impl Into<Value>) -> Self {
        self.having.and(condition.into(), vec![value.into()]);
        self
    }

    pub fn order(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn paginate(self, page: Page) -> Self {
        self.limit(page.limit()).offset(page.offset())
    }

    /// `UNION` with another select. Its ordering and limits are dropped;
    /// this query's apply to the combined result.
    pub fn union(mut self, other: Select) -> Self {
        self.unions.push((UnionKind::Distinct, other));
        self
    }

    pub fn union_all(mut self, other: Select) -> Self {
        self.unions.push((UnionKind::All, other));
        self
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.from.is_none() {
            return Err(GatewayError::Configuration(
                "SELECT requires a FROM table".to_string(),
            ));
        }
        self.conditions.check()?;
        self.having.check()?;
        for (_, other) in &self.unions {
            other.check()?;
        }
        Ok(())
    }

    fn write_body(&self, writer: &mut SqlWriter) {
        writer.push("SELECT ");
        if self.columns.is_empty() {
            writer.push("*");
        } else {
            let rendered: Vec<String> = self.columns.iter().map(Column::render).collect();
            writer.push_list(rendered.iter().map(String::as_str));
        }

        if let Some(from) = &self.from {
            writer.push(" FROM ");
            writer.push(from);
        }

        for join in &self.joins {
            writer.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
                JoinKind::Right => " RIGHT JOIN ",
            });
            writer.push(&join.relation);
            writer.push(" ON ");
            writer.push(&join.on);
        }

        self.conditions.write("WHERE", writer);

        if !self.group_by.is_empty() {
            writer.push(" GROUP BY ");
            writer.push_list(self.group_by.iter().map(String::as_str));
        }

        self.having.write("HAVING", writer);
    }

    fn write_tail(&self, writer: &mut SqlWriter) {
        if !self.order.is_empty() {
            let rendered: Vec<String> = self
                .order
                .iter()
                .map(|(column, order)| format!("{column} {}", order.as_str()))
                .collect();
            writer.push(" ORDER BY ");
            writer.push_list(rendered.iter().map(String::as_str));
        }
        if let Some(limit) = self.limit {
            writer.push(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            writer.push(&format!(" OFFSET {offset}"));
        }
    }

    /// A LIMIT wider than one row, or any OFFSET, without ORDER BY.
    /// `LIMIT 1` alone is a keyed lookup and does not count.
    fn is_unordered_page(&self) -> bool {
        let paged = self.offset.is_some() || self.limit.is_some_and(|limit| limit > 1);
        paged && self.order.is_empty()
    }

    /// Render the statement for `dialect`.
    pub fn build(&self, dialect: Dialect) -> Result<Statement, GatewayError> {
        self.check()?;

        if self.is_unordered_page() {
            tracing::warn!(
                from = self.from.as_deref().unwrap_or_default(),
                limit = self.limit,
                offset = self.offset,
                "LIMIT/OFFSET without ORDER BY; row order is not deterministic"
            );
        }

        let mut writer = SqlWriter::new(dialect);
        if self.unions.is_empty() {
            self.write_body(&mut writer);
        } else {
            writer.push("(");
            self.write_body(&mut writer);
            writer.push(")");
            for (kind, other) in &self.unions {
                writer.push(match kind {
                    UnionKind::Distinct => " UNION (",
                    UnionKind::All => " UNION ALL (",
                });
                other.write_body(&mut writer);
                writer.push(")");
            }
        }
        self.write_tail(&mut writer);

        Ok(writer.finish(StatementKind::Select, false))
    }

    pub async fn execute(&self, adapter: &dyn Adapter) -> Result<Vec<Row>, GatewayError> {
        let statement = self.build(adapter.dialect())?;
        Ok(adapter.query(&statement).await?.rows)
    }
}

impl Conditional for Select {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}
