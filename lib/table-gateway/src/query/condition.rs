use super::{SqlWriter, count_placeholders};
use crate::{GatewayError, Value, error::PlaceholderMismatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    And,
    Or,
}

#[derive(Debug, Clone)]
struct Predicate {
    conjunction: Conjunction,
    sql: String,
    values: Vec<Value>,
}

/// An ordered list of AND/OR predicates with their bound values.
///
/// A predicate whose placeholder count does not match its values is not
/// recorded; the first such mismatch is kept and reported at build time.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    predicates: Vec<Predicate>,
    mismatch: Option<PlaceholderMismatch>,
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.mismatch.is_none()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    fn push(&mut self, conjunction: Conjunction, sql: String, values: Vec<Value>) {
        let placeholders = count_placeholders(&sql);
        if placeholders != values.len() {
            if self.mismatch.is_none() {
                self.mismatch = Some(PlaceholderMismatch {
                    condition: sql,
                    placeholders,
                    values: values.len(),
                });
            }
            return;
        }
        self.predicates.push(Predicate {
            conjunction,
            sql,
            values,
        });
    }

    pub(crate) fn check(&self) -> Result<(), GatewayError> {
        match &self.mismatch {
            Some(mismatch) => Err(GatewayError::Placeholder(mismatch.clone())),
            None => Ok(()),
        }
    }

    /// Writes ` <keyword> ...`, or nothing when empty.
    ///
    /// An OR binds to the predicate before it; each run of OR-ed predicates
    /// is parenthesized, and runs are joined with AND, so
    /// `a AND b OR c` renders as `a AND (b OR c)`.
    pub(crate) fn write(&self, keyword: &str, writer: &mut SqlWriter) {
        let mut groups: Vec<Vec<&Predicate>> = Vec::new();
        for predicate in &self.predicates {
            match (predicate.conjunction, groups.last_mut()) {
                (Conjunction::Or, Some(group)) => group.push(predicate),
                _ => groups.push(vec![predicate]),
            }
        }

        for (i, group) in groups.iter().enumerate() {
            if i == 0 {
                writer.push(" ");
                writer.push(keyword);
                writer.push(" ");
            } else {
                writer.push(" AND ");
            }
            let grouped = group.len() > 1;
            if grouped {
                writer.push("(");
            }
            for (j, predicate) in group.iter().enumerate() {
                if j > 0 {
                    writer.push(" OR ");
                }
                writer.push_fragment(&predicate.sql, &predicate.values);
            }
            if grouped {
                writer.push(")");
            }
        }
    }

    pub(crate) fn and(&mut self, sql: String, values: Vec<Value>) {
        self.push(Conjunction::And, sql, values);
    }

    pub(crate) fn or(&mut self, sql: String, values: Vec<Value>) {
        self.push(Conjunction::Or, sql, values);
    }
}

fn in_list(column: &str, operator: &str, count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!("{column} {operator} ({placeholders})")
}

/// WHERE-clause methods shared by `Select`, `Update` and `Delete`.
pub trait Conditional: Sized {
    #[doc(hidden)]
    fn conditions_mut(&mut self) -> &mut Conditions;

    /// AND a condition with exactly one `?`.
    fn and_where(mut self, condition: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions_mut()
            .and(condition.into(), vec![value.into()]);
        self
    }

    /// AND a condition with one `?` per value.
    fn and_where_values<I, V>(mut self, condition: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions_mut().and(condition.into(), values);
        self
    }

    /// AND a condition that binds nothing.
    fn and_where_raw(mut self, condition: impl Into<String>) -> Self {
        self.conditions_mut().and(condition.into(), Vec::new());
        self
    }

    /// OR a condition with exactly one `?` onto the previous predicate.
    ///
    /// The pair renders parenthesized: `a AND b OR c` is `a AND (b OR c)`.
    fn or_where(mut self, condition: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions_mut().or(condition.into(), vec![value.into()]);
        self
    }

    /// `column = value`, or `column IS NULL` for a null value.
    fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_null(column);
        }
        self.and_where(format!("{column} = ?"), value)
    }

    fn is_null(self, column: &str) -> Self {
        self.and_where_raw(format!("{column} IS NULL"))
    }

    fn is_not_null(self, column: &str) -> Self {
        self.and_where_raw(format!("{column} IS NOT NULL"))
    }

    /// `column IN (...)`. An empty list matches no rows.
    fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.and_where_raw("1 = 0");
        }
        self.and_where_values(in_list(column, "IN", values.len()), values)
    }

    /// `column NOT IN (...)`. An empty list filters nothing.
    fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self;
        }
        self.and_where_values(in_list(column, "NOT IN", values.len()), values)
    }

    fn where_between(self, column: &str, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.and_where_values(
            format!("{column} BETWEEN ? AND ?"),
            [start.into(), end.into()],
        )
    }
}
