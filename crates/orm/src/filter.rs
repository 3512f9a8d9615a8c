use anyhow::Result;
use prism_sql::Value;
use sea_query::{ColumnRef, Expr, ExprTrait, SimpleExpr};

use crate::query::to_sea_value;
use crate::select::{SelectBuilder, table_column};

/// A column reference, optionally qualified by a table name or alias.
///
/// Unqualified columns resolve against the default table of the statement
/// they are used in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    table: Option<String>,
    name: String,
}

impl Column {
    /// An unqualified column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { table: None, name: name.into() }
    }

    /// A column qualified by table name or alias.
    #[must_use]
    pub fn of(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self { table: Some(table.into()), name: name.into() }
    }

    /// The column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn resolve(&self, default_table: &str) -> ColumnRef {
        table_column(self.table.as_deref().unwrap_or(default_table), &self.name)
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Filter represents database predicates without exposing ``SeaQuery`` types.
///
/// Values are prism [`Value`]s and are only converted when the owning
/// statement is built, so unbindable values (collections, views) surface as
/// build errors.
#[derive(Debug, Clone)]
pub enum Filter {
    /// column = value
    Eq(Column, Value),
    /// column != value
    Ne(Column, Value),
    /// column > value
    Gt(Column, Value),
    /// column >= value
    Gte(Column, Value),
    /// column < value
    Lt(Column, Value),
    /// column <= value
    Lte(Column, Value),
    /// column IN (values)
    In(Column, Vec<Value>),
    /// column NOT IN (values)
    NotIn(Column, Vec<Value>),
    /// column IN (SELECT ...)
    InSubquery(Column, Box<SelectBuilder>),
    /// column IS NULL
    IsNull(Column),
    /// column IS NOT NULL
    IsNotNull(Column),
    /// column LIKE pattern
    Like(Column, String),
    /// column NOT LIKE pattern
    NotLike(Column, String),
    /// column BETWEEN low AND high
    Between(Column, Value, Value),
    /// Column-to-column comparison: left = right
    ColEq(Column, Column),
    /// Logical AND of multiple filters
    And(Vec<Self>),
    /// Logical OR of multiple filters
    Or(Vec<Self>),
    /// Logical NOT of a filter
    Not(Box<Self>),
}

impl Filter {
    /// Convert Filter to ``SeaQuery`` ``SimpleExpr``, resolving unqualified
    /// columns against `default_table`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be bound or a subquery fails to build.
    pub fn into_expr(self, default_table: &str) -> Result<SimpleExpr> {
        let col = |column: &Column| -> SimpleExpr { Expr::col(column.resolve(default_table)).into() };

        let expr = match self {
            Self::Eq(column, val) => col(&column).eq(to_sea_value(val)?),
            Self::Ne(column, val) => col(&column).ne(to_sea_value(val)?),
            Self::Gt(column, val) => col(&column).gt(to_sea_value(val)?),
            Self::Gte(column, val) => col(&column).gte(to_sea_value(val)?),
            Self::Lt(column, val) => col(&column).lt(to_sea_value(val)?),
            Self::Lte(column, val) => col(&column).lte(to_sea_value(val)?),
            Self::In(column, vals) => col(&column).is_in(to_sea_values(vals)?),
            Self::NotIn(column, vals) => col(&column).is_not_in(to_sea_values(vals)?),
            Self::InSubquery(column, select) => {
                Expr::col(column.resolve(default_table)).in_subquery(select.statement()?)
            }
            Self::IsNull(column) => col(&column).is_null(),
            Self::IsNotNull(column) => col(&column).is_not_null(),
            Self::Like(column, pattern) => col(&column).like(pattern),
            Self::NotLike(column, pattern) => col(&column).not_like(pattern),
            Self::Between(column, low, high) => {
                col(&column).between(to_sea_value(low)?, to_sea_value(high)?)
            }
            Self::ColEq(left, right) => col(&left).eq(col(&right)),
            Self::And(filters) => {
                let mut exprs = Vec::with_capacity(filters.len());
                for filter in filters {
                    exprs.push(filter.into_expr(default_table)?);
                }
                let mut exprs = exprs.into_iter();
                exprs.next().map_or_else(
                    || Expr::value(true), // no filters, so all conditions satisfied, hence `true`
                    |first| exprs.fold(first, SimpleExpr::and),
                )
            }
            Self::Or(filters) => {
                let mut exprs = Vec::with_capacity(filters.len());
                for filter in filters {
                    exprs.push(filter.into_expr(default_table)?);
                }
                let mut exprs = exprs.into_iter();
                exprs.next().map_or_else(
                    || Expr::value(false), // no filters, so 0 conditions satisfied, hence `false`
                    |first| exprs.fold(first, SimpleExpr::or),
                )
            }
            Self::Not(filter) => Expr::expr(filter.into_expr(default_table)?).not(),
        };
        Ok(expr)
    }

    /// Creates an equality filter (column = value).
    #[must_use]
    pub fn eq(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Eq(column.into(), val.into())
    }

    /// Creates an inequality filter (column != value).
    #[must_use]
    pub fn ne(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Ne(column.into(), val.into())
    }

    /// Creates a greater-than filter (column > value).
    #[must_use]
    pub fn gt(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Gt(column.into(), val.into())
    }

    /// Creates a greater-than-or-equal filter (column >= value).
    #[must_use]
    pub fn gte(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Gte(column.into(), val.into())
    }

    /// Creates a less-than filter (column < value).
    #[must_use]
    pub fn lt(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Lt(column.into(), val.into())
    }

    /// Creates a less-than-or-equal filter (column <= value).
    #[must_use]
    pub fn lte(column: impl Into<Column>, val: impl Into<Value>) -> Self {
        Self::Lte(column.into(), val.into())
    }

    /// Creates an IN filter (column IN (values)).
    #[must_use]
    pub fn r#in(column: impl Into<Column>, vals: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::In(column.into(), vals.into_iter().map(Into::into).collect())
    }

    /// Creates a NOT IN filter (column NOT IN (values)).
    #[must_use]
    pub fn not_in(
        column: impl Into<Column>, vals: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self::NotIn(column.into(), vals.into_iter().map(Into::into).collect())
    }

    /// Creates a subquery membership filter (column IN (SELECT ...)).
    #[must_use]
    pub fn in_subquery(column: impl Into<Column>, select: SelectBuilder) -> Self {
        Self::InSubquery(column.into(), Box::new(select))
    }

    /// Creates an IS NULL filter.
    #[must_use]
    pub fn is_null(column: impl Into<Column>) -> Self {
        Self::IsNull(column.into())
    }

    /// Creates an IS NOT NULL filter.
    #[must_use]
    pub fn is_not_null(column: impl Into<Column>) -> Self {
        Self::IsNotNull(column.into())
    }

    /// Creates a LIKE filter with pattern matching.
    #[must_use]
    pub fn like(column: impl Into<Column>, pattern: impl Into<String>) -> Self {
        Self::Like(column.into(), pattern.into())
    }

    /// Creates a NOT LIKE filter with pattern matching.
    #[must_use]
    pub fn not_like(column: impl Into<Column>, pattern: impl Into<String>) -> Self {
        Self::NotLike(column.into(), pattern.into())
    }

    /// Creates a BETWEEN filter (column BETWEEN low AND high).
    #[must_use]
    pub fn between(
        column: impl Into<Column>, low: impl Into<Value>, high: impl Into<Value>,
    ) -> Self {
        Self::Between(column.into(), low.into(), high.into())
    }

    /// Compare two columns for equality, typically `owner.fk = related.id`.
    #[must_use]
    pub fn col_eq(left: impl Into<Column>, right: impl Into<Column>) -> Self {
        Self::ColEq(left.into(), right.into())
    }
}

fn to_sea_values(values: Vec<Value>) -> Result<Vec<sea_query::Value>> {
    values.into_iter().map(to_sea_value).collect()
}
