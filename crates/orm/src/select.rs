use anyhow::{Context, Result};
use sea_query::{Alias, Asterisk, ColumnRef, IntoIden, Order, SelectStatement, SimpleExpr};

use crate::dialect::Dialect;
use crate::filter::{Column, Filter};
use crate::join::{Join, JoinSpec};
use crate::query::{Query, render};

/// Where a SELECT reads from.
#[derive(Debug, Clone)]
enum Source {
    Table { name: String, alias: Option<String> },
    Subquery { select: Box<SelectBuilder>, alias: String },
}

/// Builder for constructing SELECT queries.
///
/// Unqualified columns in items, filters and ordering resolve against the
/// source's alias, or its table name when no alias is set.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    source: Source,
    items: Vec<(SimpleExpr, Option<String>)>,
    filters: Vec<Filter>,
    joins: Vec<Join>,
    order: Vec<(Column, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    dialect: Dialect,
}

impl SelectBuilder {
    /// Creates a new SELECT query builder reading from `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_source(Source::Table { name: table.into(), alias: None })
    }

    /// Creates a SELECT reading from a derived table: `FROM (select) AS alias`.
    #[must_use]
    pub fn from_subquery(select: Self, alias: impl Into<String>) -> Self {
        Self::with_source(Source::Subquery { select: Box::new(select), alias: alias.into() })
    }

    const fn with_source(source: Source) -> Self {
        Self {
            source,
            items: Vec::new(),
            filters: Vec::new(),
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            dialect: Dialect::Postgres,
        }
    }

    /// Sets an alias for the source table.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        match &mut self.source {
            Source::Table { alias: current, .. } => *current = Some(alias.into()),
            Source::Subquery { alias: current, .. } => *current = alias.into(),
        }
        self
    }

    /// Sets the dialect the query is rendered for.
    #[must_use]
    pub const fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Selects a column.
    #[must_use]
    pub fn column(mut self, column: impl Into<Column>) -> Self {
        let column = column.into();
        let expr = SimpleExpr::Column(column.resolve(self.reference()));
        self.items.push((expr, None));
        self
    }

    /// Selects a column under an alias.
    #[must_use]
    pub fn column_as(mut self, column: impl Into<Column>, alias: impl Into<String>) -> Self {
        let column = column.into();
        let expr = SimpleExpr::Column(column.resolve(self.reference()));
        self.items.push((expr, Some(alias.into())));
        self
    }

    /// Selects an arbitrary expression under an alias.
    #[must_use]
    pub fn expr_as(mut self, expr: SimpleExpr, alias: impl Into<String>) -> Self {
        self.items.push((expr, Some(alias.into())));
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Applies a `(first_result, max_results)` window.
    #[must_use]
    pub const fn window(mut self, first_result: u64, max_results: Option<u64>) -> Self {
        self.offset = if first_result > 0 { Some(first_result) } else { None };
        self.limit = max_results;
        self
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<Column>) -> Self {
        self.order.push((column.into(), Order::Asc));
        self
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<Column>) -> Self {
        self.order.push((column.into(), Order::Desc));
        self
    }

    /// Adds a JOIN clause to the query.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// The name unqualified columns resolve against.
    #[must_use]
    pub fn reference(&self) -> &str {
        match &self.source {
            Source::Table { name, alias } => alias.as_deref().unwrap_or(name),
            Source::Subquery { alias, .. } => alias,
        }
    }

    /// Number of select items declared so far.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The configured dialect.
    #[must_use]
    pub const fn target_dialect(&self) -> Dialect {
        self.dialect
    }

    /// Builds the ``SeaQuery`` statement, e.g. to embed it as a subquery.
    ///
    /// # Errors
    ///
    /// Returns an error if a filter value cannot be bound.
    pub fn statement(&self) -> Result<SelectStatement> {
        let reference = self.reference().to_string();
        let mut statement = sea_query::Query::select();

        if self.items.is_empty() {
            statement.column(Asterisk);
        }
        for (expr, alias) in &self.items {
            match alias {
                Some(alias) => statement.expr_as(expr.clone(), Alias::new(alias)),
                None => statement.expr(expr.clone()),
            };
        }

        match &self.source {
            Source::Table { name, alias: Some(alias) } => {
                statement.from_as(Alias::new(name), Alias::new(alias));
            }
            Source::Table { name, alias: None } => {
                statement.from(Alias::new(name));
            }
            Source::Subquery { select, alias } => {
                statement.from_subquery(select.statement()?, Alias::new(alias));
            }
        }

        for join in self.joins.iter().cloned() {
            let JoinSpec { table, alias, on, kind } = join.into_join_spec(&reference)?;
            let table_alias = Alias::new(table);
            if let Some(alias) = alias {
                statement.join_as(kind, table_alias, Alias::new(alias), on);
            } else {
                statement.join(kind, table_alias, on);
            }
        }

        for filter in self.filters.iter().cloned() {
            statement.and_where(filter.into_expr(&reference)?);
        }

        if let Some(limit) = self.limit {
            statement.limit(limit);
        }

        if let Some(offset) = self.offset {
            statement.offset(offset);
        }

        for (column, order) in &self.order {
            statement.order_by(column.resolve(&reference), order.clone());
        }

        Ok(statement)
    }

    /// Build the SELECT query.
    ///
    /// # Errors
    ///
    /// Returns an error if query values cannot be converted.
    pub fn build(&self) -> Result<Query> {
        let statement = self.statement()?;
        let query = render(&statement, self.dialect).context("rendering select")?;

        tracing::debug!(
            table = self.reference(),
            sql = %query.sql,
            param_count = query.params.len(),
            "SelectBuilder generated SQL"
        );

        Ok(query)
    }
}

/// A `table.column` reference.
#[must_use]
pub fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}
