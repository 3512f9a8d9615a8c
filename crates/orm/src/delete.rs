use anyhow::{Context, Result};
use sea_query::Alias;

use crate::dialect::Dialect;
use crate::filter::Filter;
use crate::query::{Query, render};

/// Builder for constructing DELETE queries.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    filters: Vec<Filter>,
    returning: Vec<String>,
    dialect: Dialect,
}

impl DeleteBuilder {
    /// Creates a new DELETE query builder for `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            returning: Vec::new(),
            dialect: Dialect::default(),
        }
    }

    /// Sets the dialect the statement is rendered for.
    #[must_use]
    pub const fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Specifies columns to return from deleted rows.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build the DELETE query.
    ///
    /// # Errors
    ///
    /// Returns an error if any filter value cannot be bound.
    pub fn build(self) -> Result<Query> {
        let mut statement = sea_query::Query::delete();
        statement.from_table(Alias::new(&self.table));

        for filter in self.filters {
            statement.and_where(filter.into_expr(&self.table)?);
        }

        for column in self.returning {
            statement.returning_col(Alias::new(column));
        }

        let query = render(&statement, self.dialect).context("rendering delete")?;

        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "DeleteBuilder generated SQL"
        );

        Ok(query)
    }
}
