use anyhow::{Context, Result};
use prism_sql::Value;
use sea_query::Alias;

use crate::dialect::Dialect;
use crate::filter::Filter;
use crate::query::{Query, render, to_sea_value};

/// Builder for constructing UPDATE queries.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set_clauses: Vec<(String, Value)>,
    filters: Vec<Filter>,
    returning: Vec<String>,
    dialect: Dialect,
}

impl UpdateBuilder {
    /// Creates a new UPDATE query builder for `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_clauses: Vec::new(),
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

    /// Sets a column to a new value.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_clauses.push((column.into(), value.into()));
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Specifies columns to return from updated rows.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Returns `true` when at least one `RETURNING` column is declared.
    #[must_use]
    pub const fn has_returning(&self) -> bool {
        !self.returning.is_empty()
    }

    /// Build the UPDATE query.
    ///
    /// # Errors
    ///
    /// Returns an error if there is nothing to set or a value cannot be bound.
    pub fn build(self) -> Result<Query> {
        anyhow::ensure!(!self.set_clauses.is_empty(), "UPDATE {} sets no columns", self.table);

        let mut statement = sea_query::Query::update();
        statement.table(Alias::new(&self.table));

        for (column, value) in self.set_clauses {
            statement.value(Alias::new(column), to_sea_value(value)?);
        }

        for filter in self.filters {
            statement.and_where(filter.into_expr(&self.table)?);
        }

        for column in self.returning {
            statement.returning_col(Alias::new(column));
        }

        let query = render(&statement, self.dialect).context("rendering update")?;

        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(query)
    }
}
