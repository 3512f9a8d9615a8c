use anyhow::{Context, Result};
use prism_sql::Value;
use sea_query::{Alias, SimpleExpr};

use crate::dialect::Dialect;
use crate::query::{Query, render, to_sea_value};

/// Builder for constructing INSERT queries.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
    dialect: Dialect,
}

impl InsertBuilder {
    /// Creates a new INSERT query builder for `table` with the given columns.
    #[must_use]
    pub fn new<I, C>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
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

    /// Adds one row of values, positionally matching the columns.
    #[must_use]
    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Specifies columns to return from inserted rows.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning.push(column.into());
        self
    }

    /// Build the INSERT query.
    ///
    /// # Errors
    ///
    /// Returns an error if a row's arity differs from the column list or a
    /// value cannot be bound.
    pub fn build(self) -> Result<Query> {
        let mut statement = sea_query::Query::insert();
        statement.into_table(Alias::new(&self.table));
        statement.columns(self.columns.iter().map(Alias::new));

        for (index, row) in self.rows.into_iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(crate::Error::arity(
                    self.columns.len(),
                    row.len(),
                    format!("insert into {} (row {index})", self.table),
                )
                .into());
            }
            let exprs =
                row.into_iter().map(|value| to_sea_value(value).map(SimpleExpr::Value));
            statement.values(exprs.collect::<Result<Vec<_>>>()?)?;
        }

        for column in self.returning {
            statement.returning_col(Alias::new(column));
        }

        let query = render(&statement, self.dialect).context("rendering insert")?;

        tracing::debug!(
            table = %self.table,
            sql = %query.sql,
            param_count = query.params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(query)
    }
}
