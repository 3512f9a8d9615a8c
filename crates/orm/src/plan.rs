//! # Query Plans
//!
//! A plan is one executable unit: the statement, the execution context, the
//! result window and (for plans yielding objects) the [`ObjectBuilder`].
//! Every execution method consumes the plan, so a plan runs exactly once.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use prism_sql::Row;

use crate::builder::{ObjectBuilder, single};
use crate::config_error;
use crate::context::QueryContext;
use crate::query::Query;
use crate::select::SelectBuilder;

/// Executes a SELECT and builds its rows into `T`s.
pub struct SelectQueryPlan<T> {
    context: QueryContext,
    select: SelectBuilder,
    builder: Arc<dyn ObjectBuilder<T>>,
    first_result: u64,
    max_results: Option<u64>,
}

impl<T> SelectQueryPlan<T> {
    /// Plans `select`, letting `builder` declare its select items.
    #[must_use]
    pub fn new(context: QueryContext, select: SelectBuilder, builder: Arc<dyn ObjectBuilder<T>>) -> Self {
        let select = builder.apply_selects(select).dialect(context.dialect());
        Self { context, select, builder, first_result: 0, max_results: None }
    }

    /// Sets the `(first_result, max_results)` window applied at execution.
    #[must_use]
    pub const fn window(mut self, first_result: u64, max_results: Option<u64>) -> Self {
        self.first_result = first_result;
        self.max_results = max_results;
        self
    }

    /// The statement as it will execute, window included.
    #[must_use]
    pub fn statement(&self) -> SelectBuilder {
        self.select.clone().window(self.first_result, self.max_results)
    }

    /// The native SQL and parameters as they will execute.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be rendered.
    pub fn query(&self) -> Result<Query> {
        self.statement().build()
    }

    fn execute(self) -> Result<(Vec<Row>, Arc<dyn ObjectBuilder<T>>)> {
        let select = self.statement();
        let query = select.build()?;

        let rows = self
            .context
            .provider()
            .query(&query.sql, &query.params)
            .with_context(|| format!("executing select: {}", query.sql))?;
        tracing::debug!(rows = rows.len(), "select plan executed");

        let context = self.context.with_primary(select);
        let rows = self.builder.transform_rows(&context, rows)?;
        Ok((rows, self.builder))
    }

    /// Executes the query and returns every built object.
    ///
    /// # Errors
    ///
    /// Returns provider, transformation and builder errors unchanged.
    pub fn result_list(self) -> Result<Vec<T>> {
        let (rows, builder) = self.execute()?;
        let list = rows.into_iter().map(|row| builder.build(row)).collect::<Result<Vec<_>>>()?;
        builder.build_list(list)
    }

    /// Executes the query and returns its only object.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one object results.
    pub fn single_result(self) -> Result<T> {
        single(self.result_list()?)
    }

    /// Executes the query and builds objects lazily as the stream is consumed.
    ///
    /// # Errors
    ///
    /// Returns provider and transformation errors; builder errors surface per
    /// item.
    pub fn result_stream(self) -> Result<ResultStream<T>> {
        let (rows, builder) = self.execute()?;
        Ok(ResultStream { rows: rows.into_iter(), builder })
    }
}

/// Lazily built results of a [`SelectQueryPlan`].
pub struct ResultStream<T> {
    rows: std::vec::IntoIter<Row>,
    builder: Arc<dyn ObjectBuilder<T>>,
}

impl<T> Iterator for ResultStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| self.builder.build(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// Executes an INSERT, UPDATE or DELETE and reports the affected row count.
#[derive(Debug)]
pub struct ModificationQueryPlan {
    context: QueryContext,
    query: Query,
}

impl ModificationQueryPlan {
    /// Plans an already built statement.
    #[must_use]
    pub const fn new(context: QueryContext, query: Query) -> Self {
        Self { context, query }
    }

    /// The native SQL as it will execute.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.query.sql
    }

    /// Executes the statement.
    ///
    /// # Errors
    ///
    /// Returns provider errors unchanged.
    pub fn execute_update(self) -> Result<u64> {
        let count = self
            .context
            .provider()
            .exec(&self.query.sql, &self.query.params)
            .with_context(|| format!("executing update: {}", self.query.sql))?;
        tracing::debug!(count, "modification plan executed");
        Ok(count)
    }
}

/// Objects returned by a DML `RETURNING` statement plus the affected row
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturningResult<T> {
    results: Vec<T>,
    update_count: u64,
}

impl<T> ReturningResult<T> {
    /// Objects built from the returned rows, windowed.
    #[must_use]
    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Consumes the result, returning the built objects.
    #[must_use]
    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    /// Number of rows the statement affected.
    #[must_use]
    pub const fn update_count(&self) -> u64 {
        self.update_count
    }
}

/// Executes a DML statement with a `RETURNING` clause.
///
/// Providers may collapse single-column returning rows to bare values; the
/// plan re-wraps those before building so builders always see rows.
pub struct ReturningModificationQueryPlan<T> {
    context: QueryContext,
    query: Query,
    builder: Arc<dyn ObjectBuilder<T>>,
    first_result: u64,
    max_results: Option<u64>,
}

impl<T> ReturningModificationQueryPlan<T> {
    /// Plans an already built statement.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the dialect has no `RETURNING`.
    pub fn new(
        context: QueryContext, query: Query, builder: Arc<dyn ObjectBuilder<T>>,
    ) -> Result<Self> {
        if !context.dialect().supports_returning() {
            bail!(config_error!("{} does not support RETURNING clauses", context.dialect()));
        }
        Ok(Self { context, query, builder, first_result: 0, max_results: None })
    }

    /// Sets the `(first_result, max_results)` window applied to the returned
    /// rows.
    #[must_use]
    pub const fn window(mut self, first_result: u64, max_results: Option<u64>) -> Self {
        self.first_result = first_result;
        self.max_results = max_results;
        self
    }

    /// Executes the statement, building every returned row.
    ///
    /// # Errors
    ///
    /// Returns provider and builder errors unchanged.
    pub fn result_list(self) -> Result<ReturningResult<T>> {
        let returned = self
            .context
            .provider()
            .query_returning(&self.query.sql, &self.query.params)
            .with_context(|| format!("executing returning statement: {}", self.query.sql))?;

        let update_count = u64::try_from(returned.len()).unwrap_or(u64::MAX);
        let collapsed = returned.iter().filter(|row| row.is_scalar()).count();
        if collapsed > 0 {
            tracing::debug!(collapsed, "re-wrapping collapsed returning rows");
        }

        let skip = usize::try_from(self.first_result).unwrap_or(usize::MAX);
        let take = self
            .max_results
            .map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(usize::MAX));
        let rows: Vec<Row> =
            returned.into_iter().map(prism_sql::ResultRow::into_row).skip(skip).take(take).collect();

        let rows = self.builder.transform_rows(&self.context, rows)?;
        let list = rows.into_iter().map(|row| self.builder.build(row)).collect::<Result<Vec<_>>>()?;
        let results = self.builder.build_list(list)?;

        Ok(ReturningResult { results, update_count })
    }

    /// Executes the statement, which must return exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one row is returned.
    pub fn single_result(self) -> Result<ReturningResult<T>> {
        let ReturningResult { results, update_count } = self.result_list()?;
        let result = single(results)?;
        Ok(ReturningResult { results: vec![result], update_count })
    }
}
