//! # Provider Traits
//!
//! The contracts a database must satisfy to execute prism queries.

use std::fmt::Debug;

use anyhow::Result;

use crate::row::{ResultRow, Row};
use crate::value::Value;

/// Executes rendered SQL against a database.
///
/// Providers are synchronous: a call blocks until every row is available or
/// the database reports an error, which is propagated unchanged. Secondary
/// (correlated) queries issued while transforming a result go through the same
/// provider, so they observe the same session state as the primary query.
pub trait Provider: Debug + Send + Sync {
    /// Runs a query and returns its rows in provider order.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Runs a DML statement with a `RETURNING` clause.
    ///
    /// The default implementation delegates to [`Provider::query`] and so never
    /// collapses rows. Providers whose driver drops the wrapper of
    /// single-column rows report those as [`ResultRow::Scalar`].
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn query_returning(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>> {
        Ok(self.query(sql, params)?.into_iter().map(ResultRow::Tuple).collect())
    }
}

/// Implemented by providers that can be connected from configuration.
pub trait Backend: Sized + Send + Sync {
    /// The options used to connect to the backend.
    type ConnectOptions: FromEnv;

    /// Connect using options loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be loaded or the connection fails.
    fn connect() -> Result<Self> {
        Self::connect_with(Self::ConnectOptions::from_env()?)
    }

    /// Connect with the specified options.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    fn connect_with(options: Self::ConnectOptions) -> Result<Self>;
}

/// Trait for creating options from environment variables.
pub trait FromEnv: Sized {
    /// Create options from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    fn from_env() -> Result<Self>;
}
