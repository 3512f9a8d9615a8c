//! Default `SQLite` provider
//!
//! This is a lightweight implementation for development and tests.

#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(missing_docs)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use rusqlite::types::ValueRef;
use rusqlite::{Connection as SqliteConnection, params_from_iter};
use tracing::instrument;

use crate::row::Row;
use crate::traits::{Backend, Provider};
use crate::value::Value;

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

impl crate::traits::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// `SQLite` backed [`Provider`].
#[derive(Debug, Clone)]
pub struct SqlDefault {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<SqliteConnection>>,
}

impl Backend for SqlDefault {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn = Arc::new(parking_lot::Mutex::new(
            SqliteConnection::open(&options.database).context("failed to open SQLite database")?,
        ));

        Ok(Self { conn })
    }
}

impl SqlDefault {
    /// Runs a batch of `;`-separated statements without parameters, e.g. to
    /// create a schema.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Provider for SqlDefault {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!("executing query: {}", sql);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;

        let sqlite_params = params.iter().map(value_to_rusqlite).collect::<Result<Vec<_>>>()?;
        let column_count = stmt.column_count();

        let mut rows =
            stmt.query(params_from_iter(sqlite_params.iter())).context("failed to execute query")?;

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next().context("failed to fetch row")? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).context("failed to get column value")?;
                values.push(rusqlite_to_value(value)?);
            }
            result_rows.push(Row::new(values));
        }

        Ok(result_rows)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::debug!("executing statement: {}", sql);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;

        let sqlite_params = params.iter().map(value_to_rusqlite).collect::<Result<Vec<_>>>()?;

        let rows_affected = stmt
            .execute(params_from_iter(sqlite_params.iter()))
            .context("failed to execute statement")?;

        Ok(rows_affected as u64)
    }
}

fn value_to_rusqlite(value: &Value) -> Result<rusqlite::types::Value> {
    Ok(match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Int(i) => rusqlite::types::Value::Integer(*i),
        Value::Double(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Timestamp(ts) => rusqlite::types::Value::Text(ts.to_rfc3339()),
        Value::Collection(_) | Value::View(_) => {
            anyhow::bail!("cannot bind a {:?} value as a SQL parameter", value.kind())
        }
    })
}

fn rusqlite_to_value(value: ValueRef) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Double(f)),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(Value::Text(s.to_string()))
        }
        ValueRef::Blob(b) => Ok(Value::Bytes(b.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn sqlite_operations() {
        let provider = SqlDefault::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
        .expect("connect");

        let rows_affected = provider
            .exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[])
            .expect("create table");
        assert_eq!(rows_affected, 0);

        let rows_affected = provider
            .exec("INSERT INTO users (name, age) VALUES (?, ?)", &["Alice".into(), 30.into()])
            .expect("insert");
        assert_eq!(rows_affected, 1);

        let rows_affected = provider
            .exec("INSERT INTO users (name, age) VALUES (?, ?)", &["Bob".into(), 25.into()])
            .expect("insert");
        assert_eq!(rows_affected, 1);

        let rows =
            provider.query("SELECT id, name, age FROM users ORDER BY name", &[]).expect("query");
        assert_eq!(rows, vec![row![1, "Alice", 30], row![2, "Bob", 25]]);
    }

    #[test]
    fn returning_rows_stay_wrapped() {
        let provider = SqlDefault::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
        .expect("connect");
        provider
            .execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT)")
            .expect("schema");

        let rows = provider
            .query_returning("INSERT INTO tags (name) VALUES (?) RETURNING id", &["rust".into()])
            .expect("insert returning");
        assert_eq!(rows, vec![crate::ResultRow::Tuple(row![1])]);
    }

    #[test]
    fn collections_are_not_bindable() {
        let value = Value::Collection(crate::Collection::List(vec![]));
        value_to_rusqlite(&value).expect_err("collections cannot be bound");
    }
}
