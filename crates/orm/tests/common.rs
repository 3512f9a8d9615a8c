//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use prism_orm::{Dialect, QueryContext};
use prism_sql::{Backend, ConnectOptions, Provider, ResultRow, Row, SqlDefault, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Installs a `debug` subscriber once per test binary.
pub fn tracing() {
    let _ = Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).try_init();
}

/// A private in-memory `SQLite` database.
pub fn sqlite(schema: &str) -> SqlDefault {
    let provider = SqlDefault::connect_with(ConnectOptions { database: ":memory:".to_string() })
        .expect("in-memory database");
    provider.execute_batch(schema).expect("schema");
    provider
}

/// A context executing against `provider` with the `SQLite` dialect.
pub fn sqlite_context(provider: SqlDefault) -> QueryContext {
    QueryContext::new(Arc::new(provider), Dialect::Sqlite)
}

/// Answers every query with canned rows and records what was executed.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    rows: Vec<Row>,
    returning: Vec<ResultRow>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingProvider {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self { rows, ..Self::default() }
    }

    pub fn with_returning(returning: Vec<ResultRow>) -> Self {
        Self { returning, ..Self::default() }
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.executed.lock().unwrap().push((sql.to_string(), params.to_vec()));
    }
}

impl Provider for RecordingProvider {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(sql, params);
        Ok(self.rows.clone())
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.record(sql, params);
        Ok(self.rows.len() as u64)
    }

    fn query_returning(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>> {
        self.record(sql, params);
        Ok(self.returning.clone())
    }
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {
                // Strip identifier quoting to avoid brittle comparisons.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// This helper normalizes SQL to avoid brittle exact-string matching with ``SeaQuery`` output.
/// It strips identifier quotes, normalizes whitespace, and checks that fragments appear
/// sequentially in the generated SQL.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            use std::io::Write;
            let mut stderr = std::io::stderr();
            writeln!(stderr, "*** fragment-canonical: {fragment_canonical}").unwrap();
            writeln!(stderr, "*** actual-canonical-sql: {actual_canonical}").unwrap();
            stderr.flush().unwrap();

            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
