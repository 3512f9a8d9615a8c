//! # Dialects
//!
//! Vendor specifics are data, not code paths: each [`Dialect`] maps to a
//! quote character, a placeholder style and a handful of SQL templates. The
//! dialect is chosen once per configured data source.

use std::fmt::{self, Display};
use std::str::FromStr;

use sea_query::{Alias, Func, FunctionCall, Quote, SimpleExpr};

use crate::config_error;
use crate::error::Error;
use crate::query::QueryBuilder;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `PostgreSQL`: double-quoted identifiers, numbered `$n` placeholders.
    #[default]
    Postgres,
    /// `SQLite`: double-quoted identifiers, `?` placeholders.
    Sqlite,
    /// `MySQL`: back-quoted identifiers, `?` placeholders.
    MySql,
}

/// The functions used to aggregate a correlated child result into a single
/// JSON encoded column.
struct MultisetTemplate {
    aggregate: &'static str,
    row: &'static str,
}

impl Dialect {
    /// The query builder rendering SQL for this dialect.
    #[must_use]
    pub fn query_builder(self) -> QueryBuilder {
        let (quote, placeholder, numbered) = match self {
            Self::Postgres => (b'"', "$", true),
            Self::Sqlite => (b'"', "?", false),
            Self::MySql => (b'`', "?", false),
        };
        QueryBuilder { quote: Quote::new(quote), placeholder, numbered }
    }

    /// Whether DML statements may carry a `RETURNING` clause.
    #[must_use]
    pub const fn supports_returning(self) -> bool {
        match self {
            Self::Postgres | Self::Sqlite => true,
            Self::MySql => false,
        }
    }

    const fn multiset_template(self) -> MultisetTemplate {
        match self {
            Self::Postgres => MultisetTemplate { aggregate: "json_agg", row: "json_build_array" },
            Self::Sqlite => MultisetTemplate { aggregate: "json_group_array", row: "json_array" },
            Self::MySql => MultisetTemplate { aggregate: "JSON_ARRAYAGG", row: "JSON_ARRAY" },
        }
    }

    /// Aggregates `columns` of every row of a (correlated) subquery into one
    /// JSON array of arrays, e.g. `json_group_array(json_array(a, b))`.
    ///
    /// The decoded cell holds one inner array per child row, with the columns
    /// in the given order.
    #[must_use]
    pub fn multiset_aggregate(self, columns: Vec<SimpleExpr>) -> SimpleExpr {
        let template = self.multiset_template();
        let row: FunctionCall = Func::cust(Alias::new(template.row)).args(columns);
        let aggregate =
            Func::cust(Alias::new(template.aggregate)).arg(SimpleExpr::FunctionCall(row));
        SimpleExpr::FunctionCall(aggregate)
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
        };
        f.write_str(name)
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(config_error!("unknown SQL dialect: {other}")),
        }
    }
}
