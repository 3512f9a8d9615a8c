use anyhow::Result;
use sea_query::{JoinType, SimpleExpr};

use crate::filter::Filter;

/// Represents a SQL join operation without exposing ``SeaQuery`` types.
#[derive(Debug, Clone)]
pub struct Join {
    table: String,
    alias: Option<String>,
    on: Filter,
    kind: JoinKind,
}

/// Join types supported by the ORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
    /// RIGHT JOIN
    Right,
    /// FULL OUTER JOIN
    Full,
}

impl Join {
    /// Creates a JOIN of the given kind.
    #[must_use]
    pub fn new(kind: JoinKind, table: impl Into<String>, on: Filter) -> Self {
        Self { table: table.into(), alias: None, on, kind }
    }

    /// Creates an INNER JOIN.
    #[must_use]
    pub fn inner(table: impl Into<String>, on: Filter) -> Self {
        Self::new(JoinKind::Inner, table, on)
    }

    /// Creates a LEFT JOIN.
    #[must_use]
    pub fn left(table: impl Into<String>, on: Filter) -> Self {
        Self::new(JoinKind::Left, table, on)
    }

    /// Creates a RIGHT JOIN.
    #[must_use]
    pub fn right(table: impl Into<String>, on: Filter) -> Self {
        Self::new(JoinKind::Right, table, on)
    }

    /// Creates a FULL OUTER JOIN.
    #[must_use]
    pub fn full(table: impl Into<String>, on: Filter) -> Self {
        Self::new(JoinKind::Full, table, on)
    }

    /// Sets an alias for the joined table.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name the joined table is referenced by: its alias if set.
    #[must_use]
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Converts this Join into a ``JoinSpec`` for ``SeaQuery``.
    /// The ``default_table`` is the primary table being selected from.
    pub(crate) fn into_join_spec(self, default_table: &str) -> Result<JoinSpec> {
        Ok(JoinSpec {
            table: self.table,
            alias: self.alias,
            on: self.on.into_expr(default_table)?,
            kind: self.kind.into_join_type(),
        })
    }
}

impl JoinKind {
    const fn into_join_type(self) -> JoinType {
        match self {
            Self::Inner => JoinType::InnerJoin,
            Self::Left => JoinType::LeftJoin,
            Self::Right => JoinType::RightJoin,
            Self::Full => JoinType::FullOuterJoin,
        }
    }
}

/// Internal representation used by ``SeaQuery``.
pub(crate) struct JoinSpec {
    pub table: String,
    pub alias: Option<String>,
    pub on: SimpleExpr,
    pub kind: JoinType,
}
