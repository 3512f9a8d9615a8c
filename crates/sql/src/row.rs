use std::ops::{Index, IndexMut};

use crate::value::Value;

/// One flat result record, positionally addressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Row(Vec<Value>);

impl Row {
    /// Creates a row from its column values.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a zero-column row.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Mutable column at `index`, if present.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.0.get_mut(index)
    }

    /// Moves the value out of column `index`, leaving `NULL` behind.
    ///
    /// Out of range indexes yield `NULL`.
    pub fn take(&mut self, index: usize) -> Value {
        self.0.get_mut(index).map(std::mem::take).unwrap_or_default()
    }

    /// Column values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Consumes the row, returning its column values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Row {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Row {
    type IntoIter = std::vec::IntoIter<Value>;
    type Item = Value;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A row produced by a DML statement with a `RETURNING` clause.
///
/// Some providers collapse single-column returning rows to the bare value;
/// those arrive as [`ResultRow::Scalar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultRow {
    /// A complete row.
    Tuple(Row),
    /// A single-column row whose wrapper was dropped.
    Scalar(Value),
}

impl ResultRow {
    /// Restores the uniform row shape, wrapping scalars into one-column rows.
    #[must_use]
    pub fn into_row(self) -> Row {
        match self {
            Self::Tuple(row) => row,
            Self::Scalar(value) => Row(vec![value]),
        }
    }

    /// Returns `true` when the provider dropped the row wrapper.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

/// Builds a [`Row`] from values convertible into [`Value`].
///
/// ```rust
/// use prism_sql::{Value, row};
///
/// let row = row![1, "x", None::<i64>];
/// assert_eq!(row[2], Value::Null);
/// ```
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::Row::new(vec![$($crate::Value::from($value)),*])
    };
}
