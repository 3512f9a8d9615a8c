//! # Tuple Transformation Pipeline
//!
//! Flat result rows become nested view objects in levels. Each level runs its
//! row-level [`TupleTransformer`]s over every row, then its
//! [`TupleListTransformer`]s over the whole [`RowList`]. A level only starts
//! once the previous level finished, so list transformers can rely on
//! everything nested below them being materialized.
//!
//! Row arity is constant through the pipeline: a transformer consuming a
//! range of columns writes its result at the first position of the range and
//! leaves the remaining columns in place.

mod collection;
mod container;
mod correlation;
mod multiset;
mod parameter;
mod subview;
mod transformator;

use std::fmt::Debug;

use anyhow::Result;
use prism_orm::QueryContext;
use prism_sql::Row;

pub use self::collection::{CollectionTupleListTransformer, FoldSpec};
pub use self::container::{ContainerAccumulator, ContainerKind};
pub use self::correlation::{
    CorrelatedBatchTupleListTransformer, CorrelatedSubselectTupleListTransformer,
    CorrelatedTemplate,
};
pub use self::multiset::{MultisetTemplate, MultisetTupleTransformerFactory, decode_multiset};
pub use self::parameter::ParameterTupleTransformerFactory;
pub use self::subview::SubviewTupleTransformerFactory;
pub use self::transformator::{
    TupleTransformator, TupleTransformatorFactory, TupleTransformatorLevel,
};

/// Converts one row.
///
/// Transformers are bound to one execution and may keep state across the rows
/// of that execution.
pub trait TupleTransformer: Send {
    /// Transforms `row`, keeping its arity.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be transformed.
    fn transform(&mut self, row: Row) -> Result<Row>;
}

/// Creates a [`TupleTransformer`] bound to one execution.
///
/// Factories are part of a compiled view template and are shared by every
/// execution, so they hold no execution state themselves.
pub trait TupleTransformerFactory: Debug + Send + Sync {
    /// Binds a transformer to `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformer cannot be bound.
    fn create(&self, context: &QueryContext) -> Result<Box<dyn TupleTransformer>>;
}

/// Transforms the complete row list of one level.
///
/// List transformers hold no execution state; the context is handed in per
/// call.
pub trait TupleListTransformer: Debug + Send + Sync {
    /// Transforms `rows`.
    ///
    /// # Errors
    ///
    /// Returns provider errors from secondary queries and data-shape errors.
    fn transform(&self, context: &QueryContext, rows: RowList) -> Result<RowList>;
}

/// The rows of one execution as they pass through the pipeline.
///
/// Rows are replaced in place and removed in bulk with [`RowList::retain`],
/// which keeps removal linear in the list length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowList(Vec<Row>);

impl RowList {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rows remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.0.iter()
    }

    /// The rows in order, mutably.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Row> {
        self.0.iter_mut()
    }

    /// Keeps the rows for which `keep` returns `true`. `keep` sees every row
    /// exactly once, in order, together with its index before removal.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &mut Row) -> bool,
    {
        let mut index = 0;
        self.0.retain_mut(|row| {
            let kept = keep(index, row);
            index += 1;
            kept
        });
    }

    /// Consumes the list.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.0
    }
}

impl From<Vec<Row>> for RowList {
    fn from(rows: Vec<Row>) -> Self {
        Self(rows)
    }
}

impl<'a> IntoIterator for &'a RowList {
    type IntoIter = std::slice::Iter<'a, Row>;
    type Item = &'a Row;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut RowList {
    type IntoIter = std::slice::IterMut<'a, Row>;
    type Item = &'a mut Row;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
