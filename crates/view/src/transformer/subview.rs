//! Nested single views.

use std::sync::Arc;

use anyhow::Result;
use prism_orm::QueryContext;
use prism_sql::Row;

use super::{TupleTransformer, TupleTransformerFactory};
use crate::shape::ViewShape;

/// Builds a nested view from its column range into the range's first
/// position.
#[derive(Debug, Clone)]
pub struct SubviewTupleTransformerFactory {
    shape: Arc<ViewShape>,
}

impl SubviewTupleTransformerFactory {
    /// Builds the view laid out by `shape`.
    #[must_use]
    pub const fn new(shape: Arc<ViewShape>) -> Self {
        Self { shape }
    }
}

impl TupleTransformerFactory for SubviewTupleTransformerFactory {
    fn create(&self, _context: &QueryContext) -> Result<Box<dyn TupleTransformer>> {
        Ok(Box::new(SubviewTupleTransformer { shape: Arc::clone(&self.shape) }))
    }
}

struct SubviewTupleTransformer {
    shape: Arc<ViewShape>,
}

impl TupleTransformer for SubviewTupleTransformer {
    fn transform(&mut self, mut row: Row) -> Result<Row> {
        let view = self.shape.build(&row)?;
        row[self.shape.start()] = view;
        Ok(row)
    }
}
