//! Optional query parameters.

use anyhow::Result;
use prism_orm::QueryContext;
use prism_sql::{Row, Value};

use super::{TupleTransformer, TupleTransformerFactory};

/// Writes the value of an optional query parameter, Null when it is not set.
#[derive(Debug, Clone)]
pub struct ParameterTupleTransformerFactory {
    position: usize,
    name: String,
}

impl ParameterTupleTransformerFactory {
    /// Writes parameter `name` at `position`.
    #[must_use]
    pub fn new(position: usize, name: impl Into<String>) -> Self {
        Self { position, name: name.into() }
    }
}

impl TupleTransformerFactory for ParameterTupleTransformerFactory {
    fn create(&self, context: &QueryContext) -> Result<Box<dyn TupleTransformer>> {
        let value = context.parameter(&self.name).cloned().unwrap_or_default();
        tracing::trace!(parameter = %self.name, bound = !value.is_null(), "parameter bound");
        Ok(Box::new(ParameterTupleTransformer { position: self.position, value }))
    }
}

struct ParameterTupleTransformer {
    position: usize,
    value: Value,
}

impl TupleTransformer for ParameterTupleTransformer {
    fn transform(&mut self, mut row: Row) -> Result<Row> {
        row[self.position] = self.value.clone();
        Ok(row)
    }
}
