//! MULTISET fetch: a collection aggregated into one JSON encoded column.

use anyhow::{Context, Result, bail};
use prism_orm::{QueryContext, shape_error};
use prism_sql::{Row, Value};

use super::container::{ContainerAccumulator, ContainerKind};
use super::{
    TupleTransformator, TupleTransformatorFactory, TupleTransformer, TupleTransformerFactory,
};

/// The compiled element of a MULTISET fetched collection.
#[derive(Debug, Clone)]
pub struct MultisetTemplate {
    factory: TupleTransformatorFactory,
    width: usize,
    key: Option<usize>,
    value: usize,
    kind: ContainerKind,
}

impl MultisetTemplate {
    /// Child rows of `width` columns, materialized by `factory`, holding
    /// the element at `value` and, for keyed containers, the key at `key`.
    #[must_use]
    pub const fn new(
        factory: TupleTransformatorFactory, width: usize, key: Option<usize>, value: usize,
        kind: ContainerKind,
    ) -> Self {
        Self { factory, width, key, value, kind }
    }
}

/// Decodes the aggregated cell at `position` into its container.
#[derive(Debug, Clone)]
pub struct MultisetTupleTransformerFactory {
    template: MultisetTemplate,
    position: usize,
}

impl MultisetTupleTransformerFactory {
    /// Decodes the cell at `position` with `template`.
    #[must_use]
    pub const fn new(template: MultisetTemplate, position: usize) -> Self {
        Self { template, position }
    }
}

impl TupleTransformerFactory for MultisetTupleTransformerFactory {
    fn create(&self, context: &QueryContext) -> Result<Box<dyn TupleTransformer>> {
        Ok(Box::new(MultisetTupleTransformer {
            transformator: self.template.factory.create(context)?,
            template: self.template.clone(),
            position: self.position,
        }))
    }
}

struct MultisetTupleTransformer {
    transformator: TupleTransformator,
    template: MultisetTemplate,
    position: usize,
}

impl TupleTransformer for MultisetTupleTransformer {
    fn transform(&mut self, mut row: Row) -> Result<Row> {
        let template = &self.template;
        if row.get(self.position).is_some_and(|cell| template.kind.holds(cell)) {
            return Ok(row);
        }

        let cell = row.take(self.position);
        let children = decode_multiset(&cell, template.width)?;
        let children = self.transformator.transform_all(children)?;

        let mut container = ContainerAccumulator::new(template.kind);
        for mut child in children {
            let key = template.key.map(|position| child.take(position));
            container.add(key, child.take(template.value))?;
        }
        row[self.position] = container.finish();
        Ok(row)
    }
}

/// Decodes a JSON aggregated cell, an array holding one array of `width`
/// columns per child row. Null decodes to no rows.
///
/// Nested arrays and objects are kept as JSON text, so a multiset nested in
/// the child row is decoded by its own transformer.
///
/// # Errors
///
/// Returns a data-shape error if the cell is not such an array.
pub fn decode_multiset(cell: &Value, width: usize) -> Result<Vec<Row>> {
    let text = match cell {
        Value::Null => return Ok(Vec::new()),
        Value::Text(text) => text,
        other => bail!(shape_error!("multiset cell {other} is not JSON text")),
    };

    let serde_json::Value::Array(entries) =
        serde_json::from_str::<serde_json::Value>(text).context("decoding multiset cell")?
    else {
        bail!(shape_error!("multiset cell {text} is not a JSON array"));
    };

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let columns = match entry {
            serde_json::Value::Array(columns) => columns,
            other => bail!(shape_error!("multiset entry {other} is not a JSON array")),
        };
        if columns.len() != width {
            bail!(shape_error!(
                "multiset entry has {} columns, expected {width}",
                columns.len()
            ));
        }
        rows.push(columns.into_iter().map(json_value).collect());
    }
    Ok(rows)
}

fn json_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            n.as_i64().map_or_else(|| n.as_f64().map_or(Value::Null, Value::Double), Value::Int)
        }
        serde_json::Value::String(s) => Value::Text(s),
        nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Value::Text(nested.to_string())
        }
    }
}
