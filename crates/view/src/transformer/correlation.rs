//! SELECT and SUBSELECT fetches: secondary queries correlated to the owner
//! rows by a key column.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use prism_orm::{
    Column, Dialect, Filter, Join, QueryContext, SelectBuilder, config_error, shape_error,
};
use prism_sql::Value;
use sea_query::SimpleExpr;

use super::container::{ContainerAccumulator, ContainerKind};
use super::{RowList, TupleListTransformer, TupleTransformatorFactory};

/// Position of the correlation key in a secondary row.
const KEY: usize = 0;
/// Position of the fetched element in a secondary row.
const ELEMENT: usize = 1;

/// A compiled secondary query: the key column of the related table, the
/// element's select items and the pipeline materializing the element.
#[derive(Debug, Clone)]
pub struct CorrelatedTemplate {
    table: String,
    alias: String,
    target: String,
    items: Vec<SimpleExpr>,
    joins: Vec<Join>,
    factory: TupleTransformatorFactory,
    kind: Option<ContainerKind>,
}

impl CorrelatedTemplate {
    /// A template reading `table AS alias`, correlated by `alias.target`.
    /// `items` start with the key column; the element is read at position 1.
    /// `kind` is the container of plural attributes and `None` for singular
    /// ones.
    #[must_use]
    pub fn new(
        table: impl Into<String>, alias: impl Into<String>, target: impl Into<String>,
        items: Vec<SimpleExpr>, joins: Vec<Join>, factory: TupleTransformatorFactory,
        kind: Option<ContainerKind>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            target: target.into(),
            items,
            joins,
            factory,
            kind,
        }
    }

    /// The correlation column of the related table.
    #[must_use]
    pub fn key_column(&self) -> Column {
        Column::of(&self.alias, &self.target)
    }

    /// The secondary SELECT without its correlation filter.
    #[must_use]
    pub fn select(&self, dialect: Dialect) -> SelectBuilder {
        let mut select = SelectBuilder::new(&self.table).alias(&self.alias).dialect(dialect);
        for (position, item) in self.items.iter().enumerate() {
            select = select.expr_as(item.clone(), format!("c{position}"));
        }
        for join in &self.joins {
            select = select.join(join.clone());
        }
        select
    }

    /// Runs the secondary query restricted by `filter` and returns one
    /// `(key, element)` pair per materialized row, in provider order.
    ///
    /// # Errors
    ///
    /// Returns provider errors unchanged and errors of the element pipeline.
    pub fn fetch(&self, context: &QueryContext, filter: Filter) -> Result<Vec<(Value, Value)>> {
        let select = self.select(context.dialect()).r#where(filter);
        let query = select.build()?;
        let rows = context
            .provider()
            .query(&query.sql, &query.params)
            .with_context(|| format!("executing correlated select: {}", query.sql))?;

        let mut transformator = self.factory.create(&context.clone().with_primary(select))?;
        let rows = transformator.transform_all(rows)?;
        Ok(rows.into_iter().map(|mut row| (row.take(KEY), row.take(ELEMENT))).collect())
    }

    /// Writes the fetched elements into the owner rows, replacing the key at
    /// `position`. Owners without elements receive Null (singular) or an empty
    /// container (plural); rows already holding a materialized value are
    /// left alone.
    fn splice(
        &self, rows: &mut RowList, position: usize, fetched: Vec<(Value, Value)>,
    ) -> Result<()> {
        let mut elements: HashMap<Value, Vec<Value>> = HashMap::new();
        for (key, element) in fetched {
            elements.entry(key).or_default().push(element);
        }

        for row in rows {
            if matches!(row.get(position), Some(Value::Collection(_) | Value::View(_))) {
                continue;
            }
            let key = row.take(position);
            let found = elements.get(&key).map(Vec::as_slice).unwrap_or_default();
            let value = match self.kind {
                None => match found {
                    [] => Value::Null,
                    [element] => element.clone(),
                    _ => bail!(shape_error!(
                        "{} rows of {} match key {key} of a singular attribute",
                        found.len(),
                        self.table
                    )),
                },
                Some(kind) => {
                    let mut container = ContainerAccumulator::new(kind);
                    for element in found {
                        container.add(None, element.clone())?;
                    }
                    container.finish()
                }
            };
            row[position] = value;
        }
        Ok(())
    }
}

/// Distinct non-null keys at `position`, in arrival order. Positions already
/// holding a materialized value are skipped.
fn keys(rows: &RowList, position: usize) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(position))
        .filter(|key| !matches!(key, Value::Null | Value::Collection(_) | Value::View(_)))
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}

/// Fetches a correlated attribute with one `key IN (...)` query per batch
/// of distinct keys.
#[derive(Debug, Clone)]
pub struct CorrelatedBatchTupleListTransformer {
    template: Arc<CorrelatedTemplate>,
    position: usize,
    batch_size: usize,
}

impl CorrelatedBatchTupleListTransformer {
    /// Resolves the key at `position` with batches of at most `batch_size`
    /// keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `batch_size` is 0.
    pub fn new(
        template: Arc<CorrelatedTemplate>, position: usize, batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            bail!(config_error!("batch size of {} must be at least 1", template.table));
        }
        Ok(Self { template, position, batch_size })
    }
}

impl TupleListTransformer for CorrelatedBatchTupleListTransformer {
    fn transform(&self, context: &QueryContext, mut rows: RowList) -> Result<RowList> {
        if rows.is_empty() {
            return Ok(rows);
        }

        let keys = keys(&rows, self.position);
        let mut fetched = Vec::new();
        let mut queries = 0;
        for chunk in keys.chunks(self.batch_size) {
            let filter = Filter::r#in(self.template.key_column(), chunk.iter().cloned());
            fetched.extend(self.template.fetch(context, filter)?);
            queries += 1;
        }

        tracing::debug!(
            table = %self.template.table,
            keys = keys.len(),
            batch_size = self.batch_size,
            queries,
            "correlated batch fetch"
        );

        self.template.splice(&mut rows, self.position, fetched)?;
        Ok(rows)
    }
}

/// Fetches a correlated attribute with a single query restricted to the keys
/// the primary statement selects: `key IN (SELECT sub.cN FROM (primary) sub)`.
#[derive(Debug, Clone)]
pub struct CorrelatedSubselectTupleListTransformer {
    template: Arc<CorrelatedTemplate>,
    position: usize,
}

impl CorrelatedSubselectTupleListTransformer {
    /// Resolves the key at `position`, selected by the primary statement as
    /// `c{position}`.
    #[must_use]
    pub const fn new(template: Arc<CorrelatedTemplate>, position: usize) -> Self {
        Self { template, position }
    }
}

impl TupleListTransformer for CorrelatedSubselectTupleListTransformer {
    fn transform(&self, context: &QueryContext, mut rows: RowList) -> Result<RowList> {
        if rows.is_empty() {
            return Ok(rows);
        }
        let Some(primary) = context.primary() else {
            bail!(config_error!(
                "subselect fetch of {} runs without a primary statement",
                self.template.table
            ));
        };

        let fetched = if keys(&rows, self.position).is_empty() {
            Vec::new()
        } else {
            let keys = SelectBuilder::from_subquery(primary.clone(), "sub")
                .column(Column::of("sub", format!("c{}", self.position)));
            self.template.fetch(context, Filter::in_subquery(self.template.key_column(), keys))?
        };

        tracing::debug!(
            table = %self.template.table,
            rows = fetched.len(),
            "correlated subselect fetch"
        );

        self.template.splice(&mut rows, self.position, fetched)?;
        Ok(rows)
    }
}
