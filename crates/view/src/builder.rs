//! Object builders producing views.

use std::fmt::{self, Debug};
use std::sync::Arc;

use anyhow::Result;
use prism_orm::{ObjectBuilder, QueryContext, SelectBuilder};
use prism_sql::{Row, ViewValue};

use crate::template::ViewTemplate;

/// Builds [`ViewValue`]s: declares the template's select items and joins,
/// runs its pipeline over the result and reads each view from its shape.
#[derive(Debug, Clone)]
pub struct ViewObjectBuilder {
    template: Arc<ViewTemplate>,
}

impl ViewObjectBuilder {
    /// Builds views compiled into `template`.
    #[must_use]
    pub const fn new(template: Arc<ViewTemplate>) -> Self {
        Self { template }
    }

    /// The template the views are built from.
    #[must_use]
    pub const fn template(&self) -> &Arc<ViewTemplate> {
        &self.template
    }
}

impl ObjectBuilder<ViewValue> for ViewObjectBuilder {
    fn apply_selects(&self, select: SelectBuilder) -> SelectBuilder {
        self.template.apply(select)
    }

    fn transform_rows(&self, context: &QueryContext, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut transformator = self.template.factory().create(context)?;
        transformator.transform_all(rows)
    }

    fn build(&self, row: Row) -> Result<ViewValue> {
        self.template.shape().build_view(&row)
    }
}

/// Builds user types from views: the attribute values of each built view, in
/// declaration order, are handed to `builder` as one row.
pub struct TypedViewObjectBuilder<T> {
    view: ViewObjectBuilder,
    builder: Arc<dyn ObjectBuilder<T>>,
}

impl<T> TypedViewObjectBuilder<T> {
    /// Builds `T`s with `builder` from views compiled into `template`.
    #[must_use]
    pub fn new(template: Arc<ViewTemplate>, builder: Arc<dyn ObjectBuilder<T>>) -> Self {
        Self { view: ViewObjectBuilder::new(template), builder }
    }
}

impl<T> Debug for TypedViewObjectBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedViewObjectBuilder")
            .field("view", &self.view.template.schema().name())
            .finish_non_exhaustive()
    }
}

impl<T> ObjectBuilder<T> for TypedViewObjectBuilder<T> {
    fn apply_selects(&self, select: SelectBuilder) -> SelectBuilder {
        self.view.apply_selects(select)
    }

    fn transform_rows(&self, context: &QueryContext, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.view.transform_rows(context, rows)
    }

    fn build(&self, row: Row) -> Result<T> {
        let view = self.view.build(row)?;
        self.builder.build(Row::new(view.into_values()))
    }

    fn build_list(&self, list: Vec<T>) -> Result<Vec<T>> {
        self.builder.build_list(list)
    }
}
