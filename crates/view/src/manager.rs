//! # View Manager
//!
//! The entry point: compiles view templates once per view type and opens
//! [`ViewQuery`]s executing through the configured provider.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use parking_lot::Mutex;
use prism_orm::{
    Column, Filter, ObjectBuilder, QueryContext, ResultStream, SelectBuilder, SelectQueryPlan,
    config_error, shape_error,
};
use prism_sql::{Provider, Value, ViewValue};

use crate::builder::{TypedViewObjectBuilder, ViewObjectBuilder};
use crate::config::ViewConfig;
use crate::schema::{Attribute, ViewSchema};
use crate::template::ViewTemplate;
use crate::update::{FlushSummary, MutableView, UpdatableViewMap, ViewKey, flush};

/// Owns the provider and configuration and caches compiled templates.
///
/// View names identify templates: every schema queried through one manager
/// must have a distinct name.
#[derive(Debug)]
pub struct ViewManager {
    provider: Arc<dyn Provider>,
    config: Arc<ViewConfig>,
    templates: Mutex<HashMap<&'static str, Arc<ViewTemplate>>>,
}

impl ViewManager {
    /// A manager executing through `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, config: ViewConfig) -> Self {
        Self { provider, config: Arc::new(config), templates: Mutex::new(HashMap::new()) }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// A fresh execution context.
    #[must_use]
    pub fn context(&self) -> QueryContext {
        QueryContext::new(Arc::clone(&self.provider), self.config.dialect())
    }

    /// The compiled template of `schema`, compiled on first use.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`ViewTemplate::compile`].
    pub fn template(&self, schema: &Arc<ViewSchema>) -> Result<Arc<ViewTemplate>> {
        let mut templates = self.templates.lock();
        if let Some(template) = templates.get(schema.name()) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(ViewTemplate::compile(schema, &self.config)?);
        templates.insert(schema.name(), Arc::clone(&template));
        Ok(template)
    }

    /// Queries views of `schema`.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`ViewTemplate::compile`].
    pub fn query(&self, schema: &Arc<ViewSchema>) -> Result<ViewQuery<ViewValue>> {
        let template = self.template(schema)?;
        let builder: Arc<dyn ObjectBuilder<ViewValue>> =
            Arc::new(ViewObjectBuilder::new(Arc::clone(&template)));
        Ok(ViewQuery::new(self.context(), template, builder))
    }

    /// Queries views of `schema`, building each into a `T` from its
    /// attribute values with `builder`.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`ViewTemplate::compile`].
    pub fn query_as<T: 'static>(
        &self, schema: &Arc<ViewSchema>, builder: Arc<dyn ObjectBuilder<T>>,
    ) -> Result<ViewQuery<T>> {
        let template = self.template(schema)?;
        let builder: Arc<dyn ObjectBuilder<T>> =
            Arc::new(TypedViewObjectBuilder::new(Arc::clone(&template), builder));
        Ok(ViewQuery::new(self.context(), template, builder))
    }

    /// Writes the dirty views of `views`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`flush`].
    pub fn flush(&self, views: &mut UpdatableViewMap) -> Result<FlushSummary> {
        flush(views, &self.context())
    }
}

/// A query for views, refined by filters, ordering, optional parameters and
/// a result window before it executes.
///
/// The window counts views. When JOIN fetched collections spread one view
/// over several rows it applies to the view identifiers instead:
/// `id IN (SELECT id FROM (SELECT id ... LIMIT ...) AS w)`, with the joined
/// select itself left unwindowed.
pub struct ViewQuery<T> {
    context: QueryContext,
    template: Arc<ViewTemplate>,
    builder: Arc<dyn ObjectBuilder<T>>,
    filters: Vec<Filter>,
    order: Vec<(Column, bool)>,
    first_result: u64,
    max_results: Option<u64>,
}

impl<T> ViewQuery<T> {
    const fn new(
        context: QueryContext, template: Arc<ViewTemplate>, builder: Arc<dyn ObjectBuilder<T>>,
    ) -> Self {
        Self {
            context,
            template,
            builder,
            filters: Vec::new(),
            order: Vec::new(),
            first_result: 0,
            max_results: None,
        }
    }

    /// Restricts the views. Unqualified columns refer to the view's table.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Orders ascending by a column of the view's table.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<Column>) -> Self {
        self.order.push((column.into(), false));
        self
    }

    /// Orders descending by a column of the view's table.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<Column>) -> Self {
        self.order.push((column.into(), true));
        self
    }

    /// Sets an optional parameter read by parameter attributes.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context = self.context.with_parameter(name, value);
        self
    }

    /// Sets the `(first_result, max_results)` window.
    #[must_use]
    pub const fn page(mut self, first_result: u64, max_results: Option<u64>) -> Self {
        self.first_result = first_result;
        self.max_results = max_results;
        self
    }

    const fn is_windowed(&self) -> bool {
        self.first_result > 0 || self.max_results.is_some()
    }

    fn ordered(&self, mut select: SelectBuilder) -> SelectBuilder {
        for (column, descending) in &self.order {
            select = if *descending {
                select.order_by_desc(column.clone())
            } else {
                select.order_by(column.clone())
            };
        }
        select
    }

    fn filtered(&self, select: SelectBuilder) -> SelectBuilder {
        self.filters.iter().cloned().fold(select, SelectBuilder::r#where)
    }

    /// The executable plan.
    #[must_use]
    pub fn plan(self) -> SelectQueryPlan<T> {
        let table = self.template.schema().table();
        let key = self.template.window_key().filter(|_| self.is_windowed());

        let Some(key) = key else {
            let select = self.ordered(self.filtered(SelectBuilder::new(table)));
            return SelectQueryPlan::new(self.context, select, self.builder)
                .window(self.first_result, self.max_results);
        };

        let window = self
            .ordered(self.filtered(SelectBuilder::new(table).column(key)))
            .window(self.first_result, self.max_results);
        let ids = SelectBuilder::from_subquery(window, "w").column(key);
        let select = self.ordered(SelectBuilder::new(table).r#where(Filter::in_subquery(key, ids)));
        tracing::debug!(view = self.template.schema().name(), key, "windowing view identifiers");

        SelectQueryPlan::new(self.context, select, self.builder)
    }

    /// Executes the query and returns every view.
    ///
    /// # Errors
    ///
    /// Returns provider, transformation and builder errors.
    pub fn result_list(self) -> Result<Vec<T>> {
        self.plan().result_list()
    }

    /// Executes the query and returns its only view.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one view results.
    pub fn single_result(self) -> Result<T> {
        self.plan().single_result()
    }

    /// Executes the query and builds views as the stream is consumed.
    ///
    /// # Errors
    ///
    /// Returns provider and transformation errors.
    pub fn result_stream(self) -> Result<ResultStream<T>> {
        self.plan().result_stream()
    }
}

impl ViewQuery<ViewValue> {
    /// Executes the query and registers each view in `views` for update. A
    /// view already registered under the same key is kept as it is.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for views without identifier, a
    /// data-shape error for a Null identifier, and the errors of
    /// [`Self::result_list`].
    pub fn load_into(self, views: &mut UpdatableViewMap) -> Result<Vec<ViewKey>> {
        let schema = Arc::clone(self.template.schema());
        let Some(id) = schema.id().map(Attribute::name) else {
            bail!(config_error!("{} has no identifier and cannot be updated", schema.name()));
        };

        let loaded = self.result_list()?;
        let mut keys = Vec::with_capacity(loaded.len());
        for view in loaded {
            let Some(value) = view.get(id).filter(|value| !value.is_null()) else {
                bail!(shape_error!("{} loaded without identifier", view.view()));
            };
            let key = ViewKey::new(view.view(), value.clone());
            views.get_or_insert_with(key.clone(), || MutableView::new(Arc::clone(&schema), view));
            keys.push(key);
        }
        tracing::debug!(view = schema.name(), loaded = keys.len(), "views loaded for update");
        Ok(keys)
    }
}
