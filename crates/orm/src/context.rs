//! The execution context shared by a plan and its late-bound transformers.

use std::collections::HashMap;
use std::sync::Arc;

use prism_sql::{Provider, Value};

use crate::dialect::Dialect;
use crate::select::SelectBuilder;

/// Everything a query execution needs beyond the statement itself.
///
/// A context is cheap to clone. Late-bound transformers receive it exactly
/// once per execution, which is how they reach the provider (for secondary
/// queries), the optional parameters and the primary statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    provider: Arc<dyn Provider>,
    dialect: Dialect,
    parameters: Arc<HashMap<String, Value>>,
    primary: Option<Arc<SelectBuilder>>,
}

impl QueryContext {
    /// Creates a context executing through `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, dialect: Dialect) -> Self {
        Self { provider, dialect, parameters: Arc::new(HashMap::new()), primary: None }
    }

    /// Sets an optional parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.parameters).insert(name.into(), value.into());
        self
    }

    /// Replaces the optional parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: HashMap<String, Value>) -> Self {
        self.parameters = Arc::new(parameters);
        self
    }

    /// Records the primary statement of the execution this context belongs to.
    #[must_use]
    pub fn with_primary(mut self, select: SelectBuilder) -> Self {
        self.primary = Some(Arc::new(select));
        self
    }

    /// The provider executing queries.
    #[must_use]
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// The dialect queries are rendered for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// An optional parameter, if set.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// The primary statement of the current execution, once it is known.
    #[must_use]
    pub fn primary(&self) -> Option<&SelectBuilder> {
        self.primary.as_deref()
    }
}
