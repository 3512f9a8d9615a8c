use std::sync::Arc;

use anyhow::{Result, bail};
use prism_orm::config_error;
use prism_sql::{Value, ViewValue};

use crate::schema::{Attribute, Mapping, ViewSchema};

/// A loaded view whose basic attributes can be changed and flushed.
#[derive(Debug, Clone)]
pub struct MutableView {
    schema: Arc<ViewSchema>,
    original: ViewValue,
    current: Vec<Value>,
}

impl MutableView {
    /// Wraps `view`, built from `schema` or one of its subtypes.
    #[must_use]
    pub fn new(schema: Arc<ViewSchema>, view: ViewValue) -> Self {
        let current = view.values().to_vec();
        Self { schema, original: view, current }
    }

    /// The concrete view type name.
    #[must_use]
    pub const fn view(&self) -> &'static str {
        self.original.view()
    }

    /// The view as loaded.
    #[must_use]
    pub const fn original(&self) -> &ViewValue {
        &self.original
    }

    /// The current value of attribute `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|position| &self.current[position])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.original.names().iter().position(|n| *n == name)
    }

    fn concrete(&self) -> Result<&ViewSchema> {
        let Some(schema) = self.schema.concrete(self.view()) else {
            bail!(config_error!("{} is not a type of {}", self.view(), self.schema.name()));
        };
        Ok(schema)
    }

    /// Changes attribute `name`. Only basic attributes other than the
    /// identifier can be changed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown attributes, the identifier
    /// and attributes that are not basic.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let schema = self.concrete()?;
        let Some(attribute) = schema.attribute(name) else {
            bail!(config_error!("{} has no attribute {name}", schema.name()));
        };
        if schema.id().map(Attribute::name) == Some(attribute.name()) {
            bail!(config_error!("identifier {name} of {} cannot be changed", schema.name()));
        }
        if !matches!(attribute.mapping(), Mapping::Basic(_)) {
            bail!(config_error!("{name} of {} is not a basic attribute", schema.name()));
        }

        let Some(position) = self.position(name) else {
            bail!(config_error!("{name} was not loaded for {}", self.view()));
        };
        self.current[position] = value.into();
        Ok(())
    }

    /// Whether any attribute differs from its loaded value.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.current.iter().zip(self.original.values()).any(|(current, original)| current != original)
    }

    /// Names of the attributes differing from their loaded value.
    #[must_use]
    pub fn dirty_attributes(&self) -> Vec<&'static str> {
        self.changes().map(|(name, _)| name).collect()
    }

    fn changes(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.original
            .names()
            .iter()
            .zip(self.original.values().iter().zip(&self.current))
            .filter(|(_, (original, current))| original != current)
            .map(|(name, (_, current))| (*name, current))
    }

    /// The columns and new values of the changed attributes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the view type is not part of the
    /// schema.
    pub fn dirty_columns(&self) -> Result<Vec<(&str, &Value)>> {
        let schema = self.concrete()?;
        Ok(self
            .changes()
            .filter_map(|(name, value)| {
                schema.attribute(name).and_then(Attribute::column).map(|column| (column, value))
            })
            .collect())
    }

    /// Accepts the current values as loaded.
    pub fn mark_clean(&mut self) {
        self.original =
            ViewValue::new(self.original.view(), self.names(), self.current.clone());
    }

    fn names(&self) -> Arc<[&'static str]> {
        Arc::from(self.original.names())
    }

    /// The view with its current values.
    #[must_use]
    pub fn to_view(&self) -> ViewValue {
        ViewValue::new(self.original.view(), self.names(), self.current.clone())
    }

    /// The schema the view was loaded with.
    #[must_use]
    pub const fn schema(&self) -> &Arc<ViewSchema> {
        &self.schema
    }
}
