//! Where a compiled view's attributes live in the row.

use std::sync::Arc;

use anyhow::{Result, bail};
use prism_orm::Error;
use prism_sql::{Row, Value, ViewValue};

/// Attribute positions of one concrete view type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    name: &'static str,
    discriminator_value: Option<Value>,
    names: Arc<[&'static str]>,
    positions: Vec<usize>,
}

impl TypeShape {
    pub(crate) fn new(
        name: &'static str, discriminator_value: Option<Value>, names: Vec<&'static str>,
        positions: Vec<usize>,
    ) -> Self {
        Self { name, discriminator_value, names: names.into(), positions }
    }

    /// The concrete view type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Attribute names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Row positions, paired with [`Self::names`].
    #[must_use]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// The position of attribute `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| *n == name).map(|i| self.positions[i])
    }
}

/// The compiled layout of a view: the column range it occupies, its id and
/// discriminator positions, and one [`TypeShape`] per concrete type, base
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewShape {
    start: usize,
    end: usize,
    id: Option<usize>,
    discriminator: Option<usize>,
    types: Vec<TypeShape>,
}

impl ViewShape {
    pub(crate) const fn new(
        start: usize, end: usize, id: Option<usize>, discriminator: Option<usize>,
        types: Vec<TypeShape>,
    ) -> Self {
        Self { start, end, id, discriminator, types }
    }

    /// First column of the view; receives the built view when nested.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// One past the last column of the view.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Position of the identifier.
    #[must_use]
    pub const fn id(&self) -> Option<usize> {
        self.id
    }

    /// The concrete types, base first.
    #[must_use]
    pub fn types(&self) -> &[TypeShape] {
        &self.types
    }

    /// Resolves the concrete type of `row` by its discriminator. Rows with an
    /// unknown or Null discriminator resolve to the base type.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape declares no type.
    pub fn resolve(&self, row: &Row) -> Result<&TypeShape> {
        let Some(base) = self.types.first() else {
            bail!(Error::arity(1, 0, "view shape types"));
        };
        let Some(value) = self.discriminator.and_then(|position| row.get(position)) else {
            return Ok(base);
        };
        if value.is_null() {
            return Ok(base);
        }
        Ok(self
            .types
            .iter()
            .skip(1)
            .find(|shape| shape.discriminator_value.as_ref() == Some(value))
            .unwrap_or(base))
    }

    /// Builds the view held by `row`.
    ///
    /// # Errors
    ///
    /// Returns an arity error if the row is narrower than the shape.
    pub fn build_view(&self, row: &Row) -> Result<ViewValue> {
        let shape = self.resolve(row)?;
        let mut values = Vec::with_capacity(shape.positions.len());
        for &position in &shape.positions {
            let Some(value) = row.get(position) else {
                bail!(Error::arity(self.end, row.len(), shape.name));
            };
            values.push(value.clone());
        }
        Ok(ViewValue::new(shape.name, Arc::clone(&shape.names), values))
    }

    /// Builds the nested view held by `row`, or Null when there is none: the
    /// id is Null, or the view has no id and every attribute is Null.
    ///
    /// # Errors
    ///
    /// Returns an arity error if the row is narrower than the shape.
    pub fn build(&self, row: &Row) -> Result<Value> {
        if let Some(id) = self.id {
            if row.get(id).is_none_or(Value::is_null) {
                return Ok(Value::Null);
            }
            return self.build_view(row).map(Value::View);
        }

        let view = self.build_view(row)?;
        if view.values().iter().all(Value::is_null) {
            return Ok(Value::Null);
        }
        Ok(Value::View(view))
    }
}
