//! # View Schemas
//!
//! A [`ViewSchema`] describes one view type: the entity table it projects,
//! its identifier and its attributes. Schemas are immutable once built and
//! shared behind [`Arc`]s, so nested views and polymorphic subtypes reference
//! each other without copying.
//!
//! Inheritance is composition: [`ViewSchemaBuilder::extends`] copies the
//! parent's attribute descriptors and the most-derived declaration wins per
//! attribute name.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use prism_orm::config_error;
use prism_sql::Value;

/// The related table of a nested attribute, joined on
/// `owner.source = related.target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    table: String,
    source: String,
    target: String,
}

impl Relation {
    /// Relates the owner's `source` column to `table.target`.
    #[must_use]
    pub fn new(
        table: impl Into<String>, source: impl Into<String>, target: impl Into<String>,
    ) -> Self {
        Self { table: table.into(), source: source.into(), target: target.into() }
    }

    /// The related table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The owner's correlation column.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The related table's correlation column.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// How a nested attribute's data is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fetch {
    /// Left joined into the primary query.
    #[default]
    Join,
    /// Fetched by secondary queries keyed by a batch of correlation values.
    Select {
        /// Maximum number of keys per secondary query.
        batch_size: Option<usize>,
    },
    /// Fetched by one secondary query correlated to the primary query.
    Subselect,
    /// Aggregated into one column of the primary query.
    Multiset,
}

/// The element of a plural attribute.
#[derive(Debug, Clone)]
pub enum Element {
    /// A column of the related table.
    Basic(String),
    /// A nested view over the related table.
    View(Arc<ViewSchema>),
}

/// The key of a map container.
#[derive(Debug, Clone)]
pub enum MapKey {
    /// A column of the related table.
    Column(String),
    /// An embeddable key view over the related table.
    View(Arc<ViewSchema>),
}

/// The target container of a plural attribute.
#[derive(Debug, Clone)]
pub enum Container {
    /// Arrival order.
    List,
    /// Ordered by an index column of the related table.
    IndexedList(String),
    /// Deduplicated.
    Set,
    /// Keyed entries.
    Map(MapKey),
}

impl Container {
    /// Whether elements are addressed by a key or index column.
    #[must_use]
    pub const fn is_keyed(&self) -> bool {
        matches!(self, Self::IndexedList(_) | Self::Map(_))
    }
}

/// How an attribute is mapped.
#[derive(Debug, Clone)]
pub enum Mapping {
    /// A column of the view's table.
    Basic(String),
    /// An optional query parameter, Null when not set.
    Parameter(String),
    /// A single nested view.
    Subview {
        /// The related table.
        relation: Relation,
        /// The nested view.
        view: Arc<ViewSchema>,
        /// The fetch strategy.
        fetch: Fetch,
    },
    /// A collection.
    Plural {
        /// The related table.
        relation: Relation,
        /// The collection element.
        element: Element,
        /// The target container.
        container: Container,
        /// The fetch strategy.
        fetch: Fetch,
    },
}

/// A named attribute and the view type that declared it.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: &'static str,
    mapping: Mapping,
    declared_in: &'static str,
}

impl Attribute {
    /// The attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The attribute mapping.
    #[must_use]
    pub const fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// The view type declaring the attribute; differs from the owning
    /// schema's name for inherited attributes.
    #[must_use]
    pub const fn declared_in(&self) -> &'static str {
        self.declared_in
    }

    /// The column of a basic attribute.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match &self.mapping {
            Mapping::Basic(column) => Some(column),
            _ => None,
        }
    }
}

/// A resolved, flat view type.
#[derive(Debug, Clone)]
pub struct ViewSchema {
    name: &'static str,
    table: String,
    id: Option<&'static str>,
    attributes: Vec<Attribute>,
    discriminator: Option<String>,
    discriminator_value: Option<Value>,
    subtypes: Vec<Arc<Self>>,
    batch_size: Option<usize>,
}

impl ViewSchema {
    /// Starts a schema for view `name` projecting `table`.
    #[must_use]
    pub fn builder(name: &'static str, table: impl Into<String>) -> ViewSchemaBuilder {
        ViewSchemaBuilder {
            name,
            table: table.into(),
            id: None,
            inherited: Vec::new(),
            declared: Vec::new(),
            discriminator: None,
            discriminator_value: None,
            batch_size: None,
            errors: Vec::new(),
        }
    }

    /// Registers polymorphic `subtypes` of `base`. The concrete type is
    /// resolved per row by the base's discriminator column.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base has no discriminator, or a
    /// subtype projects another table, lacks a discriminator value or repeats
    /// one.
    pub fn with_subtypes(base: &Arc<Self>, subtypes: Vec<Arc<Self>>) -> Result<Arc<Self>> {
        if base.discriminator.is_none() {
            bail!(config_error!("{} has subtypes but no discriminator column", base.name));
        }

        let mut values = HashSet::new();
        let mut names = HashSet::from([base.name]);
        for subtype in &subtypes {
            if subtype.table != base.table {
                bail!(config_error!(
                    "subtype {} projects {} but its base {} projects {}",
                    subtype.name,
                    subtype.table,
                    base.name,
                    base.table
                ));
            }
            let Some(value) = &subtype.discriminator_value else {
                bail!(config_error!("subtype {} has no discriminator value", subtype.name));
            };
            if !values.insert(value.clone()) {
                bail!(config_error!("discriminator value {value} of {} is not unique", subtype.name));
            }
            if !names.insert(subtype.name) {
                bail!(config_error!("subtype name {} is not unique", subtype.name));
            }
        }

        let mut schema = Self::clone(base);
        schema.subtypes = subtypes;
        Ok(Arc::new(schema))
    }

    /// The view type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The projected table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The identifier attribute, if any.
    #[must_use]
    pub fn id(&self) -> Option<&Attribute> {
        self.id.and_then(|name| self.attribute(name))
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// The discriminator column of a polymorphic base.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// The discriminator value selecting this subtype.
    #[must_use]
    pub const fn discriminator_value(&self) -> Option<&Value> {
        self.discriminator_value.as_ref()
    }

    /// Registered polymorphic subtypes.
    #[must_use]
    pub fn subtypes(&self) -> &[Arc<Self>] {
        &self.subtypes
    }

    /// The default batch size of SELECT fetched attributes of this view.
    #[must_use]
    pub const fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// This schema or the subtype named `name`.
    #[must_use]
    pub fn concrete(&self, name: &str) -> Option<&Self> {
        if self.name == name {
            return Some(self);
        }
        self.subtypes.iter().find(|subtype| subtype.name == name).map(|subtype| &**subtype)
    }
}

/// Builder for [`ViewSchema`].
///
/// Declaration errors are collected and reported by [`Self::build`].
#[derive(Debug)]
pub struct ViewSchemaBuilder {
    name: &'static str,
    table: String,
    id: Option<&'static str>,
    inherited: Vec<Attribute>,
    declared: Vec<Attribute>,
    discriminator: Option<String>,
    discriminator_value: Option<Value>,
    batch_size: Option<usize>,
    errors: Vec<String>,
}

impl ViewSchemaBuilder {
    fn declare(mut self, name: &'static str, mapping: Mapping) -> Self {
        if self.declared.iter().any(|attribute| attribute.name == name) {
            self.errors.push(format!("attribute {name} is declared twice on {}", self.name));
        } else {
            self.declared.push(Attribute { name, mapping, declared_in: self.name });
        }
        self
    }

    /// Declares the identifier attribute, mapped to `column`.
    #[must_use]
    pub fn id(mut self, name: &'static str, column: impl Into<String>) -> Self {
        self.id = Some(name);
        self.declare(name, Mapping::Basic(column.into()))
    }

    /// Declares a basic attribute mapped to `column`.
    #[must_use]
    pub fn basic(self, name: &'static str, column: impl Into<String>) -> Self {
        self.declare(name, Mapping::Basic(column.into()))
    }

    /// Declares an attribute filled from the optional query parameter
    /// `parameter`.
    #[must_use]
    pub fn parameter(self, name: &'static str, parameter: impl Into<String>) -> Self {
        self.declare(name, Mapping::Parameter(parameter.into()))
    }

    /// Declares a single nested view.
    #[must_use]
    pub fn subview(
        self, name: &'static str, relation: Relation, view: &Arc<ViewSchema>, fetch: Fetch,
    ) -> Self {
        self.declare(name, Mapping::Subview { relation, view: Arc::clone(view), fetch })
    }

    /// Declares a collection.
    #[must_use]
    pub fn plural(
        self, name: &'static str, relation: Relation, element: Element, container: Container,
        fetch: Fetch,
    ) -> Self {
        self.declare(name, Mapping::Plural { relation, element, container, fetch })
    }

    /// Declares the discriminator column of a polymorphic base.
    #[must_use]
    pub fn discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = Some(column.into());
        self
    }

    /// Declares the discriminator value selecting this subtype.
    #[must_use]
    pub fn discriminator_value(mut self, value: impl Into<Value>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    /// Sets the default batch size of SELECT fetched attributes.
    #[must_use]
    pub const fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Inherits `parent`'s table, identifier and attributes.
    #[must_use]
    pub fn extends(mut self, parent: &ViewSchema) -> Self {
        self.table = parent.table.clone();
        self.id = self.id.or(parent.id);
        self.batch_size = self.batch_size.or(parent.batch_size);
        self.inherited = parent.attributes.clone();
        self
    }

    /// Resolves the flat attribute list.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for duplicate declarations or a missing
    /// identifier attribute.
    pub fn build(self) -> Result<Arc<ViewSchema>> {
        if let Some(error) = self.errors.into_iter().next() {
            bail!(config_error!("{error}"));
        }

        let mut declared = self.declared;
        let mut attributes = Vec::with_capacity(self.inherited.len() + declared.len());
        for attribute in self.inherited {
            match declared.iter().position(|own| own.name == attribute.name) {
                Some(index) => attributes.push(declared.remove(index)),
                None => attributes.push(attribute),
            }
        }
        attributes.extend(declared);

        if let Some(id) = self.id
            && !attributes.iter().any(|attribute| attribute.name == id)
        {
            bail!(config_error!("identifier {id} of {} is not an attribute", self.name));
        }

        tracing::trace!(view = self.name, attributes = attributes.len(), "view schema built");

        Ok(Arc::new(ViewSchema {
            name: self.name,
            table: self.table,
            id: self.id,
            attributes,
            discriminator: self.discriminator,
            discriminator_value: self.discriminator_value,
            subtypes: Vec::new(),
            batch_size: self.batch_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Arc<ViewSchema> {
        ViewSchema::builder("Person", "people")
            .id("id", "id")
            .basic("name", "name")
            .basic("email", "email")
            .discriminator("kind")
            .build()
            .expect("valid schema")
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let err = ViewSchema::builder("Person", "people")
            .basic("name", "name")
            .basic("name", "full_name")
            .build()
            .expect_err("duplicate");
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn most_derived_declaration_wins() {
        let base = person();
        let employee = ViewSchema::builder("Employee", "ignored")
            .extends(&base)
            .basic("name", "display_name")
            .basic("salary", "salary")
            .discriminator_value("employee")
            .build()
            .expect("valid subtype");

        let names: Vec<_> = employee.attributes().iter().map(Attribute::name).collect();
        assert_eq!(names, ["id", "name", "email", "salary"]);
        assert_eq!(employee.table(), "people");
        assert_eq!(employee.attribute("name").and_then(Attribute::column), Some("display_name"));
        assert_eq!(employee.attribute("name").map(Attribute::declared_in), Some("Employee"));
        assert_eq!(employee.attribute("email").map(Attribute::declared_in), Some("Person"));
        assert_eq!(employee.id().map(Attribute::name), Some("id"));
    }

    #[test]
    fn subtypes_need_distinct_discriminator_values() {
        let base = person();
        let sub = |name| {
            ViewSchema::builder(name, "people")
                .extends(&base)
                .discriminator_value("same")
                .build()
                .expect("valid subtype")
        };

        ViewSchema::with_subtypes(&base, vec![sub("A"), sub("B")]).expect_err("repeated value");
    }

    #[test]
    fn subtypes_need_a_discriminator_column() {
        let base = ViewSchema::builder("Thing", "things").id("id", "id").build().expect("valid");
        let sub = ViewSchema::builder("Sub", "things")
            .extends(&base)
            .discriminator_value(1)
            .build()
            .expect("valid");

        ViewSchema::with_subtypes(&base, vec![sub]).expect_err("no discriminator");
    }

    #[test]
    fn concrete_resolves_subtypes_by_name() {
        let base = person();
        let sub = ViewSchema::builder("Employee", "people")
            .extends(&base)
            .discriminator_value("employee")
            .build()
            .expect("valid");
        let base = ViewSchema::with_subtypes(&base, vec![sub]).expect("valid hierarchy");

        assert_eq!(base.concrete("Employee").map(ViewSchema::name), Some("Employee"));
        assert_eq!(base.concrete("Person").map(ViewSchema::name), Some("Person"));
        assert!(base.concrete("Robot").is_none());
    }
}
