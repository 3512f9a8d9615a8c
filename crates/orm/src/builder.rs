//! # Object Builders
//!
//! Terminal consumers of a query: an [`ObjectBuilder`] turns one fully
//! transformed [`Row`] into a result object.
//!
//! Three policies are provided and closed over by [`BuilderStrategy`]:
//!
//! - [`ConstructorMatchingBuilder`] picks the unique [`Constructor`] whose
//!   parameters accept the row, per row.
//! - [`FixedConstructorBuilder`] is bound to one constructor up front.
//! - a plain factory function.
//!
//! [`TupleBuilder`] yields generic named [`Tuple`]s and [`RowBuilder`] passes
//! rows through untouched.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use anyhow::{Result, bail};
use prism_sql::{Row, Value, ValueKind};

use crate::context::QueryContext;
use crate::error::Error;
use crate::select::SelectBuilder;
use crate::{config_error, shape_error};

/// Converts transformed rows into result objects.
pub trait ObjectBuilder<T>: Send + Sync {
    /// Declares additional select items before the query runs.
    #[must_use]
    fn apply_selects(&self, select: SelectBuilder) -> SelectBuilder {
        select
    }

    /// Reshapes the complete result before any object is built.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be transformed.
    fn transform_rows(&self, _context: &QueryContext, rows: Vec<Row>) -> Result<Vec<Row>> {
        Ok(rows)
    }

    /// Builds one result object.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not fit the builder.
    fn build(&self, row: Row) -> Result<T>;

    /// Post-processes the complete list of built objects.
    ///
    /// # Errors
    ///
    /// Returns an error if post-processing fails.
    fn build_list(&self, list: Vec<T>) -> Result<Vec<T>> {
        Ok(list)
    }
}

/// The declared type of a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// Accepts any value.
    Any,
    /// Accepts values of exactly this kind.
    Kind(ValueKind),
}

impl ParameterType {
    /// Whether a value can be passed for this parameter. `NULL` is accepted by
    /// every parameter.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value.kind()) {
            (_, None) | (Self::Any, _) => true,
            (Self::Kind(expected), Some(actual)) => expected == actual,
        }
    }
}

impl From<ValueKind> for ParameterType {
    fn from(kind: ValueKind) -> Self {
        Self::Kind(kind)
    }
}

type Factory<T> = Arc<dyn Fn(Vec<Value>) -> Result<T> + Send + Sync>;

/// A named constructor: parameter types plus the function creating `T`.
pub struct Constructor<T> {
    name: &'static str,
    parameters: Vec<ParameterType>,
    factory: Factory<T>,
}

impl<T> Constructor<T> {
    /// Declares a constructor.
    pub fn new<P, F>(name: &'static str, parameters: P, factory: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<ParameterType>,
        F: Fn(Vec<Value>) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: parameters.into_iter().map(Into::into).collect(),
            factory: Arc::new(factory),
        }
    }

    /// Constructor name, used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    fn accepts(&self, row: &Row) -> bool {
        self.parameters.len() == row.len()
            && self.parameters.iter().zip(row.values()).all(|(param, value)| param.accepts(value))
    }

    fn invoke(&self, row: Row) -> Result<T> {
        (self.factory)(row.into_values())
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            parameters: self.parameters.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Chooses, per row, the unique constructor that accepts the row.
///
/// Constructors are indexed by arity once, at configuration time. A row that
/// no constructor accepts, or that several accept, fails; the builder never
/// guesses.
pub struct ConstructorMatchingBuilder<T> {
    target: &'static str,
    constructors: Vec<Constructor<T>>,
    by_arity: HashMap<usize, Vec<usize>>,
}

impl<T> ConstructorMatchingBuilder<T> {
    /// Creates a builder for `target` choosing among `constructors`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no constructor is declared.
    pub fn new(target: &'static str, constructors: Vec<Constructor<T>>) -> Result<Self> {
        if constructors.is_empty() {
            bail!(config_error!("{target} declares no constructors"));
        }

        let mut by_arity: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, constructor) in constructors.iter().enumerate() {
            by_arity.entry(constructor.arity()).or_default().push(index);
        }

        Ok(Self { target, constructors, by_arity })
    }

    fn resolve(&self, row: &Row) -> Result<&Constructor<T>> {
        let candidates = self.by_arity.get(&row.len()).map(Vec::as_slice).unwrap_or_default();
        let mut matching =
            candidates.iter().map(|&i| &self.constructors[i]).filter(|c| c.accepts(row));

        let Some(found) = matching.next() else {
            let kinds: Vec<_> = row.values().iter().map(Value::kind).collect();
            bail!(config_error!(
                "no constructor of {} accepts a row of arity {} with kinds {kinds:?}",
                self.target,
                row.len()
            ));
        };

        if let Some(other) = matching.next() {
            bail!(config_error!(
                "ambiguous constructors of {}: both {} and {} accept the row",
                self.target,
                found.name(),
                other.name()
            ));
        }

        Ok(found)
    }
}

impl<T> ObjectBuilder<T> for ConstructorMatchingBuilder<T> {
    fn build(&self, row: Row) -> Result<T> {
        self.resolve(&row)?.invoke(row)
    }
}

impl<T> Debug for ConstructorMatchingBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorMatchingBuilder")
            .field("target", &self.target)
            .field("constructors", &self.constructors)
            .finish_non_exhaustive()
    }
}

/// Always invokes one constructor; the row arity must match exactly.
pub struct FixedConstructorBuilder<T> {
    constructor: Constructor<T>,
}

impl<T> Debug for FixedConstructorBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedConstructorBuilder").field("constructor", &self.constructor).finish()
    }
}

impl<T> FixedConstructorBuilder<T> {
    /// Binds the builder to `constructor`.
    #[must_use]
    pub const fn new(constructor: Constructor<T>) -> Self {
        Self { constructor }
    }
}

impl<T> ObjectBuilder<T> for FixedConstructorBuilder<T> {
    fn build(&self, row: Row) -> Result<T> {
        if row.len() != self.constructor.arity() {
            bail!(Error::arity(self.constructor.arity(), row.len(), self.constructor.name()));
        }
        self.constructor.invoke(row)
    }
}

/// How objects of one target type are built, resolved once per type.
pub enum BuilderStrategy<T> {
    /// Choose the matching constructor per row.
    ByMatchingConstructor(ConstructorMatchingBuilder<T>),
    /// Always use one constructor.
    ByFixedConstructor(FixedConstructorBuilder<T>),
    /// Hand the row to a function.
    ByFactoryFunction(Arc<dyn Fn(Row) -> Result<T> + Send + Sync>),
}

impl<T> BuilderStrategy<T> {
    /// Wraps a factory function.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(Row) -> Result<T> + Send + Sync + 'static,
    {
        Self::ByFactoryFunction(Arc::new(factory))
    }
}

impl<T> Debug for BuilderStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByMatchingConstructor(builder) => {
                f.debug_tuple("ByMatchingConstructor").field(builder).finish()
            }
            Self::ByFixedConstructor(builder) => {
                f.debug_tuple("ByFixedConstructor").field(builder).finish()
            }
            Self::ByFactoryFunction(_) => f.write_str("ByFactoryFunction"),
        }
    }
}

impl<T> ObjectBuilder<T> for BuilderStrategy<T> {
    fn build(&self, row: Row) -> Result<T> {
        match self {
            Self::ByMatchingConstructor(builder) => builder.build(row),
            Self::ByFixedConstructor(builder) => builder.build(row),
            Self::ByFactoryFunction(factory) => factory(row),
        }
    }
}

/// Passes transformed rows through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowBuilder;

impl ObjectBuilder<Row> for RowBuilder {
    fn build(&self, row: Row) -> Result<Row> {
        Ok(row)
    }
}

/// A generic result row with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    aliases: Arc<[String]>,
    values: Vec<Value>,
}

impl Tuple {
    /// Value of the column named `alias`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown alias.
    pub fn get(&self, alias: &str) -> Result<&Value> {
        let Some(index) = self.aliases.iter().position(|a| a == alias) else {
            bail!(config_error!(
                "unknown tuple alias `{alias}`, expected one of {:?}",
                self.aliases
            ));
        };
        Ok(&self.values[index])
    }

    /// Value at `index`.
    ///
    /// # Errors
    ///
    /// Returns an arity error when `index` is out of bounds.
    pub fn get_index(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| Error::arity(index + 1, self.values.len(), "tuple index").into())
    }

    /// Column aliases in order.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a zero-column tuple.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds [`Tuple`]s keyed by a fixed alias list.
#[derive(Debug, Clone)]
pub struct TupleBuilder {
    aliases: Arc<[String]>,
}

impl TupleBuilder {
    /// Creates a builder for the given aliases.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for duplicate aliases.
    pub fn new<I, S>(aliases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
        for (index, alias) in aliases.iter().enumerate() {
            if aliases[..index].contains(alias) {
                bail!(config_error!("duplicate tuple alias `{alias}`"));
            }
        }
        Ok(Self { aliases: aliases.into() })
    }
}

impl ObjectBuilder<Tuple> for TupleBuilder {
    fn build(&self, row: Row) -> Result<Tuple> {
        if row.len() != self.aliases.len() {
            bail!(Error::arity(self.aliases.len(), row.len(), "tuple aliases"));
        }
        Ok(Tuple { aliases: Arc::clone(&self.aliases), values: row.into_values() })
    }
}

/// Raises a data-shape error unless exactly one object was built.
pub(crate) fn single<T>(mut list: Vec<T>) -> Result<T> {
    match list.len() {
        1 => Ok(list.remove(0)),
        0 => bail!(shape_error!("expected a single result, got none")),
        n => bail!(Error::arity(1, n, "single result")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_accepted_by_any_kind() {
        assert!(ParameterType::Kind(ValueKind::Int).accepts(&Value::Null));
        assert!(!ParameterType::Kind(ValueKind::Int).accepts(&Value::Text("1".into())));
        assert!(ParameterType::Any.accepts(&Value::Bool(true)));
    }

    #[test]
    fn tuple_rejects_duplicate_aliases() {
        TupleBuilder::new(["id", "id"]).expect_err("duplicates");
    }

    #[test]
    fn single_requires_exactly_one() {
        assert_eq!(single(vec![1]).expect("one"), 1);
        single(Vec::<i32>::new()).expect_err("none");
        let err = single(vec![1, 2]).expect_err("two");
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::arity(1, 2, "single result")));
    }
}
