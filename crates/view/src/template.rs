//! # View Templates
//!
//! A [`ViewTemplate`] is a [`ViewSchema`] compiled once: the select items and
//! left joins the primary query needs, the [`TupleTransformatorFactory`]
//! turning its flat rows into nested values, and the [`ViewShape`] locating
//! every attribute in the transformed row.
//!
//! Select items are aliased `c{position}`. The root table is referenced by
//! name, joined and correlated tables by the aliases `t1`, `t2`, ...

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use prism_orm::{Column, Filter, Join, SelectBuilder, config_error, table_column};
use sea_query::{SimpleExpr, SubQueryStatement};

use crate::config::ViewConfig;
use crate::schema::{Attribute, Container, Element, Fetch, MapKey, Mapping, Relation, ViewSchema};
use crate::shape::{TypeShape, ViewShape};
use crate::transformer::{
    CollectionTupleListTransformer, ContainerKind, CorrelatedBatchTupleListTransformer,
    CorrelatedSubselectTupleListTransformer, CorrelatedTemplate, FoldSpec, MultisetTemplate,
    MultisetTupleTransformerFactory, ParameterTupleTransformerFactory,
    SubviewTupleTransformerFactory, TupleTransformatorFactory,
};

/// Position of the correlation key in the rows of a secondary query.
const KEY: usize = 0;

/// A compiled view.
#[derive(Debug)]
pub struct ViewTemplate {
    schema: Arc<ViewSchema>,
    items: Vec<SimpleExpr>,
    joins: Vec<Join>,
    folds: bool,
    factory: TupleTransformatorFactory,
    shape: Arc<ViewShape>,
}

impl ViewTemplate {
    /// Compiles `schema`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for mappings that cannot be fetched as
    /// declared: a JOIN fetched collection without owner identifier, a keyed
    /// container fetched by SELECT or SUBSELECT, a singular MULTISET, a
    /// SUBSELECT inside a MULTISET, a batch size of 0, or a view without
    /// attributes.
    pub fn compile(schema: &Arc<ViewSchema>, config: &ViewConfig) -> Result<Self> {
        let aliases = Cell::new(1);
        let mut compiler = Compiler::new(config, &aliases, false);
        let (shape, factory) = compiler.view(schema, schema.table(), Some(&[]), false, "")?;

        tracing::debug!(
            view = schema.name(),
            items = compiler.items.len(),
            joins = compiler.joins.len(),
            folds = compiler.folds,
            levels = factory.depth(),
            "view template compiled"
        );

        Ok(Self {
            schema: Arc::clone(schema),
            items: compiler.items,
            joins: compiler.joins,
            folds: compiler.folds,
            factory,
            shape: Arc::new(shape),
        })
    }

    /// The compiled schema.
    #[must_use]
    pub const fn schema(&self) -> &Arc<ViewSchema> {
        &self.schema
    }

    /// Number of select items.
    #[must_use]
    pub fn width(&self) -> usize {
        self.items.len()
    }

    /// The pipeline materializing nested attributes.
    #[must_use]
    pub const fn factory(&self) -> &TupleTransformatorFactory {
        &self.factory
    }

    /// Where the view's attributes live in the transformed row.
    #[must_use]
    pub const fn shape(&self) -> &Arc<ViewShape> {
        &self.shape
    }

    /// The identifier column the result window must apply to when the
    /// primary query folds JOIN fetched collections, so one owner spans
    /// several rows.
    #[must_use]
    pub fn window_key(&self) -> Option<&str> {
        if !self.folds {
            return None;
        }
        self.schema.id().and_then(Attribute::column)
    }

    /// Adds the view's select items and joins to `select`, which must read
    /// from the view's table and declare no items of its own: positions are
    /// absolute.
    #[must_use]
    pub fn apply(&self, mut select: SelectBuilder) -> SelectBuilder {
        for (position, item) in self.items.iter().enumerate() {
            select = select.expr_as(item.clone(), format!("c{position}"));
        }
        for join in &self.joins {
            select = select.join(join.clone());
        }
        select
    }

    /// A SELECT of the view's table with the view's items and joins.
    #[must_use]
    pub fn select(&self) -> SelectBuilder {
        self.apply(SelectBuilder::new(self.schema.table()))
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() { name.to_string() } else { format!("{path}.{name}") }
}

/// Compiles one statement: the primary query, a correlated secondary query
/// or the aggregated subquery of a multiset.
struct Compiler<'a> {
    config: &'a ViewConfig,
    aliases: &'a Cell<usize>,
    in_multiset: bool,
    items: Vec<SimpleExpr>,
    joins: Vec<Join>,
    folds: bool,
}

impl<'a> Compiler<'a> {
    const fn new(config: &'a ViewConfig, aliases: &'a Cell<usize>, in_multiset: bool) -> Self {
        Self { config, aliases, in_multiset, items: Vec::new(), joins: Vec::new(), folds: false }
    }

    fn nested(&self, in_multiset: bool) -> Self {
        Self::new(self.config, self.aliases, in_multiset)
    }

    fn alias(&self) -> String {
        let next = self.aliases.get();
        self.aliases.set(next + 1);
        format!("t{next}")
    }

    fn push(&mut self, item: SimpleExpr) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    fn column(&mut self, table: &str, column: &str) -> usize {
        self.push(SimpleExpr::Column(table_column(table, column)))
    }

    /// Compiles `schema` read from `table`.
    ///
    /// `owner` holds the identifier positions of the enclosing views, `None`
    /// when an enclosing view has no identifier. A view without identifier
    /// only keeps its owner's chain when it is singular (`inherit`).
    fn view(
        &mut self, schema: &ViewSchema, table: &str, owner: Option<&[usize]>, inherit: bool,
        path: &str,
    ) -> Result<(ViewShape, TupleTransformatorFactory)> {
        let start = self.items.len();
        let mut factory = TupleTransformatorFactory::default();

        let discriminator = match schema.discriminator() {
            Some(column) if !schema.subtypes().is_empty() => Some(self.column(table, column)),
            _ => None,
        };

        let id = match schema.id() {
            Some(attribute) => {
                Some(self.attribute(schema, attribute, table, None, path, &mut factory)?)
            }
            None => None,
        };
        let chain = match (owner, id) {
            (Some(owner), Some(id)) => {
                let mut chain = owner.to_vec();
                chain.push(id);
                Some(chain)
            }
            (Some(owner), None) if inherit => Some(owner.to_vec()),
            _ => None,
        };

        let mut placed: HashMap<(&'static str, &'static str), usize> = HashMap::new();
        if let (Some(attribute), Some(position)) = (schema.id(), id) {
            placed.insert((attribute.name(), attribute.declared_in()), position);
        }

        let mut types = Vec::with_capacity(schema.subtypes().len() + 1);
        for concrete in std::iter::once(schema).chain(schema.subtypes().iter().map(|s| &**s)) {
            let mut names = Vec::with_capacity(concrete.attributes().len());
            let mut positions = Vec::with_capacity(concrete.attributes().len());
            for attribute in concrete.attributes() {
                let key = (attribute.name(), attribute.declared_in());
                let position = match placed.get(&key) {
                    Some(&position) => position,
                    None => {
                        let position = self.attribute(
                            concrete,
                            attribute,
                            table,
                            chain.as_deref(),
                            path,
                            &mut factory,
                        )?;
                        placed.insert(key, position);
                        position
                    }
                };
                names.push(attribute.name());
                positions.push(position);
            }
            let value = concrete.discriminator_value().cloned();
            types.push(TypeShape::new(concrete.name(), value, names, positions));
        }

        let end = self.items.len();
        if end == start {
            bail!(config_error!("view {} maps no attributes", schema.name()));
        }

        Ok((ViewShape::new(start, end, id, discriminator, types), factory))
    }

    /// Compiles a nested view and builds it into its first position.
    fn nested_view(
        &mut self, schema: &ViewSchema, table: &str, owner: Option<&[usize]>, inherit: bool,
        path: &str, factory: &mut TupleTransformatorFactory,
    ) -> Result<usize> {
        let (shape, nested) = self.view(schema, table, owner, inherit, path)?;
        let start = shape.start();
        factory.merge(&nested);
        factory.add_transformer_factory(Arc::new(SubviewTupleTransformerFactory::new(Arc::new(
            shape,
        ))));
        Ok(start)
    }

    /// Compiles one attribute and returns its position.
    fn attribute(
        &mut self, owner: &ViewSchema, attribute: &Attribute, table: &str,
        chain: Option<&[usize]>, path: &str, factory: &mut TupleTransformatorFactory,
    ) -> Result<usize> {
        let path = child_path(path, attribute.name());
        match attribute.mapping() {
            Mapping::Basic(column) => Ok(self.column(table, column)),
            Mapping::Parameter(name) => {
                let position = self.push(SimpleExpr::Custom("NULL".to_string()));
                factory.add_transformer_factory(Arc::new(ParameterTupleTransformerFactory::new(
                    position, name,
                )));
                Ok(position)
            }
            Mapping::Subview { relation, view, fetch } => match fetch {
                Fetch::Join => {
                    let alias = self.join(table, relation);
                    self.nested_view(view, &alias, chain, true, &path, factory)
                }
                Fetch::Select { .. } | Fetch::Subselect => {
                    let element = Element::View(Arc::clone(view));
                    self.correlated(owner, relation, &element, None, *fetch, table, &path, factory)
                }
                Fetch::Multiset => {
                    bail!(config_error!("singular attribute {path} cannot be fetched as MULTISET"))
                }
            },
            Mapping::Plural { relation, element, container, fetch } => match fetch {
                Fetch::Join => {
                    let Some(chain) = chain else {
                        bail!(config_error!(
                            "collection {path} is JOIN fetched but {} has no identifier chain",
                            owner.name()
                        ));
                    };
                    let alias = self.join(table, relation);
                    let target = self.items.len();
                    let key = self.key(container, &alias, &path, factory)?;
                    let value = self.element(element, &alias, Some(chain), &path, factory)?;
                    let spec = FoldSpec {
                        parent_ids: chain.to_vec(),
                        target,
                        key,
                        value,
                        end: self.items.len(),
                        kind: ContainerKind::from(container),
                    };
                    let fold = CollectionTupleListTransformer::new(spec);
                    factory.add_list_transformer(Arc::new(fold));
                    self.folds = true;
                    Ok(target)
                }
                Fetch::Select { .. } | Fetch::Subselect => {
                    if container.is_keyed() {
                        bail!(config_error!(
                            "correlated mappings can't be indexed or keyed: {path}"
                        ));
                    }
                    let kind = Some(ContainerKind::from(container));
                    self.correlated(owner, relation, element, kind, *fetch, table, &path, factory)
                }
                Fetch::Multiset => self.multiset(relation, element, container, table, &path, factory),
            },
        }
    }

    /// Left joins the related table and returns its alias.
    fn join(&mut self, table: &str, relation: &Relation) -> String {
        let alias = self.alias();
        let on = Filter::col_eq(
            Column::of(table, relation.source()),
            Column::of(&alias, relation.target()),
        );
        self.joins.push(Join::left(relation.table(), on).alias(&alias));
        alias
    }

    /// Compiles the index or map key of a keyed container.
    fn key(
        &mut self, container: &Container, table: &str, path: &str,
        factory: &mut TupleTransformatorFactory,
    ) -> Result<Option<usize>> {
        match container {
            Container::List | Container::Set => Ok(None),
            Container::IndexedList(column) | Container::Map(MapKey::Column(column)) => {
                Ok(Some(self.column(table, column)))
            }
            Container::Map(MapKey::View(view)) => {
                self.nested_view(view, table, None, false, path, factory).map(Some)
            }
        }
    }

    /// Compiles a collection element.
    fn element(
        &mut self, element: &Element, table: &str, chain: Option<&[usize]>, path: &str,
        factory: &mut TupleTransformatorFactory,
    ) -> Result<usize> {
        match element {
            Element::Basic(column) => Ok(self.column(table, column)),
            Element::View(view) => self.nested_view(view, table, chain, false, path, factory),
        }
    }

    /// Selects the correlation key and resolves it with a secondary query.
    #[allow(clippy::too_many_arguments)]
    fn correlated(
        &mut self, owner: &ViewSchema, relation: &Relation, element: &Element,
        kind: Option<ContainerKind>, fetch: Fetch, table: &str, path: &str,
        factory: &mut TupleTransformatorFactory,
    ) -> Result<usize> {
        if fetch == Fetch::Subselect && self.in_multiset {
            bail!(config_error!("{path} cannot be SUBSELECT fetched inside a MULTISET"));
        }

        let position = self.column(table, relation.source());

        let alias = self.alias();
        let mut secondary = self.nested(self.in_multiset);
        let mut nested = TupleTransformatorFactory::default();
        secondary.column(&alias, relation.target());
        match element {
            Element::Basic(column) => {
                secondary.column(&alias, column);
            }
            Element::View(view) => {
                let inherit = kind.is_none();
                secondary.nested_view(view, &alias, Some(&[KEY]), inherit, path, &mut nested)?;
            }
        }

        let template = Arc::new(CorrelatedTemplate::new(
            relation.table(),
            alias,
            relation.target(),
            secondary.items,
            secondary.joins,
            nested,
            kind,
        ));

        if let Fetch::Select { batch_size } = fetch {
            let batch_size = self
                .config
                .batch_size(path)
                .or(batch_size)
                .or(owner.batch_size())
                .unwrap_or(self.config.default_batch_size());
            if batch_size == 0 {
                bail!(config_error!("batch size of {path} must be at least 1"));
            }
            let transformer =
                CorrelatedBatchTupleListTransformer::new(template, position, batch_size)?;
            factory.add_list_transformer(Arc::new(transformer));
        } else {
            factory.add_list_transformer(Arc::new(CorrelatedSubselectTupleListTransformer::new(
                template, position,
            )));
        }
        Ok(position)
    }

    /// Aggregates the collection into one column with a correlated subquery.
    fn multiset(
        &mut self, relation: &Relation, element: &Element, container: &Container, table: &str,
        path: &str, factory: &mut TupleTransformatorFactory,
    ) -> Result<usize> {
        let alias = self.alias();
        let mut child = self.nested(true);
        let mut nested = TupleTransformatorFactory::default();
        let key = child.key(container, &alias, path, &mut nested)?;
        let value = child.element(element, &alias, Some(&[]), path, &mut nested)?;
        let width = child.items.len();

        let aggregate = self.config.dialect().multiset_aggregate(child.items);
        let correlation = Filter::col_eq(
            Column::of(&alias, relation.target()),
            Column::of(table, relation.source()),
        );
        let mut select = SelectBuilder::new(relation.table())
            .alias(&alias)
            .expr_as(aggregate, "m")
            .r#where(correlation);
        for join in child.joins {
            select = select.join(join);
        }
        let subquery = SubQueryStatement::SelectStatement(select.statement()?);
        let position = self.push(SimpleExpr::SubQuery(None, Box::new(subquery)));

        let kind = ContainerKind::from(container);
        let template = MultisetTemplate::new(nested, width, key, value, kind);
        factory.add_transformer_factory(Arc::new(MultisetTupleTransformerFactory::new(
            template, position,
        )));
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use prism_orm::{Dialect, Error};

    use super::*;

    fn config() -> ViewConfig {
        ViewConfig::new(Dialect::Sqlite)
    }

    fn comment() -> Arc<ViewSchema> {
        ViewSchema::builder("CommentView", "comments")
            .id("id", "id")
            .basic("body", "body")
            .build()
            .expect("valid schema")
    }

    fn comments(container: Container, fetch: Fetch) -> Arc<ViewSchema> {
        ViewSchema::builder("PostView", "posts")
            .id("id", "id")
            .basic("title", "title")
            .plural(
                "comments",
                Relation::new("comments", "id", "post_id"),
                Element::View(comment()),
                container,
                fetch,
            )
            .build()
            .expect("valid schema")
    }

    fn configuration_error(result: Result<ViewTemplate>) -> String {
        let err = result.expect_err("configuration error");
        match err.downcast_ref::<Error>() {
            Some(Error::Configuration { description }) => description.clone(),
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn join_fetch_layout() {
        let template = ViewTemplate::compile(&comments(Container::List, Fetch::Join), &config())
            .expect("compiles");

        assert_eq!(template.width(), 4);
        assert_eq!(template.shape().id(), Some(0));
        assert_eq!(template.shape().types()[0].positions(), [0, 1, 2]);
        assert_eq!(template.factory().depth(), 1);

        let sql = template.select().build().expect("renders").sql;
        assert!(sql.contains("LEFT JOIN"), "{sql}");
        assert!(sql.contains(r#"AS "t1""#), "{sql}");
        assert!(sql.contains(r#"AS "c3""#), "{sql}");
        assert_eq!(template.window_key(), Some("id"));
    }

    #[test]
    fn keyed_correlated_collections_are_rejected() {
        let schema = comments(Container::IndexedList("position".into()), Fetch::Subselect);
        let description = configuration_error(ViewTemplate::compile(&schema, &config()));
        assert!(description.contains("can't be indexed or keyed"), "{description}");
    }

    #[test]
    fn join_fetch_needs_an_owner_identifier() {
        let schema = ViewSchema::builder("Summary", "posts")
            .basic("title", "title")
            .plural(
                "comments",
                Relation::new("comments", "id", "post_id"),
                Element::Basic("body".into()),
                Container::List,
                Fetch::Join,
            )
            .build()
            .expect("valid schema");
        let description = configuration_error(ViewTemplate::compile(&schema, &config()));
        assert!(description.contains("no identifier chain"), "{description}");
    }

    #[test]
    fn singular_multiset_is_rejected() {
        let schema = ViewSchema::builder("CommentView", "comments")
            .id("id", "id")
            .subview("post", Relation::new("posts", "post_id", "id"), &comment(), Fetch::Multiset)
            .build()
            .expect("valid schema");
        configuration_error(ViewTemplate::compile(&schema, &config()));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let schema = comments(Container::List, Fetch::Select { batch_size: None });
        let config = config().with_batch_size("comments", 0);
        let description = configuration_error(ViewTemplate::compile(&schema, &config));
        assert!(description.contains("comments"), "{description}");
    }

    #[test]
    fn subselect_inside_multiset_is_rejected() {
        let author = ViewSchema::builder("AuthorView", "users")
            .id("id", "id")
            .basic("name", "name")
            .build()
            .expect("valid schema");
        let comment = ViewSchema::builder("CommentView", "comments")
            .id("id", "id")
            .subview("author", Relation::new("users", "author_id", "id"), &author, Fetch::Subselect)
            .build()
            .expect("valid schema");
        let post = ViewSchema::builder("PostView", "posts")
            .id("id", "id")
            .plural(
                "comments",
                Relation::new("comments", "id", "post_id"),
                Element::View(comment),
                Container::List,
                Fetch::Multiset,
            )
            .build()
            .expect("valid schema");

        let description = configuration_error(ViewTemplate::compile(&post, &config()));
        assert!(description.contains("comments.author"), "{description}");
    }

    #[test]
    fn multiset_is_one_subquery_column() {
        let template =
            ViewTemplate::compile(&comments(Container::Set, Fetch::Multiset), &config())
                .expect("compiles");

        assert_eq!(template.width(), 3);
        let sql = template.select().build().expect("renders").sql;
        assert!(sql.contains("json_group_array(json_array("), "{sql}");
        assert!(!sql.contains("LEFT JOIN"), "{sql}");
        assert_eq!(template.window_key(), None);
    }
}
