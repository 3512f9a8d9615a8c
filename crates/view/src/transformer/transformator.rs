//! Levels, the transformator and its factory.

use std::fmt::{self, Debug};
use std::mem;
use std::sync::Arc;

use anyhow::Result;
use prism_orm::QueryContext;
use prism_sql::Row;

use super::{RowList, TupleListTransformer, TupleTransformer, TupleTransformerFactory};

/// The transformers of one pipeline depth.
#[derive(Default)]
pub struct TupleTransformatorLevel {
    transformers: Vec<Box<dyn TupleTransformer>>,
    list_transformers: Vec<Arc<dyn TupleListTransformer>>,
}

impl TupleTransformatorLevel {
    /// A level of bound transformers.
    #[must_use]
    pub fn new(
        transformers: Vec<Box<dyn TupleTransformer>>,
        list_transformers: Vec<Arc<dyn TupleListTransformer>>,
    ) -> Self {
        Self { transformers, list_transformers }
    }

    fn run(&mut self, context: &QueryContext, mut rows: RowList) -> Result<RowList> {
        if !self.transformers.is_empty() {
            for row in &mut rows {
                for transformer in &mut self.transformers {
                    *row = transformer.transform(mem::take(row))?;
                }
            }
        }
        for list_transformer in &self.list_transformers {
            rows = list_transformer.transform(context, rows)?;
        }
        Ok(rows)
    }
}

impl Debug for TupleTransformatorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleTransformatorLevel")
            .field("transformers", &self.transformers.len())
            .field("list_transformers", &self.list_transformers)
            .finish()
    }
}

/// Runs the levels of one execution in order.
#[derive(Debug)]
pub struct TupleTransformator {
    context: QueryContext,
    levels: Vec<TupleTransformatorLevel>,
}

impl TupleTransformator {
    /// A transformator running `levels` with `context`.
    #[must_use]
    pub const fn new(context: QueryContext, levels: Vec<TupleTransformatorLevel>) -> Self {
        Self { context, levels }
    }

    /// Number of levels.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Runs every level over `rows`. The first failure aborts the run; no
    /// partial result is returned.
    ///
    /// # Errors
    ///
    /// Returns the first transformer error.
    pub fn transform_all(&mut self, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut rows = RowList::from(rows);
        for (depth, level) in self.levels.iter_mut().enumerate() {
            rows = level.run(&self.context, rows)?;
            tracing::trace!(level = depth, rows = rows.len(), "transformator level completed");
        }
        Ok(rows.into_rows())
    }
}

#[derive(Debug, Clone, Default)]
struct FactoryLevel {
    factories: Vec<Arc<dyn TupleTransformerFactory>>,
    list_transformers: Vec<Arc<dyn TupleListTransformer>>,
}

impl FactoryLevel {
    fn extend(&mut self, other: &Self) {
        self.factories.extend(other.factories.iter().map(Arc::clone));
        self.list_transformers.extend(other.list_transformers.iter().map(Arc::clone));
    }
}

/// Accumulates transformer factories into levels at compile time and binds
/// them into a [`TupleTransformator`] per execution.
///
/// A cursor marks the level new contributions go to. Row transformer
/// factories join the current level; a list transformer closes it.
#[derive(Debug, Clone, Default)]
pub struct TupleTransformatorFactory {
    levels: Vec<FactoryLevel>,
    current: usize,
}

impl TupleTransformatorFactory {
    fn level_mut(&mut self, index: usize) -> &mut FactoryLevel {
        if self.levels.len() <= index {
            self.levels.resize_with(index + 1, FactoryLevel::default);
        }
        &mut self.levels[index]
    }

    /// The level new contributions go to.
    #[must_use]
    pub const fn current_level(&self) -> usize {
        self.current
    }

    /// Number of levels holding contributions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Whether nothing was contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Merges `other` in: its first level joins the current level, its later
    /// levels follow, and the cursor advances by `other`'s cursor.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        let base = self.current;
        for (offset, level) in other.levels.iter().enumerate() {
            self.level_mut(base + offset).extend(level);
        }
        self.current += other.current;
    }

    /// Adds a list transformer to the current level and closes it.
    pub fn add_list_transformer(&mut self, transformer: Arc<dyn TupleListTransformer>) {
        let current = self.current;
        self.level_mut(current).list_transformers.push(transformer);
        self.current += 1;
    }

    /// Adds a row transformer factory to the current level.
    pub fn add_transformer_factory(&mut self, factory: Arc<dyn TupleTransformerFactory>) {
        let current = self.current;
        self.level_mut(current).factories.push(factory);
    }

    /// Binds every factory to `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if a transformer cannot be bound.
    pub fn create(&self, context: &QueryContext) -> Result<TupleTransformator> {
        let mut levels = Vec::with_capacity(self.levels.len());
        for level in &self.levels {
            let transformers = level
                .factories
                .iter()
                .map(|factory| factory.create(context))
                .collect::<Result<Vec<_>>>()?;
            levels.push(TupleTransformatorLevel::new(transformers, level.list_transformers.clone()));
        }
        tracing::trace!(levels = levels.len(), "transformator created");
        Ok(TupleTransformator::new(context.clone(), levels))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use prism_orm::Dialect;
    use prism_sql::{Backend, ConnectOptions, SqlDefault, Value, row};

    use super::*;

    fn context() -> QueryContext {
        let provider = SqlDefault::connect_with(ConnectOptions { database: ":memory:".into() })
            .expect("in-memory database");
        QueryContext::new(Arc::new(provider), Dialect::Sqlite)
    }

    /// Writes a constant into one column.
    #[derive(Debug)]
    struct Write(usize, i64);

    impl TupleTransformerFactory for Write {
        fn create(&self, _context: &QueryContext) -> Result<Box<dyn TupleTransformer>> {
            Ok(Box::new(Self(self.0, self.1)))
        }
    }

    impl TupleTransformer for Write {
        fn transform(&mut self, mut row: Row) -> Result<Row> {
            row[self.0] = Value::Int(self.1);
            Ok(row)
        }
    }

    /// Records the rows it observes.
    #[derive(Debug, Default)]
    struct Observe(Mutex<Vec<Vec<Row>>>);

    impl TupleListTransformer for Observe {
        fn transform(&self, _context: &QueryContext, rows: RowList) -> Result<RowList> {
            self.0.lock().expect("observer lock").push(rows.iter().cloned().collect());
            Ok(rows)
        }
    }

    #[test]
    fn list_transformers_observe_their_level_complete() {
        let observe = Arc::new(Observe::default());
        let mut factory = TupleTransformatorFactory::default();
        factory.add_transformer_factory(Arc::new(Write(0, 1)));
        factory.add_transformer_factory(Arc::new(Write(1, 2)));
        factory.add_list_transformer(Arc::clone(&observe) as Arc<dyn TupleListTransformer>);
        factory.add_transformer_factory(Arc::new(Write(2, 3)));
        factory.add_list_transformer(Arc::clone(&observe) as Arc<dyn TupleListTransformer>);

        let rows = vec![row![0, 0, 0], row![0, 0, 0]];
        let result = factory.create(&context()).expect("bind").transform_all(rows).expect("run");

        let observed = observe.0.lock().expect("observer lock");
        assert_eq!(observed[0], vec![row![1, 2, 0], row![1, 2, 0]]);
        assert_eq!(observed[1], vec![row![1, 2, 3], row![1, 2, 3]]);
        assert_eq!(result, vec![row![1, 2, 3], row![1, 2, 3]]);
    }

    #[test]
    fn merge_joins_first_level_and_advances_by_cursor() {
        let observe: Arc<dyn TupleListTransformer> = Arc::new(Observe::default());

        let mut nested = TupleTransformatorFactory::default();
        nested.add_transformer_factory(Arc::new(Write(0, 1)));
        nested.add_list_transformer(Arc::clone(&observe));

        let mut factory = TupleTransformatorFactory::default();
        factory.add_transformer_factory(Arc::new(Write(1, 1)));
        factory.merge(&nested);
        assert_eq!(factory.depth(), 1);
        assert_eq!(factory.current_level(), 1);

        factory.merge(&TupleTransformatorFactory::default());
        assert_eq!(factory.current_level(), 1);

        factory.add_transformer_factory(Arc::new(Write(2, 1)));
        assert_eq!(factory.depth(), 2);
        assert_eq!(factory.levels[0].factories.len(), 2);
        assert_eq!(factory.levels[0].list_transformers.len(), 1);
    }

    #[test]
    fn row_transformer_only_factory_keeps_the_cursor() {
        let mut nested = TupleTransformatorFactory::default();
        nested.add_transformer_factory(Arc::new(Write(0, 1)));

        let mut factory = TupleTransformatorFactory::default();
        factory.merge(&nested);
        factory.merge(&nested);
        assert_eq!(factory.current_level(), 0);
        assert_eq!(factory.levels[0].factories.len(), 2);
    }
}
