//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use prism_orm::Dialect;
use prism_sql::{Backend, Collection, ConnectOptions, Provider, Row, SqlDefault, Value, ViewValue};
use prism_view::{Container, Element, Fetch, Relation, ViewConfig, ViewManager, ViewSchema};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

pub const BLOG: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_id INTEGER);
    CREATE TABLE comments (
        id INTEGER PRIMARY KEY,
        post_id INTEGER NOT NULL,
        body TEXT NOT NULL,
        position INTEGER NOT NULL,
        author_id INTEGER
    );
    CREATE TABLE tags (id INTEGER PRIMARY KEY, post_id INTEGER NOT NULL, name TEXT NOT NULL);
    CREATE TABLE people (
        id INTEGER PRIMARY KEY,
        kind TEXT,
        name TEXT NOT NULL,
        salary INTEGER,
        school TEXT
    );

    INSERT INTO users (id, name) VALUES (1, 'ada'), (2, 'bob');
    INSERT INTO posts (id, title, author_id) VALUES (1, 'first', 1), (2, 'second', 2), (3, 'third', NULL);
    INSERT INTO comments (id, post_id, body, position, author_id) VALUES
        (10, 1, 'c10', 0, 2),
        (11, 1, 'c11', 1, 1),
        (12, 3, 'c12', 0, NULL);
    INSERT INTO tags (id, post_id, name) VALUES (1, 1, 'rust'), (2, 1, 'sql'), (3, 2, 'rust');
    INSERT INTO people (id, kind, name, salary, school) VALUES
        (1, 'employee', 'eve', 100, NULL),
        (2, 'student', 'sam', NULL, 'mit'),
        (3, 'robot', 'rob', NULL, NULL),
        (4, NULL, 'nil', NULL, NULL);
";

/// Installs a `debug` subscriber once per test binary.
pub fn tracing() {
    let _ = Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).try_init();
}

/// A private in-memory `SQLite` database holding `schema`.
pub fn sqlite(schema: &str) -> SqlDefault {
    let provider = SqlDefault::connect_with(ConnectOptions { database: ":memory:".to_string() })
        .expect("in-memory database");
    provider.execute_batch(schema).expect("schema");
    provider
}

/// Counts and records the statements it forwards.
#[derive(Debug)]
pub struct CountingProvider {
    inner: SqlDefault,
    queries: Mutex<Vec<String>>,
}

impl CountingProvider {
    pub fn new(schema: &str) -> Self {
        Self { inner: sqlite(schema), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl Provider for CountingProvider {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.queries.lock().push(sql.to_string());
        self.inner.query(sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.inner.exec(sql, params)
    }
}

/// A manager over the blog fixture.
pub fn manager() -> ViewManager {
    ViewManager::new(Arc::new(sqlite(BLOG)), ViewConfig::new(Dialect::Sqlite))
}

/// A manager over the blog fixture recording its queries.
pub fn counting_manager(config: ViewConfig) -> (ViewManager, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::new(BLOG));
    let manager = ViewManager::new(Arc::clone(&provider) as Arc<dyn Provider>, config);
    (manager, provider)
}

pub fn user() -> Arc<ViewSchema> {
    ViewSchema::builder("UserView", "users")
        .id("id", "id")
        .basic("name", "name")
        .build()
        .expect("valid schema")
}

pub fn comment() -> Arc<ViewSchema> {
    ViewSchema::builder("CommentView", "comments")
        .id("id", "id")
        .basic("body", "body")
        .subview("author", Relation::new("users", "author_id", "id"), &user(), Fetch::Join)
        .build()
        .expect("valid schema")
}

/// `PostView` with the comment ids as collection.
pub fn post_with_comment_ids(name: &'static str, fetch: Fetch) -> Arc<ViewSchema> {
    ViewSchema::builder(name, "posts")
        .id("id", "id")
        .basic("title", "title")
        .plural(
            "comments",
            Relation::new("comments", "id", "post_id"),
            Element::Basic("id".to_string()),
            Container::List,
            fetch,
        )
        .build()
        .expect("valid schema")
}

/// `PostView` with the comments as nested views.
pub fn post_with_comments(name: &'static str, fetch: Fetch) -> Arc<ViewSchema> {
    ViewSchema::builder(name, "posts")
        .id("id", "id")
        .basic("title", "title")
        .plural(
            "comments",
            Relation::new("comments", "id", "post_id"),
            Element::View(comment()),
            Container::List,
            fetch,
        )
        .build()
        .expect("valid schema")
}

/// The elements of a list or set attribute.
pub fn elements<'a>(view: &'a ViewValue, name: &str) -> &'a [Value] {
    view.get(name)
        .and_then(Value::as_collection)
        .and_then(Collection::elements)
        .unwrap_or_else(|| panic!("{name} is not a list or set in {view:?}"))
}

/// The integer elements of a list or set attribute, sorted.
pub fn ints(view: &ViewValue, name: &str) -> Vec<i64> {
    let mut ints: Vec<_> =
        elements(view, name).iter().map(|value| value.as_int().expect("integer")).collect();
    ints.sort_unstable();
    ints
}

/// The text elements of a list or set attribute, sorted.
pub fn texts(view: &ViewValue, name: &str) -> Vec<String> {
    let mut texts: Vec<_> = elements(view, name)
        .iter()
        .map(|value| value.as_text().expect("text").to_string())
        .collect();
    texts.sort_unstable();
    texts
}
