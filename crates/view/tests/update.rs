//! Integration tests for loading views for update and flushing changes.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{BLOG, manager, post_with_comment_ids, sqlite, tracing};
use prism_orm::{Dialect, Error, Filter};
use prism_sql::{Provider, Value};
use prism_view::{Fetch, UpdatableViewMap, ViewConfig, ViewKey, ViewManager, ViewSchema};

fn configuration_error(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::Configuration { .. }))
}

#[test]
fn changed_attributes_are_flushed() {
    tracing();
    let manager = manager();
    let schema = post_with_comment_ids("PostView", Fetch::Join);
    let mut views = UpdatableViewMap::new();

    let keys = manager.query(&schema).unwrap().order_by("id").load_into(&mut views).unwrap();
    assert_eq!(keys, [
        ViewKey::new("PostView", 1),
        ViewKey::new("PostView", 2),
        ViewKey::new("PostView", 3),
    ]);
    assert_eq!(views.len(), 3);

    let post = views.get_mut(&keys[1]).unwrap();
    post.set("title", "renamed").unwrap();
    assert!(post.is_dirty());
    assert_eq!(post.dirty_attributes(), ["title"]);
    assert_eq!(post.get("title"), Some(&Value::from("renamed")));

    let summary = manager.flush(&mut views).unwrap();
    assert_eq!(summary.views_flushed(), 1);
    assert_eq!(summary.rows_affected(), 1);
    assert!(views.iter().all(|(_, view)| !view.is_dirty()));

    let post =
        manager.query(&schema).unwrap().r#where(Filter::eq("id", 2)).single_result().unwrap();
    assert_eq!(post.get("title"), Some(&Value::from("renamed")));

    let summary = manager.flush(&mut views).unwrap();
    assert_eq!(summary.views_flushed(), 0);
}

#[test]
fn flushing_a_deleted_view_fails() {
    let provider = Arc::new(sqlite(BLOG));
    let manager = ViewManager::new(
        Arc::clone(&provider) as Arc<dyn Provider>,
        ViewConfig::new(Dialect::Sqlite),
    );
    let schema = post_with_comment_ids("PostView", Fetch::Join);
    let mut views = UpdatableViewMap::new();

    let keys =
        manager.query(&schema).unwrap().r#where(Filter::eq("id", 2)).load_into(&mut views).unwrap();
    views.get_mut(&keys[0]).unwrap().set("title", "orphaned").unwrap();
    provider.exec("DELETE FROM posts WHERE id = 2", &[]).unwrap();

    let err = manager.flush(&mut views).expect_err("row deleted");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DataShape { .. })), "{err:?}");
    assert!(views.get(&keys[0]).unwrap().is_dirty());
}

#[test]
fn reloading_keeps_registered_views() {
    let manager = manager();
    let schema = post_with_comment_ids("PostView", Fetch::Join);
    let mut views = UpdatableViewMap::new();
    let query = || manager.query(&schema).unwrap().r#where(Filter::eq("id", 1));

    let keys = query().load_into(&mut views).unwrap();
    views.get_mut(&keys[0]).unwrap().set("title", "pending").unwrap();
    query().load_into(&mut views).unwrap();

    assert_eq!(views.len(), 1);
    assert_eq!(views.get(&keys[0]).unwrap().get("title"), Some(&Value::from("pending")));

    let removed = views.remove(&keys[0]).unwrap();
    assert!(removed.is_dirty());
    assert!(views.is_empty());
}

#[test]
fn only_basic_attributes_can_change() {
    let manager = manager();
    let schema = post_with_comment_ids("PostView", Fetch::Join);
    let mut views = UpdatableViewMap::new();
    let keys = manager.query(&schema).unwrap().load_into(&mut views).unwrap();
    let post = views.get_mut(&keys[0]).unwrap();

    assert!(configuration_error(&post.set("id", 7).expect_err("identifier")));
    assert!(configuration_error(&post.set("comments", Value::Null).expect_err("collection")));
    assert!(configuration_error(&post.set("missing", 1).expect_err("unknown")));
    assert!(!post.is_dirty());
}

#[test]
fn views_without_identifier_cannot_be_loaded() {
    let schema = ViewSchema::builder("Summary", "posts").basic("title", "title").build().unwrap();
    let mut views = UpdatableViewMap::new();

    let err = manager().query(&schema).unwrap().load_into(&mut views).expect_err("no identifier");
    assert!(configuration_error(&err));
}
