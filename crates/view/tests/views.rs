//! Integration tests for polymorphic views, parameters and typed builders.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{ints, manager, post_with_comment_ids, tracing};
use prism_orm::{BuilderStrategy, Filter, ObjectBuilder};
use prism_sql::{Collection, Row, Value};
use prism_view::{Fetch, ViewSchema};

fn people() -> Arc<ViewSchema> {
    let person = ViewSchema::builder("Person", "people")
        .id("id", "id")
        .basic("name", "name")
        .discriminator("kind")
        .build()
        .unwrap();
    let employee = ViewSchema::builder("Employee", "people")
        .extends(&person)
        .discriminator_value("employee")
        .basic("salary", "salary")
        .build()
        .unwrap();
    let student = ViewSchema::builder("Student", "people")
        .extends(&person)
        .discriminator_value("student")
        .basic("school", "school")
        .build()
        .unwrap();
    ViewSchema::with_subtypes(&person, vec![employee, student]).unwrap()
}

#[test]
fn subtypes_are_resolved_per_row() {
    tracing();
    let views = manager().query(&people()).unwrap().order_by("id").result_list().unwrap();

    let types: Vec<_> = views.iter().map(prism_sql::ViewValue::view).collect();
    assert_eq!(types, ["Employee", "Student", "Person", "Person"]);

    assert_eq!(views[0].names(), ["id", "name", "salary"]);
    assert_eq!(views[0].get("salary"), Some(&Value::Int(100)));
    assert_eq!(views[1].get("school"), Some(&Value::from("mit")));
    assert_eq!(views[1].get("salary"), None);
    assert_eq!(views[2].names(), ["id", "name"]);
    assert_eq!(views[3].get("name"), Some(&Value::from("nil")));
}

#[test]
fn parameters_fill_attributes() {
    let schema = ViewSchema::builder("PostView", "posts")
        .id("id", "id")
        .parameter("viewer", "viewer")
        .build()
        .unwrap();
    let manager = manager();

    let post = manager
        .query(&schema)
        .unwrap()
        .r#where(Filter::eq("id", 1))
        .parameter("viewer", "ada")
        .single_result()
        .unwrap();
    assert_eq!(post.get("viewer"), Some(&Value::from("ada")));

    let post = manager.query(&schema).unwrap().r#where(Filter::eq("id", 1)).single_result().unwrap();
    assert_eq!(post.get("viewer"), Some(&Value::Null));
}

#[derive(Debug, PartialEq, Eq)]
struct Post {
    id: i64,
    title: String,
    comments: usize,
}

#[test]
fn typed_builders_receive_attribute_values() {
    let builder: Arc<dyn ObjectBuilder<Post>> = Arc::new(BuilderStrategy::factory(|row: Row| {
        Ok(Post {
            id: row.get(0).and_then(Value::as_int).unwrap_or_default(),
            title: row.get(1).and_then(Value::as_text).unwrap_or_default().to_string(),
            comments: row.get(2).and_then(Value::as_collection).map_or(0, Collection::len),
        })
    }));
    let schema = post_with_comment_ids("PostView", Fetch::Join);

    let posts = manager().query_as(&schema, builder).unwrap().order_by("id").result_list().unwrap();

    assert_eq!(
        posts,
        [
            Post { id: 1, title: "first".to_string(), comments: 2 },
            Post { id: 2, title: "second".to_string(), comments: 0 },
            Post { id: 3, title: "third".to_string(), comments: 1 },
        ]
    );
}

#[test]
fn single_result_requires_one_view() {
    let manager = manager();
    let schema = post_with_comment_ids("PostView", Fetch::Join);

    let post = manager.query(&schema).unwrap().r#where(Filter::eq("id", 1)).single_result().unwrap();
    assert_eq!(ints(&post, "comments"), [10, 11]);

    manager.query(&schema).unwrap().single_result().expect_err("three posts");
}
