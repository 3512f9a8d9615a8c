//! Integration tests for ORM filters.
//!
//! Tests the public API as users would interact with it.

#![allow(missing_docs)]

mod common;

use common::assert_sql_contains;
use prism_orm::{Column, Filter, Join, SelectBuilder};
use prism_sql::Value;

fn users() -> SelectBuilder {
    SelectBuilder::new("users").column("id")
}

#[test]
fn filter_like_pattern() {
    let query = users().r#where(Filter::like("name", "%john%")).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.name", "LIKE", "$1"]);
    assert_eq!(query.params, vec![Value::Text("%john%".into())]);
}

#[test]
fn filter_not_like_pattern() {
    let query = users().r#where(Filter::not_like("name", "%admin%")).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.name", "NOT LIKE", "$1"]);
    assert_eq!(query.params.len(), 1);
}

#[test]
fn filter_between_values() {
    let query = users().r#where(Filter::between("id", 1, 100)).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.id", "BETWEEN", "$1", "AND", "$2"]);
    assert_eq!(query.params, vec![Value::Int(1), Value::Int(100)]);
}

#[test]
fn filter_in_multiple_values() {
    let query = users().r#where(Filter::r#in("id", vec![1, 2, 3, 4, 5])).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.id", "IN"]);
    assert_eq!(query.params.len(), 5);
}

#[test]
fn filter_not_in_values() {
    let query = users().r#where(Filter::not_in("id", vec![99, 100])).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.id", "NOT IN"]);
    assert_eq!(query.params.len(), 2);
}

#[test]
fn filter_in_subquery() {
    let inner = SelectBuilder::new("admins").column("user_id").r#where(Filter::eq("level", 3));
    let query = users().r#where(Filter::in_subquery("id", inner)).build().unwrap();

    assert_sql_contains(
        &query.sql,
        &["WHERE", "users.id", "IN (SELECT admins.user_id FROM admins", "admins.level"],
    );
    assert_eq!(query.params, vec![Value::Int(3)]);
}

#[test]
fn filter_is_null() {
    let query = users().r#where(Filter::is_null("name")).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.name", "IS (NULL)"]);
    assert_eq!(query.params.len(), 0);
}

#[test]
fn filter_is_not_null() {
    let query = users().r#where(Filter::is_not_null("name")).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "users.name", "IS NOT (NULL)"]);
    assert_eq!(query.params.len(), 0);
}

#[test]
fn filter_table_qualified_comparison() {
    let query = users().r#where(Filter::eq(Column::of("roles", "name"), "admin")).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "roles.name", "=", "$1"]);
    assert_eq!(query.params, vec![Value::Text("admin".into())]);
}

#[test]
fn filter_col_eq_in_join() {
    let query = users()
        .join(Join::left("user_roles", Filter::col_eq("id", Column::of("user_roles", "user_id"))))
        .build()
        .unwrap();

    assert_sql_contains(&query.sql, &["LEFT JOIN", "user_roles", "ON", "users.id", "=", "user_roles.user_id"]);
}

#[test]
fn filter_not() {
    let query = users().r#where(Filter::Not(Box::new(Filter::eq("active", true)))).build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE NOT ((users.active) = ($1))"]);
}

#[test]
fn filter_deeply_nested() {
    let query = users()
        .r#where(Filter::Or(vec![
            Filter::And(vec![Filter::eq("active", true), Filter::gt("id", 10)]),
            Filter::And(vec![Filter::eq("active", false), Filter::lt("id", 5)]),
        ]))
        .build()
        .unwrap();

    assert_sql_contains(&query.sql, &["WHERE", "AND", "OR"]);
    assert_eq!(
        query.params,
        vec![Value::Bool(true), Value::Int(10), Value::Bool(false), Value::Int(5)]
    );
}

#[test]
fn filter_empty_and() {
    let query = users().r#where(Filter::And(vec![])).build().unwrap();

    // Empty AND should be treated as true (all conditions satisfied)
    assert_sql_contains(&query.sql, &["SELECT", "FROM users"]);
}

#[test]
fn filter_empty_or() {
    let query = users().r#where(Filter::Or(vec![])).build().unwrap();

    // Empty OR should be treated as false (no conditions satisfied)
    assert_sql_contains(&query.sql, &["SELECT", "FROM users"]);
}

#[test]
fn filter_null_value_binds_as_null() {
    let query = users().r#where(Filter::ne("name", Value::Null)).build().unwrap();
    assert_eq!(query.params, vec![Value::Null]);
}
