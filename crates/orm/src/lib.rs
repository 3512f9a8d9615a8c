//! Criteria query builder, object builders and query plans.
//!
//! `prism-orm` sits between the raw [`prism_sql::Provider`] and the view
//! layer. It renders dialect-specific SQL without exposing ``SeaQuery`` types,
//! turns result rows into objects and bundles both into executable plans.
//!
//! # Quick Start
//!
//! ```ignore
//! use prism_orm::{Filter, QueryContext, RowBuilder, SelectBuilder, SelectQueryPlan};
//!
//! let select = SelectBuilder::new("posts")
//!     .column("id")
//!     .column("title")
//!     .r#where(Filter::eq("published", true))
//!     .order_by_desc("created_at");
//!
//! let context = QueryContext::new(provider, Dialect::Sqlite);
//! let rows = SelectQueryPlan::new(context, select, Arc::new(RowBuilder))
//!     .window(0, Some(10))
//!     .result_list()?;
//! ```
//!
//! ## Joins
//!
//! ```ignore
//! SelectBuilder::new("posts")
//!     .join(Join::left("users", Filter::col_eq("author_id", Column::of("users", "id"))))
//!     .column_as(Column::of("users", "name"), "author_name");
//! ```
//!
//! ## Object builders
//!
//! ```ignore
//! let builder = ConstructorMatchingBuilder::new("Person", vec![
//!     Constructor::new("by_id", [ValueKind::Int], |v| Ok(Person::id(v[0].as_int()))),
//!     Constructor::new("by_id_name", [ValueKind::Int, ValueKind::Text], |v| ...),
//! ])?;
//! ```
//!
//! Failures raised by prism itself are [`Error`]s carried in
//! [`anyhow::Error`]; recover them with `downcast_ref`.

#![forbid(unsafe_code)]

mod builder;
mod context;
mod delete;
mod dialect;
mod error;
mod filter;
mod insert;
mod join;
mod plan;
mod query;
mod select;
mod update;

pub use builder::{
    BuilderStrategy, Constructor, ConstructorMatchingBuilder, FixedConstructorBuilder,
    ObjectBuilder, ParameterType, RowBuilder, Tuple, TupleBuilder,
};
pub use context::QueryContext;
pub use delete::DeleteBuilder;
pub use dialect::Dialect;
pub use error::Error;
pub use filter::{Column, Filter};
pub use insert::InsertBuilder;
pub use join::{Join, JoinKind};
pub use plan::{
    ModificationQueryPlan, ResultStream, ReturningModificationQueryPlan, ReturningResult,
    SelectQueryPlan,
};
pub use query::{Query, QueryBuilder, to_sea_value};
pub use select::{SelectBuilder, table_column};
pub use update::UpdateBuilder;

// Re-exported so dependants can build custom select expressions without
// pinning their own ``SeaQuery`` version.
#[doc(hidden)]
pub mod __private {
    pub use sea_query;
}
