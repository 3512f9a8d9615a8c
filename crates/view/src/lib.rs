//! Entity views over prism queries.
//!
//! A view is a projection of an entity table declared as a [`ViewSchema`]:
//! basic columns, optional query parameters, nested views and collections.
//! Each nested attribute picks how its data is fetched:
//!
//! - `Join` left joins the related table into the primary query and folds
//!   the multiplied rows back per owner;
//! - `Select` resolves correlation keys with batched `IN (...)` queries;
//! - `Subselect` resolves them with one query restricted by the primary
//!   statement;
//! - `Multiset` aggregates the collection into one JSON column.
//!
//! The [`ViewManager`] compiles each schema once into a [`ViewTemplate`]
//! and runs its [`transformer`] pipeline over every result.
//!
//! # Quick Start
//!
//! ```ignore
//! use prism_view::{Container, Element, Fetch, Relation, ViewConfig, ViewManager, ViewSchema};
//!
//! let comment = ViewSchema::builder("CommentView", "comments")
//!     .id("id", "id")
//!     .basic("body", "body")
//!     .build()?;
//! let post = ViewSchema::builder("PostView", "posts")
//!     .id("id", "id")
//!     .basic("title", "title")
//!     .plural(
//!         "comments",
//!         Relation::new("comments", "id", "post_id"),
//!         Element::View(comment),
//!         Container::List,
//!         Fetch::Select { batch_size: Some(50) },
//!     )
//!     .build()?;
//!
//! let manager = ViewManager::new(provider, ViewConfig::from_env()?);
//! let posts = manager.query(&post)?.order_by("id").page(0, Some(20)).result_list()?;
//! ```
//!
//! ## Updating views
//!
//! ```ignore
//! let mut views = UpdatableViewMap::new();
//! let keys = manager.query(&post)?.load_into(&mut views)?;
//! views.get_mut(&keys[0]).expect("loaded").set("title", "Renamed")?;
//! manager.flush(&mut views)?;
//! ```

#![forbid(unsafe_code)]

mod builder;
mod config;
mod manager;
mod schema;
mod shape;
mod template;
pub mod transformer;
mod update;

pub use builder::{TypedViewObjectBuilder, ViewObjectBuilder};
pub use config::{ViewConfig, ViewOptions};
pub use manager::{ViewManager, ViewQuery};
pub use schema::{
    Attribute, Container, Element, Fetch, MapKey, Mapping, Relation, ViewSchema,
    ViewSchemaBuilder,
};
pub use shape::{TypeShape, ViewShape};
pub use template::ViewTemplate;
pub use update::{FlushSummary, MutableView, UpdatableViewMap, ViewKey, flush};
