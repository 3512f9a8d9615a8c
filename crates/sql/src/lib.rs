//! # Prism SQL
//!
//! The boundary between prism and the database that executes its queries.
//!
//! Everything above this crate speaks in [`Value`]s and [`Row`]s. A
//! [`Provider`] receives rendered SQL plus bound parameters and hands back
//! positional rows; it is otherwise a black box. [`SqlDefault`] is a bundled
//! `SQLite` provider suitable for development and tests.

#![forbid(unsafe_code)]

mod default_impl;
mod json;
mod row;
mod traits;
mod value;

pub use default_impl::{ConnectOptions, SqlDefault};
pub use row::{ResultRow, Row};
pub use traits::{Backend, FromEnv, Provider};
pub use value::{Collection, Value, ValueKind, ViewValue};
