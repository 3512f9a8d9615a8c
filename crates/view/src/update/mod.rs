//! # Updatable Views
//!
//! Views loaded for modification live in an [`UpdatableViewMap`] owned by
//! the unit of work: one [`MutableView`] per [`ViewKey`], so rows referencing
//! the same entity share one instance. [`flush`] writes the changed basic
//! attributes back, one partial UPDATE per dirty view.

mod flush;
mod key;
mod map;
mod view;

pub use self::flush::{FlushSummary, flush};
pub use self::key::ViewKey;
pub use self::map::UpdatableViewMap;
pub use self::view::MutableView;
