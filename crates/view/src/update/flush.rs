//! Writing dirty views back to their tables.

use anyhow::{Context, Result, bail};
use prism_orm::{
    Filter, ModificationQueryPlan, QueryContext, UpdateBuilder, config_error, shape_error,
};

use super::map::UpdatableViewMap;
use crate::schema::Attribute;

/// What a [`flush`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    views_flushed: usize,
    rows_affected: u64,
}

impl FlushSummary {
    /// Number of dirty views written.
    #[must_use]
    pub const fn views_flushed(&self) -> usize {
        self.views_flushed
    }

    /// Rows affected by the UPDATE statements.
    #[must_use]
    pub const fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// Writes every dirty view of `views`, in insertion order, with one partial
/// `UPDATE <table> SET <changed columns> WHERE <id> = ?` each. Written views
/// are marked clean; the first failure stops the flush.
///
/// # Errors
///
/// Returns a configuration error for views without identifier column, a
/// data-shape error when the row of a view no longer exists, and provider
/// errors unchanged.
pub fn flush(views: &mut UpdatableViewMap, context: &QueryContext) -> Result<FlushSummary> {
    let mut summary = FlushSummary::default();

    for (key, view) in views.iter_mut() {
        if !view.is_dirty() {
            continue;
        }

        let query = {
            let Some(schema) = view.schema().concrete(view.view()) else {
                bail!(config_error!("{} is not a type of {}", view.view(), view.schema().name()));
            };
            let Some(id) = schema.id().and_then(Attribute::column) else {
                bail!(config_error!("{} has no identifier column to flush by", schema.name()));
            };

            let mut update = UpdateBuilder::new(schema.table()).dialect(context.dialect());
            for (column, value) in view.dirty_columns()? {
                update = update.set(column, value.clone());
            }
            update.r#where(Filter::eq(id, key.id().clone())).build()?
        };

        let rows = ModificationQueryPlan::new(context.clone(), query)
            .execute_update()
            .with_context(|| format!("flushing {} {}", key.view(), key.id()))?;
        if rows == 0 {
            bail!(shape_error!("{} {} no longer exists", key.view(), key.id()));
        }
        tracing::debug!(view = key.view(), id = %key.id(), rows, "view flushed");

        view.mark_clean();
        summary.views_flushed += 1;
        summary.rows_affected += rows;
    }

    tracing::debug!(
        views = summary.views_flushed,
        rows = summary.rows_affected,
        "flush completed"
    );
    Ok(summary)
}
