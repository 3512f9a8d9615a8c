//! JOIN fetch folding.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use prism_orm::QueryContext;
use prism_sql::{Row, Value};

use super::container::{ContainerAccumulator, ContainerKind};
use super::{RowList, TupleListTransformer};

/// Where a JOIN fetched collection lives in the row.
///
/// The collection occupies the columns `target..end`. Its owner is identified
/// by the values at `parent_ids`; the columns from `end` on belong to
/// attributes declared after the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSpec {
    /// Identifier positions of the owner and its ancestors.
    pub parent_ids: Vec<usize>,
    /// First column of the collection; receives the container.
    pub target: usize,
    /// Index or map key position of keyed containers.
    pub key: Option<usize>,
    /// Element position.
    pub value: usize,
    /// One past the last column of the collection.
    pub end: usize,
    /// The container kind.
    pub kind: ContainerKind,
}

/// Folds the rows a JOIN fetch multiplied back into one row per owner.
///
/// Rows of one owner that differ after `end` carry the product with a sibling
/// collection: each distinct tail keeps one row, and elements are only taken
/// from rows sharing the owner's first tail so the product does not duplicate
/// them. Every surviving row receives the finished container.
///
/// Rows without an owner id and rows already holding the container pass
/// untouched, so folding a folded list is a no-op.
#[derive(Debug, Clone)]
pub struct CollectionTupleListTransformer {
    spec: FoldSpec,
}

struct Group {
    first_tail: Vec<Value>,
    tails: HashSet<Vec<Value>>,
    container: ContainerAccumulator,
}

impl CollectionTupleListTransformer {
    /// Folds the collection described by `spec`.
    #[must_use]
    pub const fn new(spec: FoldSpec) -> Self {
        Self { spec }
    }

    fn parent(&self, row: &Row) -> Option<Vec<Value>> {
        let mut parent = Vec::with_capacity(self.spec.parent_ids.len());
        for &position in &self.spec.parent_ids {
            match row.get(position) {
                Some(value) if !value.is_null() => parent.push(value.clone()),
                _ => return None,
            }
        }
        Some(parent)
    }
}

impl TupleListTransformer for CollectionTupleListTransformer {
    fn transform(&self, _context: &QueryContext, mut rows: RowList) -> Result<RowList> {
        let spec = &self.spec;
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        // per row: None to keep untouched, Some((group, keep)) otherwise
        let mut assignments: Vec<Option<(usize, bool)>> = Vec::with_capacity(rows.len());

        for row in &rows {
            let folded = row.get(spec.target).is_some_and(|value| spec.kind.holds(value));
            let Some(parent) = self.parent(row).filter(|_| !folded) else {
                assignments.push(None);
                continue;
            };

            let tail = row.values().get(spec.end..).unwrap_or_default().to_vec();
            let group_index = *index.entry(parent).or_insert_with(|| {
                groups.push(Group {
                    first_tail: tail.clone(),
                    tails: HashSet::new(),
                    container: ContainerAccumulator::new(spec.kind),
                });
                groups.len() - 1
            });
            let group = &mut groups[group_index];

            if tail == group.first_tail {
                let key = spec.key.map(|position| row.get(position).cloned().unwrap_or_default());
                let value = row.get(spec.value).cloned().unwrap_or_default();
                group.container.add(key, value)?;
            }
            let keep = group.tails.insert(tail);
            assignments.push(Some((group_index, keep)));
        }

        let containers: Vec<Value> =
            groups.into_iter().map(|group| group.container.finish()).collect();
        let before = rows.len();

        rows.retain(|row_index, row| match assignments[row_index] {
            None => true,
            Some((_, false)) => false,
            Some((group, true)) => {
                row[spec.target] = containers[group].clone();
                true
            }
        });

        tracing::trace!(
            target_position = spec.target,
            owners = containers.len(),
            removed = before - rows.len(),
            "folded join fetched collection"
        );

        Ok(rows)
    }
}
