//! Container materialization.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use prism_orm::shape_error;
use prism_sql::{Collection, Value};

use crate::schema::Container;

/// Most Null slots one index of an indexed list may skip past the current end.
const MAX_INDEX_GAP: usize = 1 << 16;

/// The container kinds a plural attribute materializes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Arrival order, Null elements skipped.
    List,
    /// Ordered by a non-negative integer index; gaps are Null.
    IndexedList,
    /// Deduplicated, first-arrival order.
    Set,
    /// Keyed entries, first-arrival order.
    Map,
}

impl ContainerKind {
    /// Whether `value` already holds a container of this kind.
    #[must_use]
    pub const fn holds(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::List | Self::IndexedList, Value::Collection(Collection::List(_)))
                | (Self::Set, Value::Collection(Collection::Set(_)))
                | (Self::Map, Value::Collection(Collection::Map(_)))
        )
    }

    /// Whether elements are added with a key.
    #[must_use]
    pub const fn is_keyed(self) -> bool {
        matches!(self, Self::IndexedList | Self::Map)
    }

    /// The empty container.
    #[must_use]
    pub fn empty(self) -> Value {
        ContainerAccumulator::new(self).finish()
    }
}

impl From<&Container> for ContainerKind {
    fn from(container: &Container) -> Self {
        match container {
            Container::List => Self::List,
            Container::IndexedList(_) => Self::IndexedList,
            Container::Set => Self::Set,
            Container::Map(_) => Self::Map,
        }
    }
}

/// Accumulates the elements of one container.
#[derive(Debug, Clone)]
pub struct ContainerAccumulator {
    kind: ContainerKind,
    elements: Vec<Value>,
    slots: Vec<Option<Value>>,
    entries: Vec<(Value, Value)>,
    seen: HashSet<Value>,
    keys: HashMap<Value, usize>,
}

impl ContainerAccumulator {
    /// An empty accumulator.
    #[must_use]
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
            slots: Vec::new(),
            entries: Vec::new(),
            seen: HashSet::new(),
            keys: HashMap::new(),
        }
    }

    /// Adds one element. `key` is the index or map key for keyed kinds and
    /// ignored otherwise.
    ///
    /// A row without an element (Null key and Null value, as produced by an
    /// outer join without match) adds nothing.
    ///
    /// # Errors
    ///
    /// Returns a data-shape error for an invalid index, or for a duplicate
    /// index or key carrying a different value.
    pub fn add(&mut self, key: Option<Value>, value: Value) -> Result<()> {
        match self.kind {
            ContainerKind::List => {
                if !value.is_null() {
                    self.elements.push(value);
                }
            }
            ContainerKind::Set => {
                if !value.is_null() && self.seen.insert(value.clone()) {
                    self.elements.push(value);
                }
            }
            ContainerKind::IndexedList => {
                let key = key.unwrap_or_default();
                if key.is_null() && value.is_null() {
                    return Ok(());
                }
                let index = match key {
                    Value::Int(index) => usize::try_from(index).ok(),
                    _ => None,
                };
                let Some(index) = index else {
                    bail!(shape_error!("list index {key} is not a non-negative integer"));
                };
                if index > self.slots.len().saturating_add(MAX_INDEX_GAP) {
                    bail!(shape_error!(
                        "list index {index} leaves more than {MAX_INDEX_GAP} empty slots"
                    ));
                }
                if self.slots.len() <= index {
                    self.slots.resize(index + 1, None);
                }
                match &self.slots[index] {
                    None => self.slots[index] = Some(value),
                    Some(existing) if *existing == value => {}
                    Some(existing) => {
                        bail!(shape_error!(
                            "list index {index} holds both {existing} and {value}"
                        ));
                    }
                }
            }
            ContainerKind::Map => {
                let key = key.unwrap_or_default();
                if key.is_null() {
                    if value.is_null() {
                        return Ok(());
                    }
                    bail!(shape_error!("map value {value} has a Null key"));
                }
                match self.keys.get(&key) {
                    None => {
                        self.keys.insert(key.clone(), self.entries.len());
                        self.entries.push((key, value));
                    }
                    Some(&index) if self.entries[index].1 == value => {}
                    Some(&index) => {
                        bail!(shape_error!(
                            "map key {key} holds both {} and {value}",
                            self.entries[index].1
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// The finished container.
    #[must_use]
    pub fn finish(self) -> Value {
        let collection = match self.kind {
            ContainerKind::List => Collection::List(self.elements),
            ContainerKind::Set => Collection::Set(self.elements),
            ContainerKind::IndexedList => {
                Collection::List(self.slots.into_iter().map(Option::unwrap_or_default).collect())
            }
            ContainerKind::Map => Collection::Map(self.entries),
        };
        Value::Collection(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: Vec<Value>) -> Value {
        Value::Collection(Collection::List(values))
    }

    #[test]
    fn indexed_list_orders_by_index() {
        let mut acc = ContainerAccumulator::new(ContainerKind::IndexedList);
        acc.add(Some(Value::Int(0)), "a".into()).expect("index 0");
        acc.add(Some(Value::Int(2)), "c".into()).expect("index 2");
        acc.add(Some(Value::Int(1)), "b".into()).expect("index 1");

        assert_eq!(acc.finish(), list(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn indexed_list_pads_gaps_and_rejects_collisions() {
        let mut acc = ContainerAccumulator::new(ContainerKind::IndexedList);
        acc.add(Some(Value::Int(2)), "c".into()).expect("index 2");
        acc.add(Some(Value::Int(2)), "c".into()).expect("identical duplicate");
        acc.add(Some(Value::Int(2)), "x".into()).expect_err("collision");
        acc.add(Some(Value::Int(-1)), "x".into()).expect_err("negative index");

        assert_eq!(acc.finish(), list(vec![Value::Null, Value::Null, "c".into()]));
    }

    #[test]
    fn indexed_list_rejects_unbounded_gaps() {
        let mut acc = ContainerAccumulator::new(ContainerKind::IndexedList);
        acc.add(Some(Value::Int(i64::MAX)), 1.into()).expect_err("index out of range");
        let gap = i64::try_from(MAX_INDEX_GAP).expect("gap fits");
        acc.add(Some(Value::Int(gap + 1)), 1.into()).expect_err("gap too large");
        acc.add(Some(Value::Int(gap)), 1.into()).expect("largest gap");
        let Value::Collection(list) = acc.finish() else { panic!("collection expected") };
        assert_eq!(list.len(), MAX_INDEX_GAP + 1);
    }

    #[test]
    fn set_deduplicates() {
        let mut acc = ContainerAccumulator::new(ContainerKind::Set);
        for value in [1, 2, 1, 3, 2] {
            acc.add(None, value.into()).expect("set element");
        }
        let Value::Collection(set) = acc.finish() else { panic!("collection expected") };
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn map_rejects_conflicting_keys() {
        let mut acc = ContainerAccumulator::new(ContainerKind::Map);
        acc.add(Some("k".into()), 1.into()).expect("first");
        acc.add(Some("k".into()), 1.into()).expect("identical duplicate");
        acc.add(Some("k".into()), 2.into()).expect_err("conflict");
    }

    #[test]
    fn list_skips_null_elements() {
        let mut acc = ContainerAccumulator::new(ContainerKind::List);
        acc.add(None, Value::Null).expect("null");
        acc.add(None, 10.into()).expect("element");
        acc.add(None, 10.into()).expect("repeated element");

        assert_eq!(acc.finish(), list(vec![10.into(), 10.into()]));
        assert!(ContainerKind::List.holds(&ContainerKind::IndexedList.empty()));
        assert!(!ContainerKind::Set.holds(&ContainerKind::List.empty()));
    }
}
