use std::collections::HashMap;

use super::key::ViewKey;
use super::view::MutableView;

/// Insertion ordered map from [`ViewKey`] to the single [`MutableView`] of
/// that key.
#[derive(Debug, Default)]
pub struct UpdatableViewMap {
    entries: Vec<(ViewKey, MutableView)>,
    index: HashMap<ViewKey, usize>,
}

impl UpdatableViewMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The view of `key`, created by `create` if absent.
    pub fn get_or_insert_with<F>(&mut self, key: ViewKey, create: F) -> &mut MutableView
    where
        F: FnOnce() -> MutableView,
    {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.clone(), create()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    /// The view of `key`.
    #[must_use]
    pub fn get(&self, key: &ViewKey) -> Option<&MutableView> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    /// The view of `key`, mutably.
    pub fn get_mut(&mut self, key: &ViewKey) -> Option<&mut MutableView> {
        self.index.get(key).map(|&position| &mut self.entries[position].1)
    }

    /// Removes and returns the view of `key`.
    pub fn remove(&mut self, key: &ViewKey) -> Option<MutableView> {
        let position = self.index.remove(key)?;
        let (_, view) = self.entries.remove(position);
        for index in self.index.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }
        Some(view)
    }

    /// Number of views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no view.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The views in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ViewKey, &MutableView)> {
        self.entries.iter().map(|(key, view)| (key, view))
    }

    /// The views in insertion order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ViewKey, &mut MutableView)> {
        self.entries.iter_mut().map(|(key, view)| (&*key, view))
    }
}
