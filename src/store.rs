//! Ordered, identity-deduplicated item collection.

use std::collections::HashSet;

use crate::model::{Beer, ItemId};

#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<Beer>,
    ids: HashSet<ItemId>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything and store `items` in order.
    ///
    /// Repeated ids inside `items` keep their first occurrence.
    pub fn replace(&mut self, items: Vec<Beer>) {
        self.items.clear();
        self.ids.clear();
        self.append_merge(items);
    }

    /// Append each item whose id is not already present. Returns the number
    /// actually inserted.
    pub fn append_merge(&mut self, items: Vec<Beer>) -> usize {
        let before = self.items.len();
        for item in items {
            if self.ids.insert(item.id.clone()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    /// How many of `items` `append_merge` would insert.
    pub fn count_new(&self, items: &[Beer]) -> usize {
        let mut seen: HashSet<&ItemId> = HashSet::new();
        items
            .iter()
            .filter(|item| !self.ids.contains(&item.id) && seen.insert(&item.id))
            .count()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, index: usize) -> Option<&Beer> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Beer> {
        self.items.iter()
    }
}
