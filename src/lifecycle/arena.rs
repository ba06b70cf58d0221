use std::collections::BTreeMap;

use crate::models::{application::Application, history_entry::HistoryEntry, offer::Offer};

/// Anything stored in an [`Arena`] under its own identity.
pub trait Identified {
    fn id(&self) -> i64;
}

impl Identified for Offer {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Application {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for HistoryEntry {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Flat identity-keyed storage. Entities refer to one another by id only.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: BTreeMap<i64, T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Identified> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entity stored under its id.
    pub fn insert(&mut self, item: T) -> Option<T> {
        self.items.insert(item.id(), item)
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.items.into_values()
    }
}

impl<T: Identified> FromIterator<T> for Arena<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arena = Arena::new();
        for item in iter {
            arena.insert(item);
        }
        arena
    }
}

impl<T: Identified> From<T> for Arena<T> {
    fn from(item: T) -> Self {
        std::iter::once(item).collect()
    }
}
