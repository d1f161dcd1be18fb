//! Homogeneous sets of items
//!
//! A [`Collection`] owns the items of one type keyed by name and iterates
//! them sorted by name, so "first match" searches are stable.

use crate::item::{Item, ItemType};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// All items of one type
#[derive(Debug, Clone)]
pub struct Collection {
    item_type: ItemType,
    items: BTreeMap<String, Item>,
}

impl Collection {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            items: BTreeMap::new(),
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    /// Items sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Item names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.get_mut(name)
    }

    pub(crate) fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.name().to_string(), item)
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Item> {
        self.items.remove(name)
    }

    /// First item matching every criterion, in name order
    ///
    /// A lone exact `name` criterion tries a direct lookup before falling
    /// back to the case-insensitive scan.
    pub fn find(&self, criteria: &[(&str, &str)]) -> Result<Option<&Item>> {
        if criteria.is_empty() {
            return Err(Error::EmptySearch);
        }
        if let [("name", name)] = criteria {
            if let Some(item) = self.get(name) {
                return Ok(Some(item));
            }
        }
        for item in self.iter() {
            if item.find_match(criteria)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Every item matching every criterion, in name order
    pub fn find_all(&self, criteria: &[(&str, &str)]) -> Result<Vec<&Item>> {
        if criteria.is_empty() {
            return Err(Error::EmptySearch);
        }
        let mut found = Vec::new();
        for item in self.iter() {
            if item.find_match(criteria)? {
                found.push(item);
            }
        }
        Ok(found)
    }
}
