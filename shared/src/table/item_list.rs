use std::collections::HashMap;

use crate::types::Tick;

use super::item::StringTableItem;

/// Append-only list of items with exact-name lookup.
#[derive(Clone, Debug, Default)]
pub struct ItemList {
    items: Vec<StringTableItem>,
    lookup: HashMap<String, u32>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    pub fn get(&self, index: u32) -> Option<&StringTableItem> {
        self.items.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut StringTableItem> {
        self.items.get_mut(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &StringTableItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (index as u32, item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StringTableItem> {
        self.items.iter_mut()
    }

    /// Appends a new item. The caller has checked the name is absent.
    pub(crate) fn push(&mut self, name: &str, tick: Tick, keep_history: bool) -> u32 {
        let index = self.items.len() as u32;
        self.items
            .push(StringTableItem::new(name, tick, keep_history));
        self.lookup.insert(name.to_string(), index);
        index
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.lookup.clear();
    }
}
