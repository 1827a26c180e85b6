//! Selection values and the selected-items projection.

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};

/// Current selection: one id (or nothing) in single mode, an ordered list of
/// unique ids in multiple mode.
///
/// Order of a multiple value is selection order, not source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    Multiple(Vec<ItemId>),
    Single(Option<ItemId>),
}

impl Default for SelectionValue {
    fn default() -> Self {
        Self::Single(None)
    }
}

impl SelectionValue {
    /// An empty value of the requested shape.
    pub fn empty(multiple: bool) -> Self {
        if multiple {
            Self::Multiple(Vec::new())
        } else {
            Self::Single(None)
        }
    }

    /// Whether this value has the multiple-mode shape.
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(id) => id.is_none(),
            Self::Multiple(ids) => ids.is_empty(),
        }
    }

    /// The selected ids, in order.
    pub fn ids(&self) -> Vec<ItemId> {
        match self {
            Self::Single(id) => id.iter().cloned().collect(),
            Self::Multiple(ids) => ids.clone(),
        }
    }

    /// Whether `id` is literally part of the value.
    pub fn contains(&self, id: &ItemId) -> bool {
        match self {
            Self::Single(current) => current.as_ref() == Some(id),
            Self::Multiple(ids) => ids.contains(id),
        }
    }

    /// Convert to the requested shape.
    ///
    /// A scalar becomes a singleton list, a list keeps its first id.
    /// Duplicate ids of a list are collapsed. Coercing twice yields the same
    /// result as coercing once.
    pub fn coerce(self, multiple: bool) -> Self {
        match (self, multiple) {
            (Self::Single(id), true) => Self::Multiple(id.into_iter().collect()),
            (Self::Multiple(ids), true) => Self::Multiple(dedup(ids)),
            (Self::Multiple(ids), false) => Self::Single(ids.into_iter().next()),
            (single @ Self::Single(_), false) => single,
        }
    }

    /// Build a value of the requested shape from an id list.
    pub(crate) fn from_ids(ids: Vec<ItemId>, multiple: bool) -> Self {
        Self::Multiple(ids).coerce(multiple)
    }
}

fn dedup(ids: Vec<ItemId>) -> Vec<ItemId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

impl From<ItemId> for SelectionValue {
    fn from(id: ItemId) -> Self {
        Self::Single(Some(id))
    }
}

impl From<Option<ItemId>> for SelectionValue {
    fn from(id: Option<ItemId>) -> Self {
        Self::Single(id)
    }
}

impl From<Vec<ItemId>> for SelectionValue {
    fn from(ids: Vec<ItemId>) -> Self {
        Self::Multiple(ids)
    }
}

/// Display items for the current selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedOptions {
    Multiple(Vec<Item>),
    Single(Option<Item>),
}

impl Default for SelectedOptions {
    fn default() -> Self {
        Self::Single(None)
    }
}

impl SelectedOptions {
    /// The projected items, in selection order.
    pub fn items(&self) -> Vec<&Item> {
        match self {
            Self::Single(item) => item.iter().collect(),
            Self::Multiple(items) => items.iter().collect(),
        }
    }

    pub(crate) fn from_items(items: Vec<Item>, multiple: bool) -> Self {
        if multiple {
            Self::Multiple(items)
        } else {
            Self::Single(items.into_iter().next())
        }
    }
}
