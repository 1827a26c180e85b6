//! Items, groups and the option trees hosts supply.
//!
//! An [`Item`] is one selectable entity. Hosts hand the store either flat
//! items or items nested under a group ([`OptionEntry::Group`]); the store
//! flattens those trees, tags every member with its group id and registers
//! the group in its directory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an item or a group.
///
/// Ids coming from JSON may be numbers or strings; both are kept as-is so a
/// numeric `1` and a textual `"1"` stay distinct, exactly as the host sent them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric id.
    Number(i64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ItemId {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One selectable entity.
///
/// `selected` is derived by the store from the current value and is never
/// read back as a source of truth. `title`, `style`, `class_name`, `icon` and
/// `data` are carried for the renderer and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item id; `None` is the "no selection" entry of single mode.
    #[serde(default)]
    pub id: Option<ItemId>,
    /// Display label.
    #[serde(default)]
    pub text: String,
    /// Not selectable or deselectable through normal interaction.
    #[serde(default)]
    pub disabled: bool,
    /// Selecting it clears any other selection in multiple mode.
    #[serde(default)]
    pub exclusive: bool,
    /// Group this item belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ItemId>,
    /// True only for the synthetic group headers of displayed lists.
    #[serde(default)]
    pub is_group: bool,
    /// Derived selection flag.
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Item {
    /// Create an item with an id and a label.
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create the "no selection" entry.
    pub fn none(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Placeholder shown for an id whose item is not known yet.
    pub fn placeholder(id: &ItemId) -> Self {
        Self {
            id: Some(id.clone()),
            text: id.to_string(),
            ..Self::default()
        }
    }

    /// Synthetic header inserted in displayed lists before a group's items.
    pub fn group_header(group: &Group) -> Self {
        Self {
            id: Some(group.id.clone()),
            text: group.text.clone(),
            is_group: true,
            ..Self::default()
        }
    }

    /// Mark the item as disabled.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Mark the item as exclusive.
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Attach the item to a group.
    pub fn with_group(mut self, group: impl Into<ItemId>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Whether the item can take part in bulk selection (group, select-all).
    pub fn is_bulk_selectable(&self) -> bool {
        !self.disabled && !self.exclusive && !self.is_group && self.id.is_some()
    }
}

/// A group directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: ItemId,
    pub text: String,
}

impl Group {
    /// Create a group entry.
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A group of items as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: ItemId,
    pub text: String,
    pub options: Vec<Item>,
}

/// One entry of a host-supplied option list: a plain item or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionEntry {
    /// Items nested under a group.
    Group(GroupEntry),
    /// A plain item.
    Item(Item),
}

impl OptionEntry {
    /// Build a group entry.
    pub fn group(id: impl Into<ItemId>, text: impl Into<String>, options: Vec<Item>) -> Self {
        Self::Group(GroupEntry {
            id: id.into(),
            text: text.into(),
            options,
        })
    }
}

impl From<Item> for OptionEntry {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

/// Flatten an option tree into items, tagging group members and collecting
/// the groups found along the way.
pub(crate) fn flatten_entries(entries: &[OptionEntry]) -> (Vec<Item>, Vec<Group>) {
    let mut items = Vec::with_capacity(entries.len());
    let mut groups = Vec::new();

    for entry in entries {
        match entry {
            OptionEntry::Item(item) => items.push(item.clone()),
            OptionEntry::Group(group) => {
                groups.push(Group::new(group.id.clone(), group.text.clone()));
                items.extend(group.options.iter().map(|item| Item {
                    group: Some(group.id.clone()),
                    ..item.clone()
                }));
            }
        }
    }

    (items, groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_tags_group_members() {
        let entries = vec![
            OptionEntry::from(Item::new(1, "one")),
            OptionEntry::group("g", "Group", vec![Item::new(2, "two"), Item::new(3, "three")]),
        ];

        let (items, groups) = flatten_entries(&entries);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].group, None);
        assert_eq!(items[1].group, Some(ItemId::from("g")));
        assert_eq!(items[2].group, Some(ItemId::from("g")));
        assert_eq!(groups, vec![Group::new("g", "Group")]);
    }

    #[test]
    fn test_item_deserializes_mixed_ids() {
        let entries: Vec<OptionEntry> = serde_json::from_str(
            r#"[
                {"id": 1, "text": "number"},
                {"id": "a", "text": "string", "disabled": true},
                {"id": "grp", "text": "Group", "options": [{"id": 2, "text": "nested"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], OptionEntry::Item(item) if item.id == Some(ItemId::Number(1))));
        assert!(matches!(&entries[1], OptionEntry::Item(item) if item.disabled));
        assert!(matches!(&entries[2], OptionEntry::Group(group) if group.options.len() == 1));
    }

    #[test]
    fn test_placeholder_uses_id_as_text() {
        let item = Item::placeholder(&ItemId::from(42));
        assert_eq!(item.text, "42");
        assert!(!item.is_group);
    }
}
