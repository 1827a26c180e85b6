//! Message and icon catalogs.
//!
//! Each store takes a snapshot of the process-wide default catalogs when it
//! is built. [`change_texts`] and [`change_icons`] patch those defaults and
//! only affect stores created afterwards; a store's own snapshot is patched
//! through `SelectStore::change_texts` / `SelectStore::change_icons`.

use std::sync::LazyLock;

use horizon_select_core::Property;
use serde::{Deserialize, Serialize};

/// Declares a catalog struct with string entries, its all-optional partial
/// counterpart and the patch operation between them.
macro_rules! catalog {
    (
        $(#[$meta:meta])*
        $name:ident / $partial:ident {
            $($(#[$field_meta:meta])* $field:ident = $default:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $($(#[$field_meta])* pub $field: String,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.to_string(),)*
                }
            }
        }

        #[doc = concat!("A partial [`", stringify!($name), "`]; `None` entries are left untouched.")]
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $partial {
            $(pub $field: Option<String>,)*
        }

        impl $name {
            /// Overwrite the entries set in `partial`.
            pub fn apply(&mut self, partial: &$partial) {
                $(
                    if let Some(value) = &partial.$field {
                        self.$field = value.clone();
                    }
                )*
            }
        }
    };
}

catalog! {
    /// User-visible labels and status messages.
    Texts / PartialTexts {
        search_placeholder = "Search",
        search_empty = "No results",
        select_all = "Select all",
        exclude_result = "Invert selection",
        reverse_selection = "The displayed selection is inverted.",
        no_selection = "Nothing selected",
        clear_selection = "Clear selection",
        clear_selections = "Clear all selections",
        /// `%d` is replaced by the number of hidden items.
        more_selected_item = "+1 other",
        more_selected_items = "+%d others",
        no_fetch_method = "Fetch callback is missing: it is not possible to retrieve data.",
        wrong_formatted_data = "The data fetched is not correctly formatted.",
        wrong_query_result = "Query did not return all results.",
        cannot_select_all_searched_items = "Cannot select all items: the search result is not complete.",
        cannot_select_all_revert_items = "Cannot select all items: some items are not fetched yet.",
        /// Two `%s`: the property name, then its value.
        unknown_property_value = "property \"%s\" has an unknown value \"%s\".",
    }
}

catalog! {
    /// Icon names, resolved by the renderer within [`Icons::family`].
    IconNames / PartialIconNames {
        caret_down = "caret-down",
        caret_up = "caret-up",
        check = "check",
        search = "search",
        spinner = "spinner",
        strikethrough = "strikethrough",
        times = "times",
        question = "question",
        spin = "spin",
    }
}

/// Icon set used to render the names of [`IconNames`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconFamily {
    /// Built-in icons.
    #[default]
    Selectic,
    FontAwesome4,
    FontAwesome5,
    FontAwesome6,
    /// Names are used verbatim as class names.
    Raw,
}

/// Icon catalog: a family and the icon names within it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Icons {
    pub family: IconFamily,
    #[serde(flatten)]
    pub names: IconNames,
}

/// A partial icon catalog.
pub type PartialIcons = PartialIconNames;

impl Icons {
    /// Patch names and optionally switch family.
    pub fn apply(&mut self, partial: &PartialIcons, family: Option<IconFamily>) {
        self.names.apply(partial);
        if let Some(family) = family {
            self.family = family;
        }
    }
}

static DEFAULT_TEXTS: LazyLock<Property<Texts>> = LazyLock::new(|| Property::new(Texts::default()));
static DEFAULT_ICONS: LazyLock<Property<Icons>> = LazyLock::new(|| Property::new(Icons::default()));

/// Patch the process-wide default texts. Existing stores are not affected.
pub fn change_texts(partial: &PartialTexts) {
    DEFAULT_TEXTS.update(|texts| texts.apply(partial));
}

/// Patch the process-wide default icons. Existing stores are not affected.
pub fn change_icons(partial: &PartialIcons, family: Option<IconFamily>) {
    DEFAULT_ICONS.update(|icons| icons.apply(partial, family));
}

/// Snapshot of the current default texts.
pub fn default_texts() -> Texts {
    DEFAULT_TEXTS.get()
}

/// Snapshot of the current default icons.
pub fn default_icons() -> Icons {
    DEFAULT_ICONS.get()
}
