//! Behavioral parameters of a store.
//!
//! [`StoreParams`] deserializes from JSON or TOML with camelCase keys and
//! fills every missing key with its default:
//!
//! ```
//! use horizon_select::StoreParams;
//!
//! let params: StoreParams = serde_json::from_str(r#"{"multiple": true, "pageSize": 50}"#).unwrap();
//! assert!(params.multiple);
//! assert_eq!(params.page_size, 50);
//! assert_eq!(params.option_behavior, "sort-ODE");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Number of options a list shows before the search box becomes useful.
pub const LOCAL_PAGE_SIZE: usize = 10;

/// Visibility of the search box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HideFilterRepr", into = "HideFilterRepr")]
pub enum HideFilter {
    /// Hidden when the list is short, single and fully known.
    #[default]
    Auto,
    /// Always shown, and shown expanded.
    Open,
    /// Always hidden.
    Always,
    /// Always shown.
    Never,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum HideFilterRepr {
    Flag(bool),
    Mode(HideFilterMode),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HideFilterMode {
    Auto,
    Open,
}

impl From<HideFilterRepr> for HideFilter {
    fn from(repr: HideFilterRepr) -> Self {
        match repr {
            HideFilterRepr::Flag(true) => Self::Always,
            HideFilterRepr::Flag(false) => Self::Never,
            HideFilterRepr::Mode(HideFilterMode::Auto) => Self::Auto,
            HideFilterRepr::Mode(HideFilterMode::Open) => Self::Open,
        }
    }
}

impl From<HideFilter> for HideFilterRepr {
    fn from(value: HideFilter) -> Self {
        match value {
            HideFilter::Always => Self::Flag(true),
            HideFilter::Never => Self::Flag(false),
            HideFilter::Auto => Self::Mode(HideFilterMode::Auto),
            HideFilter::Open => Self::Mode(HideFilterMode::Open),
        }
    }
}

/// How selected items that do not fit are displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOverflow {
    /// Hidden items are summarized as "+N others".
    #[default]
    Collapsed,
    /// Selected items wrap on several lines.
    Multiline,
}

/// Where the list opens relative to the control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListPosition {
    #[default]
    Auto,
    Top,
    Bottom,
}

/// One of the three option sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Static list options (`O`).
    List,
    /// Fetched options (`D`).
    Dynamic,
    /// Element options supplied outside normal props (`E`).
    Element,
}

impl SourceKind {
    /// Default precedence.
    pub const DEFAULT_ORDER: [SourceKind; 3] = [Self::List, Self::Dynamic, Self::Element];

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'O' => Some(Self::List),
            'D' => Some(Self::Dynamic),
            'E' => Some(Self::Element),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Self::List => 'O',
            Self::Dynamic => 'D',
            Self::Element => 'E',
        }
    }
}

/// How sources combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptionOperation {
    /// Concatenate sources in order.
    #[default]
    Sort,
    /// Use only the first non-empty source.
    Force,
}

/// Parsed `<operation>-<order>` setting, e.g. `sort-ODE` or `force-DO`.
///
/// Letters missing from the order are appended in default order and
/// duplicates are collapsed, so `order` always names each source once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionBehavior {
    pub operation: OptionOperation,
    pub order: Vec<SourceKind>,
}

impl Default for OptionBehavior {
    fn default() -> Self {
        Self {
            operation: OptionOperation::Sort,
            order: SourceKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl FromStr for OptionBehavior {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::unknown_property_value("optionBehavior", s);

        let (operation, letters) = s.split_once('-').ok_or_else(invalid)?;
        let operation = match operation {
            "sort" => OptionOperation::Sort,
            "force" => OptionOperation::Force,
            _ => return Err(invalid()),
        };

        let mut order = Vec::with_capacity(3);
        for letter in letters.chars() {
            let kind = SourceKind::from_letter(letter).ok_or_else(invalid)?;
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        if order.is_empty() {
            return Err(invalid());
        }
        for kind in SourceKind::DEFAULT_ORDER {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }

        Ok(Self { operation, order })
    }
}

impl fmt::Display for OptionBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation = match self.operation {
            OptionOperation::Sort => "sort",
            OptionOperation::Force => "force",
        };
        let order: String = self.order.iter().map(|kind| kind.letter()).collect();
        write!(f, "{operation}-{order}")
    }
}

/// Behavioral parameters, fixed at construction unless a setter says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreParams {
    pub multiple: bool,
    pub page_size: usize,
    pub hide_filter: HideFilter,
    /// Allow select-all on partially known data by inverting the selection.
    pub allow_revert: bool,
    /// Offer select-all even when it may fail.
    pub force_select_all: bool,
    pub allow_clear_selection: bool,
    pub auto_select: bool,
    pub auto_disabled: bool,
    /// Prune selected ids that do not correspond to a known item.
    pub strict_value: bool,
    pub selection_overflow: SelectionOverflow,
    /// Raw `<operation>-<order>` string; parsed by the store, which falls
    /// back to `sort-ODE` when it is malformed.
    pub option_behavior: String,
    pub disable_group_selection: bool,
    pub list_position: ListPosition,
    /// Stay open when another control opens.
    pub keep_open_with_other: bool,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            multiple: false,
            page_size: 100,
            hide_filter: HideFilter::Auto,
            allow_revert: false,
            force_select_all: false,
            allow_clear_selection: false,
            auto_select: true,
            auto_disabled: true,
            strict_value: false,
            selection_overflow: SelectionOverflow::Collapsed,
            option_behavior: "sort-ODE".to_string(),
            disable_group_selection: false,
            list_position: ListPosition::Auto,
            keep_open_with_other: false,
        }
    }
}

impl StoreParams {
    /// Parse the option behavior, falling back to the default.
    pub fn parsed_option_behavior(&self) -> (OptionBehavior, Option<StoreError>) {
        match self.option_behavior.parse() {
            Ok(behavior) => (behavior, None),
            Err(err) => (OptionBehavior::default(), Some(err)),
        }
    }
}
