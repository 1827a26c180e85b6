//! Error types for the option store.

use crate::catalog::Texts;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while sourcing or selecting options.
///
/// Only `get_items`/`get_selected_items` hand these to the host; every other
/// failure is recovered inside the store and surfaced as
/// `status.error_message` through [`StoreError::status_message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Dynamic data was requested but no fetch callback is configured.
    #[error("no fetch callback is configured")]
    NoFetchMethod,

    /// The fetch callback answered with data that does not have the expected shape.
    #[error("fetch result is not correctly formatted: {0}")]
    WrongFormattedData(String),

    /// Repeated fetches returned no new data before reaching the declared total.
    #[error("query did not return all results")]
    WrongQueryResult,

    /// Select-all refused because the search results are truncated.
    #[error("cannot select all searched items: results are not complete")]
    CannotSelectAllSearchedItems,

    /// Select-all refused because not every item is fetched and reverting is not allowed.
    #[error("cannot select all items: not all items are fetched")]
    CannotSelectAllRevertItems,

    /// A configuration property holds a value the store does not understand.
    #[error("property '{property}' has an unknown value '{value}'")]
    UnknownPropertyValue { property: String, value: String },

    /// A host callback rejected; the message is shown verbatim.
    #[error("{0}")]
    Callback(String),
}

impl StoreError {
    /// Create a callback error from any displayable message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    /// Create an unknown-property-value error.
    pub fn unknown_property_value(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownPropertyValue {
            property: property.into(),
            value: value.into(),
        }
    }

    /// The user-visible message for this error, taken from the text catalog.
    pub fn status_message(&self, texts: &Texts) -> String {
        match self {
            Self::NoFetchMethod => texts.no_fetch_method.clone(),
            Self::WrongFormattedData(_) => texts.wrong_formatted_data.clone(),
            Self::WrongQueryResult => texts.wrong_query_result.clone(),
            Self::CannotSelectAllSearchedItems => texts.cannot_select_all_searched_items.clone(),
            Self::CannotSelectAllRevertItems => texts.cannot_select_all_revert_items.clone(),
            Self::UnknownPropertyValue { property, value } => texts
                .unknown_property_value
                .replacen("%s", property, 1)
                .replacen("%s", value, 1),
            Self::Callback(message) => message.clone(),
        }
    }
}
