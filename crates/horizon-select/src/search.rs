//! Wildcard search over option labels.
//!
//! A search text matches any label containing it, ignoring case. A literal
//! `*` stands for zero or more characters; everything else is matched as-is.

use horizon_select_core::logging::targets;
use regex::{Regex, RegexBuilder};

use crate::item::Item;

/// A compiled search text.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Option<Regex>,
    fallback: String,
}

impl SearchPattern {
    /// Compile a search text.
    pub fn new(text: &str) -> Self {
        let regex = RegexBuilder::new(&wildcard_to_regex(text))
            .case_insensitive(true)
            .build()
            .inspect_err(|err| {
                tracing::warn!(target: targets::STORE, "search pattern rejected: {err}");
            })
            .ok();

        Self {
            regex,
            fallback: text.to_lowercase(),
        }
    }

    /// Whether `text` matches.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => text.to_lowercase().contains(&self.fallback),
        }
    }

    /// Whether an item's label matches.
    pub fn matches(&self, item: &Item) -> bool {
        self.is_match(&item.text)
    }
}

/// Convert a wildcard search text into an unanchored regex.
pub(crate) fn wildcard_to_regex(text: &str) -> String {
    text.split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}
