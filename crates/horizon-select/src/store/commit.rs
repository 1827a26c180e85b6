//! The `commit` mutation gate and host prop replacement.

use horizon_select_core::logging::targets;

use super::state::{Effects, StoreEvent, StoreState};
use crate::item::{Group, OptionEntry, flatten_entries};
use crate::params::OptionBehavior;
use crate::value::SelectionValue;

/// A keyed store mutation.
///
/// Committing a value equal to the current one does nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    /// Search text; resets scrolling and rebuilds the display list.
    SearchText(String),
    /// Open or close the list. Opening is refused while disabled.
    IsOpen(bool),
    /// Index of the first item the list needs; may trigger a fetch.
    OffsetItem(usize),
    /// Keyboard-highlighted index in the display list.
    ActiveItemIdx(Option<usize>),
    InternalValue(SelectionValue),
    SelectionIsExcluded(bool),
    /// Disabling also closes the list.
    Disabled(bool),
    IsFocused(bool),
}

impl StoreState {
    /// Apply a commit and its side effects.
    pub fn commit(&mut self, commit: Commit, fx: &mut Effects) {
        tracing::trace!(target: targets::STORE, ?commit, "commit");
        match commit {
            Commit::SearchText(text) => self.set_search_text(text, fx),
            Commit::IsOpen(open) => self.set_open(open, fx),
            Commit::OffsetItem(offset) => {
                if offset != self.offset_item {
                    self.offset_item = offset;
                    fx.rebuild_filtered = true;
                }
            }
            Commit::ActiveItemIdx(index) => self.active_item_idx = index,
            Commit::InternalValue(value) => {
                let value = value.coerce(self.multiple);
                if value != self.internal_value {
                    self.internal_value = value;
                    fx.emit(StoreEvent::Value);
                    self.after_value_change(fx);
                }
            }
            Commit::SelectionIsExcluded(excluded) => {
                let excluded = excluded && self.multiple;
                if excluded != self.selection_is_excluded {
                    self.selection_is_excluded = excluded;
                    fx.emit(StoreEvent::Value);
                    self.after_value_change(fx);
                }
            }
            Commit::Disabled(disabled) => {
                if disabled != self.disabled {
                    self.disabled = disabled;
                    fx.emit(StoreEvent::Disabled);
                    if disabled {
                        self.close_automatically(fx);
                    }
                }
            }
            Commit::IsFocused(focused) => self.is_focused = focused,
        }
    }

    fn set_search_text(&mut self, text: String, fx: &mut Effects) {
        if text == self.search_text {
            return;
        }
        self.search_text = text;
        self.offset_item = 0;
        self.active_item_idx = None;
        self.reset_filtered();
        if self.search_text.is_empty() && self.status.searching {
            self.status.searching = false;
            fx.emit(StoreEvent::Status);
        }
        fx.rebuild_filtered = true;
        fx.emit(StoreEvent::FilteredOptions);
    }

    pub fn set_open(&mut self, open: bool, fx: &mut Effects) {
        let open = open && !self.disabled;
        if open == self.is_open {
            return;
        }
        self.is_open = open;
        fx.emit(StoreEvent::Open);

        if open {
            self.offset_item = 0;
            self.active_item_idx = None;
            self.status.has_changed = false;
            fx.emit(StoreEvent::Status);
            fx.rebuild_filtered = true;
            fx.register_open = Some(self.params.keep_open_with_other);
        } else {
            fx.release_open = true;
            self.check_auto_select(fx);
        }
    }

    /// Close without user action, flagging the close as automatic.
    pub fn close_automatically(&mut self, fx: &mut Effects) {
        if !self.is_open {
            return;
        }
        self.status.automatic_close = true;
        fx.reset_automatic_close = true;
        fx.emit(StoreEvent::Status);
        self.set_open(false, fx);
    }

    /// Replace the static list options.
    pub fn set_options(&mut self, entries: &[OptionEntry], fx: &mut Effects) {
        let (items, groups) = flatten_entries(entries);
        self.list_options = items;
        self.option_groups = groups;
        self.reload_sources(fx);
    }

    /// Replace the element options.
    pub fn set_child_options(&mut self, entries: &[OptionEntry], fx: &mut Effects) {
        let (items, groups) = flatten_entries(entries);
        self.element_options = items;
        for group in groups {
            if !self.option_groups.iter().any(|known| known.id == group.id) {
                self.option_groups.push(group);
            }
        }
        self.reload_sources(fx);
    }

    fn reload_sources(&mut self, fx: &mut Effects) {
        self.merge_groups();
        fx.emit(StoreEvent::Groups);
        self.cache_item.clear();
        self.cache_generation += 1;
        self.build_all_options(true, false, fx);
        self.after_value_change(fx);
    }

    /// Replace the host-supplied group directory.
    pub fn change_groups(&mut self, groups: Vec<Group>, fx: &mut Effects) {
        self.host_groups = groups;
        self.merge_groups();
        self.refresh_selected_flags(fx);
        fx.emit(StoreEvent::Groups);
    }

    /// Apply the host `disabled` prop.
    pub fn set_props_disabled(&mut self, disabled: bool, fx: &mut Effects) {
        self.props_disabled = disabled;
        self.commit(Commit::Disabled(disabled), fx);
        if !disabled {
            self.check_auto_disabled(fx);
        }
    }

    pub fn set_multiple(&mut self, multiple: bool, fx: &mut Effects) {
        if multiple == self.multiple {
            return;
        }
        self.multiple = multiple;
        self.params.multiple = multiple;
        self.assert_value_type(fx);
        self.check_hide_filter();
        self.after_value_change(fx);
    }

    pub fn set_page_size(&mut self, page_size: usize, fx: &mut Effects) {
        self.params.page_size = page_size;
        fx.rebuild_filtered = true;
    }

    pub fn set_strict_value(&mut self, strict: bool, fx: &mut Effects) {
        self.params.strict_value = strict;
        if strict {
            self.after_value_change(fx);
        }
    }

    /// Parse and apply an option behavior, falling back to the default.
    pub fn set_option_behavior(&mut self, raw: &str, fx: &mut Effects) {
        self.params.option_behavior = raw.to_string();
        self.behavior = match raw.parse::<OptionBehavior>() {
            Ok(behavior) => behavior,
            Err(err) => {
                tracing::warn!(target: targets::STORE, "{err}, falling back to sort-ODE");
                self.report_error(&err, fx);
                OptionBehavior::default()
            }
        };
        self.build_all_options(true, false, fx);
    }

    /// Drop caches and reload every source.
    pub fn clear_cache(&mut self, force_reset: bool, fx: &mut Effects) {
        self.cache_item.clear();
        self.cache_generation += 1;
        self.clear_error(fx);
        if force_reset {
            self.requests.invalidate_all();
            if self.status.searching {
                self.status.searching = false;
                fx.emit(StoreEvent::Status);
            }
        }
        tracing::debug!(target: targets::STORE, force_reset, "cleared cache");
        self.build_all_options(false, false, fx);
        self.build_selected_options(fx);
    }
}
