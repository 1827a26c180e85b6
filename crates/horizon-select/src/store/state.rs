//! Mutable store state and the side effects a mutation schedules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Icons, Texts};
use crate::error::StoreError;
use crate::fetch::RequestTracker;
use crate::item::{Group, Item, ItemId};
use crate::params::{OptionBehavior, OptionOperation, SourceKind, StoreParams};
use crate::value::{SelectedOptions, SelectionValue};

/// Status flags exposed to display consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// A search request is in flight.
    pub searching: bool,
    /// User-visible error, empty when there is none.
    pub error_message: String,
    pub are_all_selected: bool,
    /// The user changed the selection since the list was opened.
    pub has_changed: bool,
    /// The last value change was made by the store itself.
    pub automatic_change: bool,
    /// The last close was made by the store itself.
    pub automatic_close: bool,
}

/// What changed after a store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    FilteredOptions,
    SelectedOptions,
    Value,
    Status,
    Open,
    Disabled,
    Groups,
    Texts,
    Icons,
}

/// Work scheduled by a synchronous mutation, run once the state lock is
/// released.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub rebuild_filtered: bool,
    pub prefetch: bool,
    pub resolve_selection: bool,
    pub strict_check: Option<SelectionValue>,
    pub reset_automatic_change: bool,
    pub reset_automatic_close: bool,
    /// Register as the open control; `true` to coexist with other open controls.
    pub register_open: Option<bool>,
    pub release_open: bool,
    pub events: Vec<StoreEvent>,
}

impl Effects {
    pub fn emit(&mut self, event: StoreEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }
}

/// Everything behind the store lock.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub has_fetch: bool,
    pub params: StoreParams,
    pub behavior: OptionBehavior,
    pub hide_filter: bool,
    pub keep_filter_open: bool,

    pub multiple: bool,
    pub props_disabled: bool,
    pub disabled: bool,
    pub is_open: bool,
    pub is_focused: bool,
    pub search_text: String,
    pub internal_value: SelectionValue,
    pub selection_is_excluded: bool,
    pub offset_item: usize,
    pub active_item_idx: Option<usize>,
    pub status: Status,

    pub host_groups: Vec<Group>,
    pub option_groups: Vec<Group>,
    pub groups: Vec<Group>,

    pub list_options: Vec<Item>,
    pub element_options: Vec<Item>,
    pub dyn_options: Vec<Item>,
    /// Declared size of the dynamic source, `None` while unknown.
    pub total_dyn: Option<usize>,

    pub all_options: Vec<Item>,
    pub total_all_options: Option<usize>,
    pub active_order: SourceKind,
    pub dyn_offset: usize,

    pub filtered_options: Vec<Item>,
    /// Number of items (headers excluded) the current search yields.
    pub total_filtered_items: Option<usize>,
    /// Items of `filtered_options` that precede dynamic results.
    pub filtered_dyn_offset: usize,
    /// Declared size of the dynamic results of the current search.
    pub search_total: Option<usize>,

    pub selected_options: SelectedOptions,

    pub cache_item: HashMap<ItemId, Item>,
    pub cache_generation: u64,
    pub requests: RequestTracker,
    pub do_not_update: bool,
    /// A display-list build task is running.
    pub building: bool,
    /// A rebuild was requested while `building`.
    pub rebuild_pending: bool,

    pub texts: Texts,
    pub icons: Icons,
}

impl StoreState {
    pub fn new(params: StoreParams, has_fetch: bool, texts: Texts, icons: Icons) -> Self {
        Self {
            has_fetch,
            multiple: params.multiple,
            behavior: OptionBehavior::default(),
            params,
            hide_filter: false,
            keep_filter_open: false,
            props_disabled: false,
            disabled: false,
            is_open: false,
            is_focused: false,
            search_text: String::new(),
            internal_value: SelectionValue::default(),
            selection_is_excluded: false,
            offset_item: 0,
            active_item_idx: None,
            status: Status::default(),
            host_groups: Vec::new(),
            option_groups: Vec::new(),
            groups: Vec::new(),
            list_options: Vec::new(),
            element_options: Vec::new(),
            dyn_options: Vec::new(),
            total_dyn: if has_fetch { None } else { Some(0) },
            all_options: Vec::new(),
            total_all_options: Some(0),
            active_order: SourceKind::List,
            dyn_offset: 0,
            filtered_options: Vec::new(),
            total_filtered_items: None,
            filtered_dyn_offset: 0,
            search_total: None,
            selected_options: SelectedOptions::default(),
            cache_item: HashMap::new(),
            cache_generation: 0,
            requests: RequestTracker::default(),
            do_not_update: false,
            building: false,
            rebuild_pending: false,
            texts,
            icons,
        }
    }

    /// Keep a single display-list build task alive.
    ///
    /// A rebuild requested while one runs is folded into it.
    pub fn claim_rebuild(&mut self, fx: &mut Effects) {
        if !fx.rebuild_filtered {
            return;
        }
        if self.building {
            self.rebuild_pending = true;
            fx.rebuild_filtered = false;
        } else {
            self.building = true;
        }
    }

    /// End of a build pass. Returns whether another pass was requested.
    pub fn finish_rebuild(&mut self) -> bool {
        if std::mem::take(&mut self.rebuild_pending) {
            return true;
        }
        self.building = false;
        false
    }

    pub fn page_size(&self) -> usize {
        self.params.page_size.max(1)
    }

    /// Data comes from a source whose extent is only known once fetched.
    pub fn is_partial(&self) -> bool {
        self.has_fetch
            && !(self.behavior.operation == OptionOperation::Force
                && self.active_order != SourceKind::Dynamic)
    }

    /// The dynamic source (when it matters) is completely loaded.
    pub fn has_fetched_all_items(&self) -> bool {
        !self.is_partial() || self.total_dyn.is_some_and(|total| self.dyn_options.len() >= total)
    }

    /// Every item the current search yields is in `filtered_options`.
    pub fn has_all_items(&self) -> bool {
        self.total_filtered_items
            .is_some_and(|total| self.filtered_item_count() >= total)
    }

    pub fn allow_group_selection(&self) -> bool {
        self.multiple && !self.is_partial() && !self.params.disable_group_selection
    }

    pub fn select_all_available(&self) -> bool {
        self.multiple
            && (self.select_all_targets().is_some()
                || self.params.allow_revert
                || self.params.force_select_all)
    }

    /// Number of items in `filtered_options`, headers excluded.
    pub fn filtered_item_count(&self) -> usize {
        self.filtered_options.iter().filter(|item| !item.is_group).count()
    }

    /// Displayed total: items plus the headers materialized so far.
    pub fn total_filtered_options(&self) -> Option<usize> {
        let headers = self.filtered_options.len() - self.filtered_item_count();
        self.total_filtered_items.map(|total| total + headers)
    }

    /// Items a select-all applies to, when they are all known locally.
    pub fn select_all_targets(&self) -> Option<Vec<&Item>> {
        let candidates: Box<dyn Iterator<Item = &Item> + '_> = if self.has_all_items() {
            Box::new(self.filtered_options.iter())
        } else if self.has_fetched_all_items() && self.search_text.is_empty() {
            // Closed list: nothing is displayed, use the merged options.
            Box::new(self.all_options.iter())
        } else {
            return None;
        };
        Some(candidates.filter(|item| item.is_bulk_selectable()).collect())
    }

    /// Semantic selection of `id`, honoring exclusion.
    pub fn is_selected(&self, id: &ItemId) -> bool {
        let listed = self.internal_value.contains(id);
        if self.multiple && self.selection_is_excluded { !listed } else { listed }
    }

    /// Look up a known item.
    pub fn find_item(&self, id: &ItemId) -> Option<&Item> {
        self.all_options
            .iter()
            .find(|item| !item.is_group && item.id.as_ref() == Some(id))
            .or_else(|| self.cache_item.get(id))
    }

    pub fn is_disabled_item(&self, id: &ItemId) -> bool {
        self.find_item(id).is_some_and(|item| item.disabled)
    }

    pub fn group_text(&self, id: &ItemId) -> String {
        self.groups
            .iter()
            .find(|group| &group.id == id)
            .map(|group| group.text.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Rebuild the group directory from host groups and option trees.
    pub fn merge_groups(&mut self) {
        let mut groups = self.host_groups.clone();
        for group in &self.option_groups {
            match groups.iter_mut().find(|known| known.id == group.id) {
                Some(known) => known.text = group.text.clone(),
                None => groups.push(group.clone()),
            }
        }
        self.groups = groups;
    }

    /// Annotate items for display and interleave group headers.
    pub fn decorate(&self, items: impl IntoIterator<Item = Item>) -> Vec<Item> {
        let mut decorated: Vec<Item> = Vec::new();
        let mut previous_group: Option<ItemId> = None;

        for mut item in items.into_iter().filter(|item| !item.is_group) {
            if item.group != previous_group {
                if let Some(group) = &item.group {
                    decorated.push(Item::group_header(&Group::new(group.clone(), self.group_text(group))));
                }
                previous_group = item.group.clone();
            }
            item.selected = item.id.as_ref().is_some_and(|id| self.is_selected(id))
                || (item.id.is_none() && !self.multiple && self.internal_value.is_empty());
            decorated.push(item);
        }

        mark_headers(&mut decorated);
        decorated
    }

    /// Recompute `selected` flags of displayed items and headers.
    pub fn refresh_selected_flags(&mut self, fx: &mut Effects) {
        let items = std::mem::take(&mut self.filtered_options);
        self.filtered_options = self.decorate(items);
        self.refresh_are_all_selected(fx);
        fx.emit(StoreEvent::FilteredOptions);
    }

    pub fn refresh_are_all_selected(&mut self, fx: &mut Effects) {
        let are_all_selected = if !self.multiple {
            false
        } else {
            match self.select_all_targets() {
                Some(targets) => {
                    !targets.is_empty()
                        && targets
                            .iter()
                            .filter_map(|item| item.id.as_ref())
                            .all(|id| self.is_selected(id))
                }
                None => self.selection_is_excluded && self.internal_value.is_empty(),
            }
        };
        if self.status.are_all_selected != are_all_selected {
            self.status.are_all_selected = are_all_selected;
            fx.emit(StoreEvent::Status);
        }
    }

    pub fn report_error(&mut self, err: &StoreError, fx: &mut Effects) {
        self.status.error_message = err.status_message(&self.texts);
        fx.emit(StoreEvent::Status);
    }

    pub fn clear_error(&mut self, fx: &mut Effects) {
        if !self.status.error_message.is_empty() {
            self.status.error_message.clear();
            fx.emit(StoreEvent::Status);
        }
    }

    /// Flag the current value change as automatic; it resets on the next tick.
    pub fn mark_automatic_change(&mut self, fx: &mut Effects) {
        self.status.automatic_change = true;
        fx.reset_automatic_change = true;
        fx.emit(StoreEvent::Status);
    }
}

/// Record known items in the id cache.
pub(crate) fn cache_items<'a>(cache: &mut HashMap<ItemId, Item>, items: impl IntoIterator<Item = &'a Item>) {
    for item in items {
        if let Some(id) = &item.id
            && !item.is_group
        {
            cache.insert(id.clone(), item.clone());
        }
    }
}

/// A header is selected when every selectable member under it is.
fn mark_headers(items: &mut [Item]) {
    let mut index = 0;
    while index < items.len() {
        if !items[index].is_group {
            index += 1;
            continue;
        }
        let end = items[index + 1..]
            .iter()
            .position(|item| item.is_group)
            .map_or(items.len(), |offset| index + 1 + offset);
        let mut members = items[index + 1..end].iter().filter(|item| item.is_bulk_selectable());
        let mut any = false;
        let all = members.all(|item| {
            any = true;
            item.selected
        });
        items[index].selected = any && all;
        index = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Icons, Texts};

    fn state(multiple: bool) -> StoreState {
        let params = StoreParams {
            multiple,
            ..StoreParams::default()
        };
        let mut state = StoreState::new(params, false, Texts::default(), Icons::default());
        state.internal_value = SelectionValue::empty(multiple);
        state
    }

    #[test]
    fn test_rebuild_requests_fold_into_running_build() {
        let mut state = state(false);
        let mut fx = Effects {
            rebuild_filtered: true,
            ..Effects::default()
        };
        state.claim_rebuild(&mut fx);
        assert!(fx.rebuild_filtered);
        assert!(state.building);

        let mut fx = Effects {
            rebuild_filtered: true,
            ..Effects::default()
        };
        state.claim_rebuild(&mut fx);
        assert!(!fx.rebuild_filtered);
        assert!(state.rebuild_pending);

        assert!(state.finish_rebuild());
        assert!(state.building);
        assert!(!state.finish_rebuild());
        assert!(!state.building);
    }

    #[test]
    fn test_decorate_inserts_headers_on_group_change() {
        let mut state = state(true);
        state.groups = vec![Group::new("g1", "First"), Group::new("g2", "Second")];
        let items = vec![
            Item::new(0, "a").with_group("g1"),
            Item::new(1, "b").with_group("g1"),
            Item::new(2, "c").with_group("g2"),
            Item::new(3, "d"),
        ];

        let decorated = state.decorate(items);
        let texts: Vec<&str> = decorated.iter().map(|item| item.text.as_str()).collect();
        assert_eq!(texts, vec!["First", "a", "b", "Second", "c", "d"]);
        assert!(decorated[0].is_group);
        assert!(decorated[3].is_group);
    }

    #[test]
    fn test_header_selected_when_all_selectable_members_are() {
        let mut state = state(true);
        state.internal_value = SelectionValue::Multiple(vec![ItemId::from(0)]);
        let items = vec![
            Item::new(0, "a").with_group("g"),
            Item::new(1, "b").with_group("g").with_disabled(true),
            Item::new(2, "c").with_group("h"),
        ];

        let decorated = state.decorate(items);
        assert!(decorated[0].selected);
        assert!(decorated[1].selected);
        assert!(!decorated[3].selected);
    }

    #[test]
    fn test_excluded_selection_inverts_flags() {
        let mut state = state(true);
        state.selection_is_excluded = true;
        state.internal_value = SelectionValue::Multiple(vec![ItemId::from(1)]);
        assert!(state.is_selected(&ItemId::from(0)));
        assert!(!state.is_selected(&ItemId::from(1)));
    }

    #[test]
    fn test_partial_only_with_fetch() {
        let mut state = state(false);
        assert!(!state.is_partial());
        assert!(state.has_fetched_all_items());

        state.has_fetch = true;
        state.total_dyn = None;
        assert!(state.is_partial());
        assert!(!state.has_fetched_all_items());

        state.behavior = "force-ODE".parse().unwrap();
        state.active_order = SourceKind::List;
        assert!(!state.is_partial());
    }
}
