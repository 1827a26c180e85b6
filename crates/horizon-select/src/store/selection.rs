//! Selection mutation and the selected-items projection.

use std::collections::HashMap;

use horizon_select_core::logging::targets;

use super::state::{Effects, StoreEvent, StoreState};
use crate::error::StoreError;
use crate::item::{Item, ItemId};
use crate::value::{SelectedOptions, SelectionValue};

impl StoreState {
    /// Recompute everything that depends on the value.
    ///
    /// Skipped while a batch (group or select-all) is in progress; the batch
    /// calls it once at the end.
    pub fn after_value_change(&mut self, fx: &mut Effects) {
        if self.do_not_update {
            return;
        }
        self.assert_correct_value(false, fx);
        self.refresh_selected_flags(fx);
        self.build_selected_options(fx);
        self.check_auto_disabled(fx);
    }

    /// Project the value onto display items, from the cache where possible.
    ///
    /// Ids missing from the cache get a placeholder and schedule a lookup.
    pub fn build_selected_options(&mut self, fx: &mut Effects) {
        let ids = self.internal_value.ids();
        let mut missing = false;
        let items: Vec<Item> = ids
            .iter()
            .map(|id| {
                let item = self.cache_item.get(id).cloned().unwrap_or_else(|| {
                    missing = true;
                    Item::placeholder(id)
                });
                Item { selected: true, ..item }
            })
            .collect();

        self.selected_options = SelectedOptions::from_items(items, self.multiple);
        fx.emit(StoreEvent::SelectedOptions);
        if missing {
            fx.resolve_selection = true;
        }
    }

    /// Apply the lookup started for `snapshot`.
    pub fn apply_selected_resolution(
        &mut self,
        snapshot: &SelectionValue,
        resolved: Result<Vec<Item>, StoreError>,
        fx: &mut Effects,
    ) {
        if &self.internal_value != snapshot {
            tracing::trace!(target: targets::SELECTION, "value changed during lookup, discarding");
            return;
        }
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(target: targets::SELECTION, "selected items lookup failed: {err}");
                self.report_error(&err, fx);
                return;
            }
        };

        let ids = snapshot.ids();
        let by_id: HashMap<ItemId, Item> = resolved
            .into_iter()
            .filter_map(|item| item.id.clone().map(|id| (id, item)))
            .collect();

        if self.params.strict_value && by_id.len() < ids.len() {
            let kept: Vec<ItemId> = ids.iter().filter(|id| by_id.contains_key(*id)).cloned().collect();
            tracing::debug!(
                target: targets::SELECTION,
                pruned = ids.len() - kept.len(),
                "pruned unresolved ids from strict value"
            );
            self.internal_value = SelectionValue::from_ids(kept, self.multiple);
            self.mark_automatic_change(fx);
            fx.emit(StoreEvent::Value);
            self.refresh_selected_flags(fx);
        }

        let items: Vec<Item> = self
            .internal_value
            .ids()
            .iter()
            .map(|id| {
                let item = by_id.get(id).cloned().unwrap_or_else(|| Item::placeholder(id));
                Item { selected: true, ..item }
            })
            .collect();
        self.selected_options = SelectedOptions::from_items(items, self.multiple);
        fx.emit(StoreEvent::SelectedOptions);

        if self.internal_value.is_empty() {
            self.check_auto_select(fx);
        }
    }

    /// Select or deselect one item. Returns whether the value changed.
    ///
    /// `selected: None` toggles in multiple mode and selects in single mode.
    /// In single mode the control closes unless `keep_open` is set, even when
    /// the value did not change.
    pub fn select_item(
        &mut self,
        id: Option<ItemId>,
        selected: Option<bool>,
        keep_open: bool,
        fx: &mut Effects,
    ) -> bool {
        if let Some(id) = &id {
            let item = self.find_item(id);
            if item.is_some_and(|item| item.disabled) {
                return false;
            }
            if self.params.strict_value && item.is_none() {
                return false;
            }
        }

        let changed = if self.multiple {
            self.select_multiple(id, selected)
        } else {
            let changed = self.select_single(id, selected);
            if !keep_open {
                self.set_open(false, fx);
            }
            changed
        };

        if changed {
            tracing::trace!(target: targets::SELECTION, value = ?self.internal_value, "selection changed");
            self.status.has_changed = true;
            fx.emit(StoreEvent::Value);
            fx.emit(StoreEvent::Status);
            self.after_value_change(fx);
        }
        changed
    }

    fn select_single(&mut self, id: Option<ItemId>, selected: Option<bool>) -> bool {
        let current = match &self.internal_value {
            SelectionValue::Single(current) => current.clone(),
            SelectionValue::Multiple(ids) => ids.first().cloned(),
        };
        let select = selected.unwrap_or(true);

        if id.is_none() || !select {
            let Some(current_id) = &current else {
                return false;
            };
            if id.as_ref().is_some_and(|id| id != current_id) || self.is_disabled_item(current_id) {
                return false;
            }
            self.internal_value = SelectionValue::Single(None);
            return true;
        }

        if current == id {
            return false;
        }
        self.internal_value = SelectionValue::Single(id);
        true
    }

    fn select_multiple(&mut self, id: Option<ItemId>, selected: Option<bool>) -> bool {
        let mut ids = self.internal_value.ids();

        let Some(id) = id else {
            let kept: Vec<ItemId> = ids.iter().filter(|id| self.is_disabled_item(id)).cloned().collect();
            if kept.len() == ids.len() && !self.selection_is_excluded {
                return false;
            }
            self.internal_value = SelectionValue::Multiple(kept);
            self.selection_is_excluded = false;
            return true;
        };

        let currently = self.is_selected(&id);
        let select = selected.unwrap_or(!currently);
        if select == currently {
            return false;
        }

        if self.selection_is_excluded {
            if ids.contains(&id) {
                ids.retain(|known| known != &id);
            } else {
                ids.push(id);
            }
        } else if select {
            let exclusive = self.find_item(&id).is_some_and(|item| item.exclusive);
            if exclusive {
                if ids.iter().any(|known| self.is_disabled_item(known)) {
                    return false;
                }
                ids = vec![id];
            } else {
                let replaces_exclusive = matches!(
                    ids.as_slice(),
                    [only] if self.find_item(only).is_some_and(|item| item.exclusive && !item.disabled)
                );
                if replaces_exclusive {
                    ids.clear();
                }
                ids.push(id);
            }
        } else {
            ids.retain(|known| known != &id);
        }

        self.internal_value = SelectionValue::Multiple(ids);
        true
    }

    /// Select or deselect every displayed selectable member of a group.
    pub fn select_group(&mut self, group: &ItemId, selected: bool, fx: &mut Effects) -> bool {
        if !self.allow_group_selection() {
            return false;
        }
        let members: Vec<ItemId> = self
            .filtered_options
            .iter()
            .filter(|item| item.group.as_ref() == Some(group) && item.is_bulk_selectable())
            .filter_map(|item| item.id.clone())
            .collect();

        let changed = self.batch(fx, |state, fx| {
            members
                .into_iter()
                .fold(false, |changed, id| state.select_item(Some(id), Some(selected), true, fx) || changed)
        });
        tracing::debug!(target: targets::SELECTION, %group, selected, changed, "group selection");
        changed
    }

    /// Select everything, or nothing when everything is selected.
    pub fn toggle_select_all(&mut self, fx: &mut Effects) {
        if !self.multiple {
            return;
        }

        let candidates: Option<Vec<ItemId>> = self
            .select_all_targets()
            .map(|items| items.into_iter().filter_map(|item| item.id.clone()).collect());
        let Some(ids) = candidates else {
            if !self.search_text.is_empty() {
                self.report_error(&StoreError::CannotSelectAllSearchedItems, fx);
                return;
            }
            if !self.params.allow_revert {
                self.report_error(&StoreError::CannotSelectAllRevertItems, fx);
                return;
            }
            let excluded = !self.internal_value.is_empty() || !self.selection_is_excluded;
            self.internal_value = SelectionValue::Multiple(Vec::new());
            self.selection_is_excluded = excluded;
            self.status.has_changed = true;
            tracing::debug!(target: targets::SELECTION, excluded, "inverted selection");
            fx.emit(StoreEvent::Value);
            fx.emit(StoreEvent::Status);
            self.after_value_change(fx);
            return;
        };

        let select = !self.status.are_all_selected;
        self.batch(fx, |state, fx| {
            for id in ids {
                state.select_item(Some(id), Some(select), true, fx);
            }
        });
        tracing::debug!(target: targets::SELECTION, select, "toggled select all");
    }

    /// Run several selections, recomputing dependent state once.
    fn batch<R>(&mut self, fx: &mut Effects, f: impl FnOnce(&mut Self, &mut Effects) -> R) -> R {
        self.do_not_update = true;
        let result = f(self, fx);
        self.do_not_update = false;
        self.after_value_change(fx);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Icons, Texts};
    use crate::params::StoreParams;

    fn state(multiple: bool, options: Vec<Item>) -> StoreState {
        let params = StoreParams {
            multiple,
            auto_select: false,
            auto_disabled: false,
            ..StoreParams::default()
        };
        let mut state = StoreState::new(params, false, Texts::default(), Icons::default());
        state.internal_value = SelectionValue::empty(multiple);
        state.list_options = options;
        let mut fx = Effects::default();
        state.build_all_options(false, true, &mut fx);
        state
    }

    fn items(count: i64) -> Vec<Item> {
        (0..count).map(|i| Item::new(i, format!("text{i}"))).collect()
    }

    fn id(value: i64) -> Option<ItemId> {
        Some(ItemId::from(value))
    }

    #[test]
    fn test_single_replace_and_clear() {
        let mut state = state(false, items(3));
        let mut fx = Effects::default();

        assert!(state.select_item(id(1), None, false, &mut fx));
        assert_eq!(state.internal_value, SelectionValue::Single(id(1)));
        assert!(!state.select_item(id(1), Some(true), false, &mut fx));
        assert!(state.select_item(id(2), None, false, &mut fx));
        assert!(state.select_item(None, None, false, &mut fx));
        assert_eq!(state.internal_value, SelectionValue::Single(None));
        assert!(state.status.has_changed);
    }

    #[test]
    fn test_single_disabled_selection_is_kept() {
        let mut options = items(3);
        options[1].disabled = true;
        let mut state = state(false, options);
        state.internal_value = SelectionValue::Single(id(1));

        let mut fx = Effects::default();
        assert!(!state.select_item(None, None, false, &mut fx));
        assert_eq!(state.internal_value, SelectionValue::Single(id(1)));
    }

    #[test]
    fn test_multiple_keeps_insertion_order() {
        let mut state = state(true, items(5));
        let mut fx = Effects::default();
        for value in [3, 0, 4] {
            assert!(state.select_item(id(value), None, false, &mut fx));
        }
        assert_eq!(state.internal_value.ids(), vec![ItemId::from(3), ItemId::from(0), ItemId::from(4)]);
        assert!(!state.select_item(id(0), Some(true), false, &mut fx));
        assert!(!state.select_item(id(1), Some(false), false, &mut fx));
    }

    #[test]
    fn test_exclusive_item_blocked_by_disabled_selection() {
        let mut options = items(3);
        options[0].disabled = true;
        options[2].exclusive = true;
        let mut state = state(true, options);
        state.internal_value = SelectionValue::Multiple(vec![0.into(), 1.into()]);

        let mut fx = Effects::default();
        assert!(!state.select_item(id(2), Some(true), false, &mut fx));
        assert_eq!(state.internal_value.ids(), vec![ItemId::from(0), ItemId::from(1)]);
    }

    #[test]
    fn test_clear_preserves_disabled_ids() {
        let mut options = items(3);
        options[1].disabled = true;
        let mut state = state(true, options);
        state.internal_value = SelectionValue::Multiple(vec![0.into(), 1.into(), 2.into()]);

        let mut fx = Effects::default();
        assert!(state.select_item(None, None, false, &mut fx));
        assert_eq!(state.internal_value.ids(), vec![ItemId::from(1)]);
    }

    #[test]
    fn test_excluded_selection_flips_membership() {
        let mut state = state(true, items(3));
        state.has_fetch = true;
        state.total_dyn = None;
        state.selection_is_excluded = true;

        let mut fx = Effects::default();
        assert!(state.select_item(id(1), Some(false), false, &mut fx));
        assert_eq!(state.internal_value.ids(), vec![ItemId::from(1)]);
        assert!(!state.is_selected(&ItemId::from(1)));
        assert!(state.is_selected(&ItemId::from(0)));
    }

    #[test]
    fn test_revert_requires_allow_revert() {
        let mut state = state(true, Vec::new());
        state.has_fetch = true;
        state.total_dyn = None;

        let mut fx = Effects::default();
        state.toggle_select_all(&mut fx);
        assert_eq!(
            state.status.error_message,
            StoreError::CannotSelectAllRevertItems.status_message(&state.texts)
        );

        state.params.allow_revert = true;
        state.status.error_message.clear();
        state.toggle_select_all(&mut fx);
        assert!(state.selection_is_excluded);
        assert!(state.status.are_all_selected);
        assert!(state.status.error_message.is_empty());
    }
}
