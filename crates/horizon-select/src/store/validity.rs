//! Value validity and policy enforcement.

use horizon_select_core::logging::targets;

use super::state::{Effects, StoreEvent, StoreState};
use crate::item::ItemId;
use crate::params::{HideFilter, LOCAL_PAGE_SIZE};
use crate::value::SelectionValue;

impl StoreState {
    /// Make the value's shape match `multiple`.
    pub fn assert_value_type(&mut self, fx: &mut Effects) {
        let coerced = self.internal_value.clone().coerce(self.multiple);
        if coerced != self.internal_value {
            self.internal_value = coerced;
            self.mark_automatic_change(fx);
            fx.emit(StoreEvent::Value);
        }
        if !self.multiple && self.selection_is_excluded {
            self.selection_is_excluded = false;
            fx.emit(StoreEvent::Value);
        }
    }

    /// Resolve exclusion against a complete item set and enforce strictness.
    ///
    /// With `apply_strict`, unknown ids are pruned even though the data is
    /// still partial; callers pass it once an existence lookup completed.
    pub fn assert_correct_value(&mut self, apply_strict: bool, fx: &mut Effects) {
        if self.multiple && self.selection_is_excluded && self.has_fetched_all_items() {
            let excluded = self.internal_value.ids();
            let ids: Vec<ItemId> = self
                .all_options
                .iter()
                .filter(|item| !item.is_group)
                .filter_map(|item| item.id.clone())
                .filter(|id| !excluded.contains(id))
                .collect();
            tracing::trace!(target: targets::SELECTION, count = ids.len(), "expanded excluded selection");
            self.internal_value = SelectionValue::Multiple(ids);
            self.selection_is_excluded = false;
            self.mark_automatic_change(fx);
            fx.emit(StoreEvent::Value);
        }

        if self.params.strict_value {
            let ids = self.internal_value.ids();
            let known: Vec<ItemId> = ids
                .iter()
                .filter(|id| self.find_item(id).is_some())
                .cloned()
                .collect();
            if known.len() != ids.len() {
                if apply_strict || self.has_fetched_all_items() {
                    tracing::debug!(
                        target: targets::SELECTION,
                        pruned = ids.len() - known.len(),
                        "pruned unknown ids from strict value"
                    );
                    self.internal_value = SelectionValue::from_ids(known, self.multiple);
                    self.mark_automatic_change(fx);
                    fx.emit(StoreEvent::Value);
                } else {
                    fx.strict_check = Some(self.internal_value.clone());
                }
            }
        }

        if self.internal_value.is_empty() && !self.selection_is_excluded {
            self.check_auto_select(fx);
        }
    }

    /// Select the first enabled option of a closed single select whose
    /// value is null, when clearing is not allowed.
    ///
    /// A leading "no selection" entry makes the null value legitimate.
    pub fn check_auto_select(&mut self, fx: &mut Effects) {
        if !self.params.auto_select
            || self.params.allow_clear_selection
            || self.multiple
            || self.internal_value != SelectionValue::Single(None)
            || self.is_open
        {
            return;
        }

        let Some(id) = self
            .all_options
            .iter()
            .find(|item| !item.is_group && !item.disabled)
            .and_then(|item| item.id.clone())
        else {
            return;
        };

        tracing::debug!(target: targets::SELECTION, %id, "auto-selected first option");
        self.internal_value = SelectionValue::Single(Some(id));
        self.mark_automatic_change(fx);
        fx.emit(StoreEvent::Value);
        self.after_value_change(fx);
    }

    /// Force-disable the control when there is nothing left to choose.
    pub fn check_auto_disabled(&mut self, fx: &mut Effects) {
        if !self.params.auto_disabled || self.props_disabled || !self.has_fetched_all_items() {
            return;
        }

        let enabled: Vec<&ItemId> = self
            .all_options
            .iter()
            .filter(|item| !item.is_group && !item.disabled)
            .filter_map(|item| item.id.as_ref())
            .collect();
        let only_one_selected = enabled.len() == 1
            && !self.params.allow_clear_selection
            && self.is_selected(enabled[0]);
        let locked_exclusive = self.multiple
            && match self.internal_value.ids().as_slice() {
                [id] => self.find_item(id).is_some_and(|item| item.disabled && item.exclusive),
                _ => false,
            };

        let disabled = enabled.is_empty() || only_one_selected || locked_exclusive;
        if disabled != self.disabled {
            tracing::debug!(target: targets::STORE, disabled, "auto-disabled state changed");
            self.disabled = disabled;
            fx.emit(StoreEvent::Disabled);
            if disabled {
                self.close_automatically(fx);
            }
        }
    }

    /// Derive search box visibility from the `hide_filter` setting.
    pub fn check_hide_filter(&mut self) {
        let (hide, keep_open) = match self.params.hide_filter {
            HideFilter::Auto => (
                !self.multiple
                    && !self.is_partial()
                    && self.total_all_options.is_some_and(|total| total <= LOCAL_PAGE_SIZE),
                false,
            ),
            HideFilter::Open => (false, true),
            HideFilter::Always => (true, false),
            HideFilter::Never => (false, false),
        };
        self.hide_filter = hide;
        self.keep_filter_open = keep_open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Icons, Texts};
    use crate::item::Item;
    use crate::params::StoreParams;

    fn state(params: StoreParams, options: Vec<Item>) -> StoreState {
        let mut state = StoreState::new(params, false, Texts::default(), Icons::default());
        state.internal_value = SelectionValue::empty(state.multiple);
        state.list_options = options;
        state
    }

    fn items(count: i64) -> Vec<Item> {
        (0..count).map(|i| Item::new(i, format!("text{i}"))).collect()
    }

    #[test]
    fn test_auto_select_picks_first_enabled_option() {
        let mut fx = Effects::default();
        let mut options = items(3);
        options[0].disabled = true;
        let mut single = state(StoreParams::default(), options);
        single.build_all_options(false, true, &mut fx);
        assert_eq!(single.internal_value, SelectionValue::from(ItemId::from(1)));
        assert!(single.status.automatic_change);

        let mut all = state(StoreParams::default(), items(3));
        all.build_all_options(false, true, &mut fx);
        assert_eq!(all.internal_value, SelectionValue::from(ItemId::from(0)));
    }

    #[test]
    fn test_auto_select_skipped_in_multiple_or_clearable_mode() {
        let mut fx = Effects::default();
        let multiple = StoreParams {
            multiple: true,
            ..StoreParams::default()
        };
        let mut state_multiple = state(multiple, items(3));
        state_multiple.build_all_options(false, true, &mut fx);
        assert_eq!(state_multiple.internal_value, SelectionValue::Multiple(Vec::new()));

        let clearable = StoreParams {
            allow_clear_selection: true,
            ..StoreParams::default()
        };
        let mut state_clearable = state(clearable, items(3));
        state_clearable.build_all_options(false, true, &mut fx);
        assert!(state_clearable.internal_value.is_empty());

        let mut with_none = state(StoreParams::default(), vec![Item::none("None"), Item::new(1, "one")]);
        with_none.build_all_options(false, true, &mut fx);
        assert!(with_none.internal_value.is_empty());
    }

    #[test]
    fn test_auto_disabled_without_enabled_options() {
        let mut fx = Effects::default();
        let mut state = state(StoreParams::default(), vec![Item::new(0, "a").with_disabled(true)]);
        state.build_all_options(false, true, &mut fx);
        assert!(state.disabled);
    }

    #[test]
    fn test_strict_value_prunes_unknown_ids() {
        let params = StoreParams {
            multiple: true,
            strict_value: true,
            ..StoreParams::default()
        };
        let mut fx = Effects::default();
        let mut state = state(params, items(3));
        state.build_all_options(false, true, &mut fx);
        state.internal_value =
            SelectionValue::Multiple(vec![ItemId::from(0), ItemId::from("bogus"), ItemId::from(2)]);
        state.assert_correct_value(false, &mut fx);
        assert_eq!(
            state.internal_value,
            SelectionValue::Multiple(vec![ItemId::from(0), ItemId::from(2)])
        );
    }

    #[test]
    fn test_excluded_selection_expands_when_complete() {
        let params = StoreParams {
            multiple: true,
            ..StoreParams::default()
        };
        let mut fx = Effects::default();
        let mut state = state(params, items(4));
        state.build_all_options(false, true, &mut fx);
        state.selection_is_excluded = true;
        state.internal_value = SelectionValue::Multiple(vec![ItemId::from(1)]);
        state.assert_correct_value(false, &mut fx);
        assert!(!state.selection_is_excluded);
        assert_eq!(
            state.internal_value,
            SelectionValue::Multiple(vec![ItemId::from(0), ItemId::from(2), ItemId::from(3)])
        );
    }

    #[test]
    fn test_hide_filter_auto() {
        let mut fx = Effects::default();
        let mut short = state(StoreParams::default(), items(5));
        short.build_all_options(false, true, &mut fx);
        assert!(short.hide_filter);

        let mut long = state(StoreParams::default(), items(11));
        long.build_all_options(false, true, &mut fx);
        assert!(!long.hide_filter);
    }
}
