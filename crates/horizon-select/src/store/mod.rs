//! The option store.
//!
//! [`SelectStore`] owns a dropdown control's configuration, option sources,
//! selection, search and pagination state. Mutators are synchronous: they
//! update visible state immediately and spawn whatever refinement needs the
//! host callbacks (page fetches, selection lookups, strict-value checks).
//! [`SelectStore::settled`] waits for that work; [`SelectStore::changed`]
//! notifies display consumers.
//!
//! # Example
//!
//! ```no_run
//! use horizon_select::{Commit, Item, SelectStore};
//!
//! # async fn demo() {
//! let store = SelectStore::builder()
//!     .options((0..5).map(|i| Item::new(i, format!("text{i}"))))
//!     .build();
//!
//! store.commit(Commit::IsOpen(true));
//! store.settled().await;
//! assert_eq!(store.filtered_options().len(), 5);
//!
//! store.select_item(Some(2.into()), None, false);
//! # }
//! ```

mod builder;
mod commit;
mod options;
mod remote;
mod selection;
mod state;
mod validity;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use horizon_select_core::logging::targets;
use horizon_select_core::{Signal, TaskTracker};
use parking_lot::Mutex;

pub use builder::SelectStoreBuilder;
pub use commit::Commit;
pub use state::{Status, StoreEvent};

use self::state::{Effects, StoreState};
use crate::catalog::{IconFamily, Icons, PartialIcons, PartialTexts, Texts};
use crate::error::StoreError;
use crate::fetch::{FetchCallback, GetItemsCallback};
use crate::item::{Group, Item, ItemId, OptionEntry};
use crate::params::{OptionBehavior, StoreParams};
use crate::registry::{Closer, OpenRegistry, StoreId};
use crate::value::{SelectedOptions, SelectionValue};

type ItemsFuture = Shared<BoxFuture<'static, Result<Vec<Option<Item>>, StoreError>>>;

struct StoreInner {
    id: StoreId,
    state: Mutex<StoreState>,
    fetch: Option<FetchCallback>,
    get_items: Option<GetItemsCallback>,
    registry: Arc<OpenRegistry>,
    tasks: TaskTracker,
    /// In-flight lookups keyed by the ids they resolve.
    pending_items: Mutex<HashMap<Vec<ItemId>, ItemsFuture>>,
    changed: Signal<StoreEvent>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// Handle to a store. Clones share the same state.
#[derive(Clone)]
pub struct SelectStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for SelectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SelectStore")
            .field("id", &self.inner.id)
            .field("is_open", &state.is_open)
            .field("value", &state.internal_value)
            .field("total_all_options", &state.total_all_options)
            .finish_non_exhaustive()
    }
}

impl SelectStore {
    /// Start configuring a store.
    pub fn builder() -> SelectStoreBuilder {
        SelectStoreBuilder::new()
    }

    /// Identity of this store in the open registry.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Signal emitted after each mutation, once per kind of change.
    pub fn changed(&self) -> &Signal<StoreEvent> {
        &self.inner.changed
    }

    /// Run a synchronous mutation, then carry out the effects it scheduled.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState, &mut Effects) -> R) -> R {
        let mut fx = Effects::default();
        let result = {
            let mut state = self.inner.state.lock();
            let result = f(&mut state, &mut fx);
            state.claim_rebuild(&mut fx);
            result
        };
        self.dispatch(fx);
        result
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.inner.state.lock())
    }

    fn dispatch(&self, fx: Effects) {
        let id = self.inner.id;
        if let Some(coexist) = fx.register_open {
            self.inner.registry.close_others(id);
            if !coexist {
                self.inner.registry.set_open(id, self.closer());
            }
        }
        if fx.release_open {
            self.inner.registry.release(id);
        }

        for event in fx.events {
            self.inner.changed.emit(event);
        }

        if fx.rebuild_filtered {
            let store = self.clone();
            self.inner.tasks.spawn(store.build_filtered_options());
        }
        if fx.prefetch {
            let store = self.clone();
            self.inner.tasks.spawn(store.prefetch());
        }
        if fx.resolve_selection {
            let store = self.clone();
            self.inner.tasks.spawn(store.resolve_selected_options());
        }
        if let Some(snapshot) = fx.strict_check {
            let store = self.clone();
            self.inner.tasks.spawn(store.check_strict_value(snapshot));
        }
        if fx.reset_automatic_change {
            let store = self.clone();
            self.inner.tasks.spawn(async move {
                tokio::task::yield_now().await;
                store.mutate(|state, fx| {
                    if state.status.automatic_change {
                        state.status.automatic_change = false;
                        fx.emit(StoreEvent::Status);
                    }
                });
            });
        }
        if fx.reset_automatic_close {
            let store = self.clone();
            self.inner.tasks.spawn(async move {
                tokio::task::yield_now().await;
                store.mutate(|state, fx| {
                    if state.status.automatic_close {
                        state.status.automatic_close = false;
                        fx.emit(StoreEvent::Status);
                    }
                });
            });
        }
    }

    /// Closer handed to the open registry; does not keep the store alive.
    fn closer(&self) -> Closer {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                SelectStore { inner }.mutate(|state, fx| state.close_automatically(fx));
            }
        })
    }

    /// Wait until no spawned refinement (fetches, lookups, resets) remains.
    pub async fn settled(&self) {
        self.inner.tasks.wait_idle().await;
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Apply a keyed mutation.
    pub fn commit(&self, commit: Commit) {
        self.mutate(|state, fx| state.commit(commit, fx));
    }

    /// Select or deselect an item; `None` clears the selection.
    ///
    /// `selected: None` toggles in multiple mode. Returns whether the value
    /// changed.
    pub fn select_item(&self, id: Option<ItemId>, selected: Option<bool>, keep_open: bool) -> bool {
        self.mutate(|state, fx| state.select_item(id, selected, keep_open, fx))
    }

    /// Select or deselect every displayed selectable member of a group.
    pub fn select_group(&self, group: &ItemId, selected: bool) -> bool {
        self.mutate(|state, fx| state.select_group(group, selected, fx))
    }

    /// Select everything, or nothing when everything is selected.
    pub fn toggle_select_all(&self) {
        self.mutate(|state, fx| state.toggle_select_all(fx));
    }

    /// Clear the "has changed" flag.
    pub fn reset_change(&self) {
        self.mutate(|state, fx| {
            if state.status.has_changed {
                state.status.has_changed = false;
                fx.emit(StoreEvent::Status);
            }
        });
    }

    /// Clear the error message.
    pub fn reset_error_message(&self) {
        self.mutate(|state, fx| state.clear_error(fx));
    }

    /// Drop cached items and reload every source.
    ///
    /// With `force_reset`, requests in flight are invalidated as well and
    /// their responses will be dropped.
    pub fn clear_cache(&self, force_reset: bool) {
        self.inner.pending_items.lock().clear();
        self.mutate(|state, fx| state.clear_cache(force_reset, fx));
    }

    /// Replace the group directory.
    pub fn change_groups(&self, groups: Vec<Group>) {
        self.mutate(|state, fx| state.change_groups(groups, fx));
    }

    /// Patch this store's text catalog.
    pub fn change_texts(&self, partial: &PartialTexts) {
        self.mutate(|state, fx| {
            state.texts.apply(partial);
            fx.emit(StoreEvent::Texts);
        });
    }

    /// Patch this store's icon catalog, optionally switching family.
    pub fn change_icons(&self, partial: &PartialIcons, family: Option<IconFamily>) {
        self.mutate(|state, fx| {
            state.icons.apply(partial, family);
            fx.emit(StoreEvent::Icons);
        });
    }

    /// Replace the static list options.
    pub fn set_options<I>(&self, options: I)
    where
        I: IntoIterator,
        I::Item: Into<OptionEntry>,
    {
        let entries: Vec<OptionEntry> = options.into_iter().map(Into::into).collect();
        self.mutate(|state, fx| state.set_options(&entries, fx));
    }

    /// Replace the element options.
    pub fn set_child_options<I>(&self, options: I)
    where
        I: IntoIterator,
        I::Item: Into<OptionEntry>,
    {
        let entries: Vec<OptionEntry> = options.into_iter().map(Into::into).collect();
        self.mutate(|state, fx| state.set_child_options(&entries, fx));
    }

    /// Replace the value; its shape is coerced to the current mode.
    pub fn set_value(&self, value: impl Into<SelectionValue>) {
        self.commit(Commit::InternalValue(value.into()));
    }

    pub fn set_selection_is_excluded(&self, excluded: bool) {
        self.commit(Commit::SelectionIsExcluded(excluded));
    }

    /// Apply the host `disabled` prop.
    pub fn set_disabled(&self, disabled: bool) {
        self.mutate(|state, fx| state.set_props_disabled(disabled, fx));
    }

    pub fn set_multiple(&self, multiple: bool) {
        self.mutate(|state, fx| state.set_multiple(multiple, fx));
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.mutate(|state, fx| state.set_page_size(page_size, fx));
    }

    pub fn set_strict_value(&self, strict: bool) {
        self.mutate(|state, fx| state.set_strict_value(strict, fx));
    }

    /// Change how sources combine, e.g. `"force-DOE"`.
    pub fn set_option_behavior(&self, behavior: &str) {
        self.mutate(|state, fx| state.set_option_behavior(behavior, fx));
    }

    /// Best-effort item lookup.
    ///
    /// Unknown ids yield a placeholder and start a lookup in the background;
    /// the selected projection is refreshed when it completes.
    pub fn get_item(&self, id: &ItemId) -> Item {
        if let Some(item) = self.read(|state| state.find_item(id).cloned()) {
            return item;
        }
        let store = self.clone();
        self.inner.tasks.spawn(store.backfill_item(id.clone()));
        Item::placeholder(id)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Merged, unfiltered options.
    pub fn all_options(&self) -> Vec<Item> {
        self.read(|state| state.all_options.clone())
    }

    /// Display list: filtered items interleaved with group headers.
    pub fn filtered_options(&self) -> Vec<Item> {
        self.read(|state| state.filtered_options.clone())
    }

    pub fn selected_options(&self) -> SelectedOptions {
        self.read(|state| state.selected_options.clone())
    }

    /// Size of the merged set, `None` while unknown.
    pub fn total_all_options(&self) -> Option<usize> {
        self.read(|state| state.total_all_options)
    }

    /// Size of the display list once complete, headers included; `None`
    /// while unknown.
    pub fn total_filtered_options(&self) -> Option<usize> {
        self.read(StoreState::total_filtered_options)
    }

    pub fn groups(&self) -> Vec<Group> {
        self.read(|state| state.groups.clone())
    }

    pub fn status(&self) -> Status {
        self.read(|state| state.status.clone())
    }

    pub fn value(&self) -> SelectionValue {
        self.read(|state| state.internal_value.clone())
    }

    pub fn selection_is_excluded(&self) -> bool {
        self.read(|state| state.selection_is_excluded)
    }

    /// Semantic selection of `id`, honoring exclusion.
    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.read(|state| state.is_selected(id))
    }

    pub fn is_open(&self) -> bool {
        self.read(|state| state.is_open)
    }

    /// Effective disabled state (host prop or auto-disable).
    pub fn is_disabled(&self) -> bool {
        self.read(|state| state.disabled)
    }

    pub fn is_focused(&self) -> bool {
        self.read(|state| state.is_focused)
    }

    pub fn is_multiple(&self) -> bool {
        self.read(|state| state.multiple)
    }

    pub fn search_text(&self) -> String {
        self.read(|state| state.search_text.clone())
    }

    pub fn offset_item(&self) -> usize {
        self.read(|state| state.offset_item)
    }

    pub fn active_item_idx(&self) -> Option<usize> {
        self.read(|state| state.active_item_idx)
    }

    /// Whether the search box is hidden.
    pub fn hide_filter(&self) -> bool {
        self.read(|state| state.hide_filter)
    }

    /// Whether the search box is shown expanded.
    pub fn keep_filter_open(&self) -> bool {
        self.read(|state| state.keep_filter_open)
    }

    pub fn params(&self) -> StoreParams {
        self.read(|state| state.params.clone())
    }

    /// The option behavior in effect, after fallback.
    pub fn option_behavior(&self) -> OptionBehavior {
        self.read(|state| state.behavior.clone())
    }

    pub fn texts(&self) -> Texts {
        self.read(|state| state.texts.clone())
    }

    pub fn icons(&self) -> Icons {
        self.read(|state| state.icons.clone())
    }

    /// Data comes from a source whose extent is only known once fetched.
    pub fn is_partial(&self) -> bool {
        self.read(StoreState::is_partial)
    }

    /// Every item of the current search is in the display list.
    pub fn has_all_items(&self) -> bool {
        self.read(StoreState::has_all_items)
    }

    pub fn has_fetched_all_items(&self) -> bool {
        self.read(StoreState::has_fetched_all_items)
    }

    pub fn allow_group_selection(&self) -> bool {
        self.read(StoreState::allow_group_selection)
    }

    /// Whether a select-all control should be offered.
    pub fn select_all_available(&self) -> bool {
        self.read(StoreState::select_all_available)
    }

    /// Number of spawned tasks still running.
    pub fn pending_tasks(&self) -> usize {
        let pending = self.inner.tasks.active_count();
        tracing::trace!(target: targets::STORE, pending, "pending tasks");
        pending
    }
}
