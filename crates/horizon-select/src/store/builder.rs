//! Store construction.

use std::future::Future;
use std::sync::Arc;

use horizon_select_core::logging::targets;
use horizon_select_core::{Signal, TaskTracker};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use super::state::{Effects, StoreState};
use super::{SelectStore, StoreInner};
use crate::catalog::{IconFamily, PartialIcons, PartialTexts, default_icons, default_texts};
use crate::error::StoreError;
use crate::fetch::{FetchCallback, FetchResponse, GetItemsCallback, fetch_callback, get_items_callback};
use crate::item::{Group, Item, ItemId, OptionEntry, flatten_entries};
use crate::params::StoreParams;
use crate::registry::{OpenRegistry, StoreId};
use crate::value::SelectionValue;

/// Builder for a [`SelectStore`].
pub struct SelectStoreBuilder {
    params: StoreParams,
    value: SelectionValue,
    selection_is_excluded: bool,
    disabled: bool,
    options: Vec<OptionEntry>,
    child_options: Vec<OptionEntry>,
    groups: Vec<Group>,
    texts: PartialTexts,
    icons: PartialIcons,
    icon_family: Option<IconFamily>,
    fetch: Option<FetchCallback>,
    get_items: Option<GetItemsCallback>,
    registry: Option<Arc<OpenRegistry>>,
    handle: Option<Handle>,
}

impl Default for SelectStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectStoreBuilder {
    /// Create a builder with default parameters and no sources.
    pub fn new() -> Self {
        Self {
            params: StoreParams::default(),
            value: SelectionValue::default(),
            selection_is_excluded: false,
            disabled: false,
            options: Vec::new(),
            child_options: Vec::new(),
            groups: Vec::new(),
            texts: PartialTexts::default(),
            icons: PartialIcons::default(),
            icon_family: None,
            fetch: None,
            get_items: None,
            registry: None,
            handle: None,
        }
    }

    /// Replace all parameters.
    pub fn params(mut self, params: StoreParams) -> Self {
        self.params = params;
        self
    }

    /// Set multiple-selection mode.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.params.multiple = multiple;
        self
    }

    /// Set the fetch page size.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.params.page_size = page_size;
        self
    }

    /// Set the option behavior, e.g. `"sort-ODE"`.
    pub fn option_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.params.option_behavior = behavior.into();
        self
    }

    /// Set the initial value. Its shape is coerced to the selection mode.
    pub fn value(mut self, value: impl Into<SelectionValue>) -> Self {
        self.value = value.into();
        self
    }

    /// Treat the value as the set of items *not* selected.
    pub fn selection_is_excluded(mut self, excluded: bool) -> Self {
        self.selection_is_excluded = excluded;
        self
    }

    /// Set the host `disabled` prop.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the static list options.
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OptionEntry>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the element options.
    pub fn child_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OptionEntry>,
    {
        self.child_options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the host group directory.
    pub fn groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }

    /// Override texts for this store only.
    pub fn texts(mut self, texts: PartialTexts) -> Self {
        self.texts = texts;
        self
    }

    /// Override icons for this store only.
    pub fn icons(mut self, icons: PartialIcons, family: Option<IconFamily>) -> Self {
        self.icons = icons;
        self.icon_family = family;
        self
    }

    /// Set the paged fetch callback.
    pub fn fetch_callback(mut self, callback: FetchCallback) -> Self {
        self.fetch = Some(callback);
        self
    }

    /// Set the paged fetch callback from an async closure.
    pub fn fetch<F, Fut>(self, f: F) -> Self
    where
        F: Fn(String, usize, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FetchResponse, StoreError>> + Send + 'static,
    {
        self.fetch_callback(fetch_callback(f))
    }

    /// Set the id lookup callback.
    pub fn get_items_callback(mut self, callback: GetItemsCallback) -> Self {
        self.get_items = Some(callback);
        self
    }

    /// Set the id lookup callback from an async closure.
    pub fn get_items<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Vec<ItemId>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Option<Item>>, StoreError>> + Send + 'static,
    {
        self.get_items_callback(get_items_callback(f))
    }

    /// Use a private open registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<OpenRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Spawn background work on this runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Build the store and run its initial validation.
    pub fn build(self) -> SelectStore {
        let mut texts = default_texts();
        texts.apply(&self.texts);
        let mut icons = default_icons();
        icons.apply(&self.icons, self.icon_family);

        let mut fx = Effects::default();
        let mut state = StoreState::new(self.params, self.fetch.is_some(), texts, icons);

        let (behavior, behavior_error) = state.params.parsed_option_behavior();
        state.behavior = behavior;
        if let Some(err) = behavior_error {
            tracing::warn!(target: targets::STORE, "{err}, falling back to sort-ODE");
            state.report_error(&err, &mut fx);
        }
        state.multiple = state.params.multiple;
        state.check_hide_filter();

        let (list_options, mut option_groups) = flatten_entries(&self.options);
        let (element_options, element_groups) = flatten_entries(&self.child_options);
        for group in element_groups {
            if !option_groups.iter().any(|known| known.id == group.id) {
                option_groups.push(group);
            }
        }
        state.host_groups = self.groups;
        state.option_groups = option_groups;
        state.merge_groups();

        state.internal_value = self.value;
        state.selection_is_excluded = self.selection_is_excluded && state.multiple;
        state.assert_value_type(&mut fx);
        state.props_disabled = self.disabled;
        state.disabled = self.disabled;

        state.list_options = list_options;
        state.element_options = element_options;
        state.build_all_options(false, false, &mut fx);

        state.assert_correct_value(false, &mut fx);
        state.refresh_selected_flags(&mut fx);
        state.build_selected_options(&mut fx);
        state.check_auto_disabled(&mut fx);
        state.claim_rebuild(&mut fx);

        let id = StoreId::next();
        tracing::debug!(
            target: targets::STORE,
            %id,
            multiple = state.multiple,
            dynamic = state.has_fetch,
            options = state.all_options.len(),
            "built store"
        );

        let tasks = match self.handle {
            Some(handle) => TaskTracker::with_handle(handle),
            None => TaskTracker::new(),
        };
        let store = SelectStore {
            inner: Arc::new(StoreInner {
                id,
                state: Mutex::new(state),
                fetch: self.fetch,
                get_items: self.get_items,
                registry: self.registry.unwrap_or_else(OpenRegistry::global),
                tasks,
                pending_items: Mutex::new(Default::default()),
                changed: Signal::new(),
            }),
        };
        store.dispatch(fx);
        store
    }
}
