//! Asynchronous refinement: paged fetches and item lookups.
//!
//! Every function here alternates between short synchronous mutations and
//! awaits on host callbacks. The state lock is never held across an await.

use std::collections::HashMap;

use futures_util::FutureExt;
use horizon_select_core::logging::targets;

use super::SelectStore;
use super::options::{FetchOutcome, FilterStep};
use super::state::cache_items;
use crate::error::{Result, StoreError};
use crate::fetch::DEBOUNCE;
use crate::item::{Item, ItemId};
use crate::value::{SelectedOptions, SelectionValue};

impl SelectStore {
    /// Grow the display list until it covers the visible window.
    ///
    /// Only one such task runs per store; rebuilds requested meanwhile make
    /// it go round again instead of starting a concurrent one.
    pub(super) async fn build_filtered_options(self) {
        loop {
            let step = self.mutate(|state, fx| {
                state.rebuild_pending = false;
                state.step_filtered(fx)
            });
            let progressed = match step {
                FilterStep::Done => false,
                FilterStep::Fetch => self.fetch_data().await == FetchOutcome::Progressed,
            };
            if !progressed && !self.mutate(|state, _| state.finish_rebuild()) {
                break;
            }
        }
    }

    /// Load the next dynamic page ahead of need.
    pub(super) async fn prefetch(self) {
        let outcome = self.fetch_data().await;
        tracing::trace!(target: targets::FETCH, ?outcome, "prefetch finished");
    }

    /// Request one page and apply it.
    async fn fetch_data(&self) -> FetchOutcome {
        let Some(fetch) = self.inner.fetch.clone() else {
            tracing::warn!(target: targets::FETCH, "dynamic data needed but no fetch callback is configured");
            self.mutate(|state, fx| state.report_error(&StoreError::NoFetchMethod, fx));
            return FetchOutcome::Failed;
        };

        let plan = self.mutate(|state, fx| state.plan_fetch(fx));
        if plan.ticket.debounce {
            tokio::time::sleep(DEBOUNCE).await;
            let superseded = {
                let state = self.inner.state.lock();
                !state.requests.is_current(&plan.ticket) || state.search_text != plan.search
            };
            if superseded {
                self.mutate(|state, fx| state.abandon_fetch(&plan, fx));
                return FetchOutcome::Dropped;
            }
        }

        let response = fetch(plan.search.clone(), plan.offset, plan.limit).await;
        self.mutate(|state, fx| state.apply_fetch(&plan, response, fx))
    }

    /// Replace placeholders in the selected projection with real items.
    pub(super) async fn resolve_selected_options(self) {
        let snapshot = self.read(|state| state.internal_value.clone());
        if snapshot.is_empty() {
            return;
        }
        let resolved = self.get_items(snapshot.ids()).await;
        self.mutate(|state, fx| state.apply_selected_resolution(&snapshot, resolved, fx));
    }

    /// Prune a strict value once the existence of its ids is known.
    pub(super) async fn check_strict_value(self, snapshot: SelectionValue) {
        match self.get_items(snapshot.ids()).await {
            Ok(_) => self.mutate(|state, fx| {
                if state.internal_value == snapshot {
                    state.assert_correct_value(true, fx);
                    state.refresh_selected_flags(fx);
                    state.build_selected_options(fx);
                }
            }),
            Err(err) => {
                tracing::warn!(target: targets::SELECTION, "strict value check failed: {err}");
            }
        }
    }

    /// Look up one id for [`SelectStore::get_item`].
    pub(super) async fn backfill_item(self, id: ItemId) {
        match self.get_items(vec![id.clone()]).await {
            Ok(found) if !found.is_empty() => self.mutate(|state, fx| {
                if state.internal_value.contains(&id) {
                    state.build_selected_options(fx);
                }
            }),
            Ok(_) => tracing::trace!(target: targets::SELECTION, %id, "item not found"),
            Err(err) => tracing::warn!(target: targets::SELECTION, %id, "item lookup failed: {err}"),
        }
    }

    /// Resolve ids to items, in the order requested.
    ///
    /// Known items are answered from the cache; the rest go to the lookup
    /// callback. Identical concurrent lookups share a single callback call.
    /// Ids the callback does not know are left out.
    pub async fn get_items(&self, ids: Vec<ItemId>) -> Result<Vec<Item>> {
        let (mut known, missing, generation) = self.read(|state| {
            let mut known: HashMap<ItemId, Item> = HashMap::new();
            let mut missing: Vec<ItemId> = Vec::new();
            for id in &ids {
                match state.find_item(id) {
                    Some(item) => {
                        known.insert(id.clone(), item.clone());
                    }
                    None if !missing.contains(id) => missing.push(id.clone()),
                    None => {}
                }
            }
            (known, missing, state.cache_generation)
        });

        if !missing.is_empty()
            && let Some(callback) = &self.inner.get_items
        {
            let request = {
                let mut pending = self.inner.pending_items.lock();
                pending
                    .entry(missing.clone())
                    .or_insert_with(|| {
                        tracing::debug!(target: targets::FETCH, count = missing.len(), "looking up items");
                        callback(missing.clone()).shared()
                    })
                    .clone()
            };
            let result = request.await;
            self.inner.pending_items.lock().remove(&missing);
            let found = result?;

            {
                let mut state = self.inner.state.lock();
                if state.cache_generation == generation {
                    cache_items(&mut state.cache_item, found.iter().flatten());
                }
            }
            for (id, item) in missing.iter().zip(found) {
                if let Some(item) = item {
                    known.insert(id.clone(), item);
                }
            }
        }

        Ok(ids.iter().filter_map(|id| known.get(id).cloned()).collect())
    }

    /// The selection as items, in value order.
    ///
    /// Ids that cannot be resolved are represented by placeholders whose text
    /// is the id itself.
    pub async fn get_selected_items(&self) -> Result<SelectedOptions> {
        let (ids, multiple) = self.read(|state| (state.internal_value.ids(), state.multiple));
        let found = self.get_items(ids.clone()).await?;
        let items = ids
            .iter()
            .map(|id| {
                let item = found
                    .iter()
                    .find(|item| item.id.as_ref() == Some(id))
                    .cloned()
                    .unwrap_or_else(|| Item::placeholder(id));
                Item { selected: true, ..item }
            })
            .collect();
        Ok(SelectedOptions::from_items(items, multiple))
    }
}
