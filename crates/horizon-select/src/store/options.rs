//! Option merging, display-list construction and fetched-page application.

use std::collections::HashSet;

use horizon_select_core::PerfSpan;
use horizon_select_core::logging::targets;

use super::state::{Effects, StoreEvent, StoreState, cache_items};
use crate::error::StoreError;
use crate::fetch::{FetchResponse, RequestClass, RequestTicket};
use crate::item::{Item, ItemId};
use crate::params::{OptionOperation, SourceKind};
use crate::search::SearchPattern;

/// Next step of a display-list build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterStep {
    Done,
    Fetch,
}

/// A fetch about to be issued.
#[derive(Debug, Clone)]
pub(crate) struct FetchPlan {
    pub ticket: RequestTicket,
    pub search: String,
    pub offset: usize,
    pub limit: usize,
}

/// How a fetched page was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// New data was applied.
    Progressed,
    /// Superseded or no longer matching the current state.
    Dropped,
    /// The page brought nothing new; fetching stops.
    Stalled,
    Failed,
}

impl StoreState {
    fn source_items(&self, kind: SourceKind) -> &[Item] {
        match kind {
            SourceKind::List => &self.list_options,
            SourceKind::Dynamic => &self.dyn_options,
            SourceKind::Element => &self.element_options,
        }
    }

    /// Declared size of a source, `None` while unknown.
    fn source_len(&self, kind: SourceKind) -> Option<usize> {
        match kind {
            SourceKind::List => Some(self.list_options.len()),
            SourceKind::Element => Some(self.element_options.len()),
            SourceKind::Dynamic if self.has_fetch => self.total_dyn,
            SourceKind::Dynamic => Some(0),
        }
    }

    fn source_complete(&self, kind: SourceKind) -> bool {
        self.source_len(kind)
            .is_some_and(|total| self.source_items(kind).len() >= total)
    }

    /// Merge the three sources into `all_options`.
    ///
    /// Without `keep_fetched` the dynamic cache is dropped. Unless
    /// `stop_fetch` is set, the display list is reset and a rebuild is
    /// scheduled.
    pub fn build_all_options(&mut self, keep_fetched: bool, stop_fetch: bool, fx: &mut Effects) {
        let _perf = PerfSpan::new("build_all_options");

        if !keep_fetched && self.has_fetch {
            self.dyn_options.clear();
            self.total_dyn = None;
        }

        let order = self.behavior.order.clone();
        let mut all_options = Vec::new();
        let mut total = Some(0);
        self.dyn_offset = 0;

        match self.behavior.operation {
            OptionOperation::Force => {
                let active = order
                    .iter()
                    .copied()
                    .find(|kind| self.source_len(*kind) != Some(0))
                    .or_else(|| order.first().copied())
                    .unwrap_or(SourceKind::List);
                self.active_order = active;
                all_options.extend_from_slice(self.source_items(active));
                total = self.source_len(active);
            }
            OptionOperation::Sort => {
                self.active_order = order.first().copied().unwrap_or(SourceKind::List);
                let mut incomplete = false;
                for kind in order {
                    let len = self.source_len(kind);
                    total = total.zip(len).map(|(sum, len)| sum + len);
                    if incomplete {
                        continue;
                    }
                    if kind == SourceKind::Dynamic {
                        self.dyn_offset = all_options.len();
                    }
                    all_options.extend_from_slice(self.source_items(kind));
                    incomplete = !self.source_complete(kind);
                }
            }
        }

        cache_items(&mut self.cache_item, &all_options);
        self.all_options = all_options;
        self.total_all_options = total;
        tracing::trace!(
            target: targets::STORE,
            loaded = self.all_options.len(),
            total = ?self.total_all_options,
            active = ?self.active_order,
            "merged option sources"
        );

        self.check_hide_filter();
        if !stop_fetch {
            self.reset_filtered();
            fx.rebuild_filtered = true;
            fx.emit(StoreEvent::FilteredOptions);
        }
        self.check_auto_select(fx);
        self.check_auto_disabled(fx);
    }

    /// Forget the display list so the next build starts over.
    pub fn reset_filtered(&mut self) {
        self.filtered_options.clear();
        self.total_filtered_items = None;
        self.filtered_dyn_offset = 0;
        self.search_total = None;
    }

    /// Advance the display-list build by one synchronous step.
    pub fn step_filtered(&mut self, fx: &mut Effects) -> FilterStep {
        if !self.is_open || self.has_all_items() {
            return FilterStep::Done;
        }

        if self.has_fetched_all_items() {
            self.filter_locally(fx);
            return FilterStep::Done;
        }

        let end = self.offset_item + self.page_size() / 2;
        if end < self.filtered_options.len() {
            return FilterStep::Done;
        }

        if self.search_text.is_empty() && end < self.all_options.len() {
            self.filtered_options = self.decorate(self.all_options.clone());
            self.filtered_dyn_offset = self.dyn_offset;
            self.total_filtered_items = self.total_all_options;
            self.refresh_are_all_selected(fx);
            fx.emit(StoreEvent::FilteredOptions);
            if self.total_dyn.is_none() && !self.requests.is_requesting(RequestClass::Plain) {
                fx.prefetch = true;
            }
            return FilterStep::Done;
        }

        if self.filtered_options.is_empty() && self.behavior.operation == OptionOperation::Sort {
            let pattern = SearchPattern::new(&self.search_text);
            let before: Vec<Item> = self
                .behavior
                .order
                .iter()
                .take_while(|kind| **kind != SourceKind::Dynamic)
                .flat_map(|kind| self.source_items(*kind))
                .filter(|item| pattern.matches(item))
                .cloned()
                .collect();
            self.filtered_dyn_offset = before.len();
            if !before.is_empty() {
                self.filtered_options = self.decorate(before);
                fx.emit(StoreEvent::FilteredOptions);
            }
        }

        FilterStep::Fetch
    }

    /// Filter the complete merged set against the search text.
    fn filter_locally(&mut self, fx: &mut Effects) {
        let _perf = PerfSpan::new("filter_options");

        let items: Vec<Item> = if self.search_text.is_empty() {
            self.all_options.clone()
        } else {
            let pattern = SearchPattern::new(&self.search_text);
            self.all_options
                .iter()
                .filter(|item| pattern.matches(item))
                .cloned()
                .collect()
        };

        self.total_filtered_items = Some(items.len());
        self.filtered_dyn_offset = 0;
        self.filtered_options = self.decorate(items);
        self.refresh_are_all_selected(fx);
        fx.emit(StoreEvent::FilteredOptions);
    }

    /// Compute the next page to request and register it.
    pub fn plan_fetch(&mut self, fx: &mut Effects) -> FetchPlan {
        let search = self.search_text.clone();
        let offset = if search.is_empty() {
            self.dyn_options.len()
        } else {
            self.filtered_item_count().saturating_sub(self.filtered_dyn_offset)
        };
        let page_size = self.page_size();
        let limit = (self.offset_item + page_size)
            .saturating_sub(self.filtered_options.len())
            .max(page_size);

        let ticket = self.requests.begin(&search);
        if ticket.class == RequestClass::Search && !self.status.searching {
            self.status.searching = true;
            fx.emit(StoreEvent::Status);
        }

        tracing::debug!(
            target: targets::FETCH,
            search = %search,
            offset,
            limit,
            request = ticket.id,
            debounce = ticket.debounce,
            "planned fetch"
        );
        FetchPlan {
            ticket,
            search,
            offset,
            limit,
        }
    }

    /// Settle a request that never reached the callback.
    pub fn abandon_fetch(&mut self, plan: &FetchPlan, fx: &mut Effects) {
        self.requests.finish(&plan.ticket);
        if plan.ticket.class == RequestClass::Search
            && !self.requests.is_requesting(RequestClass::Search)
            && self.status.searching
        {
            self.status.searching = false;
            fx.emit(StoreEvent::Status);
        }
        tracing::debug!(target: targets::FETCH, request = plan.ticket.id, "dropped superseded request");
    }

    /// Apply the callback's answer to `plan`.
    pub fn apply_fetch(
        &mut self,
        plan: &FetchPlan,
        response: Result<FetchResponse, StoreError>,
        fx: &mut Effects,
    ) -> FetchOutcome {
        self.requests.finish(&plan.ticket);
        let current = self.requests.is_current(&plan.ticket);

        if plan.ticket.class == RequestClass::Search && current && self.status.searching {
            self.status.searching = false;
            fx.emit(StoreEvent::Status);
        }
        if !current {
            tracing::debug!(target: targets::FETCH, request = plan.ticket.id, "dropped stale response");
            return FetchOutcome::Dropped;
        }

        match response {
            Ok(response) if plan.search.is_empty() => self.apply_dynamic_page(plan, response, fx),
            Ok(response) => self.apply_search_page(plan, response, fx),
            Err(err) => {
                self.fail_fetch(plan, &err, fx);
                FetchOutcome::Failed
            }
        }
    }

    fn apply_dynamic_page(&mut self, plan: &FetchPlan, response: FetchResponse, fx: &mut Effects) -> FetchOutcome {
        if plan.offset > self.dyn_options.len() {
            tracing::debug!(target: targets::FETCH, "dynamic cache was reset, dropping page");
            return FetchOutcome::Dropped;
        }

        let FetchResponse { total, mut result } = response;
        let total = infer_total(plan, total, result.len(), self.total_dyn);
        result.truncate(total.saturating_sub(plan.offset));

        self.dyn_options.truncate(plan.offset);
        let outcome = if brings_new_items(&self.dyn_options, &result) || plan.offset >= total {
            self.dyn_options.extend(result);
            self.total_dyn = Some(total);
            self.clear_error(fx);
            tracing::debug!(
                target: targets::FETCH,
                loaded = self.dyn_options.len(),
                total = ?self.total_dyn,
                "applied dynamic page"
            );
            FetchOutcome::Progressed
        } else {
            self.stall(fx);
            self.total_dyn = Some(self.dyn_options.len());
            FetchOutcome::Stalled
        };

        self.build_all_options(true, true, fx);
        if self.search_text.is_empty() {
            self.filtered_options = self.decorate(self.all_options.clone());
            self.filtered_dyn_offset = self.dyn_offset;
            self.total_filtered_items = self.total_all_options;
            self.refresh_are_all_selected(fx);
            fx.emit(StoreEvent::FilteredOptions);
        }
        outcome
    }

    fn apply_search_page(&mut self, plan: &FetchPlan, response: FetchResponse, fx: &mut Effects) -> FetchOutcome {
        if plan.search != self.search_text {
            return FetchOutcome::Dropped;
        }
        let mut items: Vec<Item> = self
            .filtered_options
            .iter()
            .filter(|item| !item.is_group)
            .cloned()
            .collect();
        if items.len() != self.filtered_dyn_offset + plan.offset {
            tracing::debug!(target: targets::FETCH, "display list moved on, dropping search page");
            return FetchOutcome::Dropped;
        }

        let FetchResponse { total, mut result } = response;
        let previous = if plan.offset > 0 { self.search_total } else { None };
        let mut total = infer_total(plan, total, result.len(), previous);
        result.truncate(total.saturating_sub(plan.offset));

        let outcome = if brings_new_items(&items[self.filtered_dyn_offset..], &result) || plan.offset >= total {
            cache_items(&mut self.cache_item, &result);
            items.extend(result);
            self.clear_error(fx);
            FetchOutcome::Progressed
        } else {
            self.stall(fx);
            total = plan.offset;
            FetchOutcome::Stalled
        };

        let loaded = items.len() - self.filtered_dyn_offset;
        let after = self.matching_after_dynamic();
        self.search_total = Some(total);
        self.total_filtered_items = Some(self.filtered_dyn_offset + total + after.len());
        if loaded >= total {
            items.extend(after);
        }
        self.filtered_options = self.decorate(items);
        self.refresh_are_all_selected(fx);
        fx.emit(StoreEvent::FilteredOptions);

        tracing::debug!(
            target: targets::FETCH,
            search = %plan.search,
            loaded,
            total = ?self.search_total,
            "applied search page"
        );
        outcome
    }

    /// Items of the sources merged after the dynamic one that match the search.
    fn matching_after_dynamic(&self) -> Vec<Item> {
        if self.behavior.operation != OptionOperation::Sort {
            return Vec::new();
        }
        let pattern = SearchPattern::new(&self.search_text);
        self.behavior
            .order
            .iter()
            .skip_while(|kind| **kind != SourceKind::Dynamic)
            .skip(1)
            .flat_map(|kind| self.source_items(*kind))
            .filter(|item| pattern.matches(item))
            .cloned()
            .collect()
    }

    fn stall(&mut self, fx: &mut Effects) {
        tracing::warn!(target: targets::FETCH, "fetch returned no new data before reaching its total");
        self.report_error(&StoreError::WrongQueryResult, fx);
    }

    fn fail_fetch(&mut self, plan: &FetchPlan, err: &StoreError, fx: &mut Effects) {
        tracing::warn!(target: targets::FETCH, search = %plan.search, "fetch failed: {err}");
        self.report_error(err, fx);
        if plan.search.is_empty() {
            self.dyn_options.clear();
            self.total_dyn = Some(0);
            self.build_all_options(true, false, fx);
        }
    }
}

/// Total to use for a page: the declared one, else the previous known
/// total, else what has been loaded so far.
fn infer_total(plan: &FetchPlan, reported: Option<usize>, len: usize, previous: Option<usize>) -> usize {
    let loaded = plan.offset + len;
    match reported {
        Some(total) => total,
        None if len < plan.limit => loaded,
        None => previous.map_or(loaded, |previous| previous.max(loaded)),
    }
}

/// Whether `page` holds at least one item not already in `existing`.
fn brings_new_items(existing: &[Item], page: &[Item]) -> bool {
    let known: HashSet<&ItemId> = existing.iter().filter_map(|item| item.id.as_ref()).collect();
    page.iter()
        .any(|item| item.id.as_ref().is_none_or(|id| !known.contains(id)))
}
