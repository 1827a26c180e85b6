//! Host callbacks and request bookkeeping for remote options.
//!
//! Two callbacks feed the store: a paged fetch `(search, offset, limit)` and
//! a lookup of items by id. Requests are split into two classes, plain pages
//! and searches, each with its own monotonically increasing counter. Issuing
//! a request supersedes every older request of its class; a superseded
//! response is dropped on arrival instead of being applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::StoreError;
use crate::item::{Item, ItemId};

/// Delay imposed before a request when one of its class is outstanding.
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// Paged fetch callback: `(search, offset, limit)`.
pub type FetchCallback =
    Arc<dyn Fn(String, usize, usize) -> BoxFuture<'static, Result<FetchResponse, StoreError>> + Send + Sync>;

/// Lookup callback: one entry per requested id, `None` when unknown.
pub type GetItemsCallback =
    Arc<dyn Fn(Vec<ItemId>) -> BoxFuture<'static, Result<Vec<Option<Item>>, StoreError>> + Send + Sync>;

/// Wrap an async closure as a [`FetchCallback`].
pub fn fetch_callback<F, Fut>(f: F) -> FetchCallback
where
    F: Fn(String, usize, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResponse, StoreError>> + Send + 'static,
{
    Arc::new(move |search, offset, limit| f(search, offset, limit).boxed())
}

/// Wrap an async closure as a [`GetItemsCallback`].
pub fn get_items_callback<F, Fut>(f: F) -> GetItemsCallback
where
    F: Fn(Vec<ItemId>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Option<Item>>, StoreError>> + Send + 'static,
{
    Arc::new(move |ids| f(ids).boxed())
}

/// One page answered by the fetch callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    /// Full count for the search, when the host knows it.
    pub total: Option<usize>,
    pub result: Vec<Item>,
}

impl FetchResponse {
    /// Create a response with a declared total.
    pub fn new(total: usize, result: Vec<Item>) -> Self {
        Self {
            total: Some(total),
            result,
        }
    }

    /// Create a response without a declared total.
    pub fn without_total(result: Vec<Item>) -> Self {
        Self {
            total: None,
            result,
        }
    }

    /// Validate a JSON answer of shape `{ "total": number, "result": Item[] }`.
    ///
    /// `total` is optional; `result` must be an array of items.
    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        let Value::Object(mut object) = value else {
            return Err(StoreError::WrongFormattedData("response is not an object".into()));
        };

        let result = match object.remove("result") {
            Some(result @ Value::Array(_)) => serde_json::from_value(result)
                .map_err(|err| StoreError::WrongFormattedData(err.to_string()))?,
            Some(_) => return Err(StoreError::WrongFormattedData("`result` is not an array".into())),
            None => return Err(StoreError::WrongFormattedData("`result` is missing".into())),
        };
        let total = object
            .get("total")
            .and_then(Value::as_u64)
            .and_then(|total| usize::try_from(total).ok());

        Ok(Self { total, result })
    }
}

/// Class of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Unfiltered pages (empty search).
    Plain,
    /// Searches.
    Search,
}

impl RequestClass {
    /// The class a request for `search` belongs to.
    pub fn of(search: &str) -> Self {
        if search.is_empty() { Self::Plain } else { Self::Search }
    }
}

/// A request issued by [`RequestTracker::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub class: RequestClass,
    pub id: u64,
    /// Another request of the same class was outstanding when this one began.
    pub debounce: bool,
}

#[derive(Debug, Default)]
struct ClassCounter {
    latest: u64,
    in_flight: usize,
}

/// Generation counters for both request classes.
#[derive(Debug, Default)]
pub struct RequestTracker {
    plain: ClassCounter,
    search: ClassCounter,
}

impl RequestTracker {
    fn counter(&self, class: RequestClass) -> &ClassCounter {
        match class {
            RequestClass::Plain => &self.plain,
            RequestClass::Search => &self.search,
        }
    }

    fn counter_mut(&mut self, class: RequestClass) -> &mut ClassCounter {
        match class {
            RequestClass::Plain => &mut self.plain,
            RequestClass::Search => &mut self.search,
        }
    }

    /// Issue a request for `search`, superseding older ones of its class.
    pub fn begin(&mut self, search: &str) -> RequestTicket {
        let class = RequestClass::of(search);
        let counter = self.counter_mut(class);
        counter.latest += 1;
        let debounce = counter.in_flight > 0;
        counter.in_flight += 1;
        RequestTicket {
            class,
            id: counter.latest,
            debounce,
        }
    }

    /// Whether `ticket` is still the latest request of its class.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.counter(ticket.class).latest == ticket.id
    }

    /// Mark `ticket` as no longer outstanding.
    pub fn finish(&mut self, ticket: &RequestTicket) {
        let counter = self.counter_mut(ticket.class);
        counter.in_flight = counter.in_flight.saturating_sub(1);
    }

    /// Whether any request of `class` is outstanding.
    pub fn is_requesting(&self, class: RequestClass) -> bool {
        self.counter(class).in_flight > 0
    }

    /// Supersede every outstanding request.
    pub fn invalidate_all(&mut self) {
        self.plain.latest += 1;
        self.search.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_accepts_missing_total() {
        let response = FetchResponse::from_json(json!({
            "result": [{"id": 1, "text": "one"}, {"id": 2, "text": "two"}]
        }))
        .unwrap();
        assert_eq!(response.total, None);
        assert_eq!(response.result.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_non_array_result() {
        let err = FetchResponse::from_json(json!({"total": 3, "result": {"id": 1}})).unwrap_err();
        assert!(matches!(err, StoreError::WrongFormattedData(_)));

        let err = FetchResponse::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::WrongFormattedData(_)));
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut tracker = RequestTracker::default();
        let first = tracker.begin("");
        assert!(!first.debounce);
        let second = tracker.begin("");
        assert!(second.debounce);

        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn test_classes_are_independent() {
        let mut tracker = RequestTracker::default();
        let page = tracker.begin("");
        let search = tracker.begin("abc");

        assert!(!search.debounce);
        assert!(tracker.is_current(&page));
        assert!(tracker.is_current(&search));

        tracker.finish(&page);
        assert!(!tracker.is_requesting(RequestClass::Plain));
        assert!(tracker.is_requesting(RequestClass::Search));
    }

    #[test]
    fn test_invalidate_all() {
        let mut tracker = RequestTracker::default();
        let page = tracker.begin("");
        let search = tracker.begin("x");
        tracker.invalidate_all();
        assert!(!tracker.is_current(&page));
        assert!(!tracker.is_current(&search));
    }
}
