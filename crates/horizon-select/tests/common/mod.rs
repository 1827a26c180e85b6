//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use horizon_select::{
    FetchCallback, FetchResponse, GetItemsCallback, Item, ItemId, OpenRegistry, SelectStore, SelectStoreBuilder,
    StoreError, fetch_callback, get_items_callback,
};
use parking_lot::Mutex;

/// Route store logs to the test output; set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A builder with its own open registry, so parallel tests do not close
/// each other's stores.
pub fn builder() -> SelectStoreBuilder {
    SelectStore::builder().registry(Arc::new(OpenRegistry::new()))
}

/// `count` items with ids `0..count` and text `text{i}`.
pub fn get_options(count: i64) -> Vec<Item> {
    (0..count).map(|i| Item::new(i, format!("text{i}"))).collect()
}

/// Two groups of five items, `group1` then `group2`.
pub fn get_grouped_options() -> Vec<Item> {
    (0..10)
        .map(|i| Item::new(i, format!("text{i}")).with_group(if i < 5 { "group1" } else { "group2" }))
        .collect()
}

/// Recording fetch callback over a fixed-size remote collection.
///
/// Unfiltered pages are items `text{i}`; a search yields `search_total`
/// items whose text starts with the search.
#[derive(Clone)]
pub struct MockFetch {
    pub calls: Arc<Mutex<Vec<(String, usize, usize)>>>,
    pub total: usize,
    pub search_total: usize,
    pub delay: Option<Duration>,
}

impl MockFetch {
    pub fn new(total: usize) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            total,
            search_total: 20,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, usize, usize)> {
        self.calls.lock().clone()
    }

    pub fn callback(&self) -> FetchCallback {
        let mock = self.clone();
        fetch_callback(move |search: String, offset: usize, limit: usize| {
            let mock = mock.clone();
            async move {
                mock.calls.lock().push((search.clone(), offset, limit));
                if let Some(delay) = mock.delay {
                    tokio::time::sleep(delay).await;
                }
                let total = if search.is_empty() { mock.total } else { mock.search_total };
                let end = (offset + limit).min(total);
                let result = (offset..end)
                    .map(|i| {
                        let text = if search.is_empty() { format!("text{i}") } else { format!("{search}-{i}") };
                        Item::new(i as i64, text)
                    })
                    .collect();
                Ok::<_, StoreError>(FetchResponse::new(total, result))
            }
        })
    }
}

/// Lookup callback knowing numeric ids below `total`, counting its calls.
pub fn lookup(total: i64, calls: Arc<AtomicUsize>) -> GetItemsCallback {
    get_items_callback(move |ids: Vec<ItemId>| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let found: Vec<Option<Item>> = ids
                .into_iter()
                .map(|id| match id {
                    ItemId::Number(n) if (0..total).contains(&n) => Some(Item::new(n, format!("text{n}"))),
                    _ => None,
                })
                .collect();
            Ok::<_, StoreError>(found)
        }
    })
}

pub fn texts(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.text.clone()).collect()
}

pub fn ids(values: &[i64]) -> Vec<ItemId> {
    values.iter().map(|&i| ItemId::from(i)).collect()
}
