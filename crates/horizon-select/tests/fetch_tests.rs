//! Tests for the paged dynamic source and item lookups.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{MockFetch, builder, get_options, ids, init_tracing, lookup};
use horizon_select::{Commit, FetchResponse, Item, ItemId, SelectionValue, StoreError, StoreParams};
use serde_json::json;

#[tokio::test]
async fn test_opening_fetches_first_page() {
    init_tracing();
    let fetch = MockFetch::new(300);
    let store = builder().fetch_callback(fetch.callback()).build();
    store.settled().await;
    assert!(fetch.calls().is_empty());

    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100)]);
    assert_eq!(store.all_options().len(), 100);
    assert_eq!(store.total_all_options(), Some(300));
    assert!(store.is_partial());
    assert!(!store.has_fetched_all_items());
}

#[tokio::test]
async fn test_scrolling_fetches_next_page() {
    let fetch = MockFetch::new(300);
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    store.commit(Commit::OffsetItem(80));
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100), (String::new(), 100, 100)]);
    assert_eq!(store.all_options().len(), 200);
    assert_eq!(store.filtered_options().len(), 200);
}

#[tokio::test]
async fn test_static_options_come_before_dynamic() {
    let fetch = MockFetch::new(5);
    let store = builder()
        .options(get_options(2).into_iter().map(|item| Item {
            text: format!("static {}", item.text),
            id: item.id.map(|id| ItemId::from(format!("s{id}"))),
            ..item
        }))
        .fetch_callback(fetch.callback())
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    let texts = common::texts(&store.all_options());
    assert_eq!(
        texts,
        vec!["static text0", "static text1", "text0", "text1", "text2", "text3", "text4"]
    );
    assert_eq!(store.total_all_options(), Some(7));
    assert!(store.has_fetched_all_items());
}

#[tokio::test]
async fn test_stale_search_response_is_dropped() {
    init_tracing();
    let fetch = MockFetch::new(300).with_delay(Duration::from_millis(50));
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    store.commit(Commit::SearchText("a".into()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.commit(Commit::SearchText("ab".into()));
    store.settled().await;

    let searches: Vec<String> = fetch.calls().into_iter().skip(1).map(|(search, _, _)| search).collect();
    assert_eq!(searches, vec!["a", "ab"]);

    let filtered = store.filtered_options();
    assert_eq!(filtered.len(), 20);
    assert!(filtered.iter().all(|item| item.text.starts_with("ab-")));
    assert_eq!(store.total_filtered_options(), Some(20));
    assert!(!store.status().searching);
}

#[tokio::test]
async fn test_malformed_response_reports_error() {
    let store = builder()
        .options(get_options(2))
        .fetch(|_search: String, _offset: usize, _limit: usize| async move {
            FetchResponse::from_json(json!({ "total": 3, "result": "nope" }))
        })
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(store.status().error_message, store.texts().wrong_formatted_data);
    assert_eq!(store.total_all_options(), Some(2));
}

#[tokio::test]
async fn test_rejected_fetch_shows_message_verbatim() {
    let store = builder()
        .fetch(|_search: String, _offset: usize, _limit: usize| async move {
            Err::<FetchResponse, _>(StoreError::callback("backend unavailable"))
        })
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(store.status().error_message, "backend unavailable");
    assert_eq!(store.total_all_options(), Some(0));
    assert!(store.all_options().is_empty());
}

#[tokio::test]
async fn test_repeated_page_stops_with_wrong_query_result() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let store = builder()
        .fetch(move |_search: String, _offset: usize, _limit: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, StoreError>(FetchResponse::new(300, get_options(100))) }
        })
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    store.commit(Commit::OffsetItem(80));
    store.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.status().error_message, store.texts().wrong_query_result);
    assert_eq!(store.all_options().len(), 100);
    assert_eq!(store.total_all_options(), Some(100));
}

#[tokio::test]
async fn test_response_without_total_infers_it() {
    let store = builder()
        .fetch(|_search: String, offset: usize, _limit: usize| async move {
            let items = if offset == 0 { get_options(30) } else { Vec::new() };
            Ok::<_, StoreError>(FetchResponse::without_total(items))
        })
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(store.total_all_options(), Some(30));
    assert!(store.has_fetched_all_items());
}

#[tokio::test]
async fn test_full_page_without_total_counts_loaded_items() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let store = builder()
        .fetch(move |_search: String, offset: usize, limit: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let items = (offset..offset + limit)
                    .map(|i| Item::new(i as i64, format!("text{i}")))
                    .collect();
                Ok::<_, StoreError>(FetchResponse::without_total(items))
            }
        })
        .build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(store.total_all_options(), Some(100));
    assert!(store.has_fetched_all_items());
    assert_eq!(store.all_options().len(), 100);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_call() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let store = builder()
        .fetch_callback(MockFetch::new(300).callback())
        .get_items_callback(lookup(300, lookups.clone()))
        .build();

    let (first, second) = tokio::join!(
        store.get_items(ids(&[5, 6])),
        store.get_items(ids(&[5, 6]))
    );
    let first = first.unwrap();
    assert_eq!(first, second.unwrap());
    assert_eq!(common::texts(&first), vec!["text5", "text6"]);
    assert_eq!(lookups.load(Ordering::SeqCst), 1);

    let cached = store.get_items(ids(&[6])).await.unwrap();
    assert_eq!(cached[0].text, "text6");
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_selected_items_resolve_through_lookup() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let params = StoreParams {
        multiple: true,
        ..StoreParams::default()
    };
    let store = builder()
        .params(params)
        .fetch_callback(MockFetch::new(300).callback())
        .get_items_callback(lookup(300, lookups.clone()))
        .value(ids(&[250, 7, 1000]))
        .build();

    let placeholders: Vec<String> = store
        .selected_options()
        .items()
        .iter()
        .map(|item| item.text.clone())
        .collect();
    assert_eq!(placeholders, vec!["250", "7", "1000"]);

    store.settled().await;
    let resolved: Vec<String> = store
        .selected_options()
        .items()
        .iter()
        .map(|item| item.text.clone())
        .collect();
    assert_eq!(resolved, vec!["text250", "text7", "1000"]);

    let selected = store.get_selected_items().await.unwrap();
    assert_eq!(selected.items().len(), 3);
    assert!(selected.items().iter().all(|item| item.selected));
}

#[tokio::test]
async fn test_strict_value_prunes_dynamic_ids() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let params = StoreParams {
        multiple: true,
        strict_value: true,
        ..StoreParams::default()
    };
    let store = builder()
        .params(params)
        .fetch_callback(MockFetch::new(300).callback())
        .get_items_callback(lookup(300, lookups))
        .value(ids(&[5, 999]))
        .build();
    assert_eq!(store.value(), SelectionValue::Multiple(ids(&[5, 999])));

    store.settled().await;
    assert_eq!(store.value(), SelectionValue::Multiple(ids(&[5])));
    let labels: Vec<String> = store
        .selected_options()
        .items()
        .iter()
        .map(|item| item.text.clone())
        .collect();
    assert_eq!(labels, vec!["text5"]);
}

#[tokio::test]
async fn test_get_item_backfills_selection() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let store = builder()
        .fetch_callback(MockFetch::new(300).callback())
        .get_items_callback(lookup(300, lookups))
        .build();

    let placeholder = store.get_item(&ItemId::from(42));
    assert_eq!(placeholder.text, "42");
    store.settled().await;

    assert_eq!(store.get_item(&ItemId::from(42)).text, "text42");
}

#[tokio::test]
async fn test_select_all_reverts_on_partial_data() {
    let params = StoreParams {
        multiple: true,
        allow_revert: true,
        ..StoreParams::default()
    };
    let store = builder()
        .params(params)
        .fetch_callback(MockFetch::new(300).callback())
        .build();

    store.toggle_select_all();
    assert!(store.selection_is_excluded());
    assert!(store.value().is_empty());
    assert!(store.status().are_all_selected);
    assert!(store.is_selected(&ItemId::from(123)));

    store.select_item(Some(ItemId::from(5)), Some(false), true);
    assert!(!store.is_selected(&ItemId::from(5)));
    assert_eq!(store.value(), SelectionValue::Multiple(ids(&[5])));
    assert!(!store.status().are_all_selected);
}

#[tokio::test]
async fn test_select_all_refused_without_revert() {
    let params = StoreParams {
        multiple: true,
        ..StoreParams::default()
    };
    let store = builder()
        .params(params)
        .fetch_callback(MockFetch::new(300).callback())
        .build();

    store.toggle_select_all();
    assert!(store.value().is_empty());
    assert!(!store.selection_is_excluded());
    assert_eq!(store.status().error_message, store.texts().cannot_select_all_revert_items);
}

#[tokio::test]
async fn test_clear_cache_refetches() {
    let fetch = MockFetch::new(300);
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    store.clear_cache(false);
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100), (String::new(), 0, 100)]);
    assert_eq!(store.all_options().len(), 100);
}

#[tokio::test]
async fn test_page_arriving_after_forced_reset_is_dropped() {
    let fetch = MockFetch::new(300).with_delay(Duration::from_millis(100));
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    tokio::time::sleep(Duration::from_millis(20)).await;

    store.clear_cache(true);
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100), (String::new(), 0, 100)]);
    assert_eq!(store.all_options().len(), 100);
    assert_eq!(store.total_all_options(), Some(300));
}

#[tokio::test]
async fn test_open_right_after_build_fetches_once() {
    let fetch = MockFetch::new(1000).with_delay(Duration::from_millis(50));
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100)]);
    assert_eq!(store.all_options().len(), 100);
    assert_eq!(store.filtered_options().len(), 100);
}

#[tokio::test]
async fn test_scroll_during_fetch_does_not_duplicate_request() {
    let fetch = MockFetch::new(1000).with_delay(Duration::from_millis(50));
    let store = builder().fetch_callback(fetch.callback()).build();
    store.commit(Commit::IsOpen(true));
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.commit(Commit::OffsetItem(5));
    store.settled().await;

    assert_eq!(fetch.calls(), vec![(String::new(), 0, 100)]);
    assert_eq!(store.all_options().len(), 100);
}
