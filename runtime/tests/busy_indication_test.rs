//! Busy-indication gate behavior, observed through a real store.
//!
//! Latencies here are generous multiples of the busy delay so scheduling
//! jitter cannot flip an assertion.

use entity_store_core::action::EntityAction;
use entity_store_core::client::{CrudError, EntityPage};
use entity_store_core::config::EntityConfig;
use entity_store_core::entity::{Entity, EntityStatus};
use entity_store_runtime::EntityStore;
use entity_store_testing::mocks::MockCrudClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
struct Order {
    id: Option<u64>,
    label: String,
}

impl Entity for Order {
    type Key = u64;

    fn key(&self) -> Option<u64> {
        self.id
    }
}

fn order(id: u64, label: &str) -> Order {
    Order {
        id: Some(id),
        label: label.to_string(),
    }
}

fn store_with(
    latency: Duration,
    busy_delay: Duration,
) -> (EntityStore<Order>, MockCrudClient<Order>) {
    let client = MockCrudClient::new().with_latency(latency);
    let config = EntityConfig::new("orders").with_busy_indication_delay(busy_delay);
    let store = EntityStore::new(Arc::new(client.clone()), config);
    (store, client)
}

fn drain(
    rx: &mut tokio::sync::broadcast::Receiver<EntityAction<Order>>,
) -> Vec<EntityAction<Order>> {
    let mut actions = Vec::new();
    while let Ok(action) = rx.try_recv() {
        actions.push(action);
    }
    actions
}

#[tokio::test]
async fn fast_call_never_surfaces_busy() {
    let (store, client) = store_with(Duration::from_millis(10), Duration::from_millis(300));
    client.enqueue_get_all(Ok(EntityPage::new(vec![order(1, "a")], 1)));

    let mut rx = store.subscribe_actions();
    let mut handle = store.get_all(None).await.unwrap();
    handle.wait().await;

    let actions = drain(&mut rx);
    assert!(
        !actions
            .iter()
            .any(|a| matches!(a, EntityAction::CollectionBusy { .. })),
        "fast call must not emit a busy action"
    );
    assert_eq!(
        actions
            .iter()
            .filter(|a| matches!(a, EntityAction::EntitiesLoaded { .. }))
            .count(),
        1
    );

    let views = store.views();
    assert_eq!(views.collection_status(), EntityStatus::Loaded);
    assert!(!views.collection_is_busy());
    assert_eq!(views.total_entities(), 1);
}

#[tokio::test]
async fn slow_call_shows_busy_exactly_once_then_loads() {
    // The documented scenario: delay 300ms, call resolving in 500ms with
    // 2 entities and a total of 2.
    let (store, client) = store_with(Duration::from_millis(500), Duration::from_millis(300));
    client.enqueue_get_all(Ok(EntityPage::new(vec![order(1, "a"), order(2, "b")], 2)));

    let views = store.views();
    assert_eq!(views.collection_status(), EntityStatus::Initial);

    let mut rx = store.subscribe_actions();
    let mut handle = store.get_all(Some(json!({}))).await.unwrap();

    // The filter lands immediately, before any busy or response event.
    assert_eq!(
        store.state(|s| s.collection.api_filter.clone()).await,
        Some(json!({}))
    );

    // Mid-flight (past the delay, before the response): busy is surfaced.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(views.collection_is_busy());
    assert_eq!(views.collection_status(), EntityStatus::Loading);

    handle.wait_with_timeout(Duration::from_secs(5)).await.unwrap();

    let actions = drain(&mut rx);
    let busy_count = actions
        .iter()
        .filter(|a| matches!(a, EntityAction::CollectionBusy { is_busy: true, .. }))
        .count();
    let loaded_index = actions
        .iter()
        .position(|a| matches!(a, EntityAction::EntitiesLoaded { .. }));
    let busy_index = actions
        .iter()
        .position(|a| matches!(a, EntityAction::CollectionBusy { .. }));

    assert_eq!(busy_count, 1, "busy must fire exactly once");
    assert!(busy_index.unwrap() < loaded_index.unwrap());

    assert_eq!(views.collection_status(), EntityStatus::Loaded);
    assert!(!views.collection_is_busy());
    assert_eq!(views.entities().len(), 2);
    assert_eq!(views.total_entities(), 2);
}

#[tokio::test]
async fn exactly_one_terminal_event_per_invocation() {
    let (store, client) = store_with(Duration::from_millis(10), Duration::from_millis(300));
    client.enqueue_get_all(Ok(EntityPage::new(vec![order(1, "a")], 1)));
    client.enqueue_get_all(Ok(EntityPage::new(vec![order(2, "b")], 1)));

    let mut rx = store.subscribe_actions();

    let mut handle = store.get_all(None).await.unwrap();
    handle.wait().await;
    let mut handle = store.get_all(None).await.unwrap();
    handle.wait().await;

    let terminals = drain(&mut rx)
        .iter()
        .filter(|a| a.is_terminal())
        .count();
    assert_eq!(terminals, 2, "one terminal event per invocation");
    assert_eq!(client.get_all_calls(), 2);
}

#[tokio::test]
async fn failing_save_surfaces_error_on_selected_entity() {
    // The documented scenario: save failing with E while the matching
    // entity is selected.
    let (store, client) = store_with(Duration::from_millis(10), Duration::from_millis(300));
    client.enqueue_get_by_key(Ok(order(5, "a")));

    let mut handle = store.get_by_key(5).await.unwrap();
    handle.wait().await;

    let error = CrudError::Api {
        status: 500,
        message: "boom".to_string(),
    };
    client.enqueue_save(Err(error.clone()));

    let mut rx = store.subscribe_actions();
    let mut handle = store.save(order(5, "edited")).await.unwrap();
    handle.wait().await;

    let views = store.views();
    assert_eq!(views.selected_error(), Some(error));
    assert_eq!(views.selected_status(), EntityStatus::Error);
    assert!(!views.selected_is_busy());

    let failures = drain(&mut rx)
        .iter()
        .filter(|a| matches!(a, EntityAction::SelectedFailed { .. }))
        .count();
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn slow_failure_shows_busy_then_error() {
    let (store, client) = store_with(Duration::from_millis(300), Duration::from_millis(100));
    client.enqueue_get_by_key(Err(CrudError::Transport("down".to_string())));

    let mut rx = store.subscribe_actions();
    let mut handle = store.get_by_key(1).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(5)).await.unwrap();

    let actions = drain(&mut rx);
    assert!(matches!(
        actions.first(),
        Some(EntityAction::SelectedBusy { is_busy: true, status: EntityStatus::Loading, .. })
    ));
    assert!(matches!(
        actions.last(),
        Some(EntityAction::SelectedFailed { .. })
    ));
    assert_eq!(actions.len(), 2);

    let views = store.views();
    assert_eq!(views.selected_status(), EntityStatus::Error);
    assert!(!views.selected_is_busy());
}

#[tokio::test]
async fn redispatch_after_error_clears_it() {
    let (store, client) = store_with(Duration::from_millis(10), Duration::from_millis(300));
    client.enqueue_save(Err(CrudError::Transport("down".to_string())));

    let mut handle = store.save(order(5, "draft")).await.unwrap();
    handle.wait().await;
    assert_eq!(store.views().selected_status(), EntityStatus::Error);

    client.enqueue_save(Ok(order(5, "draft")));
    let mut handle = store.save(order(5, "draft")).await.unwrap();
    handle.wait().await;

    let views = store.views();
    assert_eq!(views.selected_status(), EntityStatus::Saved);
    assert!(views.selected_error().is_none());
}
