//! Orders demo binary
//!
//! Drives a full CRUD cycle against a mock transport with 500ms latency and
//! a 300ms busy-indication delay, so the busy states are visible in the
//! printed state transitions.

use entity_store_core::client::EntityPage;
use entity_store_core::config::EntityStoreConfig;
use entity_store_core::entity::Entity;
use entity_store_runtime::EntityStore;
use entity_store_testing::mocks::MockCrudClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A sample entity.
#[derive(Clone, Debug, PartialEq)]
struct Order {
    id: Option<u64>,
    label: String,
    quantity: u32,
}

impl Entity for Order {
    type Key = u64;

    fn key(&self) -> Option<u64> {
        self.id
    }
}

fn order(id: u64, label: &str, quantity: u32) -> Order {
    Order {
        id: Some(id),
        label: label.to_string(),
        quantity,
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orders_demo=debug,entity_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Orders Demo: Entity Store ===\n");

    // Mock transport: every call takes 500ms, busy indication at 300ms.
    let client = MockCrudClient::new().with_latency(Duration::from_millis(500));
    let config = EntityStoreConfig::new("https://api.example.com")
        .with_busy_indication_delay(Duration::from_millis(300));
    let store = EntityStore::new(Arc::new(client.clone()), config.entity("orders"));

    // Print every state transition as it is published.
    let mut views = store.views();
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let snapshot = views.current();
            println!(
                "    [views] collection: {:>7} (busy: {:>5}, rows: {}, total: {}) | selected: {:>7} (busy: {})",
                snapshot.collection.status.to_string(),
                snapshot.collection.is_busy,
                snapshot.collection.len(),
                snapshot.collection.total_entities,
                snapshot.selected_entity.status.to_string(),
                snapshot.selected_entity.is_busy,
            );
        }
    });

    // Load the collection.
    println!(">>> get_all(page 1)");
    client.enqueue_get_all(Ok(EntityPage::new(
        vec![order(1, "keyboard", 2), order(2, "mouse", 1)],
        2,
    )));
    match store.get_all(Some(json!({ "page": 1 }))).await {
        Ok(mut handle) => handle.wait().await,
        Err(error) => eprintln!("dispatch failed: {error}"),
    }

    // Focus one entity.
    println!("\n>>> get_by_key(2)");
    client.enqueue_get_by_key(Ok(order(2, "mouse", 1)));
    match store.get_by_key(2).await {
        Ok(mut handle) => handle.wait().await,
        Err(error) => eprintln!("dispatch failed: {error}"),
    }

    // Save an edit to it.
    println!("\n>>> save(order 2, quantity 3)");
    client.enqueue_save(Ok(order(2, "mouse", 3)));
    match store.save(order(2, "mouse", 3)).await {
        Ok(mut handle) => handle.wait().await,
        Err(error) => eprintln!("dispatch failed: {error}"),
    }

    // Delete it again.
    println!("\n>>> delete_by_key(2)");
    client.enqueue_delete_by_key(Ok(order(2, "mouse", 3)));
    match store.delete_by_key(2).await {
        Ok(mut handle) => handle.wait().await,
        Err(error) => eprintln!("dispatch failed: {error}"),
    }

    let views = store.views();
    println!(
        "\nFinal: {} row(s), selected entity: {:?}, selected status: {}",
        views.entities().len(),
        views.selected_entity(),
        views.selected_status(),
    );

    if let Err(error) = store.shutdown(Duration::from_secs(5)).await {
        eprintln!("shutdown: {error}");
    }

    println!("\n=== Demo complete ===");
}
