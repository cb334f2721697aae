//! The typed per-entity store facade.
//!
//! [`EntityStore`] owns one [`Store`] specialized to an entity type: the
//! generated CRUD reducer, the transport from the environment, and the
//! derived views. Applications hold one `EntityStore` per entity type;
//! composition across entity types happens at compile time by holding
//! several stores, not by registering reducers into a shared one.

use crate::{EffectHandle, Store, StoreError};
use entity_store_core::action::EntityAction;
use entity_store_core::client::{ApiFilter, CrudClient, CrudError};
use entity_store_core::config::EntityConfig;
use entity_store_core::entity::{
    Entity, EntityCollectionState, EntityState, EntityStatus, EntityStoreState,
};
use entity_store_core::reducer::{EntityEnvironment, EntityReducer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

type Runtime<T> =
    Store<EntityStoreState<T>, EntityAction<T>, EntityEnvironment<T>, EntityReducer<T>>;

/// Reactive CRUD store for one entity type.
///
/// Wires the four flows (load all, load by key, save, delete) through the
/// busy-indication gate and exposes the resulting state as derived views.
///
/// # Example
///
/// ```ignore
/// let config = EntityStoreConfig::new("https://api.example.com");
/// let client = Arc::new(RestCrudClient::<Order>::new(&config, &config.entity("orders")));
/// let orders = EntityStore::new(client, config.entity("orders"));
///
/// orders.get_all(None).await?;
/// let views = orders.views();
/// println!("{} orders", views.total_entities());
/// ```
pub struct EntityStore<T: Entity> {
    store: Runtime<T>,
    entity_name: String,
}

impl<T: Entity> EntityStore<T> {
    /// Create a store for one entity type from a transport and its
    /// configuration. State starts in the all-`initial` snapshot.
    #[must_use]
    pub fn new(client: Arc<dyn CrudClient<T>>, config: EntityConfig) -> Self {
        let entity_name = config.entity_name.clone();
        let environment = EntityEnvironment::new(client, config);
        let store = Store::new(EntityStoreState::initial(), EntityReducer::new(), environment);

        Self { store, entity_name }
    }

    /// Load the collection with an optional filter.
    ///
    /// The filter is recorded on the collection state immediately; busy
    /// indication follows only if the call outlasts the configured delay.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    pub async fn get_all(&self, api_filter: Option<ApiFilter>) -> Result<EffectHandle, StoreError> {
        tracing::debug!(entity = %self.entity_name, "dispatching get_all");
        metrics::counter!("entity_store.operations", "op" => "get_all").increment(1);
        self.store.send(EntityAction::GetAll { api_filter }).await
    }

    /// Load one entity into the selected-entity slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    pub async fn get_by_key(&self, key: T::Key) -> Result<EffectHandle, StoreError> {
        tracing::debug!(entity = %self.entity_name, key = %key, "dispatching get_by_key");
        metrics::counter!("entity_store.operations", "op" => "get_by_key").increment(1);
        self.store.send(EntityAction::GetByKey { key }).await
    }

    /// Persist an entity (create when it has no key yet).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    pub async fn save(&self, entity: T) -> Result<EffectHandle, StoreError> {
        tracing::debug!(entity = %self.entity_name, "dispatching save");
        metrics::counter!("entity_store.operations", "op" => "save").increment(1);
        self.store.send(EntityAction::Save { entity }).await
    }

    /// Delete the entity with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    pub async fn delete_by_key(&self, key: T::Key) -> Result<EffectHandle, StoreError> {
        tracing::debug!(entity = %self.entity_name, key = %key, "dispatching delete_by_key");
        metrics::counter!("entity_store.operations", "op" => "delete_by_key").increment(1);
        self.store.send(EntityAction::DeleteByKey { key }).await
    }

    /// Derived views over the store state.
    ///
    /// A views handle created at any time immediately observes the latest
    /// snapshot; `changed().await` waits for the next one.
    #[must_use]
    pub fn views(&self) -> EntityViews<T> {
        EntityViews {
            rx: self.store.subscribe(),
        }
    }

    /// Subscribe to effect-produced actions (busy indications, responses,
    /// failures). Commands dispatched through this store are not broadcast.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<EntityAction<T>> {
        self.store.subscribe_actions()
    }

    /// Dispatch an action and wait for the first effect-produced action
    /// matching `predicate`, typically a terminal check via
    /// [`EntityAction::is_terminal`].
    ///
    /// # Errors
    ///
    /// See [`Store::send_and_wait_for`].
    pub async fn send_and_wait_for<F>(
        &self,
        action: EntityAction<T>,
        predicate: F,
        timeout: Duration,
    ) -> Result<EntityAction<T>, StoreError>
    where
        F: Fn(&EntityAction<T>) -> bool,
    {
        self.store.send_and_wait_for(action, predicate, timeout).await
    }

    /// Read current state via a closure.
    pub async fn state<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&EntityStoreState<T>) -> U,
    {
        self.store.state(f).await
    }

    /// Name of the entity type this store manages.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Initiate graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects outlive the
    /// timeout.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            entity_name: self.entity_name.clone(),
        }
    }
}

/// Read-only derived views over an entity store's state.
///
/// Each accessor is a pure selection over the latest published snapshot;
/// there is no caching beyond the watch channel itself. Handles are cheap
/// to clone and can be created (or re-created) at any time.
pub struct EntityViews<T: Entity> {
    rx: watch::Receiver<EntityStoreState<T>>,
}

impl<T: Entity> EntityViews<T> {
    /// The full latest snapshot.
    #[must_use]
    pub fn current(&self) -> EntityStoreState<T> {
        self.rx.borrow().clone()
    }

    /// The selected entity, if one is present.
    #[must_use]
    pub fn selected_entity(&self) -> Option<T> {
        self.rx.borrow().selected_entity.entity.clone()
    }

    /// The selected entity's full state (status, busy, error).
    #[must_use]
    pub fn selected_entity_state(&self) -> EntityState<T> {
        self.rx.borrow().selected_entity.clone()
    }

    /// The selected entity's status label.
    #[must_use]
    pub fn selected_status(&self) -> EntityStatus {
        self.rx.borrow().selected_entity.status
    }

    /// Whether the selected entity is surfacing a busy indication.
    #[must_use]
    pub fn selected_is_busy(&self) -> bool {
        self.rx.borrow().selected_entity.is_busy
    }

    /// The selected entity's last error, if any.
    #[must_use]
    pub fn selected_error(&self) -> Option<CrudError> {
        self.rx.borrow().selected_entity.error.clone()
    }

    /// The bare entities of the collection, in order.
    #[must_use]
    pub fn entities(&self) -> Vec<T> {
        self.rx.borrow().collection.entities()
    }

    /// The collection's entity rows with per-row status.
    #[must_use]
    pub fn entity_states(&self) -> Vec<EntityState<T>> {
        self.rx.borrow().collection.entity_states.clone()
    }

    /// The full collection state.
    #[must_use]
    pub fn collection(&self) -> EntityCollectionState<T> {
        self.rx.borrow().collection.clone()
    }

    /// Server-side total for the active filter.
    #[must_use]
    pub fn total_entities(&self) -> u64 {
        self.rx.borrow().collection.total_entities
    }

    /// The collection's status label.
    #[must_use]
    pub fn collection_status(&self) -> EntityStatus {
        self.rx.borrow().collection.status
    }

    /// Whether the collection is surfacing a busy indication.
    #[must_use]
    pub fn collection_is_busy(&self) -> bool {
        self.rx.borrow().collection.is_busy
    }

    /// The collection's last error, if any.
    #[must_use]
    pub fn collection_error(&self) -> Option<CrudError> {
        self.rx.borrow().collection.error.clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the store (and thus the watch sender) has been
    /// dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

impl<T: Entity> Clone for EntityViews<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}
