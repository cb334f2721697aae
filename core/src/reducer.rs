//! The reducer contract and the generated per-entity CRUD reducer.
//!
//! [`Reducer`] is the generic contract the runtime executes. For entity
//! stores there is exactly one implementation per entity type,
//! [`EntityReducer`], which realizes the CRUD state machine: command
//! handlers record synchronously-known state and return busy-gated call
//! effects; event handlers are pure state updates and return no effects.

use crate::action::EntityAction;
use crate::client::CrudClient;
use crate::config::EntityConfig;
use crate::effect::{busy_gated_call, Effect};
use crate::entity::{Entity, EntityState, EntityStatus, EntityStoreState};
use smallvec::{smallvec, SmallVec};
use std::marker::PhantomData;
use std::sync::Arc;

/// The reducer contract: `(state, action, environment) -> effects`.
///
/// Reducers contain all transition logic and are deterministic: the same
/// state and action always produce the same new state. Side effects are
/// returned as descriptions, never performed in place.
pub trait Reducer {
    /// The state type this reducer operates on.
    type State;

    /// The action type this reducer processes.
    type Action;

    /// The environment type with injected dependencies.
    type Environment;

    /// Reduce an action into state changes and effect descriptions.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}

/// Injected dependencies for an [`EntityReducer`]: the transport and the
/// per-entity configuration.
#[derive(Clone)]
pub struct EntityEnvironment<T: Entity> {
    /// CRUD transport collaborator.
    pub client: Arc<dyn CrudClient<T>>,
    /// Per-entity settings (busy-indication delay, names).
    pub config: EntityConfig,
}

impl<T: Entity> EntityEnvironment<T> {
    /// Create an environment from a transport and configuration.
    #[must_use]
    pub fn new(client: Arc<dyn CrudClient<T>>, config: EntityConfig) -> Self {
        Self { client, config }
    }
}

/// The generated CRUD reducer for one entity type.
///
/// Command variants dispatch transport calls through the busy-indication
/// gate; event variants apply the resulting transitions. Pointwise updates
/// keep the collection rows consistent with the selected entity whenever
/// both track the same key.
#[derive(Clone, Copy, Debug)]
pub struct EntityReducer<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityReducer<T> {
    /// Create a new entity reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for EntityReducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityReducer<T> {
    /// Apply busy flags to the selected entity and to the matching
    /// collection row without clobbering the row's entity.
    fn apply_selected_busy(
        state: &mut EntityStoreState<T>,
        is_busy: bool,
        status: EntityStatus,
        key: Option<T::Key>,
    ) {
        state.selected_entity.is_busy = is_busy;
        state.selected_entity.status = status;
        state.selected_entity.error = None;

        let row_key = key.or_else(|| state.selected_entity.key());
        if let Some(row_key) = row_key {
            if let Some(row) = state.collection.entity_state_mut(&row_key) {
                row.is_busy = is_busy;
                row.status = status;
                row.error = None;
            }
        }
    }

    /// Rebuild the collection rows from a loaded page. Duplicate keys from
    /// the backend are dropped (first occurrence wins) to keep the
    /// key-uniqueness invariant.
    fn apply_entities_loaded(
        state: &mut EntityStoreState<T>,
        entities: Vec<T>,
        total_entities: u64,
        complete_status: EntityStatus,
    ) {
        let mut rows: Vec<EntityState<T>> = Vec::with_capacity(entities.len());
        for entity in entities {
            let duplicate = entity
                .key()
                .is_some_and(|key| rows.iter().any(|row| row.key().as_ref() == Some(&key)));
            if !duplicate {
                rows.push(EntityState::settled(entity, complete_status));
            }
        }

        state.collection.entity_states = rows;
        state.collection.total_entities = total_entities;
        state.collection.status = complete_status;
        state.collection.is_busy = false;
        state.collection.error = None;
    }

    fn apply_saved(state: &mut EntityStoreState<T>, entity: T) {
        let updated = EntityState::settled(entity, EntityStatus::Saved);

        // Adopt into the selected slot when nothing is selected or the keys
        // agree; a selected entity with a different key is left alone.
        let adopt =
            state.selected_entity.entity.is_none() || state.selected_entity.key() == updated.key();

        state.collection.update_entity_state(&updated);
        if adopt {
            state.selected_entity = updated;
        }
    }

    fn apply_deleted(state: &mut EntityStoreState<T>, entity: &T) {
        let deleted_key = entity.key();

        let selected_matches = matches!(
            (&deleted_key, state.selected_entity.key()),
            (Some(deleted), Some(selected)) if *deleted == selected
        );
        if selected_matches {
            state.selected_entity = EntityState {
                entity: None,
                status: EntityStatus::Deleted,
                is_busy: false,
                error: None,
            };
        }

        if let Some(key) = deleted_key {
            state.collection.remove_by_key(&key);
        }
    }
}

impl<T: Entity> Reducer for EntityReducer<T> {
    type State = EntityStoreState<T>;
    type Action = EntityAction<T>;
    type Environment = EntityEnvironment<T>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let delay = env.config.busy_indication_delay;

        match action {
            // ========== Commands ==========
            EntityAction::GetAll { api_filter } => {
                // The filter is recorded immediately; status and busy flag
                // only change once the busy delay elapses or the call
                // settles.
                state.collection.api_filter = api_filter.clone();
                state.collection.error = None;

                smallvec![busy_gated_call(
                    delay,
                    env.client.get_all(api_filter),
                    EntityAction::CollectionBusy {
                        is_busy: true,
                        status: EntityStatus::Loading,
                    },
                    |page| EntityAction::EntitiesLoaded {
                        entities: page.entities,
                        total_entities: page.total_entities,
                        complete_status: EntityStatus::Loaded,
                    },
                    |error| EntityAction::CollectionFailed { error },
                )]
            }

            EntityAction::GetByKey { key } => {
                state.selected_entity.error = None;

                smallvec![busy_gated_call(
                    delay,
                    env.client.get_by_key(key.clone()),
                    EntityAction::SelectedBusy {
                        is_busy: true,
                        status: EntityStatus::Loading,
                        key: Some(key),
                    },
                    |entity| EntityAction::SelectedLoaded {
                        entity,
                        complete_status: EntityStatus::Loaded,
                    },
                    |error| EntityAction::SelectedFailed { error },
                )]
            }

            EntityAction::Save { entity } => {
                state.selected_entity.error = None;
                let key = entity.key();

                smallvec![busy_gated_call(
                    delay,
                    env.client.save(entity),
                    EntityAction::SelectedBusy {
                        is_busy: true,
                        status: EntityStatus::Saving,
                        key,
                    },
                    |entity| EntityAction::Saved { entity },
                    |error| EntityAction::SelectedFailed { error },
                )]
            }

            EntityAction::DeleteByKey { key } => {
                state.selected_entity.error = None;

                smallvec![busy_gated_call(
                    delay,
                    env.client.delete_by_key(key.clone()),
                    EntityAction::SelectedBusy {
                        is_busy: true,
                        status: EntityStatus::Deleting,
                        key: Some(key),
                    },
                    |entity| EntityAction::Deleted { entity },
                    |error| EntityAction::SelectedFailed { error },
                )]
            }

            // ========== Events ==========
            EntityAction::EntitiesLoaded {
                entities,
                total_entities,
                complete_status,
            } => {
                Self::apply_entities_loaded(state, entities, total_entities, complete_status);
                SmallVec::new()
            }

            EntityAction::CollectionBusy { is_busy, status } => {
                state.collection.is_busy = is_busy;
                state.collection.status = status;
                state.collection.error = None;
                SmallVec::new()
            }

            EntityAction::CollectionFailed { error } => {
                state.collection.is_busy = false;
                state.collection.status = EntityStatus::Error;
                state.collection.error = Some(error);
                SmallVec::new()
            }

            EntityAction::SelectedLoaded {
                entity,
                complete_status,
            } => {
                let updated = EntityState::settled(entity, complete_status);
                state.collection.update_entity_state(&updated);
                state.selected_entity = updated;
                SmallVec::new()
            }

            EntityAction::SelectedBusy {
                is_busy,
                status,
                key,
            } => {
                Self::apply_selected_busy(state, is_busy, status, key);
                SmallVec::new()
            }

            EntityAction::SelectedFailed { error } => {
                state.selected_entity.is_busy = false;
                state.selected_entity.status = EntityStatus::Error;
                state.selected_entity.error = Some(error);
                SmallVec::new()
            }

            EntityAction::Saved { entity } => {
                Self::apply_saved(state, entity);
                SmallVec::new()
            }

            EntityAction::Deleted { entity } => {
                Self::apply_deleted(state, &entity);
                SmallVec::new()
            }
        }
    }
}
