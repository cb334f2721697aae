//! Actions for the entity store reducer.
//!
//! The action set is a closed enum rather than a runtime-populated table:
//! every transition the store can make is a named constructor, available
//! from the moment the store exists. Commands trigger transport calls;
//! events are the pure state updates those calls feed back.

use crate::client::{ApiFilter, CrudError};
use crate::entity::{Entity, EntityStatus};

/// All inputs to an entity store reducer.
///
/// Command variants are dispatched by application code and produce effects;
/// event variants are produced by those effects (busy timers, responses,
/// failures) and only update state.
#[derive(Clone, Debug)]
pub enum EntityAction<T: Entity> {
    // ========== Commands ==========
    /// Command: load the collection with an optional filter.
    GetAll {
        /// Filter forwarded to the transport and recorded on the
        /// collection immediately.
        api_filter: Option<ApiFilter>,
    },

    /// Command: load one entity into the selected-entity slot.
    GetByKey {
        /// Key of the entity to load.
        key: T::Key,
    },

    /// Command: persist an entity (create when it has no key yet).
    Save {
        /// The entity to persist.
        entity: T,
    },

    /// Command: delete the entity with the given key.
    DeleteByKey {
        /// Key of the entity to delete.
        key: T::Key,
    },

    // ========== Events ==========
    /// Event: a collection load completed.
    EntitiesLoaded {
        /// Entities of the loaded page.
        entities: Vec<T>,
        /// Server-side total for the active filter.
        total_entities: u64,
        /// Status the collection settles into (normally `loaded`).
        complete_status: EntityStatus,
    },

    /// Event: the busy-indication delay elapsed (or cleared) for the
    /// collection.
    CollectionBusy {
        /// Whether the busy indication is on.
        is_busy: bool,
        /// The busy status to surface (`loading`).
        status: EntityStatus,
    },

    /// Event: a collection load failed.
    CollectionFailed {
        /// The transport failure.
        error: CrudError,
    },

    /// Event: a single-entity load completed.
    SelectedLoaded {
        /// The loaded entity.
        entity: T,
        /// Status the selected entity settles into (normally `loaded`).
        complete_status: EntityStatus,
    },

    /// Event: the busy-indication delay elapsed (or cleared) for the
    /// selected entity.
    SelectedBusy {
        /// Whether the busy indication is on.
        is_busy: bool,
        /// The busy status to surface (`loading`, `saving`, or `deleting`).
        status: EntityStatus,
        /// Key of the entity the call targets, when known; lets the
        /// matching collection row surface the same busy flags.
        key: Option<T::Key>,
    },

    /// Event: a single-entity call failed.
    SelectedFailed {
        /// The transport failure.
        error: CrudError,
    },

    /// Event: a save completed; the stored entity comes back from the
    /// transport.
    Saved {
        /// The entity as persisted by the backend.
        entity: T,
    },

    /// Event: a delete completed; the transport returns the deleted entity.
    Deleted {
        /// The entity that was deleted.
        entity: T,
    },
}

impl<T: Entity> EntityAction<T> {
    /// Whether this action is a command (dispatched by application code,
    /// produces effects).
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::GetAll { .. } | Self::GetByKey { .. } | Self::Save { .. } | Self::DeleteByKey { .. }
        )
    }

    /// Whether this action is an event (produced by effects, pure state
    /// update).
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }

    /// Whether this action terminates an invocation: each dispatched
    /// command produces exactly one terminal event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::EntitiesLoaded { .. }
                | Self::CollectionFailed { .. }
                | Self::SelectedLoaded { .. }
                | Self::SelectedFailed { .. }
                | Self::Saved { .. }
                | Self::Deleted { .. }
        )
    }

    /// Stable action name for logs and metrics labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetAll { .. } => "get_all",
            Self::GetByKey { .. } => "get_by_key",
            Self::Save { .. } => "save",
            Self::DeleteByKey { .. } => "delete_by_key",
            Self::EntitiesLoaded { .. } => "entities_loaded",
            Self::CollectionBusy { .. } => "collection_busy",
            Self::CollectionFailed { .. } => "collection_failed",
            Self::SelectedLoaded { .. } => "selected_loaded",
            Self::SelectedBusy { .. } => "selected_busy",
            Self::SelectedFailed { .. } => "selected_failed",
            Self::Saved { .. } => "saved",
            Self::Deleted { .. } => "deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Widget {
        id: Option<u32>,
    }

    impl Entity for Widget {
        type Key = u32;

        fn key(&self) -> Option<u32> {
            self.id
        }
    }

    #[test]
    fn commands_and_events_are_disjoint() {
        let get_all = EntityAction::<Widget>::GetAll { api_filter: None };
        assert!(get_all.is_command());
        assert!(!get_all.is_event());
        assert!(!get_all.is_terminal());

        let loaded = EntityAction::<Widget>::EntitiesLoaded {
            entities: vec![],
            total_entities: 0,
            complete_status: EntityStatus::Loaded,
        };
        assert!(loaded.is_event());
        assert!(loaded.is_terminal());

        let busy = EntityAction::<Widget>::CollectionBusy {
            is_busy: true,
            status: EntityStatus::Loading,
        };
        assert!(busy.is_event());
        assert!(!busy.is_terminal());
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(EntityAction::<Widget>::GetAll { api_filter: None }.name(), "get_all");
        assert_eq!(
            EntityAction::<Widget>::Deleted {
                entity: Widget { id: Some(1) }
            }
            .name(),
            "deleted"
        );
    }
}
