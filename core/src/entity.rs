//! Entity state model: the canonical per-entity-type store state.
//!
//! The state tree for one entity type has two halves:
//!
//! - [`EntityState`]: the single currently-focused entity ("selected
//!   entity"), with its status, busy flag, and last error.
//! - [`EntityCollectionState`]: the loaded collection: an ordered list of
//!   [`EntityState`] rows plus the total count, the last-used filter, and
//!   aggregate status/busy/error.
//!
//! Both halves live in [`EntityStoreState`], which is what the runtime
//! publishes to observers after every reduction. All types are owned data;
//! observers receive clones, so no snapshot ever aliases live state.

use crate::client::{ApiFilter, CrudError};
use std::fmt;

/// A record type managed by an entity store.
///
/// This is the Rust-native form of a "configurable key property": instead of
/// naming a field, the entity type declares its key type and how to read it.
/// A key of `None` models an entity that has not been persisted yet (for
/// example, a create payload before the server assigned an id).
///
/// # Examples
///
/// ```
/// use entity_store_core::entity::Entity;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Order {
///     id: Option<u64>,
///     label: String,
/// }
///
/// impl Entity for Order {
///     type Key = u64;
///
///     fn key(&self) -> Option<u64> {
///         self.id
///     }
/// }
/// ```
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// The identity key used to match entities across the selected-entity
    /// view and the collection. Displayed when building keyed URLs.
    type Key: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// The entity's key, or `None` if it has not been assigned one yet.
    fn key(&self) -> Option<Self::Key>;
}

/// Lifecycle status of a tracked entity or collection.
///
/// `Error` is not terminal: dispatching another command transitions back
/// into the matching busy status and clears the stored error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    /// Nothing has been requested yet.
    #[default]
    Initial,
    /// A load is in flight past the busy-indication delay.
    Loading,
    /// The last load completed.
    Loaded,
    /// A save is in flight past the busy-indication delay.
    Saving,
    /// The last save completed.
    Saved,
    /// A delete is in flight past the busy-indication delay.
    Deleting,
    /// The last delete completed.
    Deleted,
    /// The last call failed.
    Error,
}

impl EntityStatus {
    /// Lowercase status label, suitable for UI binding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked entity instance plus its status tag, busy flag, and error.
///
/// Replaced wholesale on every status transition.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityState<T: Entity> {
    /// The tracked entity, if one is present.
    pub entity: Option<T>,
    /// Current lifecycle status.
    pub status: EntityStatus,
    /// Whether a busy indication is currently surfaced for this entity.
    pub is_busy: bool,
    /// The last transport error, cleared on the next command dispatch.
    pub error: Option<CrudError>,
}

impl<T: Entity> EntityState<T> {
    /// The pristine state: no entity, status `initial`, not busy, no error.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            entity: None,
            status: EntityStatus::Initial,
            is_busy: false,
            error: None,
        }
    }

    /// A settled state holding `entity` with the given completion status.
    #[must_use]
    pub const fn settled(entity: T, status: EntityStatus) -> Self {
        Self {
            entity: Some(entity),
            status,
            is_busy: false,
            error: None,
        }
    }

    /// The tracked entity's key, if an entity is present and has one.
    #[must_use]
    pub fn key(&self) -> Option<T::Key> {
        self.entity.as_ref().and_then(Entity::key)
    }
}

impl<T: Entity> Default for EntityState<T> {
    fn default() -> Self {
        Self::initial()
    }
}

/// The loaded collection for one entity type.
///
/// Rows are [`EntityState`] values so that per-row busy/status/error can be
/// tracked when a selected entity that also appears in the collection
/// transitions. Invariant: no two rows share a key.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityCollectionState<T: Entity> {
    /// Ordered entity rows, as returned by the last load.
    pub entity_states: Vec<EntityState<T>>,
    /// Total number of entities on the server for the last filter (may
    /// exceed `entity_states.len()` when the server pages).
    pub total_entities: u64,
    /// The filter used by the most recent `get_all` dispatch. Set
    /// immediately on dispatch, before any response arrives.
    pub api_filter: Option<ApiFilter>,
    /// Aggregate lifecycle status of the collection.
    pub status: EntityStatus,
    /// Whether a busy indication is currently surfaced for the collection.
    pub is_busy: bool,
    /// The last transport error, cleared on the next `get_all` dispatch.
    pub error: Option<CrudError>,
}

impl<T: Entity> EntityCollectionState<T> {
    /// The pristine collection: empty, status `initial`, not busy, no error.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            entity_states: Vec::new(),
            total_entities: 0,
            api_filter: None,
            status: EntityStatus::Initial,
            is_busy: false,
            error: None,
        }
    }

    /// The bare entities of every row, in collection order.
    #[must_use]
    pub fn entities(&self) -> Vec<T> {
        self.entity_states
            .iter()
            .filter_map(|row| row.entity.clone())
            .collect()
    }

    /// Number of rows currently loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entity_states.len()
    }

    /// Whether no rows are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_states.is_empty()
    }

    /// The row holding the entity with the given key, if any.
    #[must_use]
    pub fn entity_state(&self, key: &T::Key) -> Option<&EntityState<T>> {
        self.entity_states
            .iter()
            .find(|row| row.key().as_ref() == Some(key))
    }

    /// Mutable access to the row holding the entity with the given key.
    pub fn entity_state_mut(&mut self, key: &T::Key) -> Option<&mut EntityState<T>> {
        self.entity_states
            .iter_mut()
            .find(|row| row.key().as_ref() == Some(key))
    }

    /// Replace the row whose key matches `updated`'s entity, keeping the
    /// collection consistent with a selected-entity transition.
    ///
    /// No-op when `updated` carries no keyed entity or no row matches; rows
    /// are never inserted here, so key uniqueness is preserved.
    pub fn update_entity_state(&mut self, updated: &EntityState<T>) {
        let Some(key) = updated.key() else {
            return;
        };

        if let Some(row) = self.entity_state_mut(&key) {
            *row = updated.clone();
        }
    }

    /// Remove the row with the given key. Returns whether a row was removed.
    pub fn remove_by_key(&mut self, key: &T::Key) -> bool {
        let before = self.entity_states.len();
        self.entity_states.retain(|row| row.key().as_ref() != Some(key));
        self.entity_states.len() != before
    }
}

impl<T: Entity> Default for EntityCollectionState<T> {
    fn default() -> Self {
        Self::initial()
    }
}

/// The top-level per-entity-type state: selected entity plus collection.
///
/// Initialized to the all-`initial` state at store construction and lives
/// for the application session.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityStoreState<T: Entity> {
    /// The single currently-focused entity.
    pub selected_entity: EntityState<T>,
    /// The loaded collection.
    pub collection: EntityCollectionState<T>,
}

impl<T: Entity> EntityStoreState<T> {
    /// The pristine store state.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            selected_entity: EntityState::initial(),
            collection: EntityCollectionState::initial(),
        }
    }
}

impl<T: Entity> Default for EntityStoreState<T> {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Widget {
        id: Option<u32>,
        label: String,
    }

    impl Entity for Widget {
        type Key = u32;

        fn key(&self) -> Option<u32> {
            self.id
        }
    }

    fn widget(id: u32, label: &str) -> Widget {
        Widget {
            id: Some(id),
            label: label.to_string(),
        }
    }

    #[test]
    fn status_labels_are_lowercase() {
        assert_eq!(EntityStatus::Initial.to_string(), "initial");
        assert_eq!(EntityStatus::Loading.to_string(), "loading");
        assert_eq!(EntityStatus::Deleted.to_string(), "deleted");
        assert_eq!(EntityStatus::Error.to_string(), "error");
    }

    #[test]
    fn initial_state_is_empty_and_not_busy() {
        let state = EntityStoreState::<Widget>::initial();
        assert_eq!(state.selected_entity.status, EntityStatus::Initial);
        assert!(!state.selected_entity.is_busy);
        assert!(state.selected_entity.entity.is_none());
        assert!(state.collection.is_empty());
        assert_eq!(state.collection.total_entities, 0);
        assert!(state.collection.api_filter.is_none());
    }

    #[test]
    fn update_entity_state_replaces_matching_row() {
        let mut collection = EntityCollectionState::initial();
        collection.entity_states = vec![
            EntityState::settled(widget(1, "a"), EntityStatus::Loaded),
            EntityState::settled(widget(2, "b"), EntityStatus::Loaded),
        ];

        let updated = EntityState::settled(widget(2, "b2"), EntityStatus::Saved);
        collection.update_entity_state(&updated);

        assert_eq!(collection.len(), 2);
        let row = collection.entity_state(&2).unwrap();
        assert_eq!(row.status, EntityStatus::Saved);
        assert_eq!(row.entity.as_ref().unwrap().label, "b2");
    }

    #[test]
    fn update_entity_state_never_inserts() {
        let mut collection = EntityCollectionState::initial();
        collection.entity_states = vec![EntityState::settled(widget(1, "a"), EntityStatus::Loaded)];

        let unknown = EntityState::settled(widget(9, "x"), EntityStatus::Saved);
        collection.update_entity_state(&unknown);

        assert_eq!(collection.len(), 1);
        assert!(collection.entity_state(&9).is_none());
    }

    #[test]
    fn remove_by_key_drops_only_the_matching_row() {
        let mut collection = EntityCollectionState::initial();
        collection.entity_states = vec![
            EntityState::settled(widget(1, "a"), EntityStatus::Loaded),
            EntityState::settled(widget(2, "b"), EntityStatus::Loaded),
        ];

        assert!(collection.remove_by_key(&1));
        assert_eq!(collection.len(), 1);
        assert!(collection.entity_state(&1).is_none());
        assert!(!collection.remove_by_key(&1));
    }

    #[test]
    fn entity_state_key_reads_through_entity() {
        let state = EntityState::settled(widget(7, "a"), EntityStatus::Loaded);
        assert_eq!(state.key(), Some(7));
        assert_eq!(EntityState::<Widget>::initial().key(), None);
    }
}
