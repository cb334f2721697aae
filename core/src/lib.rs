//! # Entity Store Core
//!
//! Core types for the entity store: a generic client-side state-management
//! layer that binds a REST-style CRUD API to a reactive store.
//!
//! For any entity type implementing [`entity::Entity`], this crate provides:
//!
//! - **State**: [`entity::EntityStoreState`], the selected entity plus the
//!   loaded collection, each with status, busy flag, and error.
//! - **Actions**: [`action::EntityAction`], an immutable, closed set of
//!   commands (`get_all`, `get_by_key`, `save`, `delete_by_key`) and the
//!   events their effects feed back.
//! - **Reducer**: [`reducer::EntityReducer`], the pure CRUD state machine
//!   behind the generic [`reducer::Reducer`] contract the runtime executes.
//! - **Effects**: [`effect::Effect`] descriptions, including the
//!   busy-indication gate [`effect::busy_gated_call`], which races a
//!   transport call against a delay so fast calls never flicker a loading
//!   UI.
//! - **Transport contract**: [`client::CrudClient`], the CRUD collaborator
//!   trait the store calls through; implementations live elsewhere.
//!
//! ## Architecture principles
//!
//! - Functional core, imperative shell: reducers are pure, effects are
//!   descriptions executed by the runtime crate.
//! - Unidirectional data flow: command → effect → event → state → views.
//! - Dependency injection via the environment (transport, configuration).
//!
//! ## Example
//!
//! ```
//! use entity_store_core::entity::{Entity, EntityStoreState, EntityStatus};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Order {
//!     id: Option<u64>,
//!     label: String,
//! }
//!
//! impl Entity for Order {
//!     type Key = u64;
//!
//!     fn key(&self) -> Option<u64> {
//!         self.id
//!     }
//! }
//!
//! let state = EntityStoreState::<Order>::initial();
//! assert_eq!(state.collection.status, EntityStatus::Initial);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Actions: the closed set of commands and events per entity type.
pub mod action;

/// Transport collaborator contract and error taxonomy.
pub mod client;

/// Store and per-entity configuration.
pub mod config;

/// Effect descriptions and the busy-indication gate.
pub mod effect;

/// Entity trait and the canonical state model.
pub mod entity;

/// The reducer contract and the generated CRUD reducer.
pub mod reducer;
