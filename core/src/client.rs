//! Transport collaborator contract for REST-style CRUD backends.
//!
//! The store never performs I/O itself: every call goes through a
//! [`CrudClient`] implementation injected via the environment. The trait
//! returns boxed futures so implementations can be held behind
//! `Arc<dyn CrudClient<T>>` and so a call, once constructed, carries no
//! borrow of the client. A future resolves at most once, which is what
//! guarantees the store sees at most one response per invocation.

use crate::entity::Entity;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filter payload for `get_all`, forwarded verbatim to the transport.
///
/// A JSON object is expected; the REST transport maps its top-level entries
/// to query parameters.
pub type ApiFilter = serde_json::Value;

/// One page of a collection response: the entities plus the server-side
/// total, which may exceed the page length when the backend paginates.
///
/// Serialized with camelCase field names to match the
/// `{entities, totalEntities}` wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPage<T> {
    /// Entities in this page, in server order.
    pub entities: Vec<T>,
    /// Total entities matching the filter on the server.
    pub total_entities: u64,
}

impl<T> EntityPage<T> {
    /// Build a page from entities and the server-side total.
    #[must_use]
    pub const fn new(entities: Vec<T>, total_entities: u64) -> Self {
        Self {
            entities,
            total_entities,
        }
    }
}

/// Transport-level failure surfaced by a [`CrudClient`] call.
///
/// Cloneable so the error can ride inside actions and state snapshots.
/// There is deliberately no validation or domain-error layer here; anything
/// the backend rejects arrives as [`CrudError::Api`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CrudError {
    /// The request never produced an HTTP response (connect, TLS, IO).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// CRUD transport for one entity type.
///
/// Implementations must not perform I/O while *constructing* the returned
/// future; all work belongs inside the future so that reducers, which call
/// these methods to build effect descriptions, stay pure.
pub trait CrudClient<T: Entity>: Send + Sync {
    /// Load a page of entities matching `filter`.
    fn get_all(&self, filter: Option<ApiFilter>) -> BoxFuture<'static, Result<EntityPage<T>, CrudError>>;

    /// Load the entity with the given key.
    fn get_by_key(&self, key: T::Key) -> BoxFuture<'static, Result<T, CrudError>>;

    /// Persist `entity`, returning the stored version (with any
    /// server-assigned fields filled in).
    fn save(&self, entity: T) -> BoxFuture<'static, Result<T, CrudError>>;

    /// Delete the entity with the given key, returning the deleted entity.
    fn delete_by_key(&self, key: T::Key) -> BoxFuture<'static, Result<T, CrudError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_page_uses_camel_case_wire_shape() {
        let page = EntityPage::new(vec![1u32, 2, 3], 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalEntities"], 10);
        assert_eq!(json["entities"].as_array().unwrap().len(), 3);

        let back: EntityPage<u32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn crud_error_messages_carry_context() {
        let err = CrudError::Api {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "api error (status 404): not found");
        assert_eq!(
            CrudError::Transport("connection refused".to_string()).to_string(),
            "transport error: connection refused"
        );
    }
}
