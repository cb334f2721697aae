//! # Entity Store REST Transport
//!
//! A `reqwest`-backed implementation of the CRUD transport contract.
//!
//! URL scheme, per entity type:
//!
//! - `GET    {api_url}/{endpoint}?{filter}` loads a page
//! - `GET    {api_url}/{endpoint}/{key}` loads one entity
//! - `POST   {api_url}/{endpoint}` creates (entity has no key)
//! - `PUT    {api_url}/{endpoint}/{key}` updates (entity has a key)
//! - `DELETE {api_url}/{endpoint}/{key}` deletes, returning the entity
//!
//! Bodies are JSON; the collection response is the
//! `{entities, totalEntities}` page shape. Filters are JSON objects whose
//! top-level entries become query parameters.

use entity_store_core::client::{ApiFilter, CrudClient, CrudError, EntityPage};
use entity_store_core::config::{EntityConfig, EntityStoreConfig};
use entity_store_core::entity::Entity;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// REST transport for one entity type.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections. The
/// trait methods build the request synchronously and defer all I/O into the
/// returned future, so reducers can call them while staying pure.
pub struct RestCrudClient<T> {
    http: reqwest::Client,
    collection_url: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RestCrudClient<T> {
    /// Build a transport from the store and per-entity configuration,
    /// using a default `reqwest` client.
    #[must_use]
    pub fn new(store_config: &EntityStoreConfig, entity_config: &EntityConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), store_config, entity_config)
    }

    /// Build a transport around an existing `reqwest` client (custom
    /// headers, timeouts, proxies).
    #[must_use]
    pub fn with_http_client(
        http: reqwest::Client,
        store_config: &EntityStoreConfig,
        entity_config: &EntityConfig,
    ) -> Self {
        Self {
            http,
            collection_url: format!("{}/{}", store_config.api_url, entity_config.endpoint),
            _entity: PhantomData,
        }
    }

    /// The collection URL this transport targets.
    #[must_use]
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn entity_url(&self, key: &impl std::fmt::Display) -> String {
        format!("{}/{key}", self.collection_url)
    }
}

impl<T> Clone for RestCrudClient<T> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            collection_url: self.collection_url.clone(),
            _entity: PhantomData,
        }
    }
}

/// Flatten a JSON filter object into query parameters.
///
/// Strings are used verbatim; other scalars use their JSON rendering;
/// nested arrays and objects are passed as JSON text; nulls are skipped.
fn query_pairs(filter: Option<&ApiFilter>) -> Vec<(String, String)> {
    let Some(object) = filter.and_then(|f| f.as_object()) else {
        return Vec::new();
    };

    object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let rendered = match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Send a request and decode a JSON body, mapping failures onto the
/// transport error taxonomy.
async fn decode<R: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<R, CrudError> {
    let response = request
        .send()
        .await
        .map_err(|e| CrudError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CrudError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<R>()
        .await
        .map_err(|e| CrudError::Decode(e.to_string()))
}

impl<T> CrudClient<T> for RestCrudClient<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn get_all(
        &self,
        filter: Option<ApiFilter>,
    ) -> BoxFuture<'static, Result<EntityPage<T>, CrudError>> {
        let request = self
            .http
            .get(self.collection_url.as_str())
            .query(&query_pairs(filter.as_ref()));
        tracing::debug!(url = %self.collection_url, "GET collection");

        Box::pin(decode(request))
    }

    fn get_by_key(&self, key: T::Key) -> BoxFuture<'static, Result<T, CrudError>> {
        let url = self.entity_url(&key);
        tracing::debug!(%url, "GET entity");
        let request = self.http.get(url);

        Box::pin(decode(request))
    }

    fn save(&self, entity: T) -> BoxFuture<'static, Result<T, CrudError>> {
        // Keyed entities update in place; unkeyed entities are created and
        // come back with a server-assigned key.
        let request = match entity.key() {
            Some(key) => {
                let url = self.entity_url(&key);
                tracing::debug!(%url, "PUT entity");
                self.http.put(url).json(&entity)
            }
            None => {
                tracing::debug!(url = %self.collection_url, "POST entity");
                self.http.post(self.collection_url.as_str()).json(&entity)
            }
        };

        Box::pin(decode(request))
    }

    fn delete_by_key(&self, key: T::Key) -> BoxFuture<'static, Result<T, CrudError>> {
        let url = self.entity_url(&key);
        tracing::debug!(%url, "DELETE entity");
        let request = self.http.delete(url);

        Box::pin(decode(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
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

    fn client() -> RestCrudClient<Order> {
        let store_config = EntityStoreConfig::new("https://api.example.com/");
        let entity_config = store_config.entity("orders");
        RestCrudClient::new(&store_config, &entity_config)
    }

    #[test]
    fn collection_url_joins_base_and_endpoint() {
        assert_eq!(client().collection_url(), "https://api.example.com/orders");
    }

    #[test]
    fn entity_url_appends_the_key() {
        assert_eq!(
            client().entity_url(&42),
            "https://api.example.com/orders/42"
        );
    }

    #[test]
    fn endpoint_override_changes_the_path() {
        let store_config = EntityStoreConfig::new("https://api.example.com");
        let entity_config = store_config.entity("order").with_endpoint("v2/orders");
        let client = RestCrudClient::<Order>::new(&store_config, &entity_config);
        assert_eq!(client.collection_url(), "https://api.example.com/v2/orders");
    }

    #[test]
    fn query_pairs_render_scalars_and_skip_nulls() {
        let filter = json!({
            "q": "widgets",
            "page": 2,
            "active": true,
            "missing": null,
        });

        let mut pairs = query_pairs(Some(&filter));
        pairs.sort();

        assert_eq!(
            pairs,
            vec![
                ("active".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "widgets".to_string()),
            ]
        );
    }

    #[test]
    fn query_pairs_pass_nested_values_as_json() {
        let filter = json!({ "ids": [1, 2, 3] });
        let pairs = query_pairs(Some(&filter));
        assert_eq!(pairs, vec![("ids".to_string(), "[1,2,3]".to_string())]);
    }

    #[test]
    fn missing_or_non_object_filters_yield_no_pairs() {
        assert!(query_pairs(None).is_empty());
        assert!(query_pairs(Some(&json!("text"))).is_empty());
    }
}
