//! Store configuration.
//!
//! [`EntityStoreConfig`] carries the settings shared by every entity type of
//! an application (API base URL, busy-indication delay); [`EntityConfig`] is
//! the per-entity-type slice derived from it. There is no store-section key:
//! each entity type owns its own typed store, composed at compile time.

use std::time::Duration;

/// Default busy-indication delay: calls faster than this never surface a
/// busy state.
pub const DEFAULT_BUSY_INDICATION_DELAY: Duration = Duration::from_millis(300);

/// Application-wide entity store settings.
///
/// # Example
///
/// ```
/// use entity_store_core::config::EntityStoreConfig;
/// use std::time::Duration;
///
/// let config = EntityStoreConfig::new("https://api.example.com")
///     .with_busy_indication_delay(Duration::from_millis(150));
/// let orders = config.entity("orders");
/// assert_eq!(orders.entity_name, "orders");
/// assert_eq!(orders.busy_indication_delay, Duration::from_millis(150));
/// ```
#[derive(Clone, Debug)]
pub struct EntityStoreConfig {
    /// Base URL of the CRUD API, without a trailing slash.
    pub api_url: String,
    /// How long a call may run before a busy indication is surfaced.
    pub busy_indication_delay: Duration,
}

impl EntityStoreConfig {
    /// Create a configuration for the given API base URL with the default
    /// busy-indication delay.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        while api_url.ends_with('/') {
            api_url.pop();
        }
        Self {
            api_url,
            busy_indication_delay: DEFAULT_BUSY_INDICATION_DELAY,
        }
    }

    /// Set the busy-indication delay.
    #[must_use]
    pub const fn with_busy_indication_delay(mut self, delay: Duration) -> Self {
        self.busy_indication_delay = delay;
        self
    }

    /// Derive the per-entity configuration for `entity_name`, inheriting
    /// this configuration's busy-indication delay. The REST endpoint
    /// defaults to the entity name.
    #[must_use]
    pub fn entity(&self, entity_name: impl Into<String>) -> EntityConfig {
        let entity_name = entity_name.into();
        EntityConfig {
            endpoint: entity_name.clone(),
            entity_name,
            busy_indication_delay: self.busy_indication_delay,
        }
    }
}

/// Settings for one entity type.
#[derive(Clone, Debug)]
pub struct EntityConfig {
    /// Name of the entity type, used in logs and as the default endpoint.
    pub entity_name: String,
    /// Path segment appended to the API base URL for this entity type.
    pub endpoint: String,
    /// How long a call may run before a busy indication is surfaced.
    pub busy_indication_delay: Duration,
}

impl EntityConfig {
    /// Create a per-entity configuration with the default busy-indication
    /// delay and an endpoint equal to the entity name.
    #[must_use]
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        Self {
            endpoint: entity_name.clone(),
            entity_name,
            busy_indication_delay: DEFAULT_BUSY_INDICATION_DELAY,
        }
    }

    /// Override the REST endpoint path segment.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the busy-indication delay.
    #[must_use]
    pub const fn with_busy_indication_delay(mut self, delay: Duration) -> Self {
        self.busy_indication_delay = delay;
        self
    }
}
