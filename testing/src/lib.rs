//! # Entity Store Testing
//!
//! Testing utilities for the entity store:
//!
//! - [`mocks::MockCrudClient`]: a canned-response transport with
//!   configurable latency and failures, for driving the busy-indication
//!   gate deterministically in tests.
//! - [`ReducerTest`]: a fluent Given/When/Then harness for reducer tests.
//!
//! ## Example
//!
//! ```ignore
//! let client = MockCrudClient::<Order>::new()
//!     .with_latency(Duration::from_millis(500));
//! client.enqueue_get_all(Ok(EntityPage::new(orders, 2)));
//!
//! let store = EntityStore::new(Arc::new(client), config.entity("orders"));
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of the transport collaborator.
pub mod mocks {
    use entity_store_core::client::{ApiFilter, CrudClient, CrudError, EntityPage};
    use entity_store_core::entity::Entity;
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type ResponseQueue<R> = Mutex<VecDeque<Result<R, CrudError>>>;

    struct Queues<T: Entity> {
        get_all: ResponseQueue<EntityPage<T>>,
        get_by_key: ResponseQueue<T>,
        save: ResponseQueue<T>,
        delete_by_key: ResponseQueue<T>,

        get_all_calls: AtomicUsize,
        get_by_key_calls: AtomicUsize,
        save_calls: AtomicUsize,
        delete_by_key_calls: AtomicUsize,
    }

    impl<T: Entity> Queues<T> {
        fn new() -> Self {
            Self {
                get_all: Mutex::new(VecDeque::new()),
                get_by_key: Mutex::new(VecDeque::new()),
                save: Mutex::new(VecDeque::new()),
                delete_by_key: Mutex::new(VecDeque::new()),
                get_all_calls: AtomicUsize::new(0),
                get_by_key_calls: AtomicUsize::new(0),
                save_calls: AtomicUsize::new(0),
                delete_by_key_calls: AtomicUsize::new(0),
            }
        }
    }

    fn missing<R>(operation: &str) -> Result<R, CrudError> {
        Err(CrudError::Transport(format!(
            "no mock response queued for {operation}"
        )))
    }

    /// Canned-response CRUD transport for tests.
    ///
    /// Responses are queued per operation and consumed in FIFO order when
    /// the call future runs, after the configured latency. A call with no
    /// queued response fails with a transport error, which surfaces test
    /// misconfiguration instead of hanging.
    #[allow(clippy::unwrap_used)] // queue mutexes are test-only
    pub struct MockCrudClient<T: Entity> {
        latency: Duration,
        queues: Arc<Queues<T>>,
    }

    #[allow(clippy::unwrap_used)] // queue mutexes are test-only
    impl<T: Entity> MockCrudClient<T> {
        /// Create a mock transport with zero latency.
        #[must_use]
        pub fn new() -> Self {
            Self {
                latency: Duration::ZERO,
                queues: Arc::new(Queues::new()),
            }
        }

        /// Set the simulated latency applied to every call.
        #[must_use]
        pub const fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        /// Queue a `get_all` response.
        ///
        /// # Panics
        ///
        /// Panics if the internal queue mutex is poisoned.
        pub fn enqueue_get_all(&self, response: Result<EntityPage<T>, CrudError>) {
            self.queues.get_all.lock().unwrap().push_back(response);
        }

        /// Queue a `get_by_key` response.
        ///
        /// # Panics
        ///
        /// Panics if the internal queue mutex is poisoned.
        pub fn enqueue_get_by_key(&self, response: Result<T, CrudError>) {
            self.queues.get_by_key.lock().unwrap().push_back(response);
        }

        /// Queue a `save` response.
        ///
        /// # Panics
        ///
        /// Panics if the internal queue mutex is poisoned.
        pub fn enqueue_save(&self, response: Result<T, CrudError>) {
            self.queues.save.lock().unwrap().push_back(response);
        }

        /// Queue a `delete_by_key` response.
        ///
        /// # Panics
        ///
        /// Panics if the internal queue mutex is poisoned.
        pub fn enqueue_delete_by_key(&self, response: Result<T, CrudError>) {
            self.queues.delete_by_key.lock().unwrap().push_back(response);
        }

        /// Number of `get_all` calls executed so far.
        #[must_use]
        pub fn get_all_calls(&self) -> usize {
            self.queues.get_all_calls.load(Ordering::SeqCst)
        }

        /// Number of `get_by_key` calls executed so far.
        #[must_use]
        pub fn get_by_key_calls(&self) -> usize {
            self.queues.get_by_key_calls.load(Ordering::SeqCst)
        }

        /// Number of `save` calls executed so far.
        #[must_use]
        pub fn save_calls(&self) -> usize {
            self.queues.save_calls.load(Ordering::SeqCst)
        }

        /// Number of `delete_by_key` calls executed so far.
        #[must_use]
        pub fn delete_by_key_calls(&self) -> usize {
            self.queues.delete_by_key_calls.load(Ordering::SeqCst)
        }
    }

    impl<T: Entity> Default for MockCrudClient<T> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<T: Entity> Clone for MockCrudClient<T> {
        fn clone(&self) -> Self {
            Self {
                latency: self.latency,
                queues: Arc::clone(&self.queues),
            }
        }
    }

    #[allow(clippy::unwrap_used)] // queue mutexes are test-only
    impl<T: Entity> CrudClient<T> for MockCrudClient<T> {
        fn get_all(
            &self,
            _filter: Option<ApiFilter>,
        ) -> BoxFuture<'static, Result<EntityPage<T>, CrudError>> {
            let latency = self.latency;
            let queues = Arc::clone(&self.queues);

            Box::pin(async move {
                queues.get_all_calls.fetch_add(1, Ordering::SeqCst);
                if latency > Duration::ZERO {
                    tokio::time::sleep(latency).await;
                }
                let queued = queues.get_all.lock().unwrap().pop_front();
                queued.unwrap_or_else(|| missing("get_all"))
            })
        }

        fn get_by_key(&self, _key: T::Key) -> BoxFuture<'static, Result<T, CrudError>> {
            let latency = self.latency;
            let queues = Arc::clone(&self.queues);

            Box::pin(async move {
                queues.get_by_key_calls.fetch_add(1, Ordering::SeqCst);
                if latency > Duration::ZERO {
                    tokio::time::sleep(latency).await;
                }
                let queued = queues.get_by_key.lock().unwrap().pop_front();
                queued.unwrap_or_else(|| missing("get_by_key"))
            })
        }

        fn save(&self, _entity: T) -> BoxFuture<'static, Result<T, CrudError>> {
            let latency = self.latency;
            let queues = Arc::clone(&self.queues);

            Box::pin(async move {
                queues.save_calls.fetch_add(1, Ordering::SeqCst);
                if latency > Duration::ZERO {
                    tokio::time::sleep(latency).await;
                }
                let queued = queues.save.lock().unwrap().pop_front();
                queued.unwrap_or_else(|| missing("save"))
            })
        }

        fn delete_by_key(&self, _key: T::Key) -> BoxFuture<'static, Result<T, CrudError>> {
            let latency = self.latency;
            let queues = Arc::clone(&self.queues);

            Box::pin(async move {
                queues.delete_by_key_calls.fetch_add(1, Ordering::SeqCst);
                if latency > Duration::ZERO {
                    tokio::time::sleep(latency).await;
                }
                let queued = queues.delete_by_key.lock().unwrap().pop_front();
                queued.unwrap_or_else(|| missing("delete_by_key"))
            })
        }
    }

}
