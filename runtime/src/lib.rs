//! # Entity Store Runtime
//!
//! The runtime that coordinates reducer execution and effect handling.
//!
//! ## Core components
//!
//! - [`Store`]: owns the state, runs the reducer under a write lock, and
//!   executes effects on the tokio runtime, feeding produced actions back
//!   through dispatch.
//! - [`EffectHandle`]: returned by [`Store::send`] so callers can await
//!   completion of an invocation's effects.
//! - [`entity_store::EntityStore`]: the typed per-entity facade with CRUD
//!   operations and derived views.
//!
//! ## Example
//!
//! ```ignore
//! use entity_store_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//! let handle = store.send(Action::DoSomething).await?;
//! handle.wait().await;
//! let value = store.state(|s| s.some_field).await;
//! ```

use entity_store_core::{effect::Effect, reducer::Reducer};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};

pub mod entity_store;

pub use entity_store::{EntityStore, EntityViews};

/// Error types for the store runtime.
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during store operations.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The store is shutting down and not accepting new actions.
        #[error("store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out with effects still running.
        #[error("shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action in
        /// [`Store::send_and_wait_for`](super::Store::send_and_wait_for).
        #[error("timeout waiting for action")]
        Timeout,

        /// The action broadcast channel closed, typically because the store
        /// is shutting down.
        #[error("action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion.
///
/// Returned by [`Store::send`]; waiting on it blocks until every effect
/// spawned for that action (and the dispatch of the actions those effects
/// produced) has finished.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that is already complete.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        drop(tx);

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait for all tracked effects to complete.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Notifier gone: every tracking clone has been dropped,
                // which only happens after the final decrement.
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete, up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires first.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: completion tracking passed through effect execution.
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

impl Clone for EffectTracking {
    fn clone(&self) -> Self {
        Self {
            counter: Arc::clone(&self.counter),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop, so the
/// counter stays correct even if an effect task panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking).
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The store: runtime coordinator for a reducer.
///
/// The store manages:
///
/// 1. State (behind an async `RwLock`)
/// 2. Reducer execution (serialized at the write lock)
/// 3. Effect execution with a feedback loop (effects produce actions, which
///    are dispatched back through the same path)
/// 4. State observation (a watch channel carrying a clone of every
///    post-reduce snapshot) and action observation (a broadcast channel of
///    effect-produced actions)
///
/// # Type parameters
///
/// - `S`: state type
/// - `A`: action type
/// - `E`: environment type
/// - `R`: reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Actions produced by effects are broadcast to observers; the initial
    /// action of a `send` is not.
    action_broadcast: broadcast::Sender<A>,
    /// Every post-reduce state snapshot is published here. Subscribers see
    /// the latest value immediately on subscription.
    state_watch: watch::Sender<S>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + 'static,
    S: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment.
    ///
    /// The action broadcast capacity defaults to 16; use
    /// [`Store::with_broadcast_capacity`] when observers may lag.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a new store with a custom action broadcast capacity.
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);
        let (state_watch, _) = watch::channel(initial_state.clone());

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
            state_watch,
        }
    }

    /// Send an action to the store.
    ///
    /// Runs the reducer synchronously under the write lock, publishes the
    /// new state snapshot, then starts executing the returned effects in
    /// spawned tasks. Returns before the effects complete; await the
    /// returned [`EffectHandle`] to wait for them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("entity_store.actions.total").increment(1);

        let (handle, tracking) = EffectHandle::new();

        let effects = {
            let mut state = self.state.write().await;

            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut state, action, &self.environment);
            metrics::histogram!("entity_store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            // Publish while still holding the write lock so snapshots reach
            // the watch channel in reduction order.
            self.state_watch.send_replace(state.clone());

            effects
        };

        tracing::trace!(effect_count = effects.len(), "executing effects");
        for effect in effects {
            self.execute_effect(effect, tracking.clone());
        }

        Ok(handle)
    }

    /// Send an action and wait for a matching result action.
    ///
    /// Designed for request/response flows: subscribes to the action
    /// broadcast *before* sending (so the response cannot be missed), sends
    /// the action, then returns the first effect-produced action matching
    /// `predicate`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if no matching action arrives in time
    /// - [`StoreError::ChannelClosed`] if the broadcast channel closes
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();

        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Keep waiting; the timeout catches a dropped match.
                        tracing::warn!(skipped, "action observer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    }
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Read current state via a closure, releasing the lock promptly.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Subscribe to state snapshots.
    ///
    /// The receiver immediately holds the latest snapshot; every subsequent
    /// reduction publishes a new one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state_watch.subscribe()
    }

    /// Subscribe to all actions produced by effects.
    ///
    /// Initial actions passed to [`Store::send`] are not broadcast; only
    /// the actions effects feed back (busy indications, responses, errors).
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Initiate graceful shutdown: reject new actions, then wait for
    /// pending effects to finish.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);

            if pending == 0 {
                tracing::info!("all effects completed, shutdown successful");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "shutdown timeout");
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Execute one effect with completion tracking.
    ///
    /// Effects run in spawned tasks; actions they produce are broadcast to
    /// observers and dispatched back into the store. The [`DecrementGuard`]
    /// keeps the handle's counter correct even if a task panics.
    fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
        match effect {
            Effect::None => {
                tracing::trace!("executing Effect::None (no-op)");
                metrics::counter!("entity_store.effects.executed", "type" => "none").increment(1);
            }
            Effect::Delay { duration, action } => {
                tracing::trace!(?duration, "executing Effect::Delay");
                metrics::counter!("entity_store.effects.executed", "type" => "delay").increment(1);
                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending_guard = pending_guard;

                    tokio::time::sleep(duration).await;

                    let _ = store.action_broadcast.send((*action).clone());
                    let _ = store.send(*action).await;
                });
            }
            Effect::Future(fut) => {
                tracing::trace!("executing Effect::Future");
                metrics::counter!("entity_store.effects.executed", "type" => "future").increment(1);
                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending_guard = pending_guard;

                    if let Some(action) = fut.await {
                        let _ = store.action_broadcast.send(action.clone());
                        let _ = store.send(action).await;
                    }
                });
            }
            Effect::Stream(mut stream) => {
                tracing::trace!("executing Effect::Stream");
                metrics::counter!("entity_store.effects.executed", "type" => "stream").increment(1);
                tracking.increment();

                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                let store = self.clone();
                tokio::spawn(async move {
                    let _guard = DecrementGuard(tracking);
                    let _pending_guard = pending_guard;

                    while let Some(action) = stream.next().await {
                        let _ = store.action_broadcast.send(action.clone());
                        let _ = store.send(action).await;
                    }
                    tracing::trace!("Effect::Stream exhausted");
                });
            }
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
            state_watch: self.state_watch.clone(),
        }
    }
}
