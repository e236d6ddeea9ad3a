//! # Fairsale Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Execution model
//!
//! Every action is processed under a single state lock: the reducer runs and
//! its emitted notifications are journaled and broadcast before the next action
//! can observe the state. Callers therefore see one global serial order, and a
//! rejected action leaves no trace beyond its error.
//!
//! `Effect::Future` never runs under the lock. It is spawned once the lock is
//! released, and whatever action it yields is journaled, broadcast and fed
//! back through [`Store::send`]. A slow collaborator behind such an effect
//! delays nobody.
//!
//! ## Example
//!
//! ```ignore
//! use fairsale_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action; notifications come back on the receipt
//! let receipt = store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use fairsale_core::{effect::Effect, reducer::Reducer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};

/// Prometheus metrics for observability
pub mod metrics;

pub use store::{JournalEntry, Receipt, Store};

/// Default capacity of the notification broadcast channel
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// How often [`Store::settle`] re-checks the pending effect count
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Decrements the pending effect counter on drop, even if the effect panics
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - serial action dispatch
pub mod store {
    use super::{
        broadcast, Arc, AtomicUsize, Duration, Effect, Instant, Mutex, Ordering, PendingGuard,
        Reducer, DEFAULT_BROADCAST_CAPACITY, SETTLE_POLL_INTERVAL,
    };
    use crate::metrics::StoreMetrics;

    /// A notification recorded in the store's audit journal
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct JournalEntry<A> {
        /// Position in the journal, starting at 0
        pub sequence: u64,
        /// The notification itself
        pub notification: A,
    }

    /// What an accepted action produced
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Receipt<A> {
        /// Notifications emitted while processing the action, in order
        pub notifications: Vec<A>,
    }

    impl<A> Default for Receipt<A> {
        fn default() -> Self {
            Self {
                notifications: Vec::new(),
            }
        }
    }

    impl<A> Receipt<A> {
        /// Returns the first notification matching `f`
        pub fn find_map<T, F>(&self, f: F) -> Option<T>
        where
            F: FnMut(&A) -> Option<T>,
        {
            self.notifications.iter().find_map(f)
        }
    }

    struct Inner<S, A> {
        state: S,
        journal: Vec<JournalEntry<A>>,
        next_sequence: u64,
    }

    impl<S, A: Clone> Inner<S, A> {
        fn record(&mut self, notification: &A) {
            self.journal.push(JournalEntry {
                sequence: self.next_sequence,
                notification: notification.clone(),
            });
            self.next_sequence += 1;
        }
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State and the notification journal (behind one `Mutex`)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution and notification broadcast
    ///
    /// Cloning a Store is cheap and yields a handle to the same state.
    ///
    /// The journal is the audit trail and is retained in memory until a caller
    /// takes it with [`Store::drain_journal`].
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<Mutex<Inner<S, A>>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        notifications: broadcast::Sender<A>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                notifications: self.notifications.clone(),
                pending_effects: Arc::clone(&self.pending_effects),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
        }

        /// Create a store whose notification channel buffers `capacity` messages
        ///
        /// Slow subscribers that fall further behind observe a lag error; the
        /// journal keeps the complete history regardless.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (notifications, _) = broadcast::channel(capacity.max(1));

            Self {
                inner: Arc::new(Mutex::new(Inner {
                    state: initial_state,
                    journal: Vec::new(),
                    next_sequence: 0,
                })),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                notifications,
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Send an action through the reducer
        ///
        /// Emitted notifications are journaled before the state lock is
        /// released, so no other action observes the new state without them.
        /// Future effects are spawned afterwards and are not part of the
        /// receipt; see [`Store::settle`].
        ///
        /// # Errors
        ///
        /// Returns the reducer's error when the action is rejected; no effect
        /// runs and nothing is journaled in that case.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<Receipt<A>, R::Error> {
            let mut receipt = Receipt::default();
            let mut deferred = Vec::new();
            {
                let mut inner = self.inner.lock().await;

                let started = Instant::now();
                let result = self
                    .reducer
                    .reduce(&mut inner.state, action, &self.environment);
                StoreMetrics::record_action(started.elapsed());

                for effect in result? {
                    match effect {
                        Effect::None => {},
                        Effect::Emit(notification) => {
                            self.publish(&mut inner, &notification);
                            receipt.notifications.push(notification);
                        },
                        Effect::Future(fut) => deferred.push(fut),
                    }
                }
            }

            for fut in deferred {
                self.spawn_effect(fut);
            }

            Ok(receipt)
        }

        fn publish(&self, inner: &mut Inner<S, A>, notification: &A) {
            inner.record(notification);
            // No subscribers is not an error: the journal still has it
            let _ = self.notifications.send(notification.clone());
            StoreMetrics::record_notification();
        }

        /// Run a future effect off the lock, feeding its action back in
        fn spawn_effect(
            &self,
            fut: std::pin::Pin<Box<dyn std::future::Future<Output = Option<A>> + Send>>,
        ) {
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let guard = PendingGuard(Arc::clone(&self.pending_effects));
            let store = self.clone();

            tokio::spawn(async move {
                let _guard = guard;
                let Some(action) = fut.await else {
                    tracing::trace!("Effect::Future completed with no action");
                    return;
                };

                {
                    let mut inner = store.inner.lock().await;
                    store.publish(&mut inner, &action);
                }
                // The reducer may react to the outcome; a rejection here has no caller
                if store.send(action).await.is_err() {
                    tracing::warn!("Action produced by an effect was rejected");
                }
            });
        }

        /// Number of spawned future effects still running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::SeqCst)
        }

        /// Wait until every spawned future effect has finished
        ///
        /// Returns `false` if effects are still running after `timeout`.
        pub async fn settle(&self, timeout: Duration) -> bool {
            let started = Instant::now();
            loop {
                let pending = self.pending_effects();
                if pending == 0 {
                    return true;
                }
                if started.elapsed() >= timeout {
                    tracing::warn!(
                        pending_effects = pending,
                        "Effects still running after settle timeout"
                    );
                    return false;
                }
                tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
            }
        }

        /// Read state through a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let inner = self.inner.lock().await;
            f(&inner.state)
        }

        /// Subscribe to notifications emitted after this call
        #[must_use]
        pub fn subscribe(&self) -> broadcast::Receiver<A> {
            self.notifications.subscribe()
        }

        /// Snapshot of the audit journal
        pub async fn journal(&self) -> Vec<JournalEntry<A>> {
            self.inner.lock().await.journal.clone()
        }

        /// Take the retained journal, leaving it empty
        ///
        /// Sequence numbers keep counting from where the drained entries left
        /// off, so an archive built from successive drains has no gaps.
        pub async fn drain_journal(&self) -> Vec<JournalEntry<A>> {
            std::mem::take(&mut self.inner.lock().await.journal)
        }

        /// The injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }
    }
}
