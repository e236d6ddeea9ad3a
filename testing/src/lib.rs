//! # Fairsale Testing
//!
//! Testing utilities for reducers and stores.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - A Given-When-Then harness for reducers (`ReducerTest`)
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use fairsale_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(PresaleReducer::new())
//!     .with_env(test_environment())
//!     .given_state(TicketingState::default())
//!     .when_action(PresaleAction::StartBallot { caller, event })
//!     .then_error(|error| assert_eq!(error.code(), "not_administrator"))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use fairsale_core::environment::Clock;

/// Reducer test harness
pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use fairsale_testing::mocks::FixedClock;
    /// use fairsale_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment under test.
    ///
    /// ```
    /// use fairsale_testing::mocks::ManualClock;
    /// use fairsale_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// let shared = clock.clone();
    /// clock.advance(Duration::seconds(90));
    /// assert_eq!(shared.now(), start + Duration::seconds(90));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock reading `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = time;
        }

        /// Move forward (or backward, for a negative duration)
        pub fn advance(&self, by: chrono::Duration) {
            let mut guard = self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts at: 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }
}

/// Install a `tracing` subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub use mocks::{epoch, test_clock, FixedClock, ManualClock};
pub use reducer_test::{assertions, ReducerTest};
