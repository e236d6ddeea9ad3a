//! # Fairsale Core
//!
//! Core traits and types shared by every fairsale crate.
//!
//! Business logic is written as reducers over explicit, owned state. A reducer
//! either accepts an action (mutating state and describing follow-up effects) or
//! rejects it with an error, in which case it must leave state untouched.
//!
//! ## Core Concepts
//!
//! - **State**: Explicit keyed domain state, passed to every reducer call
//! - **Action**: All inputs to a reducer (commands and notifications)
//! - **Reducer**: `(State, Action, Environment) → Result<Effects, Error>`
//! - **Effect**: Descriptions of work to run after the reducer commits
//! - **Environment**: Injected collaborators (clock, registries, sinks)
//!
//! ## Example
//!
//! ```
//! use fairsale_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Default)]
//! struct Tally {
//!     total: u64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum TallyAction {
//!     Add(u64),
//!     Added(u64),
//! }
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = Tally;
//!     type Action = TallyAction;
//!     type Environment = ();
//!     type Error = String;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Tally,
//!         action: TallyAction,
//!         _env: &(),
//!     ) -> Result<SmallVec<[Effect<TallyAction>; 4]>, String> {
//!         match action {
//!             TallyAction::Add(0) => Err("nothing to add".to_string()),
//!             TallyAction::Add(n) => {
//!                 state.total += n;
//!                 Ok(smallvec![Effect::Emit(TallyAction::Added(n))])
//!             }
//!             TallyAction::Added(_) => Ok(SmallVec::new()),
//!         }
//!     }
//! }
//!
//! let mut state = Tally::default();
//! assert!(TallyReducer.reduce(&mut state, TallyAction::Add(0), &()).is_err());
//! assert_eq!(state.total, 0);
//! assert!(TallyReducer.reduce(&mut state, TallyAction::Add(3), &()).is_ok());
//! assert_eq!(state.total, 3);
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
///
/// Reducers are transactional: `(State, Action, Environment) → Result<Effects, Error>`.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Error`: The rejection type reported back to the caller
    ///
    /// # Contract
    ///
    /// An `Err` return means the action had no effect: implementations validate
    /// everything first and only then mutate `state`. Effects are only executed
    /// for accepted actions.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Why an action was rejected
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// 1. Validates the action against current state
        /// 2. Updates state in place (only when valid)
        /// 3. Returns effect descriptions to be executed by the store
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is rejected. State is unchanged.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned by reducers and executed by the store once the
/// reducer has committed its state change.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should
    /// happen, returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Publish a notification to subscribers and the audit journal
        Emit(Action),

        /// Fire-and-forget async computation
        ///
        /// Returns `Option<Action>`; if `Some`, the action is emitted as a
        /// notification once the computation finishes.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Emit(action) => f.debug_tuple("Effect::Emit").field(action).finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns the emitted action, if this is an `Emit` effect
        #[must_use]
        pub const fn as_emitted(&self) -> Option<&Action> {
            match self {
                Effect::Emit(action) => Some(action),
                Effect::None | Effect::Future(_) => None,
            }
        }

        /// Lift the effect into a wider action type
        ///
        /// Used by parent reducers that delegate to child reducers.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: 'static,
            F: FnOnce(Action) -> B + Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Emit(action) => Effect::Emit(f(action)),
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Purchase windows are checked against this clock, so tests drive time
    /// through a controllable implementation instead of the system clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
