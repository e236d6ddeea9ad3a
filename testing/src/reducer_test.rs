//! Given-When-Then checks for a single reducer step
//!
//! Accepted actions are checked with `then_state`/`then_effects`; rejected
//! ones with `then_error`, which also verifies that the rejection left state
//! untouched.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use fairsale_core::{effect::Effect, reducer::Reducer};
use std::fmt::Debug;

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;
type ErrorCheck<Err> = Box<dyn FnOnce(&Err)>;

/// One reducer step under test
///
/// ```ignore
/// ReducerTest::new(PresaleReducer::new())
///     .with_env(world.env())
///     .given_state(state)
///     .when_action(PresaleAction::StartBallot { caller: admin, event })
///     .then_state(move |state| assert!(state.event(&event).unwrap().ballot_started))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E, Err>
where
    R: Reducer<State = S, Action = A, Environment = E, Error = Err>,
{
    reducer: R,
    env: Option<E>,
    given: Option<S>,
    when: Option<A>,
    state_checks: Vec<StateCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
    error_checks: Vec<ErrorCheck<Err>>,
}

impl<R, S, A, E, Err> ReducerTest<R, S, A, E, Err>
where
    R: Reducer<State = S, Action = A, Environment = E, Error = Err>,
    S: Clone + PartialEq + Debug,
    A: Debug,
    Err: Debug,
{
    /// Start a test of `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            given: None,
            when: None,
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
            error_checks: Vec::new(),
        }
    }

    /// Environment handed to the reducer
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.env = Some(env);
        self
    }

    /// State before the step
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.given = Some(state);
        self
    }

    /// The action under test
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.when = Some(action);
        self
    }

    /// Checked against the state after the step, accepted or not
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// The step must be accepted; `check` sees its effects
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// The step must be rejected; `check` sees the error
    #[must_use]
    pub fn then_error<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&Err) + 'static,
    {
        self.error_checks.push(Box::new(check));
        self
    }

    /// Reduce once and run every check
    ///
    /// # Panics
    ///
    /// On a missing given/when/env, on an unexpected acceptance or
    /// rejection, when a rejection changed state, or when a check fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self.given.expect("given_state() not called");
        let action = self.when.expect("when_action() not called");
        let env = self.env.expect("with_env() not called");
        let expect_rejection = !self.error_checks.is_empty();

        let before = state.clone();
        match self.reducer.reduce(&mut state, action, &env) {
            Ok(effects) => {
                assert!(
                    !expect_rejection,
                    "Expected the action to be rejected, but it was accepted with {effects:?}"
                );
                self.effect_checks.into_iter().for_each(|check| check(&effects));
            }
            Err(error) => {
                assert!(
                    expect_rejection,
                    "Expected the action to be accepted, but it was rejected: {error:?}"
                );
                assert_eq!(state, before, "A rejected action must leave state untouched");
                self.error_checks.into_iter().for_each(|check| check(&error));
            }
        }
        self.state_checks.into_iter().for_each(|check| check(&state));
    }
}

/// Checks over a reducer's effects
pub mod assertions {
    use fairsale_core::effect::Effect;

    /// Only `Effect::None`, if anything
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Exactly `expected` effects
    ///
    /// # Panics
    ///
    /// Panics on any other count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "wrong number of effects");
    }

    /// Collect every emitted notification, in order
    #[must_use]
    pub fn emitted<A>(effects: &[Effect<A>]) -> Vec<&A> {
        effects.iter().filter_map(Effect::as_emitted).collect()
    }

    /// Background work was scheduled
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "no Effect::Future among the effects"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::{smallvec, SmallVec};

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        stock: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Take(u32),
        Taken(u32),
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;
        type Error = String;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, String> {
            match action {
                TestAction::Take(n) if n > state.stock => Err(format!("only {} left", state.stock)),
                TestAction::Take(n) => {
                    state.stock -= n;
                    Ok(smallvec![Effect::Emit(TestAction::Taken(n))])
                }
                TestAction::Taken(_) => Ok(SmallVec::new()),
            }
        }
    }

    #[test]
    fn test_accepted_action() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { stock: 5 })
            .when_action(TestAction::Take(2))
            .then_state(|state| assert_eq!(state.stock, 3))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assert_eq!(assertions::emitted(effects), vec![&TestAction::Taken(2)]);
            })
            .run();
    }

    #[test]
    fn test_rejected_action() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { stock: 1 })
            .when_action(TestAction::Take(2))
            .then_error(|error| assert_eq!(error, "only 1 left"))
            .then_state(|state| assert_eq!(state.stock, 1))
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected the action to be rejected")]
    fn test_expected_rejection_that_was_accepted() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { stock: 5 })
            .when_action(TestAction::Take(1))
            .then_error(|_| {})
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }
}
