//! Aggregates for the presale and marketplace.
//!
//! Both reducers share one [`TicketingState`]: the marketplace reads the
//! price history the presale writes. [`TicketingReducer`] routes each
//! [`TicketingAction`] to its aggregate and lifts the resulting effects.

pub mod marketplace;
pub mod presale;

use crate::environment::TicketingEnvironment;
use crate::error::TicketingError;
use crate::types::{AccountId, EventId, EventState, TicketingState};
use fairsale_core::{effect::Effect, reducer::Reducer, SmallVec};
use marketplace::{MarketAction, MarketplaceReducer};
use presale::{PresaleAction, PresaleReducer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Every command and notification the ticketing store handles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TicketingAction {
    /// Registration, escrow, ballot, purchase and refund
    Presale(PresaleAction),
    /// Listings and resales
    Market(MarketAction),
}

impl TicketingAction {
    /// Variant name, for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Presale(action) => action.name(),
            Self::Market(action) => action.name(),
        }
    }

    /// Is this an administrator-only command?
    #[must_use]
    pub const fn requires_admin(&self) -> bool {
        match self {
            Self::Presale(action) => action.requires_admin(),
            Self::Market(action) => action.requires_admin(),
        }
    }

    /// Versioned notification name, or "unknown" for commands
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Presale(action) => action.event_type(),
            Self::Market(action) => action.event_type(),
        }
    }

    /// The presale notification, if this is one
    #[must_use]
    pub const fn as_presale(&self) -> Option<&PresaleAction> {
        match self {
            Self::Presale(action) => Some(action),
            Self::Market(_) => None,
        }
    }

    /// The marketplace notification, if this is one
    #[must_use]
    pub const fn as_market(&self) -> Option<&MarketAction> {
        match self {
            Self::Market(action) => Some(action),
            Self::Presale(_) => None,
        }
    }
}

impl From<PresaleAction> for TicketingAction {
    fn from(action: PresaleAction) -> Self {
        Self::Presale(action)
    }
}

impl From<MarketAction> for TicketingAction {
    fn from(action: MarketAction) -> Self {
        Self::Market(action)
    }
}

/// Root reducer: presale and marketplace over one state
#[derive(Clone, Debug, Default)]
pub struct TicketingReducer {
    presale: PresaleReducer,
    marketplace: MarketplaceReducer,
}

impl TicketingReducer {
    /// Creates a new `TicketingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            presale: PresaleReducer::new(),
            marketplace: MarketplaceReducer::new(),
        }
    }
}

impl Reducer for TicketingReducer {
    type State = TicketingState;
    type Action = TicketingAction;
    type Environment = TicketingEnvironment;
    type Error = TicketingError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        match action {
            TicketingAction::Presale(action) => Ok(self
                .presale
                .reduce(state, action, env)?
                .into_iter()
                .map(|effect| effect.map(TicketingAction::Presale))
                .collect()),
            TicketingAction::Market(action) => Ok(self
                .marketplace
                .reduce(state, action, env)?
                .into_iter()
                .map(|effect| effect.map(TicketingAction::Market))
                .collect()),
        }
    }
}

// ============================================================================
// Shared validation helpers
// ============================================================================

/// Administrative commands must come from the administrator
pub(crate) fn validate_administrator(
    state: &TicketingState,
    caller: &AccountId,
) -> Result<(), TicketingError> {
    if *caller == state.administrator {
        Ok(())
    } else {
        Err(TicketingError::NotAdministrator { caller: *caller })
    }
}

/// An event's state, read from the organizer the first time it is referenced
///
/// Returns `Cow::Owned` for an event not cached yet; once the command is
/// accepted the caller keeps it via [`into_fresh`] and [`cache_event`].
pub(crate) fn load_event<'s>(
    state: &'s TicketingState,
    env: &TicketingEnvironment,
    event: &EventId,
) -> Result<Cow<'s, EventState>, TicketingError> {
    if let Some(cached) = state.events.get(event) {
        return Ok(Cow::Borrowed(cached));
    }
    env.catalog
        .terms(event)
        .map(|terms| Cow::Owned(EventState::new(terms)))
        .ok_or(TicketingError::EventNotFound { event: *event })
}

/// The loaded event if it is not cached yet, releasing the borrow of state
pub(crate) fn into_fresh(loaded: Cow<'_, EventState>) -> Option<EventState> {
    match loaded {
        Cow::Owned(fresh) => Some(fresh),
        Cow::Borrowed(_) => None,
    }
}

/// Keep a freshly loaded event
pub(crate) fn cache_event(state: &mut TicketingState, event: EventId, fresh: Option<EventState>) {
    if let Some(fresh) = fresh {
        state.events.entry(event).or_insert(fresh);
    }
}
