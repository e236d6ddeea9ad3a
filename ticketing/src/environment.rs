//! Collaborators the presale and marketplace depend on.
//!
//! Inventory, organizer configuration, loyalty points and payouts are all
//! external services. Reducers only see them through these traits, injected
//! via [`TicketingEnvironment`].

use crate::error::{InventoryError, PayoutError};
use crate::types::{AccountId, Amount, EventId, EventTerms, TicketId};
use fairsale_core::environment::Clock;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Who currently holds a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    /// Not sold yet
    Issuer,
    /// Owned by an account
    Account(AccountId),
}

/// Registry view of a single ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    /// Ticket number
    pub id: TicketId,
    /// Pricing category (e.g. "VIP")
    pub category: String,
    /// Face value in the presale
    pub price: Amount,
    /// Seat number
    pub seat: u32,
    /// Current holder
    pub holder: Holder,
    /// Already scanned at the door
    pub used: bool,
}

impl TicketInfo {
    /// Can the presale still sell this ticket?
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.holder == Holder::Issuer && !self.used
    }
}

/// Ownership registry for numbered tickets
///
/// Calls are synchronous: they run inside a reducer, under the store lock.
pub trait TicketRegistry: Send + Sync {
    /// Look up a ticket
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::TicketNotFound`] for unknown tickets.
    fn ticket(&self, event: &EventId, ticket: TicketId) -> Result<TicketInfo, InventoryError>;

    /// Move a ticket from `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotHolder`] if `from` is not the current holder.
    fn transfer(
        &self,
        event: &EventId,
        ticket: TicketId,
        from: Holder,
        to: Holder,
    ) -> Result<(), InventoryError>;

    /// Has `owner` authorized the marketplace to move their tickets?
    fn is_marketplace_approved(&self, event: &EventId, owner: &AccountId) -> bool;

    /// Unsold tickets of a category, in id order
    fn available_by_category(&self, event: &EventId, category: &str) -> Vec<TicketId>;
}

/// Organizer configuration source
pub trait EventCatalog: Send + Sync {
    /// Terms for `event`, or `None` if the organizer never created it
    fn terms(&self, event: &EventId) -> Option<EventTerms>;
}

/// Loyalty point sink refused a credit
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("Points sink unavailable: {0}")]
pub struct PointsError(pub String);

/// Fire-and-forget loyalty point accrual
pub trait PointsSink: Send + Sync {
    /// Credit `points` to `account`
    fn credit(&self, account: AccountId, points: u64) -> BoxFuture<'_, Result<(), PointsError>>;
}

/// Outgoing payments: refunds, resale proceeds and withdrawals
pub trait Treasury: Send + Sync {
    /// Pay `amount` to `recipient`
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError::Declined`] if the payment rail refuses.
    fn pay_out(&self, recipient: &AccountId, amount: Amount) -> Result<(), PayoutError>;
}

/// Dependencies injected into the presale and marketplace reducers
#[derive(Clone)]
pub struct TicketingEnvironment {
    /// Time source for ballots, windows and listings
    pub clock: Arc<dyn Clock>,
    /// Ticket ownership
    pub registry: Arc<dyn TicketRegistry>,
    /// Per-event terms
    pub catalog: Arc<dyn EventCatalog>,
    /// Loyalty points
    pub points: Arc<dyn PointsSink>,
    /// Payouts
    pub treasury: Arc<dyn Treasury>,
}

impl TicketingEnvironment {
    /// Creates a new `TicketingEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        registry: Arc<dyn TicketRegistry>,
        catalog: Arc<dyn EventCatalog>,
        points: Arc<dyn PointsSink>,
        treasury: Arc<dyn Treasury>,
    ) -> Self {
        Self {
            clock,
            registry,
            catalog,
            points,
            treasury,
        }
    }
}

impl std::fmt::Debug for TicketingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketingEnvironment")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
