//! Domain types for the ballot presale and resale marketplace.
//!
//! Identifiers, the `Amount` value object, purchase windows, listings and the
//! keyed `TicketingState` every reducer operates on.

use crate::ledger::Registrant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a buyer, seller or administrator
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random `AccountId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AccountId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
///
/// Each event's tickets live in their own inventory, so the event identifier
/// also serves as the inventory reference for price history and listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numbered ticket within an event's inventory
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(u64);

impl TicketId {
    /// Create a ticket id from its number
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// The ticket number
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Amount Value Object (smallest currency unit, no floating point)
// ============================================================================

/// An amount of money in the smallest currency unit
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates an amount from smallest currency units
    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Returns the amount in smallest currency units
    #[must_use]
    pub const fn units(&self) -> u128 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts, stopping at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self × percent / 100`, rounded down
    #[must_use]
    pub const fn percent(self, percent: u128) -> Option<Self> {
        match self.0.checked_mul(percent) {
            Some(scaled) => Some(Self(scaled / 100)),
            None => None,
        }
    }

    /// Sums amounts, returning `None` on overflow
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Purchase windows
// ============================================================================

/// Half-open `[start, end)` interval during which one registrant may buy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSlot {
    /// First instant inside the window
    pub start: DateTime<Utc>,
    /// First instant after the window
    pub end: DateTime<Utc>,
}

impl PurchaseSlot {
    /// Is `now` inside the window?
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }
}

/// A registrant's assigned window, in ballot order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// Who may buy
    pub buyer: AccountId,
    /// When
    pub slot: PurchaseSlot,
}

// ============================================================================
// Event state
// ============================================================================

/// Per-event configuration published by the organizer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTerms {
    /// Lifetime limit of tickets per buyer
    pub max_purchase_per_buyer: u32,
    /// Allowed resale markup over the original price, in percent
    pub resale_cap_percent: u16,
}

/// Everything the presale tracks for one event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventState {
    /// Lifetime limit of tickets per buyer
    pub max_purchase_per_buyer: u32,
    /// Allowed resale markup over the original price, in percent
    pub resale_cap_percent: u16,
    /// Set once, by the ballot
    pub ballot_started: bool,
    /// When the ballot ran
    pub ballot_started_at: Option<DateTime<Utc>>,
    /// Escrow accounts keyed by buyer
    pub registrants: HashMap<AccountId, Registrant>,
    /// Buyers with a positive deposit, in first-deposit order
    pub paid: Vec<AccountId>,
    /// Consumed escrow already paid out to the administrator
    pub proceeds_withdrawn: Amount,
}

impl EventState {
    /// Fresh state for an event the presale has not seen before
    #[must_use]
    pub fn new(terms: EventTerms) -> Self {
        Self {
            max_purchase_per_buyer: terms.max_purchase_per_buyer,
            resale_cap_percent: terms.resale_cap_percent,
            ..Self::default()
        }
    }

    /// Look up a registrant
    #[must_use]
    pub fn registrant(&self, buyer: &AccountId) -> Option<&Registrant> {
        self.registrants.get(buyer)
    }

    /// Sum of all deposits ever made
    #[must_use]
    pub fn total_deposited(&self) -> Amount {
        self.sum(|r| r.deposited)
    }

    /// Sum of all escrow consumed by purchases
    #[must_use]
    pub fn total_consumed(&self) -> Amount {
        self.sum(|r| r.consumed)
    }

    /// Sum of all refunds paid
    #[must_use]
    pub fn total_refunded(&self) -> Amount {
        self.sum(|r| r.refunded)
    }

    /// Consumed escrow not yet withdrawn
    #[must_use]
    pub fn withdrawable_proceeds(&self) -> Amount {
        self.total_consumed().saturating_sub(self.proceeds_withdrawn)
    }

    fn sum(&self, field: impl Fn(&Registrant) -> Amount) -> Amount {
        Amount::from_units(
            self.registrants
                .values()
                .map(|r| field(r).units())
                .fold(0_u128, u128::saturating_add),
        )
    }
}

// ============================================================================
// Marketplace
// ============================================================================

/// An active offer to sell a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Current owner offering the ticket
    pub seller: AccountId,
    /// Asking price
    pub price: Amount,
    /// When the listing was (re)written
    pub listed_at: DateTime<Utc>,
}

/// What a listing query returns: an absent listing has no seller and price zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingView {
    /// Seller, if the ticket is listed
    pub seller: Option<AccountId>,
    /// Asking price, zero when not listed
    pub price: Amount,
}

impl From<Option<&Listing>> for ListingView {
    fn from(listing: Option<&Listing>) -> Self {
        listing.map_or_else(Self::default, |l| Self {
            seller: Some(l.seller),
            price: l.price,
        })
    }
}

// ============================================================================
// Global state
// ============================================================================

/// Administrator settings that apply to every event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Length of each purchase window, in seconds
    pub slot_duration_secs: u64,
    /// Gap between consecutive windows, in seconds
    pub buffer_secs: u64,
    /// Loyalty points credited per ticket bought in the presale
    pub points_per_ticket: u64,
    /// Share of every resale kept by the marketplace, in percent
    pub marketplace_fee_percent: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slot_duration_secs: 3600,
            buffer_secs: 1800,
            points_per_ticket: 1,
            marketplace_fee_percent: 0,
        }
    }
}

/// Keyed store of everything the presale and marketplace own
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketingState {
    /// The only account allowed to run administrative commands
    pub administrator: AccountId,
    /// Global settings
    pub settings: Settings,
    /// Per-event presale state
    pub events: HashMap<EventId, EventState>,
    /// Unit price paid at presale time, write-once
    pub price_history: HashMap<(EventId, TicketId), Amount>,
    /// Active listings
    pub listings: HashMap<(EventId, TicketId), Listing>,
    /// Marketplace fees collected and not yet withdrawn
    pub accrued_fees: Amount,
}

impl TicketingState {
    /// Empty state administered by `administrator`
    #[must_use]
    pub fn new(administrator: AccountId, settings: Settings) -> Self {
        Self {
            administrator,
            settings,
            events: HashMap::new(),
            price_history: HashMap::new(),
            listings: HashMap::new(),
            accrued_fees: Amount::ZERO,
        }
    }

    /// Look up an event's state
    #[must_use]
    pub fn event(&self, event: &EventId) -> Option<&EventState> {
        self.events.get(event)
    }

    /// Look up a registrant of an event
    #[must_use]
    pub fn registrant(&self, event: &EventId, buyer: &AccountId) -> Option<&Registrant> {
        self.event(event).and_then(|e| e.registrant(buyer))
    }
}
