//! Error types for the presale and marketplace.
//!
//! Every rejection carries a human-readable message, a stable machine code
//! (`code()`) and a category (`kind()`). A rejected command never changes
//! state or moves funds.

use crate::types::{AccountId, Amount, EventId, TicketId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a rejection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or out-of-bound input
    Validation,
    /// Not allowed in the current lifecycle state
    State,
    /// Caller lacks the required role
    Authorization,
    /// Referenced item does not exist or is not active
    NotFound,
    /// Item is held by someone else
    Conflict,
}

impl ErrorKind {
    /// Lowercase label, used for metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by the ticket registry
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum InventoryError {
    /// No such ticket in the event's inventory
    #[error("Ticket {ticket} does not exist for event {event}")]
    TicketNotFound {
        /// Event
        event: EventId,
        /// Ticket
        ticket: TicketId,
    },
    /// The ticket is already sold or used
    #[error("Ticket {ticket} of event {event} is not available")]
    TicketUnavailable {
        /// Event
        event: EventId,
        /// Ticket
        ticket: TicketId,
    },
    /// A transfer named the wrong current holder
    #[error("Ticket {ticket} of event {event} is not held by the sender")]
    NotHolder {
        /// Event
        event: EventId,
        /// Ticket
        ticket: TicketId,
    },
}

impl InventoryError {
    /// Category of this failure
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TicketNotFound { .. } => ErrorKind::NotFound,
            Self::TicketUnavailable { .. } | Self::NotHolder { .. } => ErrorKind::Conflict,
        }
    }
}

/// Failures reported by the treasury
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum PayoutError {
    /// The payment rail refused the transfer
    #[error("Payout of {amount} to {recipient} was declined")]
    Declined {
        /// Intended recipient
        recipient: AccountId,
        /// Amount
        amount: Amount,
    },
}

/// Why a presale or marketplace command was rejected
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TicketingError {
    // Validation
    /// Deposits must be positive
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    /// A purchase must name at least one ticket
    #[error("No tickets requested")]
    EmptyPurchase,
    /// A purchase named the same ticket twice
    #[error("Ticket {ticket} requested more than once")]
    DuplicateTicket {
        /// The repeated ticket
        ticket: TicketId,
    },
    /// More tickets than the buyer has left
    #[error("Cannot purchase more than the allowed limit for this event. Requested {requested}, remaining {remaining}")]
    QuantityExceedsLimit {
        /// Tickets in this request
        requested: usize,
        /// Tickets the buyer may still buy
        remaining: usize,
    },
    /// Escrow does not cover the tickets
    #[error("Insufficient payment: tickets cost {required}, escrow holds {available}")]
    InsufficientPayment {
        /// Total price of the request
        required: Amount,
        /// Unspent escrow
        available: Amount,
    },
    /// Windows would be empty
    #[error("Purchase slot duration must be greater than zero")]
    ZeroSlotDuration,
    /// A percentage above its maximum
    #[error("Percentage {value} exceeds the maximum of {max}")]
    PercentageOutOfRange {
        /// Requested value
        value: u16,
        /// Allowed maximum
        max: u16,
    },
    /// Listings must have a positive price
    #[error("Listing price must be greater than zero")]
    ZeroPrice,
    /// The ticket was never sold in the presale
    #[error("Ticket {ticket} has no recorded purchase price")]
    NoPriceHistory {
        /// Ticket
        ticket: TicketId,
    },
    /// Listing above the resale cap
    #[error("Listing price exceeds the allowed profit cap: {price} > {cap}")]
    ExceedsProfitCap {
        /// Asked price
        price: Amount,
        /// Highest allowed price
        cap: Amount,
    },
    /// Resale payment must match the listing exactly
    #[error("Payment of {paid} does not match the listing price of {expected}")]
    PaymentMismatch {
        /// Listing price
        expected: Amount,
        /// Amount offered
        paid: Amount,
    },
    /// An amount or timestamp left its representable range
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    // State
    /// The ballot already ran
    #[error("Ballot already started for event {event}")]
    BallotAlreadyStarted {
        /// Event
        event: EventId,
    },
    /// Refunds wait for the ballot
    #[error("Ballot has not started for event {event}")]
    BallotNotStarted {
        /// Event
        event: EventId,
    },
    /// Outside the buyer's purchase window
    #[error("Purchase window not active for {buyer} at event {event}")]
    WindowNotActive {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
    },
    /// Split-form registration, twice
    #[error("{buyer} is already registered for event {event}")]
    AlreadyRegistered {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
    },

    // Authorization
    /// Administrative command from someone else
    #[error("{caller} is not the administrator")]
    NotAdministrator {
        /// Caller
        caller: AccountId,
    },
    /// Listing a ticket the caller does not hold
    #[error("{caller} does not own ticket {ticket}")]
    NotTicketOwner {
        /// Caller
        caller: AccountId,
        /// Ticket
        ticket: TicketId,
    },
    /// The marketplace may not move the owner's tickets
    #[error("{owner} has not approved the marketplace")]
    MarketplaceNotApproved {
        /// Owner
        owner: AccountId,
    },
    /// Delisting someone else's listing
    #[error("{caller} is not the seller of ticket {ticket}")]
    NotSeller {
        /// Caller
        caller: AccountId,
        /// Ticket
        ticket: TicketId,
    },

    // NotFound
    /// The organizer does not know the event
    #[error("Event {event} not found")]
    EventNotFound {
        /// Event
        event: EventId,
    },
    /// No escrow account for this buyer
    #[error("{buyer} is not registered for event {event}")]
    NotRegistered {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
    },
    /// No active listing
    #[error("Listing not found for ticket {ticket} of event {event}")]
    ListingNotFound {
        /// Event
        event: EventId,
        /// Ticket
        ticket: TicketId,
    },

    // Collaborators
    /// Ticket registry failure
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    /// Treasury failure
    #[error(transparent)]
    Payout(#[from] PayoutError),
}

impl TicketingError {
    /// Category of this rejection
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount
            | Self::EmptyPurchase
            | Self::DuplicateTicket { .. }
            | Self::QuantityExceedsLimit { .. }
            | Self::InsufficientPayment { .. }
            | Self::ZeroSlotDuration
            | Self::PercentageOutOfRange { .. }
            | Self::ZeroPrice
            | Self::NoPriceHistory { .. }
            | Self::ExceedsProfitCap { .. }
            | Self::PaymentMismatch { .. }
            | Self::ArithmeticOverflow => ErrorKind::Validation,
            Self::BallotAlreadyStarted { .. }
            | Self::BallotNotStarted { .. }
            | Self::WindowNotActive { .. }
            | Self::AlreadyRegistered { .. } => ErrorKind::State,
            Self::NotAdministrator { .. }
            | Self::NotTicketOwner { .. }
            | Self::MarketplaceNotApproved { .. }
            | Self::NotSeller { .. } => ErrorKind::Authorization,
            Self::EventNotFound { .. } | Self::NotRegistered { .. } | Self::ListingNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Inventory(inner) => inner.kind(),
            Self::Payout(_) => ErrorKind::Conflict,
        }
    }

    /// Stable machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "amount_zero",
            Self::EmptyPurchase => "empty_purchase",
            Self::DuplicateTicket { .. } => "duplicate_ticket",
            Self::QuantityExceedsLimit { .. } => "quantity_exceeds_limit",
            Self::InsufficientPayment { .. } => "insufficient_payment",
            Self::ZeroSlotDuration => "zero_slot_duration",
            Self::PercentageOutOfRange { .. } => "percentage_out_of_range",
            Self::ZeroPrice => "zero_price",
            Self::NoPriceHistory { .. } => "no_price_history",
            Self::ExceedsProfitCap { .. } => "exceeds_profit_cap",
            Self::PaymentMismatch { .. } => "payment_mismatch",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::BallotAlreadyStarted { .. } => "ballot_already_started",
            Self::BallotNotStarted { .. } => "ballot_not_started",
            Self::WindowNotActive { .. } => "window_not_active",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::NotAdministrator { .. } => "not_administrator",
            Self::NotTicketOwner { .. } => "not_ticket_owner",
            Self::MarketplaceNotApproved { .. } => "marketplace_not_approved",
            Self::NotSeller { .. } => "not_seller",
            Self::EventNotFound { .. } => "event_not_found",
            Self::NotRegistered { .. } => "not_registered",
            Self::ListingNotFound { .. } => "listing_not_found",
            Self::Inventory(InventoryError::TicketNotFound { .. }) => "ticket_not_found",
            Self::Inventory(InventoryError::TicketUnavailable { .. }) => "ticket_unavailable",
            Self::Inventory(InventoryError::NotHolder { .. }) => "not_holder",
            Self::Payout(_) => "payout_declined",
        }
    }
}
