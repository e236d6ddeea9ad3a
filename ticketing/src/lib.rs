//! Fair Presale - ballot-based ticket presale with a resale-capped marketplace
//!
//! Buyers register for an event and escrow funds. When the administrator
//! starts the ballot, every paid registrant gets an exclusive purchase window,
//! in the order they first deposited. Tickets bought inside a window are paid
//! from escrow at their listed price, which becomes the ticket's original
//! purchase price. Unspent escrow can be refunded once the ballot has run.
//!
//! Resales go through the marketplace, which refuses any listing above
//! `original × (100 + cap) / 100` and keeps a fee from each sale.
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────────────────┐
//!   commands ──────►│  TicketingApp (facade)   │
//!                   └────────────┬─────────────┘
//!                                │ send
//!                   ┌────────────▼─────────────┐        ┌───────────────┐
//!                   │  Store (one Mutex)       │───────►│ journal +     │
//!                   │   TicketingReducer       │ notify │ broadcast     │
//!                   │   ├─ PresaleReducer      │        └───────────────┘
//!                   │   └─ MarketplaceReducer  │
//!                   └────────────┬─────────────┘
//!                                │ TicketingEnvironment
//!        ┌──────────────┬────────┴─────┬──────────────┬──────────┐
//!        ▼              ▼              ▼              ▼          ▼
//!   TicketRegistry  EventCatalog   PointsSink     Treasury     Clock
//! ```
//!
//! Every command is validated completely before anything changes. A rejected
//! command leaves state, inventory and funds as they were.
//!
//! # Usage
//!
//! See [`app::TicketingApp`] for the typed API and the [aggregates] module
//! for the reducers and their tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod app;
pub mod config;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod mocks;
pub mod schedule;
pub mod types;

pub use aggregates::marketplace::{MarketAction, MarketplaceReducer};
pub use aggregates::presale::{PresaleAction, PresaleReducer};
pub use aggregates::{TicketingAction, TicketingReducer};
pub use app::TicketingApp;
pub use config::{Config, ConfigError};
pub use environment::{
    EventCatalog, Holder, PointsError, PointsSink, TicketInfo, TicketRegistry, TicketingEnvironment,
    Treasury,
};
pub use error::{ErrorKind, InventoryError, PayoutError, TicketingError};
pub use types::*;
