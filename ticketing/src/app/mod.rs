//! Application layer: a typed facade over the ticketing store.
//!
//! [`TicketingApp`] owns one [`fairsale_runtime::Store`] running the
//! [`crate::aggregates::TicketingReducer`]. Commands are serialized by the
//! store, so concurrent callers observe a total order.

mod coordinator;
mod queries;

pub use coordinator::{TicketingApp, TicketingStore};
