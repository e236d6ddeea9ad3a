//! Read-only queries.
//!
//! Each query takes the store lock briefly and copies out what it needs.

use super::TicketingApp;
use crate::types::{
    AccountId, Amount, EventId, ListingView, PurchaseSlot, TicketId, TicketingState,
};

impl TicketingApp {
    async fn read<T>(&self, f: impl FnOnce(&TicketingState) -> T) -> T {
        self.store.state(f).await
    }

    /// The administrator account
    pub async fn administrator(&self) -> AccountId {
        self.read(|s| s.administrator).await
    }

    // ========== Registrants ==========

    /// Has `buyer` registered for `event`?
    pub async fn is_registered(&self, event: &EventId, buyer: &AccountId) -> bool {
        self.read(|s| s.registrant(event, buyer).is_some_and(|r| r.is_registered))
            .await
    }

    /// Deposited minus refunded
    pub async fn payments(&self, event: &EventId, buyer: &AccountId) -> Amount {
        self.read(|s| s.registrant(event, buyer).map_or(Amount::ZERO, |r| r.payments()))
            .await
    }

    /// Escrow still available for purchases or a refund
    pub async fn refundable_balance(&self, event: &EventId, buyer: &AccountId) -> Amount {
        self.read(|s| s.registrant(event, buyer).map_or(Amount::ZERO, |r| r.refundable()))
            .await
    }

    /// Buyers with a positive deposit, in first-deposit order
    pub async fn paid_registrants(&self, event: &EventId) -> Vec<AccountId> {
        self.read(|s| s.event(event).map(|e| e.paid.clone()).unwrap_or_default())
            .await
    }

    /// The buyer's window; `None` until the ballot has assigned one
    pub async fn purchase_slot(&self, event: &EventId, buyer: &AccountId) -> Option<PurchaseSlot> {
        self.read(|s| s.registrant(event, buyer).and_then(|r| r.slot))
            .await
    }

    /// Has `buyer` bought anything in the presale?
    pub async fn has_purchased(&self, event: &EventId, buyer: &AccountId) -> bool {
        self.read(|s| s.registrant(event, buyer).is_some_and(|r| r.has_purchased))
            .await
    }

    // ========== Events ==========

    /// Has the ballot run for `event`?
    pub async fn is_ballot_started(&self, event: &EventId) -> bool {
        self.read(|s| s.event(event).is_some_and(|e| e.ballot_started))
            .await
    }

    /// Price paid for `ticket` in the presale
    pub async fn original_purchase_price(&self, event: &EventId, ticket: TicketId) -> Option<Amount> {
        self.read(|s| s.price_history.get(&(*event, ticket)).copied())
            .await
    }

    /// Per-buyer limit; events not referenced yet report their catalog terms
    pub async fn max_purchase_quantity(&self, event: &EventId) -> Option<u32> {
        match self.read(|s| s.event(event).map(|e| e.max_purchase_per_buyer)).await {
            Some(quantity) => Some(quantity),
            None => self
                .store
                .environment()
                .catalog
                .terms(event)
                .map(|t| t.max_purchase_per_buyer),
        }
    }

    /// Resale cap; events not referenced yet report their catalog terms
    pub async fn resale_profit_cap_percentage(&self, event: &EventId) -> Option<u16> {
        match self.read(|s| s.event(event).map(|e| e.resale_cap_percent)).await {
            Some(percent) => Some(percent),
            None => self
                .store
                .environment()
                .catalog
                .terms(event)
                .map(|t| t.resale_cap_percent),
        }
    }

    /// Unsold, unused tickets of a category, in id order, straight from inventory
    #[must_use]
    pub fn available_tickets_by_category(&self, event: &EventId, category: &str) -> Vec<TicketId> {
        self.store
            .environment()
            .registry
            .available_by_category(event, category)
    }

    // ========== Settings ==========

    /// Window length for later ballots, in seconds
    pub async fn purchase_slot_duration(&self) -> u64 {
        self.read(|s| s.settings.slot_duration_secs).await
    }

    /// Gap between windows for later ballots, in seconds
    pub async fn buffer_between_slots(&self) -> u64 {
        self.read(|s| s.settings.buffer_secs).await
    }

    /// Loyalty points per presale ticket
    pub async fn points_per_ticket(&self) -> u64 {
        self.read(|s| s.settings.points_per_ticket).await
    }

    // ========== Marketplace ==========

    /// Seller and price of a listing; no seller and zero price when unlisted
    pub async fn listing(&self, event: &EventId, ticket: TicketId) -> ListingView {
        self.read(|s| ListingView::from(s.listings.get(&(*event, ticket))))
            .await
    }

    /// Fee taken from each resale, in percent
    pub async fn marketplace_fee_percentage(&self) -> u8 {
        self.read(|s| s.settings.marketplace_fee_percent).await
    }

    /// Fees collected and not yet withdrawn
    pub async fn accrued_fees(&self) -> Amount {
        self.read(|s| s.accrued_fees).await
    }
}
