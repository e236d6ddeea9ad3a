//! Command side of the application.

use crate::aggregates::marketplace::MarketAction;
use crate::aggregates::presale::PresaleAction;
use crate::aggregates::{TicketingAction, TicketingReducer};
use crate::config::Config;
use crate::environment::TicketingEnvironment;
use crate::error::TicketingError;
use crate::types::{AccountId, Amount, EventId, Settings, SlotAssignment, TicketId, TicketingState};
use fairsale_runtime::metrics::StoreMetrics;
use fairsale_runtime::{JournalEntry, Receipt, Store};
use std::time::Duration;
use tokio::sync::broadcast;

/// The store type behind [`TicketingApp`]
pub type TicketingStore =
    Store<TicketingState, TicketingAction, TicketingEnvironment, TicketingReducer>;

/// Main ticketing application.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct TicketingApp {
    pub(super) store: TicketingStore,
}

impl TicketingApp {
    /// Creates an app administered by `administrator`
    #[must_use]
    pub fn new(administrator: AccountId, settings: Settings, environment: TicketingEnvironment) -> Self {
        let state = TicketingState::new(administrator, settings);
        Self {
            store: Store::new(state, TicketingReducer::new(), environment),
        }
    }

    /// Creates an app with the configured settings
    #[must_use]
    pub fn from_config(
        config: &Config,
        administrator: AccountId,
        environment: TicketingEnvironment,
    ) -> Self {
        Self::new(administrator, config.settings(), environment)
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &TicketingStore {
        &self.store
    }

    /// Send any action through the store
    ///
    /// # Errors
    ///
    /// Returns the rejection unchanged; state is untouched in that case.
    pub async fn dispatch(
        &self,
        action: impl Into<TicketingAction>,
    ) -> Result<Receipt<TicketingAction>, TicketingError> {
        let action = action.into();
        let name = action.name();

        match self.store.send(action).await {
            Ok(receipt) => {
                tracing::debug!(
                    action = name,
                    notifications = receipt.notifications.len(),
                    "Command accepted"
                );
                Ok(receipt)
            }
            Err(error) => {
                tracing::warn!(
                    action = name,
                    code = error.code(),
                    kind = %error.kind(),
                    %error,
                    "Command rejected"
                );
                StoreMetrics::record_rejection(error.kind().as_str());
                Err(error)
            }
        }
    }

    async fn presale(&self, action: PresaleAction) -> Result<Receipt<TicketingAction>, TicketingError> {
        self.dispatch(action).await
    }

    async fn market(&self, action: MarketAction) -> Result<Receipt<TicketingAction>, TicketingError> {
        self.dispatch(action).await
    }

    // ========== Buyers ==========

    /// Register for an event without depositing
    ///
    /// # Errors
    ///
    /// Unknown event, ballot already started, or already registered.
    pub async fn register_for_event(&self, event: EventId, buyer: AccountId) -> Result<(), TicketingError> {
        self.presale(PresaleAction::RegisterForEvent { event, buyer })
            .await
            .map(drop)
    }

    /// Escrow more funds for a registered buyer, returning the deposit total
    ///
    /// # Errors
    ///
    /// Not registered, zero amount, or ballot already started.
    pub async fn deposit_payment(
        &self,
        event: EventId,
        buyer: AccountId,
        amount: Amount,
    ) -> Result<Amount, TicketingError> {
        let receipt = self
            .presale(PresaleAction::DepositPayment { event, buyer, amount })
            .await?;
        Ok(deposit_total(&receipt))
    }

    /// Register if needed and escrow funds, returning the deposit total
    ///
    /// # Errors
    ///
    /// Unknown event, zero amount, or ballot already started.
    pub async fn register_and_deposit_for_event(
        &self,
        event: EventId,
        buyer: AccountId,
        amount: Amount,
    ) -> Result<Amount, TicketingError> {
        let receipt = self
            .presale(PresaleAction::RegisterAndDeposit { event, buyer, amount })
            .await?;
        Ok(deposit_total(&receipt))
    }

    /// Buy tickets inside the buyer's window, returning the total charged to escrow
    ///
    /// # Errors
    ///
    /// Window not active, limit or escrow exceeded, or a ticket that is
    /// missing or already sold. Nothing is bought in that case.
    pub async fn purchase_tickets(
        &self,
        event: EventId,
        buyer: AccountId,
        tickets: Vec<TicketId>,
    ) -> Result<Amount, TicketingError> {
        let receipt = self
            .presale(PresaleAction::PurchaseTickets { event, buyer, tickets })
            .await?;
        Ok(receipt
            .find_map(|n| match n.as_presale() {
                Some(PresaleAction::TicketsPurchased { total, .. }) => Some(*total),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    /// Return unspent escrow, returning the amount paid out (zero if none)
    ///
    /// # Errors
    ///
    /// Not registered, ballot not started, or the payout was declined.
    pub async fn refund_unused_payment(
        &self,
        event: EventId,
        buyer: AccountId,
    ) -> Result<Amount, TicketingError> {
        let receipt = self
            .presale(PresaleAction::RefundUnusedPayment { event, buyer })
            .await?;
        Ok(receipt
            .find_map(|n| match n.as_presale() {
                Some(PresaleAction::PaymentRefunded { amount, .. }) => Some(*amount),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    // ========== Marketplace ==========

    /// Offer an owned ticket for resale
    ///
    /// # Errors
    ///
    /// Not the owner, marketplace not approved, zero price, no presale
    /// price on record, or price above the resale cap.
    pub async fn list_ticket(
        &self,
        seller: AccountId,
        event: EventId,
        ticket: TicketId,
        price: Amount,
    ) -> Result<(), TicketingError> {
        self.market(MarketAction::ListTicket { seller, event, ticket, price })
            .await
            .map(drop)
    }

    /// Buy a listed ticket, returning the fee the marketplace kept
    ///
    /// # Errors
    ///
    /// No listing, payment different from the price, or a failed transfer
    /// or payout. The listing and ownership are unchanged in that case.
    pub async fn buy_ticket(
        &self,
        buyer: AccountId,
        event: EventId,
        ticket: TicketId,
        paid: Amount,
    ) -> Result<Amount, TicketingError> {
        let receipt = self
            .market(MarketAction::BuyTicket { buyer, event, ticket, paid })
            .await?;
        Ok(receipt
            .find_map(|n| match n.as_market() {
                Some(MarketAction::TicketBought { fee, .. }) => Some(*fee),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    /// Withdraw a listing
    ///
    /// # Errors
    ///
    /// No listing, or `seller` did not create it.
    pub async fn delist_ticket(
        &self,
        seller: AccountId,
        event: EventId,
        ticket: TicketId,
    ) -> Result<(), TicketingError> {
        self.market(MarketAction::DelistTicket { seller, event, ticket })
            .await
            .map(drop)
    }

    // ========== Administration ==========

    /// Freeze the paid registrants and assign windows, returning the schedule
    ///
    /// # Errors
    ///
    /// Not the administrator, unknown event, or ballot already started.
    pub async fn start_ballot(
        &self,
        caller: AccountId,
        event: EventId,
    ) -> Result<Vec<SlotAssignment>, TicketingError> {
        let receipt = self.presale(PresaleAction::StartBallot { caller, event }).await?;
        Ok(receipt
            .find_map(|n| match n.as_presale() {
                Some(PresaleAction::BallotStarted { schedule, .. }) => Some(schedule.clone()),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Set the window length used by later ballots
    ///
    /// # Errors
    ///
    /// Not the administrator, or zero seconds.
    pub async fn set_purchase_slot_duration(&self, caller: AccountId, seconds: u64) -> Result<(), TicketingError> {
        self.presale(PresaleAction::SetPurchaseSlotDuration { caller, seconds })
            .await
            .map(drop)
    }

    /// Set the gap between windows used by later ballots
    ///
    /// # Errors
    ///
    /// Not the administrator.
    pub async fn set_buffer_between_slots(&self, caller: AccountId, seconds: u64) -> Result<(), TicketingError> {
        self.presale(PresaleAction::SetBufferBetweenSlots { caller, seconds })
            .await
            .map(drop)
    }

    /// Set loyalty points credited per presale ticket
    ///
    /// # Errors
    ///
    /// Not the administrator.
    pub async fn set_points_per_ticket(&self, caller: AccountId, points: u64) -> Result<(), TicketingError> {
        self.presale(PresaleAction::SetPointsPerTicket { caller, points })
            .await
            .map(drop)
    }

    /// Set an event's per-buyer limit
    ///
    /// # Errors
    ///
    /// Not the administrator, or unknown event.
    pub async fn set_max_purchase_quantity(
        &self,
        caller: AccountId,
        event: EventId,
        quantity: u32,
    ) -> Result<(), TicketingError> {
        self.presale(PresaleAction::SetMaxPurchaseQuantity { caller, event, quantity })
            .await
            .map(drop)
    }

    /// Set an event's resale cap
    ///
    /// # Errors
    ///
    /// Not the administrator, or unknown event.
    pub async fn set_resale_profit_cap_percentage(
        &self,
        caller: AccountId,
        event: EventId,
        percent: u16,
    ) -> Result<(), TicketingError> {
        self.presale(PresaleAction::SetResaleProfitCapPercentage { caller, event, percent })
            .await
            .map(drop)
    }

    /// Set the marketplace fee for later sales
    ///
    /// # Errors
    ///
    /// Not the administrator, or above 100%.
    pub async fn set_marketplace_fee_percentage(&self, caller: AccountId, percent: u8) -> Result<(), TicketingError> {
        self.market(MarketAction::SetMarketplaceFeePercentage { caller, percent })
            .await
            .map(drop)
    }

    /// Pay consumed escrow out to the administrator, returning the amount
    ///
    /// # Errors
    ///
    /// Not the administrator, unknown event, or the payout was declined.
    pub async fn withdraw_proceeds(&self, caller: AccountId, event: EventId) -> Result<Amount, TicketingError> {
        let receipt = self.presale(PresaleAction::WithdrawProceeds { caller, event }).await?;
        Ok(receipt
            .find_map(|n| match n.as_presale() {
                Some(PresaleAction::ProceedsWithdrawn { amount, .. }) => Some(*amount),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    /// Pay accrued marketplace fees out to the administrator, returning the amount
    ///
    /// # Errors
    ///
    /// Not the administrator, or the payout was declined.
    pub async fn withdraw_fees(&self, caller: AccountId) -> Result<Amount, TicketingError> {
        let receipt = self.market(MarketAction::WithdrawFees { caller }).await?;
        Ok(receipt
            .find_map(|n| match n.as_market() {
                Some(MarketAction::FeesWithdrawn { amount, .. }) => Some(*amount),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    // ========== Notifications ==========

    /// Notifications emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TicketingAction> {
        self.store.subscribe()
    }

    /// Every notification emitted so far
    pub async fn journal(&self) -> Vec<JournalEntry<TicketingAction>> {
        self.store.journal().await
    }

    /// Wait for background work (loyalty point credits) to finish
    ///
    /// Returns `false` if some is still running after `timeout`.
    pub async fn settle(&self, timeout: Duration) -> bool {
        self.store.settle(timeout).await
    }
}

fn deposit_total(receipt: &Receipt<TicketingAction>) -> Amount {
    receipt
        .find_map(|n| match n.as_presale() {
            Some(PresaleAction::PaymentDeposited { total, .. }) => Some(*total),
            _ => None,
        })
        .unwrap_or(Amount::ZERO)
}
