//! Presale aggregate: registration, escrow, ballot, purchase gate and refunds.
//!
//! Every command is validated in full before anything changes. Collaborator
//! calls that move tickets or money run only after validation; if one fails
//! part-way, the tickets already moved are returned and the command is
//! rejected with state untouched.
//!
//! **Purchase check order**: window, request shape, quantity, existence,
//! funds, availability. Each failure has its own error.

use super::{cache_event, into_fresh, load_event, validate_administrator};
use crate::environment::{Holder, TicketingEnvironment};
use crate::error::{InventoryError, TicketingError};
use crate::ledger::{PurchasedTicket, Registrant};
use crate::schedule::allocate_slots;
use crate::types::{
    AccountId, Amount, EventId, EventState, SlotAssignment, TicketId, TicketingState,
};
use chrono::{DateTime, Utc};
use fairsale_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use fairsale_macros::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Notifications)
// ============================================================================

/// Actions for the presale
#[derive(Action, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresaleAction {
    // Commands
    /// Register without depositing
    #[command]
    RegisterForEvent {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
    },

    /// Add to an existing registration's escrow
    #[command]
    DepositPayment {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// Amount to escrow
        amount: Amount,
    },

    /// Register if needed and escrow funds in one step
    #[command]
    RegisterAndDeposit {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// Amount to escrow
        amount: Amount,
    },

    /// Freeze the paid registrants and assign purchase windows
    #[command]
    #[admin]
    StartBallot {
        /// Must be the administrator
        caller: AccountId,
        /// Event
        event: EventId,
    },

    /// Buy tickets inside the buyer's window
    #[command]
    PurchaseTickets {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// Distinct tickets, bought as one batch
        tickets: Vec<TicketId>,
    },

    /// Return escrow not spent on tickets
    #[command]
    RefundUnusedPayment {
        /// Event
        event: EventId,
        /// Registrant asking for their own refund
        buyer: AccountId,
    },

    /// Change the length of future purchase windows
    #[command]
    #[admin]
    SetPurchaseSlotDuration {
        /// Must be the administrator
        caller: AccountId,
        /// Window length
        seconds: u64,
    },

    /// Change the gap between future purchase windows
    #[command]
    #[admin]
    SetBufferBetweenSlots {
        /// Must be the administrator
        caller: AccountId,
        /// Gap length
        seconds: u64,
    },

    /// Change loyalty points per ticket
    #[command]
    #[admin]
    SetPointsPerTicket {
        /// Must be the administrator
        caller: AccountId,
        /// Points per ticket
        points: u64,
    },

    /// Change an event's per-buyer limit
    #[command]
    #[admin]
    SetMaxPurchaseQuantity {
        /// Must be the administrator
        caller: AccountId,
        /// Event
        event: EventId,
        /// Lifetime limit per buyer
        quantity: u32,
    },

    /// Change an event's resale markup cap
    #[command]
    #[admin]
    SetResaleProfitCapPercentage {
        /// Must be the administrator
        caller: AccountId,
        /// Event
        event: EventId,
        /// Allowed markup in percent
        percent: u16,
    },

    /// Pay consumed escrow out to the administrator
    #[command]
    #[admin]
    WithdrawProceeds {
        /// Must be the administrator
        caller: AccountId,
        /// Event
        event: EventId,
    },

    // Notifications
    /// A buyer registered
    #[event]
    Registered {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
    },

    /// Escrow increased
    #[event]
    PaymentDeposited {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// This deposit
        amount: Amount,
        /// All deposits so far
        total: Amount,
    },

    /// Purchase windows assigned
    #[event]
    BallotStarted {
        /// Event
        event: EventId,
        /// Ballot instant
        started_at: DateTime<Utc>,
        /// Windows in first-deposit order
        schedule: Vec<SlotAssignment>,
    },

    /// Tickets sold in the presale
    #[event]
    TicketsPurchased {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// Tickets and the unit price paid for each
        tickets: Vec<PurchasedTicket>,
        /// Sum of prices
        total: Amount,
    },

    /// Loyalty points credited
    #[event]
    PointsAccrued {
        /// Account
        account: AccountId,
        /// Points
        points: u64,
    },

    /// Unspent escrow returned
    #[event]
    PaymentRefunded {
        /// Event
        event: EventId,
        /// Buyer
        buyer: AccountId,
        /// Refund
        amount: Amount,
    },

    /// New window length
    #[event]
    PurchaseSlotDurationSet {
        /// Window length
        seconds: u64,
    },

    /// New gap between windows
    #[event]
    BufferBetweenSlotsSet {
        /// Gap length
        seconds: u64,
    },

    /// New points per ticket
    #[event]
    PointsPerTicketSet {
        /// Points per ticket
        points: u64,
    },

    /// New per-buyer limit
    #[event]
    MaxPurchaseQuantitySet {
        /// Event
        event: EventId,
        /// Limit
        quantity: u32,
    },

    /// New resale cap
    #[event]
    ResaleProfitCapPercentageSet {
        /// Event
        event: EventId,
        /// Markup in percent
        percent: u16,
    },

    /// Consumed escrow paid out
    #[event]
    ProceedsWithdrawn {
        /// Event
        event: EventId,
        /// Administrator
        recipient: AccountId,
        /// Amount
        amount: Amount,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the presale
#[derive(Clone, Copy, Debug, Default)]
pub struct PresaleReducer;

type Effects = SmallVec<[Effect<PresaleAction>; 4]>;

impl PresaleReducer {
    /// Creates a new `PresaleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Validation ==========

    fn validate_open(event_state: &EventState, event: &EventId) -> Result<(), TicketingError> {
        if event_state.ballot_started {
            return Err(TicketingError::BallotAlreadyStarted { event: *event });
        }
        Ok(())
    }

    fn validate_register(
        event_state: &EventState,
        event: &EventId,
        buyer: &AccountId,
    ) -> Result<(), TicketingError> {
        Self::validate_open(event_state, event)?;
        if event_state
            .registrant(buyer)
            .is_some_and(|r| r.is_registered)
        {
            return Err(TicketingError::AlreadyRegistered {
                event: *event,
                buyer: *buyer,
            });
        }
        Ok(())
    }

    /// Returns the deposit total after this deposit
    fn validate_deposit(
        event_state: &EventState,
        event: &EventId,
        buyer: &AccountId,
        amount: Amount,
        must_be_registered: bool,
    ) -> Result<Amount, TicketingError> {
        Self::validate_open(event_state, event)?;

        let registrant = event_state.registrant(buyer);
        if must_be_registered && !registrant.is_some_and(|r| r.is_registered) {
            return Err(TicketingError::NotRegistered {
                event: *event,
                buyer: *buyer,
            });
        }

        if amount.is_zero() {
            return Err(TicketingError::ZeroAmount);
        }

        registrant
            .map_or(Ok(amount), |r| r.checked_deposit(amount))
    }

    fn validate_start_ballot(
        event_state: &EventState,
        settings_slot: u64,
        settings_buffer: u64,
        event: &EventId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotAssignment>, TicketingError> {
        Self::validate_open(event_state, event)?;
        allocate_slots(&event_state.paid, now, settings_slot, settings_buffer)
    }

    /// Returns the priced batch
    fn validate_purchase(
        event_state: &EventState,
        env: &TicketingEnvironment,
        event: &EventId,
        buyer: &AccountId,
        tickets: &[TicketId],
        now: DateTime<Utc>,
    ) -> Result<Vec<PurchasedTicket>, TicketingError> {
        // 1. Window
        let registrant = event_state
            .registrant(buyer)
            .filter(|r| event_state.ballot_started && r.slot.is_some_and(|s| s.contains(now)))
            .ok_or(TicketingError::WindowNotActive {
                event: *event,
                buyer: *buyer,
            })?;

        // 2. Shape
        if tickets.is_empty() {
            return Err(TicketingError::EmptyPurchase);
        }
        let mut seen = HashSet::with_capacity(tickets.len());
        if let Some(ticket) = tickets.iter().find(|t| !seen.insert(**t)) {
            return Err(TicketingError::DuplicateTicket { ticket: *ticket });
        }

        // 3. Quantity
        let limit = usize::try_from(event_state.max_purchase_per_buyer).unwrap_or(usize::MAX);
        let remaining = limit.saturating_sub(registrant.purchased_count());
        if tickets.len() > remaining {
            return Err(TicketingError::QuantityExceedsLimit {
                requested: tickets.len(),
                remaining,
            });
        }

        // 4. Existence and funds
        let infos = tickets
            .iter()
            .map(|ticket| env.registry.ticket(event, *ticket))
            .collect::<Result<Vec<_>, _>>()?;
        let required = Amount::checked_sum(infos.iter().map(|info| info.price))
            .ok_or(TicketingError::ArithmeticOverflow)?;
        let available = registrant.refundable();
        if required > available {
            return Err(TicketingError::InsufficientPayment {
                required,
                available,
            });
        }

        // 5. Availability
        if let Some(taken) = infos.iter().find(|info| !info.is_available()) {
            return Err(InventoryError::TicketUnavailable {
                event: *event,
                ticket: taken.id,
            }
            .into());
        }

        Ok(infos.into_iter().map(|info| (info.id, info.price)).collect())
    }

    fn validate_refund(
        event_state: &EventState,
        event: &EventId,
        buyer: &AccountId,
    ) -> Result<Amount, TicketingError> {
        let registrant = event_state
            .registrant(buyer)
            .filter(|r| r.is_registered)
            .ok_or(TicketingError::NotRegistered {
                event: *event,
                buyer: *buyer,
            })?;
        if !event_state.ballot_started {
            return Err(TicketingError::BallotNotStarted { event: *event });
        }
        Ok(registrant.refundable())
    }

    // ========== Collaborators ==========

    /// Move a batch from the issuer to `buyer`, all or nothing
    fn transfer_batch(
        env: &TicketingEnvironment,
        event: &EventId,
        buyer: &AccountId,
        tickets: &[PurchasedTicket],
    ) -> Result<(), TicketingError> {
        for (done, (ticket, _)) in tickets.iter().enumerate() {
            if let Err(error) =
                env.registry
                    .transfer(event, *ticket, Holder::Issuer, Holder::Account(*buyer))
            {
                for (moved, _) in &tickets[..done] {
                    if let Err(undo) = env.registry.transfer(
                        event,
                        *moved,
                        Holder::Account(*buyer),
                        Holder::Issuer,
                    ) {
                        tracing::error!(%event, ticket = %moved, error = %undo, "Ticket not returned after aborted purchase");
                    }
                }
                return Err(error.into());
            }
        }
        Ok(())
    }

    /// Credit loyalty points once the purchase is committed
    fn accrue_points(env: &TicketingEnvironment, account: AccountId, points: u64) -> Effect<PresaleAction> {
        let sink = Arc::clone(&env.points);
        Effect::Future(Box::pin(async move {
            match sink.credit(account, points).await {
                Ok(()) => Some(PresaleAction::PointsAccrued { account, points }),
                Err(error) => {
                    tracing::warn!(%account, points, %error, "Loyalty points not credited");
                    None
                }
            }
        }))
    }

    // ========== State changes ==========

    /// Applies a notification to state
    fn apply_event(state: &mut TicketingState, action: &PresaleAction) {
        match action {
            PresaleAction::Registered { event, buyer } => {
                state
                    .events
                    .entry(*event)
                    .or_default()
                    .registrants
                    .entry(*buyer)
                    .or_insert_with(Registrant::registered)
                    .is_registered = true;
            }

            PresaleAction::PaymentDeposited {
                event, buyer, total, ..
            } => {
                let event_state = state.events.entry(*event).or_default();
                let registrant = event_state
                    .registrants
                    .entry(*buyer)
                    .or_insert_with(Registrant::registered);
                let first_deposit = registrant.deposited.is_zero();
                registrant.deposited = *total;
                if first_deposit && !total.is_zero() {
                    event_state.paid.push(*buyer);
                }
            }

            PresaleAction::BallotStarted {
                event,
                started_at,
                schedule,
            } => {
                let event_state = state.events.entry(*event).or_default();
                event_state.ballot_started = true;
                event_state.ballot_started_at = Some(*started_at);
                for assignment in schedule {
                    if let Some(registrant) = event_state.registrants.get_mut(&assignment.buyer) {
                        registrant.slot = Some(assignment.slot);
                    }
                }
            }

            PresaleAction::TicketsPurchased {
                event,
                buyer,
                tickets,
                ..
            } => {
                for (ticket, price) in tickets {
                    state.price_history.entry((*event, *ticket)).or_insert(*price);
                }
                if let Some(registrant) = state
                    .events
                    .get_mut(event)
                    .and_then(|e| e.registrants.get_mut(buyer))
                {
                    registrant.record_purchase(tickets);
                }
            }

            PresaleAction::PaymentRefunded {
                event,
                buyer,
                amount,
            } => {
                if let Some(registrant) = state
                    .events
                    .get_mut(event)
                    .and_then(|e| e.registrants.get_mut(buyer))
                {
                    registrant.record_refund(*amount);
                }
            }

            PresaleAction::PurchaseSlotDurationSet { seconds } => {
                state.settings.slot_duration_secs = *seconds;
            }
            PresaleAction::BufferBetweenSlotsSet { seconds } => {
                state.settings.buffer_secs = *seconds;
            }
            PresaleAction::PointsPerTicketSet { points } => {
                state.settings.points_per_ticket = *points;
            }
            PresaleAction::MaxPurchaseQuantitySet { event, quantity } => {
                state.events.entry(*event).or_default().max_purchase_per_buyer = *quantity;
            }
            PresaleAction::ResaleProfitCapPercentageSet { event, percent } => {
                state.events.entry(*event).or_default().resale_cap_percent = *percent;
            }

            PresaleAction::ProceedsWithdrawn { event, amount, .. } => {
                let event_state = state.events.entry(*event).or_default();
                event_state.proceeds_withdrawn = Amount::from_units(
                    event_state
                        .proceeds_withdrawn
                        .units()
                        .saturating_add(amount.units()),
                );
            }

            // Commands and PointsAccrued change nothing here
            _ => {}
        }
    }

    /// Apply a notification and emit it
    fn commit(state: &mut TicketingState, notification: PresaleAction) -> Effect<PresaleAction> {
        Self::apply_event(state, &notification);
        Effect::Emit(notification)
    }
}

impl Reducer for PresaleReducer {
    type State = TicketingState;
    type Action = PresaleAction;
    type Environment = TicketingEnvironment;
    type Error = TicketingError;

    #[allow(clippy::too_many_lines)] // One arm per command, each short
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects, TicketingError> {
        match action {
            // ========== Registration & escrow ==========
            PresaleAction::RegisterForEvent { event, buyer } => {
                let loaded = load_event(state, env, &event)?;
                Self::validate_register(&loaded, &event, &buyer)?;
                let fresh = into_fresh(loaded);
                cache_event(state, event, fresh);

                tracing::debug!(%event, %buyer, "Registered");
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::Registered { event, buyer }
                )])
            }

            PresaleAction::DepositPayment {
                event,
                buyer,
                amount,
            } => {
                let loaded = load_event(state, env, &event)?;
                let total = Self::validate_deposit(&loaded, &event, &buyer, amount, true)?;
                let fresh = into_fresh(loaded);
                cache_event(state, event, fresh);

                tracing::debug!(%event, %buyer, %amount, %total, "Payment deposited");
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::PaymentDeposited {
                        event,
                        buyer,
                        amount,
                        total,
                    }
                )])
            }

            PresaleAction::RegisterAndDeposit {
                event,
                buyer,
                amount,
            } => {
                let loaded = load_event(state, env, &event)?;
                let total = Self::validate_deposit(&loaded, &event, &buyer, amount, false)?;
                let newly_registered = !loaded.registrant(&buyer).is_some_and(|r| r.is_registered);
                let fresh = into_fresh(loaded);
                cache_event(state, event, fresh);

                tracing::debug!(%event, %buyer, %amount, %total, "Registered and deposited");
                let mut effects = Effects::new();
                if newly_registered {
                    effects.push(Self::commit(state, PresaleAction::Registered { event, buyer }));
                }
                effects.push(Self::commit(
                    state,
                    PresaleAction::PaymentDeposited {
                        event,
                        buyer,
                        amount,
                        total,
                    },
                ));
                Ok(effects)
            }

            // ========== Ballot ==========
            PresaleAction::StartBallot { caller, event } => {
                validate_administrator(state, &caller)?;
                let loaded = load_event(state, env, &event)?;
                let started_at = env.clock.now();
                let schedule = Self::validate_start_ballot(
                    &loaded,
                    state.settings.slot_duration_secs,
                    state.settings.buffer_secs,
                    &event,
                    started_at,
                )?;
                let fresh = into_fresh(loaded);
                cache_event(state, event, fresh);

                tracing::info!(%event, registrants = schedule.len(), "Ballot started");
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::BallotStarted {
                        event,
                        started_at,
                        schedule,
                    }
                )])
            }

            // ========== Purchase gate ==========
            PresaleAction::PurchaseTickets {
                event,
                buyer,
                tickets,
            } => {
                let loaded = load_event(state, env, &event)?;
                let priced = Self::validate_purchase(
                    &loaded,
                    env,
                    &event,
                    &buyer,
                    &tickets,
                    env.clock.now(),
                )?;
                let total = Amount::checked_sum(priced.iter().map(|(_, price)| *price))
                    .ok_or(TicketingError::ArithmeticOverflow)?;
                let fresh = into_fresh(loaded);

                Self::transfer_batch(env, &event, &buyer, &priced)?;
                cache_event(state, event, fresh);

                let points = state
                    .settings
                    .points_per_ticket
                    .saturating_mul(u64::try_from(priced.len()).unwrap_or(u64::MAX));
                tracing::info!(%event, %buyer, tickets = priced.len(), %total, "Tickets purchased");

                let mut effects: Effects = smallvec![Self::commit(
                    state,
                    PresaleAction::TicketsPurchased {
                        event,
                        buyer,
                        tickets: priced,
                        total,
                    }
                )];
                if points > 0 {
                    effects.push(Self::accrue_points(env, buyer, points));
                }
                Ok(effects)
            }

            // ========== Refund ==========
            PresaleAction::RefundUnusedPayment { event, buyer } => {
                let loaded = load_event(state, env, &event)?;
                let amount = Self::validate_refund(&loaded, &event, &buyer)?;
                if amount.is_zero() {
                    tracing::debug!(%event, %buyer, "Nothing to refund");
                    return Ok(SmallVec::new());
                }

                env.treasury.pay_out(&buyer, amount)?;

                tracing::info!(%event, %buyer, %amount, "Payment refunded");
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::PaymentRefunded {
                        event,
                        buyer,
                        amount,
                    }
                )])
            }

            // ========== Administration ==========
            PresaleAction::SetPurchaseSlotDuration { caller, seconds } => {
                validate_administrator(state, &caller)?;
                if seconds == 0 {
                    return Err(TicketingError::ZeroSlotDuration);
                }
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::PurchaseSlotDurationSet { seconds }
                )])
            }

            PresaleAction::SetBufferBetweenSlots { caller, seconds } => {
                validate_administrator(state, &caller)?;
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::BufferBetweenSlotsSet { seconds }
                )])
            }

            PresaleAction::SetPointsPerTicket { caller, points } => {
                validate_administrator(state, &caller)?;
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::PointsPerTicketSet { points }
                )])
            }

            PresaleAction::SetMaxPurchaseQuantity {
                caller,
                event,
                quantity,
            } => {
                validate_administrator(state, &caller)?;
                let fresh = into_fresh(load_event(state, env, &event)?);
                cache_event(state, event, fresh);
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::MaxPurchaseQuantitySet { event, quantity }
                )])
            }

            PresaleAction::SetResaleProfitCapPercentage {
                caller,
                event,
                percent,
            } => {
                validate_administrator(state, &caller)?;
                let fresh = into_fresh(load_event(state, env, &event)?);
                cache_event(state, event, fresh);
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::ResaleProfitCapPercentageSet { event, percent }
                )])
            }

            PresaleAction::WithdrawProceeds { caller, event } => {
                validate_administrator(state, &caller)?;
                let amount = load_event(state, env, &event)?.withdrawable_proceeds();
                if amount.is_zero() {
                    return Ok(SmallVec::new());
                }

                env.treasury.pay_out(&caller, amount)?;

                tracing::info!(%event, %amount, "Proceeds withdrawn");
                Ok(smallvec![Self::commit(
                    state,
                    PresaleAction::ProceedsWithdrawn {
                        event,
                        recipient: caller,
                        amount,
                    }
                )])
            }

            // ========== Notifications ==========
            // Outputs only: sending one back in changes nothing
            PresaleAction::Registered { .. }
            | PresaleAction::PaymentDeposited { .. }
            | PresaleAction::BallotStarted { .. }
            | PresaleAction::TicketsPurchased { .. }
            | PresaleAction::PointsAccrued { .. }
            | PresaleAction::PaymentRefunded { .. }
            | PresaleAction::PurchaseSlotDurationSet { .. }
            | PresaleAction::BufferBetweenSlotsSet { .. }
            | PresaleAction::PointsPerTicketSet { .. }
            | PresaleAction::MaxPurchaseQuantitySet { .. }
            | PresaleAction::ResaleProfitCapPercentageSet { .. }
            | PresaleAction::ProceedsWithdrawn { .. } => Ok(SmallVec::new()),
        }
    }
}
