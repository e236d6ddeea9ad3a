//! Marketplace aggregate: resale listings capped against the presale price.
//!
//! A ticket may only be listed at or below
//! `original × (100 + cap) / 100` (rounded down), where `original` is the
//! price recorded by the presale and `cap` is the event's resale percentage.
//! Sales require the exact listing price; the marketplace keeps its fee and
//! pays the rest to the seller.

use super::validate_administrator;
use crate::environment::{Holder, TicketingEnvironment};
use crate::error::TicketingError;
use crate::types::{AccountId, Amount, EventId, Listing, TicketId, TicketingState};
use chrono::{DateTime, Utc};
use fairsale_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use fairsale_macros::Action;
use serde::{Deserialize, Serialize};

/// Highest marketplace fee, in percent
pub const MAX_FEE_PERCENT: u8 = 100;

// ============================================================================
// Actions (Commands + Notifications)
// ============================================================================

/// Actions for the marketplace
#[derive(Action, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketAction {
    // Commands
    /// Offer a ticket for resale (overwrites an existing listing)
    #[command]
    ListTicket {
        /// Current owner
        seller: AccountId,
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
        /// Asking price
        price: Amount,
    },

    /// Buy a listed ticket for exactly its price
    #[command]
    BuyTicket {
        /// Buyer
        buyer: AccountId,
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
        /// Amount sent with the purchase
        paid: Amount,
    },

    /// Withdraw a listing
    #[command]
    DelistTicket {
        /// Must be the listing's seller
        seller: AccountId,
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
    },

    /// Change the fee taken from future sales
    #[command]
    #[admin]
    SetMarketplaceFeePercentage {
        /// Must be the administrator
        caller: AccountId,
        /// Fee in percent
        percent: u8,
    },

    /// Pay accrued fees out to the administrator
    #[command]
    #[admin]
    WithdrawFees {
        /// Must be the administrator
        caller: AccountId,
    },

    // Notifications
    /// A listing was written
    #[event]
    TicketListed {
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
        /// Seller
        seller: AccountId,
        /// Asking price
        price: Amount,
        /// When
        listed_at: DateTime<Utc>,
    },

    /// A listed ticket changed hands
    #[event]
    TicketBought {
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
        /// New owner
        buyer: AccountId,
        /// Previous owner
        seller: AccountId,
        /// Sale price
        price: Amount,
        /// Kept by the marketplace
        fee: Amount,
    },

    /// A listing was withdrawn
    #[event]
    TicketDelisted {
        /// Event (inventory reference)
        event: EventId,
        /// Ticket
        ticket: TicketId,
        /// Seller
        seller: AccountId,
    },

    /// New marketplace fee
    #[event]
    MarketplaceFeePercentageSet {
        /// Fee in percent
        percent: u8,
    },

    /// Accrued fees paid out
    #[event]
    FeesWithdrawn {
        /// Administrator
        recipient: AccountId,
        /// Amount
        amount: Amount,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// A validated resale, ready to settle
#[derive(Debug)]
struct Sale {
    listing: Listing,
    fee: Amount,
    seller_proceeds: Amount,
}

/// Reducer for the marketplace
#[derive(Clone, Copy, Debug, Default)]
pub struct MarketplaceReducer;

type Effects = SmallVec<[Effect<MarketAction>; 4]>;

impl MarketplaceReducer {
    /// Creates a new `MarketplaceReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Highest price `ticket` may be listed at
    ///
    /// # Errors
    ///
    /// - [`TicketingError::NoPriceHistory`] if the presale never sold it
    /// - [`TicketingError::ArithmeticOverflow`] if the cap is not representable
    pub fn resale_cap(
        state: &TicketingState,
        event: &EventId,
        ticket: TicketId,
    ) -> Result<Amount, TicketingError> {
        let original = state
            .price_history
            .get(&(*event, ticket))
            .copied()
            .ok_or(TicketingError::NoPriceHistory { ticket })?;
        let cap_percent = state.event(event).map_or(0, |e| e.resale_cap_percent);
        original
            .percent(100 + u128::from(cap_percent))
            .ok_or(TicketingError::ArithmeticOverflow)
    }

    // ========== Validation ==========

    fn validate_list(
        state: &TicketingState,
        env: &TicketingEnvironment,
        seller: &AccountId,
        event: &EventId,
        ticket: TicketId,
        price: Amount,
    ) -> Result<(), TicketingError> {
        let info = env.registry.ticket(event, ticket)?;
        if info.holder != Holder::Account(*seller) {
            return Err(TicketingError::NotTicketOwner {
                caller: *seller,
                ticket,
            });
        }
        if !env.registry.is_marketplace_approved(event, seller) {
            return Err(TicketingError::MarketplaceNotApproved { owner: *seller });
        }

        if price.is_zero() {
            return Err(TicketingError::ZeroPrice);
        }
        let cap = Self::resale_cap(state, event, ticket)?;
        if price > cap {
            return Err(TicketingError::ExceedsProfitCap { price, cap });
        }
        Ok(())
    }

    fn validate_buy(
        state: &TicketingState,
        event: &EventId,
        ticket: TicketId,
        paid: Amount,
    ) -> Result<Sale, TicketingError> {
        let listing = *state
            .listings
            .get(&(*event, ticket))
            .ok_or(TicketingError::ListingNotFound {
                event: *event,
                ticket,
            })?;
        if paid != listing.price {
            return Err(TicketingError::PaymentMismatch {
                expected: listing.price,
                paid,
            });
        }

        let fee = listing
            .price
            .percent(u128::from(state.settings.marketplace_fee_percent))
            .ok_or(TicketingError::ArithmeticOverflow)?;
        state
            .accrued_fees
            .checked_add(fee)
            .ok_or(TicketingError::ArithmeticOverflow)?;

        Ok(Sale {
            listing,
            fee,
            seller_proceeds: listing.price.saturating_sub(fee),
        })
    }

    fn validate_delist(
        state: &TicketingState,
        caller: &AccountId,
        event: &EventId,
        ticket: TicketId,
    ) -> Result<(), TicketingError> {
        let listing = state
            .listings
            .get(&(*event, ticket))
            .ok_or(TicketingError::ListingNotFound {
                event: *event,
                ticket,
            })?;
        if listing.seller != *caller {
            return Err(TicketingError::NotSeller {
                caller: *caller,
                ticket,
            });
        }
        Ok(())
    }

    // ========== Collaborators ==========

    /// Ticket to the buyer, proceeds to the seller; undone if the payout fails.
    /// The seller's approval is checked again: it may have been revoked since listing.
    fn settle(
        env: &TicketingEnvironment,
        event: &EventId,
        ticket: TicketId,
        buyer: &AccountId,
        sale: &Sale,
    ) -> Result<(), TicketingError> {
        if !env.registry.is_marketplace_approved(event, &sale.listing.seller) {
            return Err(TicketingError::MarketplaceNotApproved {
                owner: sale.listing.seller,
            });
        }
        let seller = Holder::Account(sale.listing.seller);
        let buyer = Holder::Account(*buyer);
        env.registry.transfer(event, ticket, seller, buyer)?;

        if sale.seller_proceeds.is_zero() {
            return Ok(());
        }
        if let Err(error) = env
            .treasury
            .pay_out(&sale.listing.seller, sale.seller_proceeds)
        {
            if let Err(undo) = env.registry.transfer(event, ticket, buyer, seller) {
                tracing::error!(%event, %ticket, error = %undo, "Ticket not returned after failed payout");
            }
            return Err(error.into());
        }
        Ok(())
    }

    // ========== State changes ==========

    /// Applies a notification to state
    fn apply_event(state: &mut TicketingState, action: &MarketAction) {
        match action {
            MarketAction::TicketListed {
                event,
                ticket,
                seller,
                price,
                listed_at,
            } => {
                state.listings.insert(
                    (*event, *ticket),
                    Listing {
                        seller: *seller,
                        price: *price,
                        listed_at: *listed_at,
                    },
                );
            }

            MarketAction::TicketBought {
                event, ticket, fee, ..
            } => {
                state.listings.remove(&(*event, *ticket));
                state.accrued_fees = Amount::from_units(
                    state.accrued_fees.units().saturating_add(fee.units()),
                );
            }

            MarketAction::TicketDelisted { event, ticket, .. } => {
                state.listings.remove(&(*event, *ticket));
            }

            MarketAction::MarketplaceFeePercentageSet { percent } => {
                state.settings.marketplace_fee_percent = *percent;
            }

            MarketAction::FeesWithdrawn { amount, .. } => {
                state.accrued_fees = state.accrued_fees.saturating_sub(*amount);
            }

            // Commands change nothing here
            MarketAction::ListTicket { .. }
            | MarketAction::BuyTicket { .. }
            | MarketAction::DelistTicket { .. }
            | MarketAction::SetMarketplaceFeePercentage { .. }
            | MarketAction::WithdrawFees { .. } => {}
        }
    }

    fn commit(state: &mut TicketingState, notification: MarketAction) -> Effect<MarketAction> {
        Self::apply_event(state, &notification);
        Effect::Emit(notification)
    }
}

impl Reducer for MarketplaceReducer {
    type State = TicketingState;
    type Action = MarketAction;
    type Environment = TicketingEnvironment;
    type Error = TicketingError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects, TicketingError> {
        match action {
            MarketAction::ListTicket {
                seller,
                event,
                ticket,
                price,
            } => {
                Self::validate_list(state, env, &seller, &event, ticket, price)?;

                tracing::info!(%event, %ticket, %seller, %price, "Ticket listed");
                Ok(smallvec![Self::commit(
                    state,
                    MarketAction::TicketListed {
                        event,
                        ticket,
                        seller,
                        price,
                        listed_at: env.clock.now(),
                    }
                )])
            }

            MarketAction::BuyTicket {
                buyer,
                event,
                ticket,
                paid,
            } => {
                let sale = Self::validate_buy(state, &event, ticket, paid)?;
                Self::settle(env, &event, ticket, &buyer, &sale)?;

                tracing::info!(%event, %ticket, %buyer, seller = %sale.listing.seller, price = %sale.listing.price, "Ticket resold");
                Ok(smallvec![Self::commit(
                    state,
                    MarketAction::TicketBought {
                        event,
                        ticket,
                        buyer,
                        seller: sale.listing.seller,
                        price: sale.listing.price,
                        fee: sale.fee,
                    }
                )])
            }

            MarketAction::DelistTicket {
                seller,
                event,
                ticket,
            } => {
                Self::validate_delist(state, &seller, &event, ticket)?;

                tracing::debug!(%event, %ticket, %seller, "Ticket delisted");
                Ok(smallvec![Self::commit(
                    state,
                    MarketAction::TicketDelisted {
                        event,
                        ticket,
                        seller,
                    }
                )])
            }

            MarketAction::SetMarketplaceFeePercentage { caller, percent } => {
                validate_administrator(state, &caller)?;
                if percent > MAX_FEE_PERCENT {
                    return Err(TicketingError::PercentageOutOfRange {
                        value: u16::from(percent),
                        max: u16::from(MAX_FEE_PERCENT),
                    });
                }
                Ok(smallvec![Self::commit(
                    state,
                    MarketAction::MarketplaceFeePercentageSet { percent }
                )])
            }

            MarketAction::WithdrawFees { caller } => {
                validate_administrator(state, &caller)?;
                let amount = state.accrued_fees;
                if amount.is_zero() {
                    return Ok(SmallVec::new());
                }

                env.treasury.pay_out(&caller, amount)?;

                tracing::info!(%amount, "Marketplace fees withdrawn");
                Ok(smallvec![Self::commit(
                    state,
                    MarketAction::FeesWithdrawn {
                        recipient: caller,
                        amount,
                    }
                )])
            }

            // Notifications are outputs only
            MarketAction::TicketListed { .. }
            | MarketAction::TicketBought { .. }
            | MarketAction::TicketDelisted { .. }
            | MarketAction::MarketplaceFeePercentageSet { .. }
            | MarketAction::FeesWithdrawn { .. } => Ok(SmallVec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::fixture::World;
    use crate::aggregates::presale::{PresaleAction, PresaleReducer};
    use crate::environment::TicketRegistry;
    use crate::error::ErrorKind;
    use fairsale_testing::mocks::epoch;
    use fairsale_testing::{assertions, ReducerTest};

    fn units(n: u128) -> Amount {
        Amount::from_units(n)
    }

    /// `owner` bought ticket 0 at 100 in the presale and approved the marketplace
    fn owned_ticket() -> (World, TicketingState, AccountId, TicketId) {
        let world = World::new();
        let mut state = world.state();
        let owner = AccountId::new();
        let tickets = world.registry.mint(world.event, "floor", units(100), 2);
        let presale = PresaleReducer::new();
        for action in [
            PresaleAction::RegisterAndDeposit {
                event: world.event,
                buyer: owner,
                amount: units(100),
            },
            PresaleAction::StartBallot {
                caller: world.admin,
                event: world.event,
            },
            PresaleAction::PurchaseTickets {
                event: world.event,
                buyer: owner,
                tickets: vec![tickets[0]],
            },
        ] {
            world.apply(&presale, &mut state, action);
        }
        world.registry.approve_marketplace(world.event, owner, true);
        (world, state, owner, tickets[0])
    }

    fn list(world: &World, state: &mut TicketingState, seller: AccountId, ticket: TicketId, price: u128) {
        world.apply(
            &MarketplaceReducer::new(),
            state,
            MarketAction::ListTicket {
                seller,
                event: world.event,
                ticket,
                price: units(price),
            },
        );
    }

    // ========== Listing ==========

    #[test]
    fn test_list_at_cap() {
        let (world, state, seller, ticket) = owned_ticket();
        let event = world.event;

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::ListTicket {
                seller,
                event,
                ticket,
                price: units(110),
            })
            .then_state(move |state| {
                assert_eq!(
                    state.listings.get(&(event, ticket)),
                    Some(&Listing {
                        seller,
                        price: units(110),
                        listed_at: epoch(),
                    })
                );
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_list_above_cap_rejected() {
        let (world, state, seller, ticket) = owned_ticket();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::ListTicket {
                seller,
                event: world.event,
                ticket,
                price: units(111),
            })
            .then_error(|error| {
                assert_eq!(
                    *error,
                    TicketingError::ExceedsProfitCap {
                        price: units(111),
                        cap: units(110),
                    }
                );
                assert_eq!(error.kind(), ErrorKind::Validation);
            })
            .run();
    }

    #[test]
    fn test_cap_uses_current_percentage() {
        let (world, mut state, seller, ticket) = owned_ticket();
        world.apply(
            &PresaleReducer::new(),
            &mut state,
            PresaleAction::SetResaleProfitCapPercentage {
                caller: world.admin,
                event: world.event,
                percent: 50,
            },
        );

        assert_eq!(
            MarketplaceReducer::resale_cap(&state, &world.event, ticket),
            Ok(units(150))
        );
        list(&world, &mut state, seller, ticket, 150);
    }

    #[test]
    fn test_list_requires_ownership_and_approval() {
        let (world, state, seller, ticket) = owned_ticket();
        let stranger = AccountId::new();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state.clone())
            .when_action(MarketAction::ListTicket {
                seller: stranger,
                event: world.event,
                ticket,
                price: units(100),
            })
            .then_error(|error| assert_eq!(error.code(), "not_ticket_owner"))
            .run();

        world.registry.approve_marketplace(world.event, seller, false);
        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::ListTicket {
                seller,
                event: world.event,
                ticket,
                price: units(100),
            })
            .then_error(|error| {
                assert_eq!(error.code(), "marketplace_not_approved");
                assert_eq!(error.kind(), ErrorKind::Authorization);
            })
            .run();
    }

    #[test]
    fn test_list_zero_price_rejected() {
        let (world, state, seller, ticket) = owned_ticket();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::ListTicket {
                seller,
                event: world.event,
                ticket,
                price: Amount::ZERO,
            })
            .then_error(|error| assert_eq!(*error, TicketingError::ZeroPrice))
            .run();
    }

    #[test]
    fn test_list_without_presale_price_rejected() {
        let world = World::new();
        let owner = AccountId::new();
        let ticket = world.registry.mint(world.event, "floor", units(100), 1)[0];
        world
            .registry
            .transfer(&world.event, ticket, Holder::Issuer, Holder::Account(owner))
            .unwrap();
        world.registry.approve_marketplace(world.event, owner, true);

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(world.state())
            .when_action(MarketAction::ListTicket {
                seller: owner,
                event: world.event,
                ticket,
                price: units(100),
            })
            .then_error(move |error| {
                assert_eq!(*error, TicketingError::NoPriceHistory { ticket });
            })
            .run();
    }

    #[test]
    fn test_relist_overwrites() {
        let (world, mut state, seller, ticket) = owned_ticket();
        let event = world.event;
        list(&world, &mut state, seller, ticket, 105);

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::ListTicket {
                seller,
                event,
                ticket,
                price: units(90),
            })
            .then_state(move |state| {
                assert_eq!(state.listings.len(), 1);
                assert_eq!(state.listings[&(event, ticket)].price, units(90));
            })
            .run();
    }

    // ========== Buying ==========

    #[test]
    fn test_buy_pays_seller_minus_fee() {
        let (world, mut state, seller, ticket) = owned_ticket();
        let event = world.event;
        let buyer = AccountId::new();
        state.settings.marketplace_fee_percent = 5;
        list(&world, &mut state, seller, ticket, 110);
        let (registry, treasury) = (world.registry.clone(), world.treasury.clone());

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::BuyTicket {
                buyer,
                event,
                ticket,
                paid: units(110),
            })
            .then_state(move |state| {
                assert!(state.listings.is_empty());
                assert_eq!(state.accrued_fees, units(5));
                assert_eq!(registry.holder_of(&event, ticket), Some(Holder::Account(buyer)));
                assert_eq!(treasury.paid_to(&seller), units(105));
            })
            .then_effects(move |effects| {
                assert_eq!(
                    assertions::emitted(effects),
                    vec![&MarketAction::TicketBought {
                        event,
                        ticket,
                        buyer,
                        seller,
                        price: units(110),
                        fee: units(5),
                    }]
                );
            })
            .run();
    }

    #[test]
    fn test_buy_requires_exact_payment() {
        let (world, mut state, seller, ticket) = owned_ticket();
        list(&world, &mut state, seller, ticket, 110);
        let registry = world.registry.clone();
        let event = world.event;

        for paid in [109, 111] {
            let registry = registry.clone();
            ReducerTest::new(MarketplaceReducer::new())
                .with_env(world.env())
                .given_state(state.clone())
                .when_action(MarketAction::BuyTicket {
                    buyer: AccountId::new(),
                    event,
                    ticket,
                    paid: units(paid),
                })
                .then_error(move |error| {
                    assert_eq!(
                        *error,
                        TicketingError::PaymentMismatch {
                            expected: units(110),
                            paid: units(paid),
                        }
                    );
                    assert_eq!(registry.holder_of(&event, ticket), Some(Holder::Account(seller)));
                })
                .run();
        }
    }

    #[test]
    fn test_buy_unlisted_rejected() {
        let (world, state, _, ticket) = owned_ticket();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::BuyTicket {
                buyer: AccountId::new(),
                event: world.event,
                ticket,
                paid: units(100),
            })
            .then_error(|error| assert_eq!(error.code(), "listing_not_found"))
            .run();
    }

    #[test]
    fn test_declined_payout_returns_ticket() {
        let (world, mut state, seller, ticket) = owned_ticket();
        let event = world.event;
        list(&world, &mut state, seller, ticket, 100);
        world.treasury.decline(seller, true);
        let registry = world.registry.clone();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::BuyTicket {
                buyer: AccountId::new(),
                event,
                ticket,
                paid: units(100),
            })
            .then_error(move |error| {
                assert_eq!(error.code(), "payout_declined");
                assert_eq!(registry.holder_of(&event, ticket), Some(Holder::Account(seller)));
            })
            .run();
    }

    #[test]
    fn test_seller_lost_ticket_after_listing() {
        let (world, mut state, seller, ticket) = owned_ticket();
        list(&world, &mut state, seller, ticket, 100);
        world
            .registry
            .transfer(
                &world.event,
                ticket,
                Holder::Account(seller),
                Holder::Account(AccountId::new()),
            )
            .unwrap();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::BuyTicket {
                buyer: AccountId::new(),
                event: world.event,
                ticket,
                paid: units(100),
            })
            .then_error(|error| assert_eq!(error.code(), "not_holder"))
            .run();
    }

    // ========== Delisting ==========

    #[test]
    fn test_delist_by_seller_only() {
        let (world, mut state, seller, ticket) = owned_ticket();
        let event = world.event;
        list(&world, &mut state, seller, ticket, 100);
        let stranger = AccountId::new();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state.clone())
            .when_action(MarketAction::DelistTicket {
                seller: stranger,
                event,
                ticket,
            })
            .then_error(move |error| {
                assert_eq!(*error, TicketingError::NotSeller { caller: stranger, ticket });
            })
            .run();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::DelistTicket { seller, event, ticket })
            .then_state(|state| assert!(state.listings.is_empty()))
            .run();
    }

    // ========== Fees ==========

    #[test]
    fn test_fee_percentage_bounded() {
        let world = World::new();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(world.state())
            .when_action(MarketAction::SetMarketplaceFeePercentage {
                caller: world.admin,
                percent: 101,
            })
            .then_error(|error| assert_eq!(error.code(), "percentage_out_of_range"))
            .run();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(world.state())
            .when_action(MarketAction::SetMarketplaceFeePercentage {
                caller: world.admin,
                percent: 100,
            })
            .then_state(|state| assert_eq!(state.settings.marketplace_fee_percent, 100))
            .run();
    }

    #[test]
    fn test_withdraw_fees() {
        let (world, mut state, seller, ticket) = owned_ticket();
        state.settings.marketplace_fee_percent = 10;
        list(&world, &mut state, seller, ticket, 110);
        world.apply(
            &MarketplaceReducer::new(),
            &mut state,
            MarketAction::BuyTicket {
                buyer: AccountId::new(),
                event: world.event,
                ticket,
                paid: units(110),
            },
        );
        let treasury = world.treasury.clone();
        let admin = world.admin;

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(state)
            .when_action(MarketAction::WithdrawFees { caller: admin })
            .then_state(move |state| {
                assert_eq!(state.accrued_fees, Amount::ZERO);
                assert_eq!(treasury.paid_to(&admin), units(11));
            })
            .run();
    }

    #[test]
    fn test_withdraw_fees_requires_administrator() {
        let world = World::new();

        ReducerTest::new(MarketplaceReducer::new())
            .with_env(world.env())
            .given_state(world.state())
            .when_action(MarketAction::WithdrawFees {
                caller: AccountId::new(),
            })
            .then_error(|error| assert_eq!(error.code(), "not_administrator"))
            .run();
    }
}
