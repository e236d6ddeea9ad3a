//! Escrow ledger.
//!
//! Per (event, buyer) accounting. Deposits, consumption by purchases and
//! refunds are tracked as separate cumulative totals; nothing is ever
//! decremented, so `deposited − consumed − refunded` is always auditable.
//!
//! ```
//! use fairsale_ticketing::ledger::Registrant;
//! use fairsale_ticketing::types::{Amount, TicketId};
//!
//! let mut registrant = Registrant::registered();
//! registrant.deposit(Amount::from_units(200)).unwrap();
//! registrant.record_purchase(&[(TicketId::new(0), Amount::from_units(120))]);
//! assert_eq!(registrant.refundable(), Amount::from_units(80));
//! ```

use crate::error::TicketingError;
use crate::types::{Amount, PurchaseSlot, TicketId};

/// A ticket bought in the presale and what was paid for it
pub type PurchasedTicket = (TicketId, Amount);

/// Escrow account of one buyer for one event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registrant {
    /// Registered for the event
    pub is_registered: bool,
    /// Cumulative deposits
    pub deposited: Amount,
    /// Cumulative historical price of tickets bought
    pub consumed: Amount,
    /// Cumulative refunds paid out
    pub refunded: Amount,
    /// Tickets bought, in purchase order
    pub purchased: Vec<PurchasedTicket>,
    /// Bought at least one ticket
    pub has_purchased: bool,
    /// Assigned by the ballot
    pub slot: Option<PurchaseSlot>,
}

impl Registrant {
    /// A registrant with nothing deposited yet
    #[must_use]
    pub fn registered() -> Self {
        Self {
            is_registered: true,
            ..Self::default()
        }
    }

    /// Add `amount` to the deposit, returning the new total
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::ArithmeticOverflow`] if the total would overflow.
    pub fn deposit(&mut self, amount: Amount) -> Result<Amount, TicketingError> {
        let total = self.checked_deposit(amount)?;
        self.deposited = total;
        Ok(total)
    }

    /// The deposit total after adding `amount`, without recording it
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::ArithmeticOverflow`] if the total would overflow.
    pub fn checked_deposit(&self, amount: Amount) -> Result<Amount, TicketingError> {
        self.deposited
            .checked_add(amount)
            .ok_or(TicketingError::ArithmeticOverflow)
    }

    /// Amounts paid in and not yet refunded
    #[must_use]
    pub const fn payments(&self) -> Amount {
        self.deposited.saturating_sub(self.refunded)
    }

    /// Escrow neither spent on tickets nor refunded
    #[must_use]
    pub const fn refundable(&self) -> Amount {
        self.deposited
            .saturating_sub(self.consumed)
            .saturating_sub(self.refunded)
    }

    /// Number of tickets bought so far
    #[must_use]
    pub fn purchased_count(&self) -> usize {
        self.purchased.len()
    }

    /// Record tickets bought at their historical prices
    ///
    /// Callers check [`Registrant::refundable`] first; consumption never
    /// exceeds what is left in escrow.
    pub fn record_purchase(&mut self, tickets: &[PurchasedTicket]) {
        for &(ticket, price) in tickets {
            self.consumed = Amount::from_units(self.consumed.units().saturating_add(price.units()));
            self.purchased.push((ticket, price));
        }
        self.has_purchased = true;
    }

    /// Record a refund, capped at what is still refundable
    pub fn record_refund(&mut self, amount: Amount) {
        let amount = amount.min(self.refundable());
        self.refunded = Amount::from_units(self.refunded.units().saturating_add(amount.units()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_refund_is_paid_once() {
        let mut registrant = Registrant::registered();
        registrant.deposit(Amount::from_units(500)).unwrap();
        registrant.record_purchase(&[
            (TicketId::new(1), Amount::from_units(100)),
            (TicketId::new(2), Amount::from_units(150)),
        ]);

        assert_eq!(registrant.refundable(), Amount::from_units(250));
        registrant.record_refund(registrant.refundable());
        assert_eq!(registrant.refundable(), Amount::ZERO);
        registrant.record_refund(Amount::from_units(10));
        assert_eq!(registrant.refunded, Amount::from_units(250));
        assert_eq!(registrant.payments(), Amount::from_units(250));
        assert_eq!(registrant.purchased_count(), 2);
        assert!(registrant.has_purchased);
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let mut registrant = Registrant::registered();
        registrant.deposit(Amount::from_units(u128::MAX)).unwrap();
        assert_eq!(
            registrant.deposit(Amount::from_units(1)),
            Err(TicketingError::ArithmeticOverflow)
        );
        assert_eq!(registrant.deposited, Amount::from_units(u128::MAX));
    }

    proptest! {
        #[test]
        fn prop_never_pays_out_more_than_deposited(
            deposits in proptest::collection::vec(1_u64..1_000, 1..6),
            prices in proptest::collection::vec(1_u64..400, 0..6),
        ) {
            let mut registrant = Registrant::registered();
            for d in &deposits {
                registrant.deposit(Amount::from_units(u128::from(*d))).unwrap();
            }
            for (n, p) in prices.iter().enumerate() {
                let price = Amount::from_units(u128::from(*p));
                if price <= registrant.refundable() {
                    registrant.record_purchase(&[(TicketId::new(n as u64), price)]);
                }
            }
            let first = registrant.refundable();
            registrant.record_refund(first);

            prop_assert_eq!(registrant.refundable(), Amount::ZERO);
            prop_assert_eq!(
                registrant.consumed.units() + registrant.refunded.units(),
                registrant.deposited.units()
            );
            prop_assert_eq!(first, registrant.refunded);
        }
    }
}
