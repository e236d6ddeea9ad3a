//! In-memory collaborators.
//!
//! Used by the tests and the demo binary in place of a live inventory
//! service, organizer registry, points program and payment rail.

use crate::environment::{
    EventCatalog, Holder, PointsError, PointsSink, TicketInfo, TicketRegistry, Treasury,
};
use crate::error::{InventoryError, PayoutError};
use crate::types::{AccountId, Amount, EventId, EventTerms, TicketId};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Ticket registry
// ============================================================================

#[derive(Default)]
struct RegistryInner {
    tickets: BTreeMap<(EventId, TicketId), TicketInfo>,
    next_id: HashMap<EventId, u64>,
    approvals: HashSet<(EventId, AccountId)>,
}

/// Ticket ownership kept in memory
///
/// Minted tickets are held by the issuer until the presale sells them.
/// Ticket numbers start at 0 for every event.
#[derive(Default)]
pub struct InMemoryTicketRegistry {
    inner: Mutex<RegistryInner>,
    points: Option<Arc<dyn PointsSink>>,
}

impl InMemoryTicketRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that credits a point whenever a ticket is used
    #[must_use]
    pub fn with_points(points: Arc<dyn PointsSink>) -> Self {
        Self {
            inner: Mutex::default(),
            points: Some(points),
        }
    }

    /// Mint `count` tickets of one category, seated consecutively
    pub fn mint(
        &self,
        event: EventId,
        category: &str,
        price: Amount,
        count: u32,
    ) -> Vec<TicketId> {
        let mut inner = lock(&self.inner);
        let first = inner.next_id.get(&event).copied().unwrap_or(0);
        let ids: Vec<TicketId> = (0..u64::from(count)).map(|n| TicketId::new(first + n)).collect();

        for id in &ids {
            let seat = u32::try_from(id.number() + 1).unwrap_or(u32::MAX);
            inner.tickets.insert(
                (event, *id),
                TicketInfo {
                    id: *id,
                    category: category.to_string(),
                    price,
                    seat,
                    holder: Holder::Issuer,
                    used: false,
                },
            );
        }
        inner.next_id.insert(event, first + u64::from(count));
        ids
    }

    /// Grant or revoke the marketplace's right to move `owner`'s tickets
    pub fn approve_marketplace(&self, event: EventId, owner: AccountId, approved: bool) {
        let mut inner = lock(&self.inner);
        if approved {
            inner.approvals.insert((event, owner));
        } else {
            inner.approvals.remove(&(event, owner));
        }
    }

    /// Current holder of a ticket
    #[must_use]
    pub fn holder_of(&self, event: &EventId, ticket: TicketId) -> Option<Holder> {
        lock(&self.inner)
            .tickets
            .get(&(*event, ticket))
            .map(|info| info.holder)
    }

    /// Tickets held by `owner`, in id order
    #[must_use]
    pub fn tickets_of(&self, event: &EventId, owner: &AccountId) -> Vec<TicketId> {
        lock(&self.inner)
            .tickets
            .iter()
            .filter(|((e, _), info)| e == event && info.holder == Holder::Account(*owner))
            .map(|((_, id), _)| *id)
            .collect()
    }

    /// Scan a ticket at the door; the holder earns one loyalty point
    ///
    /// # Errors
    ///
    /// - [`InventoryError::TicketNotFound`] for unknown tickets
    /// - [`InventoryError::NotHolder`] if `holder` does not own it
    /// - [`InventoryError::TicketUnavailable`] if it was already used
    pub async fn mark_used(
        &self,
        event: &EventId,
        ticket: TicketId,
        holder: AccountId,
    ) -> Result<(), InventoryError> {
        {
            let mut inner = lock(&self.inner);
            let info = inner
                .tickets
                .get_mut(&(*event, ticket))
                .ok_or(InventoryError::TicketNotFound {
                    event: *event,
                    ticket,
                })?;
            if info.holder != Holder::Account(holder) {
                return Err(InventoryError::NotHolder {
                    event: *event,
                    ticket,
                });
            }
            if info.used {
                return Err(InventoryError::TicketUnavailable {
                    event: *event,
                    ticket,
                });
            }
            info.used = true;
        }

        if let Some(points) = &self.points {
            if let Err(error) = points.credit(holder, 1).await {
                tracing::warn!(%holder, %ticket, %error, "Usage point not credited");
            }
        }
        Ok(())
    }
}

impl TicketRegistry for InMemoryTicketRegistry {
    fn ticket(&self, event: &EventId, ticket: TicketId) -> Result<TicketInfo, InventoryError> {
        lock(&self.inner)
            .tickets
            .get(&(*event, ticket))
            .cloned()
            .ok_or(InventoryError::TicketNotFound {
                event: *event,
                ticket,
            })
    }

    fn transfer(
        &self,
        event: &EventId,
        ticket: TicketId,
        from: Holder,
        to: Holder,
    ) -> Result<(), InventoryError> {
        let mut inner = lock(&self.inner);
        let info = inner
            .tickets
            .get_mut(&(*event, ticket))
            .ok_or(InventoryError::TicketNotFound {
                event: *event,
                ticket,
            })?;
        if info.holder != from {
            return Err(InventoryError::NotHolder {
                event: *event,
                ticket,
            });
        }
        info.holder = to;
        Ok(())
    }

    fn is_marketplace_approved(&self, event: &EventId, owner: &AccountId) -> bool {
        lock(&self.inner).approvals.contains(&(*event, *owner))
    }

    fn available_by_category(&self, event: &EventId, category: &str) -> Vec<TicketId> {
        lock(&self.inner)
            .tickets
            .iter()
            .filter(|((e, _), info)| e == event && info.category == category && info.is_available())
            .map(|((_, id), _)| *id)
            .collect()
    }
}

// ============================================================================
// Event catalog
// ============================================================================

/// Organizer registry holding per-event terms
#[derive(Default)]
pub struct StaticEventCatalog {
    events: Mutex<HashMap<EventId, EventTerms>>,
}

impl StaticEventCatalog {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event with its terms
    pub fn create_event(&self, event: EventId, terms: EventTerms) {
        lock(&self.events).insert(event, terms);
    }
}

impl EventCatalog for StaticEventCatalog {
    fn terms(&self, event: &EventId) -> Option<EventTerms> {
        lock(&self.events).get(event).copied()
    }
}

// ============================================================================
// Loyalty points
// ============================================================================

/// Loyalty balances kept in memory
#[derive(Default)]
pub struct InMemoryPointsLedger {
    balances: Mutex<HashMap<AccountId, u64>>,
    offline: Mutex<bool>,
}

impl InMemoryPointsLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points held by `account`
    #[must_use]
    pub fn points_of(&self, account: &AccountId) -> u64 {
        lock(&self.balances).get(account).copied().unwrap_or(0)
    }

    /// Make every subsequent credit fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        *lock(&self.offline) = offline;
    }
}

impl PointsSink for InMemoryPointsLedger {
    fn credit(&self, account: AccountId, points: u64) -> BoxFuture<'_, Result<(), PointsError>> {
        async move {
            if *lock(&self.offline) {
                return Err(PointsError("ledger offline".to_string()));
            }
            let mut balances = lock(&self.balances);
            let balance = balances.entry(account).or_insert(0);
            *balance = balance.saturating_add(points);
            Ok(())
        }
        .boxed()
    }
}

// ============================================================================
// Treasury
// ============================================================================

/// Records every payout; can be told to decline specific recipients
#[derive(Default)]
pub struct InMemoryTreasury {
    paid: Mutex<HashMap<AccountId, Amount>>,
    declined: Mutex<HashSet<AccountId>>,
}

impl InMemoryTreasury {
    /// Creates a treasury that accepts every payout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid to `recipient`
    #[must_use]
    pub fn paid_to(&self, recipient: &AccountId) -> Amount {
        lock(&self.paid).get(recipient).copied().unwrap_or_default()
    }

    /// Total paid to everyone
    #[must_use]
    pub fn total_paid(&self) -> Amount {
        Amount::from_units(
            lock(&self.paid)
                .values()
                .map(Amount::units)
                .fold(0_u128, u128::saturating_add),
        )
    }

    /// Decline (or accept again) payouts to `recipient`
    pub fn decline(&self, recipient: AccountId, declined: bool) {
        let mut set = lock(&self.declined);
        if declined {
            set.insert(recipient);
        } else {
            set.remove(&recipient);
        }
    }
}

impl Treasury for InMemoryTreasury {
    fn pay_out(&self, recipient: &AccountId, amount: Amount) -> Result<(), PayoutError> {
        if lock(&self.declined).contains(recipient) {
            return Err(PayoutError::Declined {
                recipient: *recipient,
                amount,
            });
        }
        let mut paid = lock(&self.paid);
        let total = paid.entry(*recipient).or_default();
        *total = Amount::from_units(total.units().saturating_add(amount.units()));
        Ok(())
    }
}
