//! Shared fixtures for the integration tests.

#![allow(dead_code)] // Not every test file uses every helper

use fairsale_testing::mocks::{epoch, ManualClock};
use fairsale_ticketing::mocks::{
    InMemoryPointsLedger, InMemoryTicketRegistry, InMemoryTreasury, StaticEventCatalog,
};
use fairsale_ticketing::{
    AccountId, Amount, EventId, EventTerms, Settings, TicketId, TicketingApp, TicketingEnvironment,
};
use std::sync::Arc;

/// Smallest units per whole currency unit
pub const UNIT: u128 = 1_000_000;

/// `hundredths / 100` whole units
pub const fn cents(hundredths: u128) -> Amount {
    Amount::from_units(hundredths * UNIT / 100)
}

/// An app wired to in-memory collaborators, with one event on sale
pub struct Harness {
    pub app: TicketingApp,
    pub admin: AccountId,
    pub event: EventId,
    pub clock: ManualClock,
    pub registry: Arc<InMemoryTicketRegistry>,
    pub catalog: Arc<StaticEventCatalog>,
    pub points: Arc<InMemoryPointsLedger>,
    pub treasury: Arc<InMemoryTreasury>,
}

impl Harness {
    /// Limit 4 per buyer, 50% resale cap, default settings
    pub fn new() -> Self {
        Self::with(
            Settings::default(),
            EventTerms {
                max_purchase_per_buyer: 4,
                resale_cap_percent: 50,
            },
        )
    }

    pub fn with(settings: Settings, terms: EventTerms) -> Self {
        fairsale_testing::init_test_tracing();

        let clock = ManualClock::new(epoch());
        let points = Arc::new(InMemoryPointsLedger::new());
        let registry = Arc::new(InMemoryTicketRegistry::with_points(points.clone()));
        let catalog = Arc::new(StaticEventCatalog::new());
        let treasury = Arc::new(InMemoryTreasury::new());
        let environment = TicketingEnvironment::new(
            Arc::new(clock.clone()),
            registry.clone(),
            catalog.clone(),
            points.clone(),
            treasury.clone(),
        );

        let admin = AccountId::new();
        let event = EventId::new();
        catalog.create_event(event, terms);

        Self {
            app: TicketingApp::new(admin, settings, environment),
            admin,
            event,
            clock,
            registry,
            catalog,
            points,
            treasury,
        }
    }

    /// Mint `count` floor tickets at `price`
    pub fn mint(&self, price: Amount, count: u32) -> Vec<TicketId> {
        self.registry.mint(self.event, "floor", price, count)
    }

    /// Register and escrow `amount` for a new buyer
    pub async fn buyer_with(&self, amount: Amount) -> AccountId {
        let buyer = AccountId::new();
        self.app
            .register_and_deposit_for_event(self.event, buyer, amount)
            .await
            .unwrap();
        buyer
    }

    /// Run the ballot and move the clock to the start of `buyer`'s window
    pub async fn open_window(&self, buyer: &AccountId) {
        if !self.app.is_ballot_started(&self.event).await {
            self.app.start_ballot(self.admin, self.event).await.unwrap();
        }
        let slot = self.app.purchase_slot(&self.event, buyer).await.unwrap();
        self.clock.set(slot.start);
    }

    /// A buyer who paid `price` for one ticket in the presale and approved the marketplace
    pub async fn owner_of_one(&self, price: Amount) -> (AccountId, TicketId) {
        let ticket = self.mint(price, 1)[0];
        let owner = self.buyer_with(price).await;
        self.open_window(&owner).await;
        self.app
            .purchase_tickets(self.event, owner, vec![ticket])
            .await
            .unwrap();
        self.registry.approve_marketplace(self.event, owner, true);
        (owner, ticket)
    }
}
