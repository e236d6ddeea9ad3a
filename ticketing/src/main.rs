//! Presale demo.
//!
//! Runs a buyer journey (escrow, ballot, windowed purchases, refunds) and a
//! resale journey (capped listing, sale, fees) against in-memory
//! collaborators, then prints the audit journal as JSON lines.

use chrono::Utc;
use fairsale_runtime::metrics::MetricsServer;
use fairsale_testing::mocks::ManualClock;
use fairsale_ticketing::mocks::{
    InMemoryPointsLedger, InMemoryTicketRegistry, InMemoryTreasury, StaticEventCatalog,
};
use fairsale_ticketing::{
    AccountId, Amount, Config, EventId, TicketingApp, TicketingEnvironment,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Smallest units per whole currency unit
const UNIT: u128 = 1_000_000;

const fn cents(hundredths: u128) -> Amount {
    Amount::from_units(hundredths * UNIT / 100)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    info!(?config, "Configuration loaded");

    let mut metrics = config.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start()?;
    }

    // Collaborators
    let clock = ManualClock::new(Utc::now());
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
    let app = TicketingApp::from_config(&config, admin, environment);

    let event = EventId::new();
    catalog.create_event(event, config.default_terms());
    let floor = registry.mint(event, "floor", cents(100), 6);
    registry.mint(event, "balcony", cents(60), 4);

    // ========== Buyer journey ==========
    let (alice, bob, carol) = (AccountId::new(), AccountId::new(), AccountId::new());

    app.register_and_deposit_for_event(event, alice, cents(200)).await?;
    app.register_for_event(event, bob).await?;
    app.deposit_payment(event, bob, cents(150)).await?;
    app.register_and_deposit_for_event(event, carol, cents(100)).await?;

    let schedule = app.start_ballot(admin, event).await?;
    for assignment in &schedule {
        info!(
            buyer = %assignment.buyer,
            start = %assignment.slot.start,
            end = %assignment.slot.end,
            "Purchase window"
        );
    }

    let spent = app.purchase_tickets(event, alice, floor[..2].to_vec()).await?;
    info!(%spent, refundable = %app.refundable_balance(&event, &alice).await, "Alice bought two tickets");

    if let Err(error) = app.purchase_tickets(event, bob, vec![floor[2]]).await {
        info!(code = error.code(), "Bob has to wait for his window");
    }
    if let Some(window) = app.purchase_slot(&event, &bob).await {
        clock.set(window.start);
    }
    app.purchase_tickets(event, bob, vec![floor[2]]).await?;

    for buyer in [alice, bob, carol] {
        let refunded = app.refund_unused_payment(event, buyer).await?;
        info!(%buyer, %refunded, "Refund");
    }
    info!(
        remaining = ?app.available_tickets_by_category(&event, "floor"),
        "Floor tickets left"
    );

    // ========== Resale journey ==========
    app.set_marketplace_fee_percentage(admin, 5).await?;
    registry.approve_marketplace(event, alice, true);

    match app.list_ticket(alice, event, floor[0], cents(151)).await {
        Ok(()) => warn!("Listing above the cap was accepted"),
        Err(error) => info!(%error, "Listing above the cap refused"),
    }
    app.list_ticket(alice, event, floor[0], cents(140)).await?;
    let fee = app.buy_ticket(carol, event, floor[0], cents(140)).await?;
    info!(%fee, seller_received = %treasury.paid_to(&alice), "Resale settled");

    registry.mark_used(&event, floor[0], carol).await?;
    info!(points = points.points_of(&carol), "Carol checked in");

    let proceeds = app.withdraw_proceeds(admin, event).await?;
    let fees = app.withdraw_fees(admin).await?;
    info!(%proceeds, %fees, total_paid = %treasury.total_paid(), "Administrator withdrew");

    // ========== Audit journal ==========
    if !app.settle(Duration::from_secs(5)).await {
        warn!("Loyalty point credits still running; journal may be incomplete");
    }
    for entry in app.journal().await {
        println!(
            "{}",
            serde_json::json!({
                "sequence": entry.sequence,
                "type": entry.notification.event_type(),
                "notification": entry.notification,
            })
        );
    }

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("{rendered}");
    }

    Ok(())
}
