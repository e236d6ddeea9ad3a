//! Concurrent callers and the solvency invariant.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{cents, Harness};
use fairsale_ticketing::{AccountId, Amount, Holder, TicketingError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_listing_one_buyer() {
    let h = Harness::new();
    let (seller, ticket) = h.owner_of_one(cents(100)).await;
    h.app
        .list_ticket(seller, h.event, ticket, cents(120))
        .await
        .unwrap();

    let (first, second) = (AccountId::new(), AccountId::new());
    let (app_a, app_b) = (h.app.clone(), h.app.clone());
    let event = h.event;
    let (a, b) = tokio::join!(
        tokio::spawn(async move { app_a.buy_ticket(first, event, ticket, cents(120)).await }),
        tokio::spawn(async move { app_b.buy_ticket(second, event, ticket, cents(120)).await }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(
        *loser,
        TicketingError::ListingNotFound {
            event: h.event,
            ticket,
        }
    );

    let holder = h.registry.holder_of(&h.event, ticket);
    assert!(holder == Some(Holder::Account(first)) || holder == Some(Holder::Account(second)));
    assert_eq!(h.treasury.paid_to(&seller), cents(120));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_get_disjoint_windows() {
    let h = Harness::new();
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = h.app.clone();
            let event = h.event;
            tokio::spawn(async move {
                let buyer = AccountId::new();
                app.register_and_deposit_for_event(event, buyer, cents(100))
                    .await
                    .map(|_| buyer)
            })
        })
        .collect();

    let mut buyers = Vec::new();
    for handle in handles {
        buyers.push(handle.await.unwrap().unwrap());
    }

    let paid = h.app.paid_registrants(&h.event).await;
    assert_eq!(paid.len(), 20);
    for buyer in &buyers {
        assert!(paid.contains(buyer));
    }

    let schedule = h.app.start_ballot(h.admin, h.event).await.unwrap();
    assert_eq!(schedule.len(), 20);
    for pair in schedule.windows(2) {
        assert!(pair[0].slot.end <= pair[1].slot.start);
    }
}

#[tokio::test]
async fn test_payouts_never_exceed_deposits() {
    let h = Harness::new();
    let tickets = h.mint(cents(100), 3);
    let a = h.buyer_with(cents(250)).await;
    let b = h.buyer_with(cents(120)).await;
    let c = h.buyer_with(cents(40)).await;
    let deposited = cents(250 + 120 + 40);

    h.open_window(&a).await;
    h.app
        .purchase_tickets(h.event, a, tickets[..2].to_vec())
        .await
        .unwrap();
    h.open_window(&b).await;
    h.app
        .purchase_tickets(h.event, b, vec![tickets[2]])
        .await
        .unwrap();

    let proceeds = h.app.withdraw_proceeds(h.admin, h.event).await.unwrap();
    assert_eq!(proceeds, cents(300));
    assert!(h.treasury.total_paid() <= deposited);

    for buyer in [a, b, c] {
        h.app.refund_unused_payment(h.event, buyer).await.unwrap();
        assert!(h.treasury.total_paid() <= deposited);
    }
    // Second round pays nothing
    for buyer in [a, b, c] {
        assert_eq!(
            h.app.refund_unused_payment(h.event, buyer).await.unwrap(),
            Amount::ZERO
        );
    }
    assert_eq!(h.app.withdraw_proceeds(h.admin, h.event).await.unwrap(), Amount::ZERO);

    assert_eq!(h.treasury.total_paid(), deposited);
}
