//! Marketplace scenarios run through the full engine.

use super::{HarnessError, TestHarness};
use stakestay::booking::{BookingStage, BookingStatus, Money, NewProperty};
use stakestay::{Error, MarketEvent};

/// A wallet staking below the threshold cannot list.
#[tokio::test]
async fn test_under_staked_host_cannot_list() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);

    let err = harness.list_as_host(&host, 500, 100).await.unwrap_err();
    let HarnessError::Engine(err) = err else {
        panic!("unexpected harness error: {err}");
    };
    assert_eq!(err.reason(), "NOT_QUALIFIED_HOST");
    assert_eq!(err.status_code(), 403);
}

/// A qualified host's stake discounts a three-night stay.
#[tokio::test]
async fn test_qualified_host_discounted_booking() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let guest = TestHarness::wallet(2);

    let property = harness.list_as_host(&host, 1_500, 100).await.unwrap();
    let session = harness.login(&guest).unwrap();

    let receipt = harness
        .engine()
        .guard()
        .authorize_booking(
            &session,
            property.id,
            TestHarness::date_in(30),
            TestHarness::date_in(33),
        )
        .await
        .unwrap();

    assert!(receipt.host.is_qualified_host);
    assert_eq!(receipt.quote.nights, 3);
    assert_eq!(receipt.quote.subtotal, Money::from_minor(30_000));
    assert_eq!(receipt.quote.discount, Money::from_minor(1_500));
    assert_eq!(receipt.quote.platform_fee, Money::from_minor(713));
    assert_eq!(receipt.booking.total_price, Money::from_minor(29_213));
    assert_eq!(receipt.booking.host_deposit, Money::from_minor(1_500));
    assert_eq!(receipt.booking.total_price.to_string(), "292.13");
}

/// A host cannot book their own listing, whatever the dates.
#[tokio::test]
async fn test_self_booking_rejected() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let property = harness.list_as_host(&host, 2_000, 100).await.unwrap();
    let session = harness.login(&host).unwrap();

    let rejection = harness
        .engine()
        .guard()
        .authorize_booking(
            &session,
            property.id,
            TestHarness::date_in(5),
            TestHarness::date_in(6),
        )
        .await
        .unwrap_err();

    assert_eq!(rejection.reason(), "SELF_BOOKING_NOT_ALLOWED");
    assert_eq!(rejection.stage, BookingStage::Received);
}

/// Back-to-back stays share a boundary day without conflicting.
#[tokio::test]
async fn test_adjacent_stays_allowed() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let property = harness.list_as_host(&host, 1_000, 80).await.unwrap();
    let guard = harness.engine().guard();

    let first = harness.login(&TestHarness::wallet(2)).unwrap();
    let second = harness.login(&TestHarness::wallet(3)).unwrap();

    guard
        .authorize_booking(&first, property.id, TestHarness::date_in(10), TestHarness::date_in(12))
        .await
        .unwrap();
    guard
        .authorize_booking(&second, property.id, TestHarness::date_in(12), TestHarness::date_in(14))
        .await
        .unwrap();

    let overlapping = guard
        .authorize_booking(&second, property.id, TestHarness::date_in(11), TestHarness::date_in(13))
        .await
        .unwrap_err();
    assert_eq!(overlapping.reason(), "DATE_CONFLICT");
    assert_eq!(overlapping.error.status_code(), 409);
}

/// A ledger outage rejects bookings and listings rather than guessing.
#[tokio::test]
async fn test_ledger_outage_fails_closed() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let property = harness.list_as_host(&host, 1_000, 100).await.unwrap();
    let guest_session = harness.login(&TestHarness::wallet(2)).unwrap();
    let host_session = harness.login(&host).unwrap();
    harness.ledger().set_offline(true);

    let rejection = harness
        .engine()
        .guard()
        .authorize_booking(
            &guest_session,
            property.id,
            TestHarness::date_in(3),
            TestHarness::date_in(4),
        )
        .await
        .unwrap_err();
    assert_eq!(rejection.reason(), "LEDGER_UNAVAILABLE");
    assert!(rejection.error.is_retryable());

    let err = harness
        .engine()
        .guard()
        .create_listing(
            &host_session,
            NewProperty {
                price_per_night: Money::from_major(50).unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Dependency(_)));
    assert_eq!(err.status_code(), 503);
}

/// Cancelling frees the dates for another guest; check-out is host-only.
#[tokio::test]
async fn test_booking_lifecycle() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let property = harness.list_as_host(&host, 1_000, 100).await.unwrap();
    let guard = harness.engine().guard();
    let host_session = harness.login(&host).unwrap();
    let alice = harness.login(&TestHarness::wallet(2)).unwrap();
    let bob = harness.login(&TestHarness::wallet(3)).unwrap();
    let (check_in, check_out) = (TestHarness::date_in(20), TestHarness::date_in(22));

    let first = guard
        .authorize_booking(&alice, property.id, check_in, check_out)
        .await
        .unwrap();
    assert_eq!(
        guard.cancel_booking(&bob, first.booking.id).unwrap_err().reason(),
        "NOT_BOOKING_PARTY"
    );
    guard.cancel_booking(&host_session, first.booking.id).unwrap();

    let second = guard
        .authorize_booking(&bob, property.id, check_in, check_out)
        .await
        .unwrap();
    let done = guard
        .check_out_booking(&host_session, second.booking.id)
        .unwrap();
    assert_eq!(done.status, BookingStatus::CheckedOut);
    assert_eq!(
        guard.cancel_booking(&bob, second.booking.id).unwrap_err().reason(),
        "INVALID_TRANSITION"
    );
}

/// Events describe what the engine did.
#[tokio::test]
async fn test_events_emitted() {
    let harness = TestHarness::setup().unwrap();
    let mut events = harness.engine().subscribe_events();
    let host = TestHarness::wallet(1);
    let guest = TestHarness::wallet(2);

    let property = harness.list_as_host(&host, 1_000, 100).await.unwrap();
    let session = harness.login(&guest).unwrap();
    let receipt = harness
        .engine()
        .guard()
        .authorize_booking(&session, property.id, TestHarness::date_in(1), TestHarness::date_in(2))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&MarketEvent::ListingCreated {
        property_id: property.id,
        owner: host.address(),
    }));
    assert!(seen.contains(&MarketEvent::SessionCreated {
        address: guest.address()
    }));
    assert!(seen.contains(&MarketEvent::BookingCommitted {
        booking_id: receipt.booking.id,
        property_id: property.id,
        guest: guest.address(),
    }));
}

/// Cached stake positions are used until invalidated.
#[tokio::test]
async fn test_stake_cache_in_front_of_ledger() {
    let harness = TestHarness::setup_with(|config| config.ledger.cache_ttl_secs = 15).unwrap();
    let host = TestHarness::wallet(1);
    harness.ledger().set_stake(host.address(), 50_000);
    let reader = harness.engine().stake_reader();

    assert_eq!(reader.read(host.address()).await.unwrap().staked_amount, 50_000);
    harness.ledger().set_stake(host.address(), 10);
    assert_eq!(reader.read(host.address()).await.unwrap().staked_amount, 50_000);
    assert_eq!(harness.ledger().reads(), 1);

    reader.invalidate(&host.address());
    assert_eq!(reader.read(host.address()).await.unwrap().staked_amount, 10);
    let stats = reader.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
}
