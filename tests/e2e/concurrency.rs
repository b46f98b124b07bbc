//! Concurrent booking attempts against one property.

use super::TestHarness;
use std::sync::Arc;

const GUESTS: u8 = 16;

/// Two guests race for the same nights; exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_guests_same_nights() {
    let harness = TestHarness::setup().unwrap();
    let host = TestHarness::wallet(1);
    let property_id = harness.list_as_host(&host, 1_000, 100).await.unwrap().id;
    let (check_in, check_out) = (TestHarness::date_in(40), TestHarness::date_in(42));

    let mut tasks = Vec::new();
    for seed in [2, 3] {
        let session = harness.login(&TestHarness::wallet(seed)).unwrap();
        let guard = harness.engine().guard();
        tasks.push(tokio::spawn(async move {
            guard
                .authorize_booking(&session, property_id, check_in, check_out)
                .await
        }));
    }

    let mut committed = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => committed += 1,
            Err(rejection) => {
                assert_eq!(rejection.reason(), "DATE_CONFLICT");
                conflicts += 1;
            }
        }
    }
    assert_eq!((committed, conflicts), (1, 1));
}

/// Many guests with overlapping ranges never produce overlapping bookings.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_ranges_never_double_book() {
    let harness = Arc::new(TestHarness::setup().unwrap());
    let host = TestHarness::wallet(1);
    let property_id = harness.list_as_host(&host, 1_000, 100).await.unwrap().id;

    let mut tasks = Vec::new();
    for seed in 0..GUESTS {
        let session = harness.login(&TestHarness::wallet(100 + seed)).unwrap();
        let guard = harness.engine().guard();
        // Three-night windows sliding by one day overlap their neighbours.
        let start = 50 + i64::from(seed);
        tasks.push(tokio::spawn(async move {
            guard
                .authorize_booking(
                    &session,
                    property_id,
                    TestHarness::date_in(start),
                    TestHarness::date_in(start + 3),
                )
                .await
        }));
    }

    let mut bookings = Vec::new();
    for task in tasks {
        if let Ok(receipt) = task.await.unwrap() {
            bookings.push(receipt.booking);
        }
    }

    assert!(!bookings.is_empty());
    for (i, a) in bookings.iter().enumerate() {
        for b in &bookings[i + 1..] {
            assert!(
                !a.overlaps(b.check_in, b.check_out),
                "bookings {} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}
