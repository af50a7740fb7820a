//! Overlap-guard properties: race freedom under concurrency and the
//! no-overlap invariant over random interval sets.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use hallbook_booking::{overlap_buffer, Contact, EventDraft, Visibility};
use hallbook_core::TimeRange;
use hallbook_infra::InMemoryStore;
use hallbook_workflow::{BookingStore, StoreError};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn draft(email: &str, range: TimeRange) -> EventDraft {
    EventDraft::new(
        Contact::new(email, "Test Hirer").unwrap(),
        range,
        "Generated booking",
        Visibility::Public,
        "",
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_submissions_admit_exactly_one() {
    // [10:00,11:00) vs [10:30,11:30) on the same day, issued together.
    let store = Arc::new(InMemoryStore::new());

    let first = draft(
        "first@example.org",
        TimeRange::new(base() + Duration::hours(10), base() + Duration::hours(11)).unwrap(),
    );
    let second = draft(
        "second@example.org",
        TimeRange::new(
            base() + Duration::minutes(10 * 60 + 30),
            base() + Duration::minutes(11 * 60 + 30),
        )
        .unwrap(),
    );

    let store_a = store.clone();
    let store_b = store.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { store_a.submit_event(&first).await }),
        tokio::spawn(async move { store_b.submit_event(&second).await }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one submission must win: {a:?} {b:?}");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser.unwrap_err(), StoreError::Conflict));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_concurrent_submissions_for_one_slot_admit_exactly_one() {
    let store = Arc::new(InMemoryStore::new());
    let range =
        TimeRange::new(base() + Duration::hours(10), base() + Duration::hours(11)).unwrap();

    let mut handles = Vec::new();
    for n in 0..16 {
        let store = store.clone();
        let email = format!("hirer{n}@example.org");
        handles.push(tokio::spawn(async move {
            store.submit_event(&draft(&email, range)).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(StoreError::Conflict) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
}

/// Greedy reference model: a proposal is accepted iff it clears every
/// previously accepted booking's buffered window.
fn greedy_accepts(accepted: &[TimeRange], proposed: &TimeRange) -> bool {
    let buffer = overlap_buffer();
    !accepted
        .iter()
        .any(|existing| proposed.collides_with_buffered(&existing.buffered(buffer)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random interval sets submitted in order: the store must accept
    /// exactly the greedy maximal non-overlapping subset, and the final
    /// accepted set must be pairwise clear of each other's buffers.
    #[test]
    fn accepted_set_matches_the_greedy_model(
        specs in prop::collection::vec((0i64..200, 1i64..9), 1..24)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let store = InMemoryStore::new();
            let mut accepted: Vec<TimeRange> = Vec::new();

            for (i, (slot, span)) in specs.iter().enumerate() {
                // Half-hour grid keeps collisions frequent enough to matter.
                let start = base() + Duration::minutes(30 * slot);
                let end = start + Duration::minutes(30 * span);
                let range = TimeRange::new(start, end).unwrap();

                let email = format!("hirer{i}@example.org");
                let expect_accept = greedy_accepts(&accepted, &range);

                match store.submit_event(&draft(&email, range)).await {
                    Ok(_) => {
                        assert!(expect_accept, "store accepted a range the model rejects");
                        accepted.push(range);
                    }
                    Err(StoreError::Conflict) => {
                        assert!(!expect_accept, "store rejected a range the model accepts");
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }

            // The invariant itself: pairwise non-overlap with buffer.
            let buffer = overlap_buffer();
            for (i, a) in accepted.iter().enumerate() {
                for b in accepted.iter().skip(i + 1) {
                    assert!(
                        !a.collides_with_buffered(&b.buffered(buffer)),
                        "accepted bookings overlap: {a:?} vs {b:?}"
                    );
                }
            }

            // And the count matches the order-consistent maximal subset.
            let final_count = store
                .list_events(base() - Duration::days(1), base() + Duration::days(30))
                .await
                .unwrap()
                .len();
            assert_eq!(final_count, accepted.len());
        });
    }
}
