use oneira::{
    ledger::{LedgerErrorKind, UsageRecord},
    types::FREE_QUOTA,
};

use crate::{ledger_with, record};

#[tokio::test]
async fn given_new_user_when_get_or_create_then_record_is_zero_valued() {
    let (ledger, _store) = ledger_with(Vec::new());

    let created = ledger
        .get_or_create("user-fresh")
        .await
        .expect("creation should succeed");

    assert_eq!(created.free_used, 0);
    assert_eq!(created.paid_remaining, 0);
    assert_eq!(created.referral_count, 0);
    assert!(created.referred_at.is_none());
    assert_eq!(created.interpretations_left(), FREE_QUOTA);
}

#[tokio::test]
async fn given_concurrent_first_reads_when_get_or_create_then_single_row_exists() {
    let (ledger, store) = ledger_with(Vec::new());

    let first = {
        let ledger = std::sync::Arc::clone(&ledger);
        tokio::spawn(async move { ledger.get_or_create("user-race").await })
    };
    let second = {
        let ledger = std::sync::Arc::clone(&ledger);
        tokio::spawn(async move { ledger.get_or_create("user-race").await })
    };

    let first = first.await.expect("task join").expect("first get_or_create");
    let second = second
        .await
        .expect("task join")
        .expect("second get_or_create");

    assert_eq!(first.free_used, 0);
    assert_eq!(second.free_used, 0);
    assert_eq!(first.paid_remaining, 0);
    assert_eq!(second.paid_remaining, 0);

    let rows = store.snapshot().await;
    assert_eq!(rows.len(), 1, "exactly one row must exist after the race");
}

#[tokio::test]
async fn given_empty_user_id_when_get_or_create_then_invalid_request() {
    let (ledger, _store) = ledger_with(Vec::new());

    let err = ledger
        .get_or_create("  ")
        .await
        .expect_err("blank user id must be rejected");
    assert_eq!(err.kind, LedgerErrorKind::InvalidRequest);
}

#[test]
fn interpretations_left_is_never_negative() {
    let exhausted = record("user-a", 5, 0);
    assert_eq!(exhausted.interpretations_left(), 0);

    // A record past the quota (legacy data) still reports zero, not a
    // wrapped-around count.
    let mut overrun = UsageRecord::new("user-b");
    overrun.free_used = 9;
    overrun.paid_remaining = 2;
    assert_eq!(overrun.interpretations_left(), 2);
}

#[test]
fn left_matches_quota_formula_for_reachable_states() {
    for free_used in 0..=5 {
        for paid_remaining in 0..=3 {
            let row = record("user-c", free_used, paid_remaining);
            assert_eq!(
                row.interpretations_left(),
                5u32.saturating_sub(free_used) + paid_remaining
            );
            assert_eq!(row.can_interpret(), free_used < 5 || paid_remaining > 0);
        }
    }
}
