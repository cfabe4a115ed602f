use std::sync::Arc;

use oneira::payment::{ConfirmOutcome, PaymentErrorKind, PaymentStatus};

use crate::fixture;

const USER: &str = "buyer-0001";

#[tokio::test]
async fn given_known_package_when_initiated_then_pending_transaction_is_recorded() {
    let fixture = fixture();

    let transaction = fixture
        .grant
        .create_transaction(USER, "premium")
        .await
        .expect("transaction should be created");

    assert_eq!(transaction.status, PaymentStatus::Pending);
    assert_eq!(transaction.user_id, USER);
    assert_eq!(transaction.amount_cents, 9_999);
    assert_eq!(transaction.interpretations_granted, 25);

    let status = fixture
        .grant
        .status(&transaction.id)
        .await
        .expect("status lookup");
    assert_eq!(status, Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn given_unknown_package_then_creation_is_rejected() {
    let fixture = fixture();

    let err = fixture
        .grant
        .create_transaction(USER, "mystery")
        .await
        .expect_err("unknown package must be rejected");
    assert_eq!(err.kind, PaymentErrorKind::UnknownPackage);
}

#[tokio::test]
async fn given_pending_transaction_when_confirmed_then_ledger_is_credited_once() {
    let fixture = fixture();
    let transaction = fixture
        .grant
        .create_transaction(USER, "basic")
        .await
        .expect("transaction creation");

    let outcome = fixture
        .grant
        .confirm_completion(&transaction.id)
        .await
        .expect("confirmation should succeed");
    assert!(matches!(outcome, ConfirmOutcome::Credited(_)));

    let record = fixture.ledger.get_or_create(USER).await.expect("record");
    assert_eq!(record.paid_remaining, 10);
}

#[tokio::test]
async fn given_confirmation_replayed_then_second_delivery_is_a_noop() {
    let fixture = fixture();
    let transaction = fixture
        .grant
        .create_transaction(USER, "basic")
        .await
        .expect("transaction creation");

    fixture
        .grant
        .confirm_completion(&transaction.id)
        .await
        .expect("first confirmation");
    let replay = fixture
        .grant
        .confirm_completion(&transaction.id)
        .await
        .expect("replayed confirmation must not error");
    assert!(matches!(replay, ConfirmOutcome::AlreadyCompleted(_)));

    let record = fixture.ledger.get_or_create(USER).await.expect("record");
    assert_eq!(record.paid_remaining, 10, "ledger credited exactly once");
}

#[tokio::test]
async fn given_concurrent_confirmations_then_exactly_one_credits() {
    let fixture = fixture();
    let transaction = fixture
        .grant
        .create_transaction(USER, "ultimate")
        .await
        .expect("transaction creation");

    let first = {
        let grant = Arc::clone(&fixture.grant);
        let id = transaction.id.clone();
        tokio::spawn(async move { grant.confirm_completion(&id).await })
    };
    let second = {
        let grant = Arc::clone(&fixture.grant);
        let id = transaction.id.clone();
        tokio::spawn(async move { grant.confirm_completion(&id).await })
    };

    let outcomes = [
        first.await.expect("task join").expect("confirmation"),
        second.await.expect("task join").expect("confirmation"),
    ];
    let credited = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ConfirmOutcome::Credited(_)))
        .count();
    assert_eq!(credited, 1, "the transition guard admits one creditor");

    let record = fixture.ledger.get_or_create(USER).await.expect("record");
    assert_eq!(record.paid_remaining, 100);
}

#[tokio::test]
async fn given_failed_transaction_then_confirmation_is_rejected_and_nothing_credited() {
    let fixture = fixture();
    let transaction = fixture
        .grant
        .create_transaction(USER, "basic")
        .await
        .expect("transaction creation");

    fixture
        .grant
        .mark_failed(&transaction.id)
        .await
        .expect("mark failed");

    let err = fixture
        .grant
        .confirm_completion(&transaction.id)
        .await
        .expect_err("completed-after-failed must be rejected");
    assert_eq!(err.kind, PaymentErrorKind::AlreadyTerminal);

    let record = fixture.ledger.get_or_create(USER).await.expect("record");
    assert_eq!(record.paid_remaining, 0, "failed transactions never credit");

    let status = fixture
        .grant
        .status(&transaction.id)
        .await
        .expect("status lookup");
    assert_eq!(status, Some(PaymentStatus::Failed));
}

#[tokio::test]
async fn given_mark_failed_replayed_then_it_stays_a_noop() {
    let fixture = fixture();
    let transaction = fixture
        .grant
        .create_transaction(USER, "basic")
        .await
        .expect("transaction creation");

    fixture
        .grant
        .mark_failed(&transaction.id)
        .await
        .expect("first mark failed");
    fixture
        .grant
        .mark_failed(&transaction.id)
        .await
        .expect("replayed mark failed is a no-op");
}

#[tokio::test]
async fn given_unknown_transaction_then_confirmation_fails() {
    let fixture = fixture();

    let err = fixture
        .grant
        .confirm_completion("txn-does-not-exist")
        .await
        .expect_err("unknown transaction must fail");
    assert_eq!(err.kind, PaymentErrorKind::UnknownTransaction);
}
