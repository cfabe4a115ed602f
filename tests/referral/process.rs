use std::sync::Arc;

use async_trait::async_trait;
use oneira::{
    ledger::{
        CreditLedger, InsertOutcome, LedgerError, LedgerErrorKind, MarkReferredOutcome,
        MemoryUsageStore, UpdateOutcome, UsageRecord, UsageStore,
    },
    referral::{
        MemoryProfileDirectory, MemoryReferralLog, ProfileDirectory, ReferralErrorKind,
        ReferralLog, ReferralProcessor,
    },
};
use time::OffsetDateTime;

use crate::{code_of, fixture_with_users};

const REFERRER: &str = "referrer-0001-aaaa";
const NEW_USER: &str = "newcomer-0002-bbbb";

#[tokio::test]
async fn given_valid_code_when_processed_then_both_parties_receive_the_bonus() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    let grant = fixture
        .processor
        .process(code_of(REFERRER), NEW_USER)
        .await
        .expect("referral should be credited");
    assert_eq!(grant.referrer_id, REFERRER);
    assert_eq!(grant.referred_id, NEW_USER);
    assert_eq!(grant.bonus, 5);

    let referrer = fixture
        .ledger
        .get_or_create(REFERRER)
        .await
        .expect("referrer record");
    let referred = fixture
        .ledger
        .get_or_create(NEW_USER)
        .await
        .expect("referred record");

    assert_eq!(referrer.paid_remaining, 5);
    assert_eq!(referrer.referral_count, 1);
    assert_eq!(referred.paid_remaining, 5);
    assert!(referred.referred_at.is_some(), "marker must be set");

    let logged = fixture
        .log
        .find_by_referred(NEW_USER)
        .await
        .expect("log lookup")
        .expect("audit row must exist");
    assert_eq!(logged.referrer_id, REFERRER);
}

#[tokio::test]
async fn given_same_activation_twice_then_second_is_rejected_and_credits_unchanged() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    fixture
        .processor
        .process(code_of(REFERRER), NEW_USER)
        .await
        .expect("first activation should succeed");

    let err = fixture
        .processor
        .process(code_of(REFERRER), NEW_USER)
        .await
        .expect_err("replayed activation must be rejected");
    assert_eq!(err.kind, ReferralErrorKind::AlreadyReferred);

    let referrer = fixture
        .ledger
        .get_or_create(REFERRER)
        .await
        .expect("referrer record");
    let referred = fixture
        .ledger
        .get_or_create(NEW_USER)
        .await
        .expect("referred record");
    assert_eq!(referrer.paid_remaining, 5, "each party credited exactly once");
    assert_eq!(referrer.referral_count, 1);
    assert_eq!(referred.paid_remaining, 5);
}

#[tokio::test]
async fn given_concurrent_activations_then_exactly_one_credits() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    let first = {
        let processor = Arc::clone(&fixture.processor);
        tokio::spawn(async move { processor.process(code_of(REFERRER), NEW_USER).await })
    };
    let second = {
        let processor = Arc::clone(&fixture.processor);
        tokio::spawn(async move { processor.process(code_of(REFERRER), NEW_USER).await })
    };

    let results = [
        first.await.expect("task join"),
        second.await.expect("task join"),
    ];
    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1, "only the marker winner may credit");

    let referred = fixture
        .ledger
        .get_or_create(NEW_USER)
        .await
        .expect("referred record");
    assert_eq!(referred.paid_remaining, 5, "bonus must not be doubled");
}

#[tokio::test]
async fn given_unknown_code_then_invalid_code_and_no_ledger_change() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    let err = fixture
        .processor
        .process("deadbeef", NEW_USER)
        .await
        .expect_err("unknown code must be rejected");
    assert_eq!(err.kind, ReferralErrorKind::InvalidCode);

    let referred = fixture
        .ledger
        .get_or_create(NEW_USER)
        .await
        .expect("referred record");
    assert_eq!(referred.paid_remaining, 0);
    assert!(referred.referred_at.is_none());
}

#[tokio::test]
async fn given_self_referral_then_invalid_code() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    let err = fixture
        .processor
        .process(code_of(REFERRER), REFERRER)
        .await
        .expect_err("self referral must be rejected");
    assert_eq!(err.kind, ReferralErrorKind::InvalidCode);

    let referrer = fixture
        .ledger
        .get_or_create(REFERRER)
        .await
        .expect("referrer record");
    assert_eq!(referrer.paid_remaining, 0);
    assert_eq!(referrer.referral_count, 0);
}

/// Store that rejects counter writes for one user while letting the
/// referred-at marker through, so the grant step can be made to fail
/// after the marker is won.
struct CreditFailingStore {
    inner: MemoryUsageStore,
    fail_user: String,
}

#[async_trait]
impl UsageStore for CreditFailingStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
        self.inner.fetch(user_id).await
    }

    async fn insert_new(&self, record: UsageRecord) -> Result<InsertOutcome, LedgerError> {
        self.inner.insert_new(record).await
    }

    async fn update_if_version(
        &self,
        record: UsageRecord,
        expected_version: u64,
    ) -> Result<UpdateOutcome, LedgerError> {
        if record.user_id == self.fail_user {
            return Err(LedgerError::new(
                LedgerErrorKind::Storage,
                "usage store rejected the write",
            ));
        }
        self.inner.update_if_version(record, expected_version).await
    }

    async fn mark_referred_if_unset(
        &self,
        user_id: &str,
        at: OffsetDateTime,
    ) -> Result<MarkReferredOutcome, LedgerError> {
        self.inner.mark_referred_if_unset(user_id, at).await
    }
}

#[tokio::test]
async fn given_failing_bonus_write_then_error_propagates_and_marker_stays() {
    let store = Arc::new(CreditFailingStore {
        inner: MemoryUsageStore::new(),
        fail_user: NEW_USER.to_string(),
    });
    let ledger = Arc::new(
        CreditLedger::new(Arc::clone(&store) as Arc<dyn UsageStore>).with_write_retries(16),
    );
    let directory = Arc::new(MemoryProfileDirectory::new());
    directory.register(REFERRER).await;
    let processor = ReferralProcessor::new(
        directory as Arc<dyn ProfileDirectory>,
        Arc::clone(&ledger),
        Arc::new(MemoryReferralLog::new()) as Arc<dyn ReferralLog>,
    );

    let err = processor
        .process(code_of(REFERRER), NEW_USER)
        .await
        .expect_err("a failed bonus write must surface");
    assert_eq!(err.kind, ReferralErrorKind::Ledger);

    let referred = ledger
        .get_or_create(NEW_USER)
        .await
        .expect("referred record");
    assert!(
        referred.referred_at.is_some(),
        "the marker stays set after the failed grant"
    );
    assert_eq!(referred.paid_remaining, 0, "no bonus was credited");

    let referrer = ledger
        .get_or_create(REFERRER)
        .await
        .expect("referrer record");
    assert_eq!(referrer.paid_remaining, 0, "the referrer grant never ran");
    assert_eq!(referrer.referral_count, 0);
}

#[tokio::test]
async fn given_blank_code_then_invalid_code() {
    let fixture = fixture_with_users(&[REFERRER]).await;

    let err = fixture
        .processor
        .process("  ", NEW_USER)
        .await
        .expect_err("blank code must be rejected");
    assert_eq!(err.kind, ReferralErrorKind::InvalidCode);
}
