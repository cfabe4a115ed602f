
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use oneira::{
    interpreter::{BackendError, BackendErrorKind, InterpretationBackend},
    ledger::{CreditLedger, MemoryUsageStore, UsageRecord, UsageStore},
    payment::{MemoryTransactionStore, PaymentGrant, TransactionStore, default_packages},
    referral::{
        MemoryProfileDirectory, MemoryReferralLog, ProfileDirectory, ReferralLog,
        ReferralProcessor,
    },
    service::InterpretationService,
    types::{Locale, Perspective},
};

/// Scripted stand-in for the generative backend. Counts calls and can
/// be told to fail one perspective so partial-failure handling is
/// observable.
pub struct MockBackend {
    calls: AtomicUsize,
    fail_perspective: Option<Perspective>,
}

impl MockBackend {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_perspective: None,
        }
    }

    pub fn failing_on(perspective: Perspective) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_perspective: Some(perspective),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterpretationBackend for MockBackend {
    async fn generate(
        &self,
        dream_text: &str,
        perspective: Perspective,
        locale: Locale,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_perspective == Some(perspective) {
            return Err(BackendError::new(
                BackendErrorKind::BackendTransient,
                "scripted backend failure",
            ));
        }
        Ok(format!(
            "{} reading ({:?}) of: {}",
            perspective.as_str(),
            locale,
            dream_text
        ))
    }
}

pub struct ServiceFixture {
    pub service: InterpretationService,
    pub ledger: Arc<CreditLedger>,
    pub backend: Arc<MockBackend>,
    pub directory: Arc<MemoryProfileDirectory>,
}

pub fn fixture(backend: MockBackend) -> ServiceFixture {
    fixture_with_records(backend, Vec::new())
}

pub fn fixture_with_records(backend: MockBackend, records: Vec<UsageRecord>) -> ServiceFixture {
    let usage_store = Arc::new(MemoryUsageStore::with_records(records));
    let ledger = Arc::new(
        CreditLedger::new(Arc::clone(&usage_store) as Arc<dyn UsageStore>).with_write_retries(16),
    );
    let directory = Arc::new(MemoryProfileDirectory::new());
    let referral = ReferralProcessor::new(
        Arc::clone(&directory) as Arc<dyn ProfileDirectory>,
        Arc::clone(&ledger),
        Arc::new(MemoryReferralLog::new()) as Arc<dyn ReferralLog>,
    );
    let payment = PaymentGrant::new(
        Arc::new(MemoryTransactionStore::new()) as Arc<dyn TransactionStore>,
        Arc::clone(&ledger),
        default_packages(),
    );
    let backend = Arc::new(backend);
    let service = InterpretationService::new(
        Arc::clone(&ledger),
        referral,
        payment,
        Arc::clone(&backend) as Arc<dyn InterpretationBackend>,
    );

    ServiceFixture {
        service,
        ledger,
        backend,
        directory,
    }
}

pub fn record(user_id: &str, free_used: u32, paid_remaining: u32) -> UsageRecord {
    let mut record = UsageRecord::new(user_id);
    record.free_used = free_used;
    record.paid_remaining = paid_remaining;
    record
}
