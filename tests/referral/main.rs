mod process;

use std::sync::Arc;

use oneira::{
    ledger::{CreditLedger, MemoryUsageStore, UsageStore},
    referral::{
        MemoryProfileDirectory, MemoryReferralLog, ProfileDirectory, ReferralLog,
        ReferralProcessor,
    },
    types::REFERRAL_CODE_LEN,
};

pub struct ReferralFixture {
    pub processor: Arc<ReferralProcessor>,
    pub ledger: Arc<CreditLedger>,
    pub log: Arc<MemoryReferralLog>,
}

pub async fn fixture_with_users(user_ids: &[&str]) -> ReferralFixture {
    let store = Arc::new(MemoryUsageStore::new());
    let ledger = Arc::new(
        CreditLedger::new(Arc::clone(&store) as Arc<dyn UsageStore>).with_write_retries(16),
    );
    let directory = Arc::new(MemoryProfileDirectory::new());
    for user_id in user_ids {
        directory.register(user_id).await;
    }
    let log = Arc::new(MemoryReferralLog::new());
    let processor = Arc::new(ReferralProcessor::new(
        Arc::clone(&directory) as Arc<dyn ProfileDirectory>,
        Arc::clone(&ledger),
        Arc::clone(&log) as Arc<dyn ReferralLog>,
    ));

    ReferralFixture {
        processor,
        ledger,
        log,
    }
}

pub fn code_of(user_id: &str) -> &str {
    &user_id[..REFERRAL_CODE_LEN]
}
