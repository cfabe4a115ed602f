mod records;

use std::sync::Arc;

use oneira::ledger::{CreditLedger, MemoryUsageStore, UsageRecord, UsageStore};

pub fn ledger_with(records: Vec<UsageRecord>) -> (Arc<CreditLedger>, Arc<MemoryUsageStore>) {
    let store = Arc::new(MemoryUsageStore::with_records(records));
    let ledger = Arc::new(
        CreditLedger::new(Arc::clone(&store) as Arc<dyn UsageStore>).with_write_retries(16),
    );
    (ledger, store)
}

pub fn record(user_id: &str, free_used: u32, paid_remaining: u32) -> UsageRecord {
    let mut record = UsageRecord::new(user_id);
    record.free_used = free_used;
    record.paid_remaining = paid_remaining;
    record
}
