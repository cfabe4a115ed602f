use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::referral::{error::ReferralError, types::ReferralRecord};

/// Append-only audit log of credited referrals.
#[async_trait]
pub trait ReferralLog: Send + Sync {
    async fn append(&self, record: ReferralRecord) -> Result<(), ReferralError>;

    async fn find_by_referred(
        &self,
        referred_id: &str,
    ) -> Result<Option<ReferralRecord>, ReferralError>;
}

#[derive(Default)]
pub struct MemoryReferralLog {
    records: Mutex<Vec<ReferralRecord>>,
}

impl MemoryReferralLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralLog for MemoryReferralLog {
    async fn append(&self, record: ReferralRecord) -> Result<(), ReferralError> {
        let mut guard = self.records.lock().await;
        guard.push(record);
        Ok(())
    }

    async fn find_by_referred(
        &self,
        referred_id: &str,
    ) -> Result<Option<ReferralRecord>, ReferralError> {
        let guard = self.records.lock().await;
        Ok(guard
            .iter()
            .find(|record| record.referred_id == referred_id)
            .cloned())
    }
}
