use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::ledger::{
    error::{LedgerError, invalid_request},
    types::UsageRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// Another writer created the row first. Benign; re-read.
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The stored version moved past the one the writer read.
    VersionMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReferredOutcome {
    Marked,
    AlreadyReferred,
}

/// Storage port for usage records. The store must provide conditional
/// semantics: inserts report uniqueness conflicts instead of overwriting,
/// and updates apply only when the caller names the version it read.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError>;

    async fn insert_new(&self, record: UsageRecord) -> Result<InsertOutcome, LedgerError>;

    /// Replaces the stored row with `record` only if the stored version
    /// equals `expected_version`.
    async fn update_if_version(
        &self,
        record: UsageRecord,
        expected_version: u64,
    ) -> Result<UpdateOutcome, LedgerError>;

    /// Sets the referred-at marker in a single conditional step so two
    /// concurrent referral activations cannot both win.
    async fn mark_referred_if_unset(
        &self,
        user_id: &str,
        at: OffsetDateTime,
    ) -> Result<MarkReferredOutcome, LedgerError>;
}

/// In-process store backed by a single mutex-guarded map. Used by the
/// default runtime (with snapshot persistence around it) and by tests.
#[derive(Default)]
pub struct MemoryUsageStore {
    records: Mutex<HashMap<String, UsageRecord>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = UsageRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.user_id.clone(), record))
            .collect();
        Self {
            records: Mutex::new(map),
        }
    }

    pub async fn snapshot(&self) -> Vec<UsageRecord> {
        let guard = self.records.lock().await;
        let mut rows: Vec<UsageRecord> = guard.values().cloned().collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        rows
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>, LedgerError> {
        let guard = self.records.lock().await;
        Ok(guard.get(user_id).cloned())
    }

    async fn insert_new(&self, record: UsageRecord) -> Result<InsertOutcome, LedgerError> {
        if record.user_id.trim().is_empty() {
            return Err(invalid_request("user_id cannot be empty"));
        }
        let mut guard = self.records.lock().await;
        if guard.contains_key(&record.user_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        guard.insert(record.user_id.clone(), record);
        Ok(InsertOutcome::Created)
    }

    async fn update_if_version(
        &self,
        record: UsageRecord,
        expected_version: u64,
    ) -> Result<UpdateOutcome, LedgerError> {
        let mut guard = self.records.lock().await;
        match guard.get(&record.user_id) {
            Some(stored) if stored.version == expected_version => {
                guard.insert(record.user_id.clone(), record);
                Ok(UpdateOutcome::Applied)
            }
            Some(_) => Ok(UpdateOutcome::VersionMismatch),
            None => Ok(UpdateOutcome::VersionMismatch),
        }
    }

    async fn mark_referred_if_unset(
        &self,
        user_id: &str,
        at: OffsetDateTime,
    ) -> Result<MarkReferredOutcome, LedgerError> {
        let mut guard = self.records.lock().await;
        let record = guard.get_mut(user_id).ok_or_else(|| {
            invalid_request(format!("no usage record for user '{}'", user_id))
        })?;
        if record.referred_at.is_some() {
            return Ok(MarkReferredOutcome::AlreadyReferred);
        }
        record.referred_at = Some(at);
        record.updated_at = at;
        record.version = record.version.saturating_add(1);
        Ok(MarkReferredOutcome::Marked)
    }
}
