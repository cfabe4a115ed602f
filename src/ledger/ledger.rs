use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    ledger::{
        error::{
            LedgerError, empty_update, insufficient_credit, invalid_request, storage_error,
            write_conflict,
        },
        store::{InsertOutcome, MarkReferredOutcome, UpdateOutcome, UsageStore},
        types::{DebitSource, UsageRecord},
    },
    types::FREE_QUOTA,
};

const DEFAULT_WRITE_RETRIES: u32 = 3;

/// The single source of truth for interpretation credits. All mutation
/// paths re-read the stored row, write through a version-conditioned
/// update, and log before/after counter values.
pub struct CreditLedger {
    store: Arc<dyn UsageStore>,
    write_retries: u32,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            write_retries: DEFAULT_WRITE_RETRIES,
        }
    }

    pub fn with_write_retries(mut self, write_retries: u32) -> Self {
        self.write_retries = write_retries;
        self
    }

    /// Returns the user's usage record, creating a zero-valued one if
    /// none exists. Losing the creation race to another caller is benign:
    /// the conflicting insert falls through to a re-read.
    pub async fn get_or_create(&self, user_id: &str) -> Result<UsageRecord, LedgerError> {
        if user_id.trim().is_empty() {
            return Err(invalid_request("user_id cannot be empty"));
        }

        if let Some(record) = self.store.fetch(user_id).await? {
            return Ok(record);
        }

        let record = UsageRecord::new(user_id);
        match self.store.insert_new(record.clone()).await? {
            InsertOutcome::Created => {
                tracing::info!(target: "ledger", user_id = %user_id, "usage_record_created");
                Ok(record)
            }
            InsertOutcome::AlreadyExists => {
                self.store.fetch(user_id).await?.ok_or_else(|| {
                    storage_error(format!(
                        "usage record for '{}' vanished after insert conflict",
                        user_id
                    ))
                })
            }
        }
    }

    /// Consumes exactly one credit: paid before free, free until the
    /// quota is exhausted. Must be called only after the external
    /// interpretation call has already succeeded.
    pub async fn debit_one(
        &self,
        user_id: &str,
    ) -> Result<(UsageRecord, DebitSource), LedgerError> {
        for attempt in 0..=self.write_retries {
            let current = self.get_or_create(user_id).await?;
            let mut next = current.clone();

            let source = if current.paid_remaining > 0 {
                next.paid_remaining = current.paid_remaining - 1;
                DebitSource::Paid
            } else if current.free_used < FREE_QUOTA {
                next.free_used = current.free_used + 1;
                DebitSource::Free
            } else {
                // The gate should have denied this request; reaching an
                // exhausted record here is a gate/ledger disagreement.
                tracing::error!(
                    target: "ledger",
                    user_id = %user_id,
                    free_used = current.free_used,
                    paid_remaining = current.paid_remaining,
                    "usage_debit_without_remaining_credit"
                );
                return Err(insufficient_credit(format!(
                    "no remaining interpretation credits for user '{}'",
                    user_id
                )));
            };

            if next.free_used == current.free_used
                && next.paid_remaining == current.paid_remaining
            {
                return Err(empty_update(format!(
                    "debit for user '{}' produced no field change",
                    user_id
                )));
            }

            next.version = current.version + 1;
            next.updated_at = OffsetDateTime::now_utc();

            match self
                .store
                .update_if_version(next.clone(), current.version)
                .await?
            {
                UpdateOutcome::Applied => {
                    tracing::info!(
                        target: "ledger",
                        user_id = %user_id,
                        source = ?source,
                        free_used_before = current.free_used,
                        free_used_after = next.free_used,
                        paid_remaining_before = current.paid_remaining,
                        paid_remaining_after = next.paid_remaining,
                        "usage_debited"
                    );
                    return Ok((next, source));
                }
                UpdateOutcome::VersionMismatch => {
                    tracing::warn!(
                        target: "ledger",
                        user_id = %user_id,
                        attempt,
                        "usage_debit_write_conflict"
                    );
                }
            }
        }

        Err(write_conflict(format!(
            "debit for user '{}' lost {} consecutive write races",
            user_id,
            self.write_retries + 1
        )))
    }

    /// Adds `amount` to the stored paid balance. A read-modify-write on
    /// the current row, never a blind overwrite: referral bonuses and
    /// payment grants can race on the same user.
    pub async fn credit(&self, user_id: &str, amount: u32) -> Result<UsageRecord, LedgerError> {
        if amount == 0 {
            return Err(empty_update(format!(
                "credit of zero for user '{}' is not allowed",
                user_id
            )));
        }

        for attempt in 0..=self.write_retries {
            let current = self.get_or_create(user_id).await?;
            let mut next = current.clone();
            next.paid_remaining = current
                .paid_remaining
                .checked_add(amount)
                .ok_or_else(|| invalid_request("paid balance overflow"))?;
            next.version = current.version + 1;
            next.updated_at = OffsetDateTime::now_utc();

            match self
                .store
                .update_if_version(next.clone(), current.version)
                .await?
            {
                UpdateOutcome::Applied => {
                    tracing::info!(
                        target: "ledger",
                        user_id = %user_id,
                        amount,
                        paid_remaining_before = current.paid_remaining,
                        paid_remaining_after = next.paid_remaining,
                        "usage_credited"
                    );
                    return Ok(next);
                }
                UpdateOutcome::VersionMismatch => {
                    tracing::warn!(
                        target: "ledger",
                        user_id = %user_id,
                        attempt,
                        "usage_credit_write_conflict"
                    );
                }
            }
        }

        Err(write_conflict(format!(
            "credit for user '{}' lost {} consecutive write races",
            user_id,
            self.write_retries + 1
        )))
    }

    /// Bumps the referrer's successful-referral counter.
    pub async fn increment_referral_count(
        &self,
        user_id: &str,
    ) -> Result<UsageRecord, LedgerError> {
        for attempt in 0..=self.write_retries {
            let current = self.get_or_create(user_id).await?;
            let mut next = current.clone();
            next.referral_count = current.referral_count.saturating_add(1);
            next.version = current.version + 1;
            next.updated_at = OffsetDateTime::now_utc();

            match self
                .store
                .update_if_version(next.clone(), current.version)
                .await?
            {
                UpdateOutcome::Applied => {
                    tracing::info!(
                        target: "ledger",
                        user_id = %user_id,
                        referral_count_before = current.referral_count,
                        referral_count_after = next.referral_count,
                        "referral_count_incremented"
                    );
                    return Ok(next);
                }
                UpdateOutcome::VersionMismatch => {
                    tracing::warn!(
                        target: "ledger",
                        user_id = %user_id,
                        attempt,
                        "referral_count_write_conflict"
                    );
                }
            }
        }

        Err(write_conflict(format!(
            "referral count bump for user '{}' lost {} consecutive write races",
            user_id,
            self.write_retries + 1
        )))
    }

    /// Sets the referred-at marker. At most one caller observes `Marked`
    /// for a given user; every later caller observes `AlreadyReferred`.
    pub async fn mark_referred(&self, user_id: &str) -> Result<MarkReferredOutcome, LedgerError> {
        self.get_or_create(user_id).await?;
        let outcome = self
            .store
            .mark_referred_if_unset(user_id, OffsetDateTime::now_utc())
            .await?;
        if outcome == MarkReferredOutcome::Marked {
            tracing::info!(target: "ledger", user_id = %user_id, "usage_marked_referred");
        }
        Ok(outcome)
    }
}
