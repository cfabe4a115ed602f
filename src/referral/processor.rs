use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    ledger::{CreditLedger, MarkReferredOutcome},
    referral::{
        directory::ProfileDirectory,
        error::{ReferralError, already_referred, invalid_code},
        log::ReferralLog,
        types::{ReferralGrant, ReferralRecord},
    },
    types::REFERRAL_BONUS,
};

/// Credits both parties of a referral exactly once per new-user
/// activation. Idempotency hinges on the referred-at marker: setting it
/// is a single conditional update, so a retried activation observes
/// `AlreadyReferred` instead of crediting twice.
pub struct ReferralProcessor {
    directory: Arc<dyn ProfileDirectory>,
    ledger: Arc<CreditLedger>,
    log: Arc<dyn ReferralLog>,
    bonus: u32,
}

impl ReferralProcessor {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        ledger: Arc<CreditLedger>,
        log: Arc<dyn ReferralLog>,
    ) -> Self {
        Self {
            directory,
            ledger,
            log,
            bonus: REFERRAL_BONUS,
        }
    }

    pub async fn process(
        &self,
        referral_code: &str,
        new_user_id: &str,
    ) -> Result<ReferralGrant, ReferralError> {
        let code = referral_code.trim();
        if code.is_empty() {
            return Err(invalid_code("referral code cannot be empty"));
        }

        let referrer_id = self
            .directory
            .resolve_code(code)
            .await?
            .ok_or_else(|| invalid_code(format!("no referrer matches code '{}'", code)))?;

        if referrer_id == new_user_id {
            return Err(invalid_code(format!(
                "user '{}' cannot refer themselves",
                new_user_id
            )));
        }

        match self.ledger.mark_referred(new_user_id).await? {
            MarkReferredOutcome::Marked => {}
            MarkReferredOutcome::AlreadyReferred => {
                tracing::info!(
                    target: "referral",
                    new_user_id = %new_user_id,
                    referral_code = %code,
                    "referral_already_applied"
                );
                return Err(already_referred(format!(
                    "user '{}' has already been referred",
                    new_user_id
                )));
            }
        }

        if let Err(err) = self.grant_bonuses(&referrer_id, new_user_id).await {
            // The marker is already set, so a retry will observe
            // AlreadyReferred; surface the missing bonus loudly so it
            // can be reconciled.
            tracing::error!(
                target: "referral",
                referrer_id = %referrer_id,
                new_user_id = %new_user_id,
                bonus = self.bonus,
                error = %err,
                "referral_bonus_failed_after_mark"
            );
            return Err(err);
        }

        self.log
            .append(ReferralRecord {
                referrer_id: referrer_id.clone(),
                referred_id: new_user_id.to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        tracing::info!(
            target: "referral",
            referrer_id = %referrer_id,
            new_user_id = %new_user_id,
            bonus = self.bonus,
            "referral_bonus_applied"
        );

        Ok(ReferralGrant {
            referrer_id,
            referred_id: new_user_id.to_string(),
            bonus: self.bonus,
        })
    }

    async fn grant_bonuses(
        &self,
        referrer_id: &str,
        new_user_id: &str,
    ) -> Result<(), ReferralError> {
        self.ledger.credit(new_user_id, self.bonus).await?;
        self.ledger.credit(referrer_id, self.bonus).await?;
        self.ledger.increment_referral_count(referrer_id).await?;
        Ok(())
    }
}
