use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    gate::InterpretationGate,
    interpreter::{BackendError, InterpretationBackend, detect_locale},
    ledger::{CreditLedger, DebitSource, LedgerError, LedgerErrorKind},
    payment::{ConfirmOutcome, PaymentError, PaymentGrant, PaymentTransaction},
    referral::{ReferralErrorKind, ReferralGrant, ReferralProcessor},
    types::{DreamInterpretation, Perspective},
};

/// User-facing error categories. Internal diagnostic detail stays in the
/// logs; callers see only what they can act on.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no interpretation credits remaining")]
    InsufficientCredit,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("interpretation backend failure: {0}")]
    ExternalService(#[source] BackendError),
    #[error("payment failure: {0}")]
    Payment(#[source] PaymentError),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err.kind {
            LedgerErrorKind::InsufficientCredit => ServiceError::InsufficientCredit,
            LedgerErrorKind::InvalidRequest => ServiceError::InvalidRequest(err.message),
            _ => ServiceError::Internal(err.message),
        }
    }
}

impl From<PaymentError> for ServiceError {
    fn from(err: PaymentError) -> Self {
        ServiceError::Payment(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretationOutcome {
    pub interpretation: DreamInterpretation,
    pub interpretations_left: u32,
    pub debit_source: DebitSource,
}

/// The upward-facing operations of the core. Composes the gate, the
/// ledger, the referral processor, the payment grant, and the generative
/// backend into the request flows the API layer exposes.
pub struct InterpretationService {
    gate: InterpretationGate,
    ledger: Arc<CreditLedger>,
    referral: ReferralProcessor,
    payment: PaymentGrant,
    backend: Arc<dyn InterpretationBackend>,
}

impl InterpretationService {
    pub fn new(
        ledger: Arc<CreditLedger>,
        referral: ReferralProcessor,
        payment: PaymentGrant,
        backend: Arc<dyn InterpretationBackend>,
    ) -> Self {
        Self {
            gate: InterpretationGate::new(Arc::clone(&ledger)),
            ledger,
            referral,
            payment,
            backend,
        }
    }

    pub fn ledger(&self) -> &Arc<CreditLedger> {
        &self.ledger
    }

    pub async fn can_interpret(&self, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self.gate.can_interpret(user_id).await?)
    }

    pub async fn interpretations_left(&self, user_id: &str) -> Result<u32, ServiceError> {
        Ok(self.gate.interpretations_left(user_id).await?)
    }

    /// The two-phase interpretation flow: gate, then the external call,
    /// then the debit. The ledger is only touched after all three
    /// perspectives generated successfully; a failed or abandoned
    /// generation leaves the balance untouched.
    pub async fn request_interpretation(
        &self,
        user_id: &str,
        dream_text: &str,
    ) -> Result<InterpretationOutcome, ServiceError> {
        let dream_text = dream_text.trim();
        if dream_text.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "dream text cannot be empty".to_string(),
            ));
        }

        if !self.gate.can_interpret(user_id).await? {
            return Err(ServiceError::InsufficientCredit);
        }

        let locale = detect_locale(dream_text);
        let (religious, spiritual, psychological) = futures_util::try_join!(
            self.backend
                .generate(dream_text, Perspective::Religious, locale),
            self.backend
                .generate(dream_text, Perspective::Spiritual, locale),
            self.backend
                .generate(dream_text, Perspective::Psychological, locale),
        )
        .map_err(|err| {
            tracing::warn!(
                target: "service",
                user_id = %user_id,
                error = %err,
                "interpretation_generation_failed"
            );
            ServiceError::ExternalService(err)
        })?;

        let (record, debit_source) = self.ledger.debit_one(user_id).await?;

        Ok(InterpretationOutcome {
            interpretation: DreamInterpretation {
                religious,
                spiritual,
                psychological,
            },
            interpretations_left: record.interpretations_left(),
            debit_source,
        })
    }

    /// Applies a referral code for a newly activated user. Rejections
    /// (invalid code, repeated activation) are logged and reported as a
    /// quiet no-op so a retried client never sees an alarming failure.
    pub async fn apply_referral(
        &self,
        referral_code: &str,
        new_user_id: &str,
    ) -> Result<Option<ReferralGrant>, ServiceError> {
        match self.referral.process(referral_code, new_user_id).await {
            Ok(grant) => Ok(Some(grant)),
            Err(err) if matches!(
                err.kind,
                ReferralErrorKind::InvalidCode | ReferralErrorKind::AlreadyReferred
            ) =>
            {
                tracing::info!(
                    target: "service",
                    new_user_id = %new_user_id,
                    kind = ?err.kind,
                    reason = %err,
                    "referral_rejected"
                );
                Ok(None)
            }
            Err(err) => Err(ServiceError::Internal(err.to_string())),
        }
    }

    pub async fn initiate_payment(
        &self,
        user_id: &str,
        package_id: &str,
    ) -> Result<PaymentTransaction, ServiceError> {
        Ok(self.payment.create_transaction(user_id, package_id).await?)
    }

    pub async fn confirm_payment(
        &self,
        transaction_id: &str,
    ) -> Result<ConfirmOutcome, ServiceError> {
        Ok(self.payment.confirm_completion(transaction_id).await?)
    }

    pub async fn mark_payment_failed(&self, transaction_id: &str) -> Result<(), ServiceError> {
        Ok(self.payment.mark_failed(transaction_id).await?)
    }
}
