use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    ledger::CreditLedger,
    payment::{
        error::{PaymentError, already_terminal, unknown_package},
        store::{TransactionStore, TransitionOutcome},
        types::{PaymentPackage, PaymentStatus, PaymentTransaction},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This confirmation performed the credit.
    Credited(PaymentTransaction),
    /// A previous confirmation already credited; replayed deliveries are
    /// a no-op.
    AlreadyCompleted(PaymentTransaction),
}

/// Records checkout transactions and grants credits on confirmed
/// completion. The status transition carries the guard, so a repeated
/// webhook delivery or poll tick can never credit twice.
pub struct PaymentGrant {
    store: Arc<dyn TransactionStore>,
    ledger: Arc<CreditLedger>,
    packages: Vec<PaymentPackage>,
}

impl PaymentGrant {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        ledger: Arc<CreditLedger>,
        packages: Vec<PaymentPackage>,
    ) -> Self {
        Self {
            store,
            ledger,
            packages,
        }
    }

    pub fn packages(&self) -> &[PaymentPackage] {
        &self.packages
    }

    pub fn package(&self, package_id: &str) -> Option<&PaymentPackage> {
        self.packages.iter().find(|p| p.id == package_id)
    }

    /// Records a pending transaction before the caller redirects to the
    /// hosted checkout, so the later callback can be matched.
    pub async fn create_transaction(
        &self,
        user_id: &str,
        package_id: &str,
    ) -> Result<PaymentTransaction, PaymentError> {
        let package = self
            .package(package_id)
            .ok_or_else(|| unknown_package(format!("unknown payment package '{}'", package_id)))?
            .clone();

        let now = OffsetDateTime::now_utc();
        let transaction = PaymentTransaction {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            amount_cents: package.amount_cents,
            currency: package.currency.clone(),
            interpretations_granted: package.interpretations_granted,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(transaction.clone()).await?;

        tracing::info!(
            target: "payment",
            transaction_id = %transaction.id,
            user_id = %user_id,
            package_id = %package.id,
            amount_cents = package.amount_cents,
            interpretations_granted = package.interpretations_granted,
            "payment_transaction_created"
        );

        Ok(transaction)
    }

    /// Confirms completion reported by the payment provider. The
    /// pending-to-completed transition happens first under the store's
    /// guard; only the caller that wins it proceeds to credit.
    pub async fn confirm_completion(
        &self,
        transaction_id: &str,
    ) -> Result<ConfirmOutcome, PaymentError> {
        match self
            .store
            .transition_if_pending(transaction_id, PaymentStatus::Completed)
            .await?
        {
            TransitionOutcome::Applied(transaction) => {
                if let Err(err) = self
                    .ledger
                    .credit(&transaction.user_id, transaction.interpretations_granted)
                    .await
                {
                    // The transaction is already completed; surface the
                    // missing credit loudly so it can be reconciled.
                    tracing::error!(
                        target: "payment",
                        transaction_id = %transaction.id,
                        user_id = %transaction.user_id,
                        interpretations_granted = transaction.interpretations_granted,
                        error = %err,
                        "payment_credit_failed_after_completion"
                    );
                    return Err(err.into());
                }

                tracing::info!(
                    target: "payment",
                    transaction_id = %transaction.id,
                    user_id = %transaction.user_id,
                    interpretations_granted = transaction.interpretations_granted,
                    "payment_completed_and_credited"
                );
                Ok(ConfirmOutcome::Credited(transaction))
            }
            TransitionOutcome::AlreadyInStatus(transaction) => {
                tracing::info!(
                    target: "payment",
                    transaction_id = %transaction.id,
                    "payment_confirmation_replayed"
                );
                Ok(ConfirmOutcome::AlreadyCompleted(transaction))
            }
            TransitionOutcome::NotPending(status) => Err(already_terminal(format!(
                "transaction '{}' is already {:?}",
                transaction_id, status
            ))),
        }
    }

    /// Marks a pending transaction failed. No credit is ever granted on
    /// this path; failed is terminal.
    pub async fn mark_failed(&self, transaction_id: &str) -> Result<(), PaymentError> {
        match self
            .store
            .transition_if_pending(transaction_id, PaymentStatus::Failed)
            .await?
        {
            TransitionOutcome::Applied(transaction) => {
                tracing::info!(
                    target: "payment",
                    transaction_id = %transaction.id,
                    user_id = %transaction.user_id,
                    "payment_marked_failed"
                );
                Ok(())
            }
            TransitionOutcome::AlreadyInStatus(_) => Ok(()),
            TransitionOutcome::NotPending(status) => Err(already_terminal(format!(
                "transaction '{}' is already {:?}",
                transaction_id, status
            ))),
        }
    }

    pub async fn status(&self, transaction_id: &str) -> Result<Option<PaymentStatus>, PaymentError> {
        Ok(self
            .store
            .fetch(transaction_id)
            .await?
            .map(|transaction| transaction.status))
    }
}
