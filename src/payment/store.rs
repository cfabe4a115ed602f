use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::payment::{
    error::{PaymentError, unknown_transaction},
    types::{PaymentStatus, PaymentTransaction},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This caller won the guard and holds the only claim on the
    /// follow-up side effect.
    Applied(PaymentTransaction),
    /// The transaction was already in the requested status.
    AlreadyInStatus(PaymentTransaction),
    /// The transaction reached a different terminal status first.
    NotPending(PaymentStatus),
}

/// Storage port for payment transactions. The transition method is the
/// idempotency guard: only one caller can move a pending transaction to
/// a terminal status.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PaymentError>;

    async fn fetch(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentTransaction>, PaymentError>;

    /// Moves the transaction to `to` only if it is still pending.
    async fn transition_if_pending(
        &self,
        transaction_id: &str,
        to: PaymentStatus,
    ) -> Result<TransitionOutcome, PaymentError>;
}

#[derive(Default)]
pub struct MemoryTransactionStore {
    transactions: Mutex<HashMap<String, PaymentTransaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PaymentError> {
        let mut guard = self.transactions.lock().await;
        guard.insert(transaction.id.clone(), transaction);
        Ok(())
    }

    async fn fetch(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentTransaction>, PaymentError> {
        let guard = self.transactions.lock().await;
        Ok(guard.get(transaction_id).cloned())
    }

    async fn transition_if_pending(
        &self,
        transaction_id: &str,
        to: PaymentStatus,
    ) -> Result<TransitionOutcome, PaymentError> {
        let mut guard = self.transactions.lock().await;
        let transaction = guard.get_mut(transaction_id).ok_or_else(|| {
            unknown_transaction(format!("unknown transaction '{}'", transaction_id))
        })?;

        match transaction.status {
            PaymentStatus::Pending => {
                transaction.status = to;
                transaction.updated_at = OffsetDateTime::now_utc();
                Ok(TransitionOutcome::Applied(transaction.clone()))
            }
            status if status == to => Ok(TransitionOutcome::AlreadyInStatus(transaction.clone())),
            status => Ok(TransitionOutcome::NotPending(status)),
        }
    }
}
