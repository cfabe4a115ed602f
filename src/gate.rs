use std::sync::Arc;

use crate::ledger::{CreditLedger, LedgerError};

/// Decides whether an interpretation request may proceed. Every check
/// fetches a fresh ledger snapshot; balances are never cached across a
/// request. A false answer is a hard gate, not a soft warning.
pub struct InterpretationGate {
    ledger: Arc<CreditLedger>,
}

impl InterpretationGate {
    pub fn new(ledger: Arc<CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn can_interpret(&self, user_id: &str) -> Result<bool, LedgerError> {
        let record = self.ledger.get_or_create(user_id).await?;
        Ok(record.can_interpret())
    }

    pub async fn interpretations_left(&self, user_id: &str) -> Result<u32, LedgerError> {
        let record = self.ledger.get_or_create(user_id).await?;
        Ok(record.interpretations_left())
    }
}
