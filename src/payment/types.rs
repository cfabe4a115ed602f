use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{TransactionId, UserId};

/// A purchasable credit bundle. The defaults mirror the hosted checkout
/// offering; deployments can override them in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPackage {
    pub id: String,
    pub name: String,
    pub interpretations_granted: u32,
    pub amount_cents: u64,
    pub currency: String,
}

pub fn default_packages() -> Vec<PaymentPackage> {
    vec![
        PaymentPackage {
            id: "basic".to_string(),
            name: "Basic Pack".to_string(),
            interpretations_granted: 10,
            amount_cents: 4_999,
            currency: "EGP".to_string(),
        },
        PaymentPackage {
            id: "premium".to_string(),
            name: "Premium Pack".to_string(),
            interpretations_granted: 25,
            amount_cents: 9_999,
            currency: "EGP".to_string(),
        },
        PaymentPackage {
            id: "ultimate".to_string(),
            name: "Ultimate Pack".to_string(),
            interpretations_granted: 100,
            amount_cents: 19_999,
            currency: "EGP".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// One checkout attempt. Created as `Pending` before any redirect so a
/// later provider callback can be matched; credits the ledger exactly
/// once on the pending-to-completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount_cents: u64,
    pub currency: String,
    pub interpretations_granted: u32,
    pub status: PaymentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
