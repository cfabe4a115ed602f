use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::UserId;

/// Audit row for a credited referral. A given `referred_id` appears at
/// most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Result of a successfully processed referral activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralGrant {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub bonus: u32,
}
