use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{FREE_QUOTA, UserId};

/// Per-user credit balances. One row per user, created lazily on first
/// access. `version` is the conditional-update token: every successful
/// write bumps it by one, and writers must name the version they read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: UserId,
    pub free_used: u32,
    pub paid_remaining: u32,
    pub referral_count: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub referred_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub version: u64,
}

impl UsageRecord {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            free_used: 0,
            paid_remaining: 0,
            referral_count: 0,
            referred_at: None,
            updated_at: OffsetDateTime::now_utc(),
            version: 0,
        }
    }

    pub fn can_interpret(&self) -> bool {
        self.free_used < FREE_QUOTA || self.paid_remaining > 0
    }

    pub fn interpretations_left(&self) -> u32 {
        FREE_QUOTA.saturating_sub(self.free_used) + self.paid_remaining
    }
}

/// Which balance a debit consumed. Paid credits are consumed before the
/// free quota once both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitSource {
    Paid,
    Free,
}
