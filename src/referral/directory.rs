use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{referral::error::ReferralError, types::UserId};

/// Lookup port from referral code to referrer. A referral code is a
/// deterministic prefix of the referrer's user id; the backing directory
/// resolves it with a prefix match (first match wins).
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn resolve_code(&self, code: &str) -> Result<Option<UserId>, ReferralError>;
}

/// In-process directory over an ordered id set; prefix resolution is a
/// range scan from the code itself.
#[derive(Default)]
pub struct MemoryProfileDirectory {
    user_ids: Mutex<BTreeSet<UserId>>,
}

impl MemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: &str) {
        if user_id.trim().is_empty() {
            return;
        }
        let mut guard = self.user_ids.lock().await;
        guard.insert(user_id.to_string());
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfileDirectory {
    async fn resolve_code(&self, code: &str) -> Result<Option<UserId>, ReferralError> {
        if code.trim().is_empty() {
            return Ok(None);
        }
        let guard = self.user_ids.lock().await;
        let matched = guard
            .range(code.to_string()..)
            .next()
            .filter(|candidate| candidate.starts_with(code))
            .cloned();
        Ok(matched)
    }
}
