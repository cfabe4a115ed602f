use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralErrorKind {
    InvalidCode,
    AlreadyReferred,
    Ledger,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralError {
    pub kind: ReferralErrorKind,
    pub message: String,
}

impl ReferralError {
    pub fn new(kind: ReferralErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReferralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReferralError {}

impl From<LedgerError> for ReferralError {
    fn from(err: LedgerError) -> Self {
        ReferralError::new(ReferralErrorKind::Ledger, err.message)
    }
}

pub fn invalid_code(message: impl Into<String>) -> ReferralError {
    ReferralError::new(ReferralErrorKind::InvalidCode, message)
}

pub fn already_referred(message: impl Into<String>) -> ReferralError {
    ReferralError::new(ReferralErrorKind::AlreadyReferred, message)
}

pub fn storage_error(message: impl Into<String>) -> ReferralError {
    ReferralError::new(ReferralErrorKind::Storage, message)
}
