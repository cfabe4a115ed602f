use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerErrorKind {
    InsufficientCredit,
    WriteConflict,
    EmptyUpdate,
    InvalidRequest,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LedgerError {}

pub fn insufficient_credit(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::InsufficientCredit, message)
}

pub fn write_conflict(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::WriteConflict, message)
}

pub fn empty_update(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::EmptyUpdate, message)
}

pub fn invalid_request(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::InvalidRequest, message)
}

pub fn storage_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Storage, message)
}
