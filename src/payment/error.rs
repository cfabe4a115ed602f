use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorKind {
    UnknownTransaction,
    UnknownPackage,
    AlreadyTerminal,
    Ledger,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    pub kind: PaymentErrorKind,
    pub message: String,
}

impl PaymentError {
    pub fn new(kind: PaymentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<LedgerError> for PaymentError {
    fn from(err: LedgerError) -> Self {
        PaymentError::new(PaymentErrorKind::Ledger, err.message)
    }
}

pub fn unknown_transaction(message: impl Into<String>) -> PaymentError {
    PaymentError::new(PaymentErrorKind::UnknownTransaction, message)
}

pub fn unknown_package(message: impl Into<String>) -> PaymentError {
    PaymentError::new(PaymentErrorKind::UnknownPackage, message)
}

pub fn already_terminal(message: impl Into<String>) -> PaymentError {
    PaymentError::new(PaymentErrorKind::AlreadyTerminal, message)
}

pub fn storage_error(message: impl Into<String>) -> PaymentError {
    PaymentError::new(PaymentErrorKind::Storage, message)
}
