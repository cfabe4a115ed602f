use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    InvalidRequest,
    Authentication,
    RateLimited,
    Timeout,
    BackendTransient,
    BackendPermanent,
    ProtocolViolation,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    pub retryable: bool,
    pub provider_http_status: Option<u16>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                BackendErrorKind::RateLimited
                    | BackendErrorKind::Timeout
                    | BackendErrorKind::BackendTransient
            ),
            provider_http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_provider_http_status(mut self, status: u16) -> Self {
        self.provider_http_status = Some(status);
        self
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider_http_status {
            Some(status) => write!(f, "{} (http_status={})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

pub fn invalid_request(message: impl Into<String>) -> BackendError {
    BackendError::new(BackendErrorKind::InvalidRequest, message)
}

pub fn protocol_violation(message: impl Into<String>) -> BackendError {
    BackendError::new(BackendErrorKind::ProtocolViolation, message)
}

pub fn internal_error(message: impl Into<String>) -> BackendError {
    BackendError::new(BackendErrorKind::Internal, message)
}
