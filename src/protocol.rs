use serde::{Deserialize, Serialize};

use crate::{
    payment::PaymentTransaction,
    referral::ReferralGrant,
    service::{InterpretationOutcome, ServiceError},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    CanInterpret { user_id: String },
    InterpretationsLeft { user_id: String },
    RequestInterpretation { user_id: String, dream_text: String },
    ApplyReferral { user_id: String, referral_code: String },
    InitiatePayment { user_id: String, package_id: String },
    ConfirmPayment { transaction_id: String },
    MarkPaymentFailed { transaction_id: String },
    Exit,
}

impl ClientRequest {
    /// The authenticated user a request acts for, when it names one.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ClientRequest::CanInterpret { user_id }
            | ClientRequest::InterpretationsLeft { user_id }
            | ClientRequest::RequestInterpretation { user_id, .. }
            | ClientRequest::ApplyReferral { user_id, .. }
            | ClientRequest::InitiatePayment { user_id, .. } => Some(user_id),
            ClientRequest::ConfirmPayment { .. }
            | ClientRequest::MarkPaymentFailed { .. }
            | ClientRequest::Exit => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InsufficientCredit,
    InvalidRequest,
    ExternalService,
    Payment,
    Internal,
}

impl From<&ServiceError> for ErrorCategory {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::InsufficientCredit => ErrorCategory::InsufficientCredit,
            ServiceError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ServiceError::ExternalService(_) => ErrorCategory::ExternalService,
            ServiceError::Payment(_) => ErrorCategory::Payment,
            ServiceError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    CanInterpret {
        allowed: bool,
    },
    InterpretationsLeft {
        left: u32,
    },
    Interpretation {
        outcome: InterpretationOutcome,
    },
    ReferralApplied {
        applied: bool,
        grant: Option<ReferralGrant>,
    },
    PaymentInitiated {
        transaction: PaymentTransaction,
    },
    PaymentConfirmed {
        credited: bool,
    },
    PaymentMarkedFailed,
    Error {
        category: ErrorCategory,
        message: String,
    },
}

impl ServerResponse {
    pub fn from_error(err: &ServiceError) -> Self {
        ServerResponse::Error {
            category: ErrorCategory::from(err),
            message: err.to_string(),
        }
    }
}

pub fn parse_client_request(line: &str) -> Result<ClientRequest, serde_json::Error> {
    serde_json::from_str(line)
}

pub fn encode_response(response: &ServerResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}
