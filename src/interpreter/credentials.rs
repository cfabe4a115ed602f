use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::interpreter::error::{BackendError, BackendErrorKind, invalid_request};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineKey { key: String },
}

impl Default for CredentialRef {
    fn default() -> Self {
        CredentialRef::Env {
            var: "ONEIRA_AI_API_KEY".to_string(),
        }
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, reference: &CredentialRef) -> Result<String, BackendError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(&self, reference: &CredentialRef) -> Result<String, BackendError> {
        match reference {
            CredentialRef::Env { var } => env::var(var).map_err(|_| {
                BackendError::new(
                    BackendErrorKind::Authentication,
                    format!("missing credential environment variable {}", var),
                )
                .with_retryable(false)
            }),
            CredentialRef::InlineKey { key } => {
                if key.trim().is_empty() {
                    return Err(invalid_request("inline credential key cannot be empty"));
                }
                Ok(key.clone())
            }
        }
    }
}
