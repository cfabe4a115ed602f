use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    config::BackendConfig,
    interpreter::{
        backend::InterpretationBackend,
        credentials::{CredentialProvider, CredentialRef},
        error::{BackendError, BackendErrorKind, internal_error, protocol_violation},
        prompts::prompt_for,
    },
    types::{Locale, Perspective},
};

/// Adapter for a Gemini-style `generateContent` HTTP endpoint.
pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    credential: CredentialRef,
    credentials: Arc<dyn CredentialProvider>,
}

impl GeminiBackend {
    pub fn new(
        config: &BackendConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| internal_error(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            credential: config.credential.clone(),
            credentials,
        })
    }

    fn classify_status(status: u16, body: &str) -> BackendError {
        let kind = match status {
            401 | 403 => BackendErrorKind::Authentication,
            429 => BackendErrorKind::RateLimited,
            400 | 404 | 422 => BackendErrorKind::BackendPermanent,
            500..=599 => BackendErrorKind::BackendTransient,
            _ => BackendErrorKind::BackendPermanent,
        };
        BackendError::new(
            kind,
            format!("generative backend returned {}: {}", status, body),
        )
        .with_provider_http_status(status)
    }

    fn extract_text(body: &Value, perspective: Perspective) -> Result<String, BackendError> {
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                protocol_violation(format!(
                    "no candidate text in {} interpretation response",
                    perspective.as_str()
                ))
            })
    }
}

#[async_trait]
impl InterpretationBackend for GeminiBackend {
    async fn generate(
        &self,
        dream_text: &str,
        perspective: Perspective,
        locale: Locale,
    ) -> Result<String, BackendError> {
        let api_key = self.credentials.resolve(&self.credential).await?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt_for(perspective, locale, dream_text) }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 1024,
            }
        });

        tracing::debug!(
            target: "interpreter",
            perspective = perspective.as_str(),
            locale = ?locale,
            "interpretation_request_dispatched"
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    BackendError::new(
                        BackendErrorKind::Timeout,
                        format!("generative backend timed out: {err}"),
                    )
                } else {
                    BackendError::new(
                        BackendErrorKind::BackendTransient,
                        format!("generative backend unreachable: {err}"),
                    )
                }
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|err| protocol_violation(format!("invalid backend response body: {err}")))?;

        let text = Self::extract_text(&parsed, perspective)?;
        tracing::debug!(
            target: "interpreter",
            perspective = perspective.as_str(),
            chars = text.len(),
            "interpretation_text_received"
        );
        Ok(text)
    }
}
