use async_trait::async_trait;

use crate::{
    interpreter::error::BackendError,
    types::{Locale, Perspective},
};

/// Port to the generative backend. One call produces one interpretation
/// text; the service invokes it three times per request, in parallel.
#[async_trait]
pub trait InterpretationBackend: Send + Sync {
    async fn generate(
        &self,
        dream_text: &str,
        perspective: Perspective,
        locale: Locale,
    ) -> Result<String, BackendError>;
}
