pub mod backend;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod prompts;

pub use backend::InterpretationBackend;
pub use credentials::{CredentialProvider, CredentialRef, EnvCredentialProvider};
pub use error::{BackendError, BackendErrorKind};
pub use gemini::GeminiBackend;
pub use prompts::{detect_locale, prompt_for};
