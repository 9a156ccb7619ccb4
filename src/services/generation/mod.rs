/// Text-generation service abstraction
///
/// The refresh logic only needs "send a prompt, get text and citations back".
/// Implementations wrap a concrete backend (currently Gemini); the retry policy
/// lives one layer up in `services::retry` so every backend gets it for free.
use crate::{error::UpstreamError, models::GroundingReference};

pub mod gemini;

pub use gemini::GeminiClient;

/// A single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Model identifier, e.g. "gemini-2.5-flash"
    pub model: String,
    pub prompt: String,
    /// Ask the backend to augment the answer with web search
    pub search_grounding: bool,
}

/// Raw text returned by the backend plus any citations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub grounding: Vec<GroundingReference>,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding: Vec::new(),
        }
    }
}

/// Trait for text-generation backends
///
/// One call is one attempt: implementations must not retry on their own, and
/// must report failures as `UpstreamError` so the caller can classify them.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, UpstreamError>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
