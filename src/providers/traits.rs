use crate::error::BackendError;
use std::future::Future;
use std::pin::Pin;

/// One fully composed completion request. The orchestrator owns prompt
/// assembly; backends only transport.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Advisory enrichment (e.g. embedding vectors keyed by fragment name).
    /// Backends may ignore it; it never affects success or failure.
    pub auxiliary_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub model: Option<String>,
}

impl CompletionResponse {
    pub fn text_only(text: String) -> Self {
        Self {
            text,
            input_tokens: None,
            output_tokens: None,
            model: None,
        }
    }
}

/// Black-box boundary to an external text-completion capability.
pub trait CompletionBackend: Send + Sync {
    /// Backend identifier (e.g. "groq", "openai").
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, BackendError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_carries_no_usage() {
        let response = CompletionResponse::text_only("hello".into());
        assert_eq!(response.text, "hello");
        assert!(response.input_tokens.is_none());
        assert!(response.output_tokens.is_none());
        assert!(response.model.is_none());
    }
}
