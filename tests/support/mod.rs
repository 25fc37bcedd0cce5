use draftpilot::conversation::{ConversationLimits, ConversationStore};
use draftpilot::generator::{EmailGenerator, GeneratorOptions};
use draftpilot::providers::{NoopEmbedding, OpenAiCompatibleBackend};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Generator wired to an OpenAI-compatible endpoint at `uri`, with the stock
/// provider set.
pub fn generator_for(uri: &str) -> EmailGenerator {
    let backend = Arc::new(OpenAiCompatibleBackend::new("groq", uri, "test-key"));
    EmailGenerator::new(
        backend,
        Arc::new(NoopEmbedding),
        Arc::new(ConversationStore::new(ConversationLimits::default())),
        GeneratorOptions::default(),
    )
    .with_default_providers()
}

/// Mount a chat-completions mock that answers `reply` for requests carrying
/// the given token budget.
pub async fn mount_completion(server: &MockServer, max_tokens: u32, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": max_tokens })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": reply}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 10}
        })))
        .mount(server)
        .await;
}
