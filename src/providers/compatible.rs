//! Generic OpenAI-compatible completion backend.
//! Most hosted completion APIs follow the same `/chat/completions` format;
//! one implementation covers Groq, OpenAI, Mistral, and the rest.

use super::http_client::build_backend_client;
use super::scrub::sanitize_api_error;
use super::traits::{CompletionBackend, CompletionRequest, CompletionResponse};
use crate::error::BackendError;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

pub struct OpenAiCompatibleBackend {
    name: String,
    /// Pre-computed `Bearer <key>` value (avoids `format!` per request).
    cached_auth: String,
    /// Pre-computed chat completions URL (avoids `format!` per request).
    cached_chat_url: String,
    client: Client,
}

impl OpenAiCompatibleBackend {
    /// The factory guarantees a credential is present before construction;
    /// a missing key is a configuration error there, never a request error
    /// here.
    pub fn new(name: &str, base_url: &str, api_key: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let cached_chat_url = if base_url.contains("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            cached_auth: format!("Bearer {api_key}"),
            cached_chat_url,
            client: build_backend_client(),
        }
    }

    fn request_error(&self, message: impl Into<String>) -> BackendError {
        BackendError::Request {
            backend: self.name.clone(),
            message: message.into(),
        }
    }

    async fn call(&self, request: &CompletionRequest) -> Result<CompletionResponse, BackendError> {
        // The wire format has no slot for advisory context; embeddings stay
        // local to the request object.
        let wire = ChatRequest {
            model: request.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system",
                    content: request.system_prompt.clone(),
                },
                WireMessage {
                    role: "user",
                    content: request.user_prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.cached_chat_url)
            .header(AUTHORIZATION, &self.cached_auth)
            .json(&wire)
            .send()
            .await
            .map_err(|error| self.request_error(error.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Auth {
                backend: self.name.clone(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(BackendError::RateLimited {
                backend: self.name.clone(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.request_error(sanitize_api_error(&body)));
        }

        let chat: ChatResponse = response.json().await.map_err(|error| BackendError::Decode {
            backend: self.name.clone(),
            message: error.to_string(),
        })?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Decode {
                backend: self.name.clone(),
                message: "response contained no choices".into(),
            })?;

        Ok(CompletionResponse {
            text,
            input_tokens: chat.usage.as_ref().map(|usage| usage.prompt_tokens),
            output_tokens: chat.usage.as_ref().map(|usage| usage.completion_tokens),
            model: chat.model,
        })
    }
}

impl CompletionBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, BackendError>> + Send + 'a>> {
        Box::pin(self.call(request))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}
