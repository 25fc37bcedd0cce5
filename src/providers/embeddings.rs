//! Embedding boundary. Strictly advisory: embedding failure must never
//! abort a generation call.

use super::http_client::build_backend_client;
use super::scrub::sanitize_api_error;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub trait EmbeddingBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts into vectors, in input order.
    fn embed<'a>(
        &'a self,
        texts: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send + 'a>>;
}

/// Embed a set of named fragments, preserving the name of each vector.
pub async fn embed_named(
    backend: &dyn EmbeddingBackend,
    entries: &[(&str, &str)],
) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if entries.is_empty() {
        return Ok(serde_json::Map::new());
    }

    let texts: Vec<&str> = entries.iter().map(|(_, text)| *text).collect();
    let vectors = backend.embed(&texts).await?;

    let mut named = serde_json::Map::new();
    for ((name, _), vector) in entries.iter().zip(vectors) {
        named.insert((*name).to_string(), serde_json::json!(vector));
    }
    Ok(named)
}

// ── Noop backend (embeddings disabled) ───────────────────────────────

pub struct NoopEmbedding;

impl EmbeddingBackend for NoopEmbedding {
    fn name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn embed<'a>(
        &'a self,
        _texts: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

// ── OpenAI-compatible embedding backend ──────────────────────────────

pub struct OpenAiCompatibleEmbedding {
    client: reqwest::Client,
    cached_embeddings_url: String,
    cached_auth_header: String,
    model: String,
    dims: usize,
}

impl OpenAiCompatibleEmbedding {
    pub fn new(base_url: &str, api_key: &str, model: &str, dims: usize) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            client: build_backend_client(),
            cached_embeddings_url: format!("{base_url}/embeddings"),
            cached_auth_header: format!("Bearer {api_key}"),
            model: model.to_string(),
            dims,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingBackend for OpenAiCompatibleEmbedding {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed<'a>(
        &'a self,
        texts: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send + 'a>> {
        Box::pin(async move {
            let request = EmbeddingRequest {
                model: &self.model,
                input: texts,
            };

            let response = self
                .client
                .post(&self.cached_embeddings_url)
                .header("Authorization", &self.cached_auth_header)
                .json(&request)
                .send()
                .await
                .context("embedding request failed")?;

            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("embedding API error: {}", sanitize_api_error(&body));
            }

            let parsed: EmbeddingResponse = response
                .json()
                .await
                .context("embedding response decode failed")?;

            let mut data = parsed.data;
            data.sort_by_key(|datum| datum.index);
            Ok(data.into_iter().map(|datum| datum.embedding).collect())
        })
    }
}
