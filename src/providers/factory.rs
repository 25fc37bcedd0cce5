use super::compatible::OpenAiCompatibleBackend;
use super::embeddings::{EmbeddingBackend, NoopEmbedding, OpenAiCompatibleEmbedding};
use super::traits::CompletionBackend;
use crate::config::Config;
use crate::error::ConfigError;
use std::sync::Arc;

pub const API_KEY_ENV: &str = "DRAFTPILOT_API_KEY";

fn resolve_api_key(config: &Config) -> Option<String> {
    config
        .api_key
        .clone()
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|key| !key.trim().is_empty())
}

/// Build the completion backend for the configured endpoint. A missing
/// credential is fatal here; backends are never constructed without one.
pub fn create_completion_backend(
    config: &Config,
) -> Result<Arc<dyn CompletionBackend>, ConfigError> {
    let api_key =
        resolve_api_key(config).ok_or_else(|| ConfigError::MissingApiKey(config.backend.clone()))?;

    Ok(Arc::new(OpenAiCompatibleBackend::new(
        &config.backend,
        &config.base_url,
        &api_key,
    )))
}

/// Build the embedding backend. Embeddings are advisory, so a disabled or
/// credential-less setup degrades to the no-op backend instead of failing.
pub fn create_embedding_backend(config: &Config) -> Arc<dyn EmbeddingBackend> {
    if !config.embeddings.enabled {
        return Arc::new(NoopEmbedding);
    }

    match resolve_api_key(config) {
        Some(api_key) => Arc::new(OpenAiCompatibleEmbedding::new(
            &config.base_url,
            &api_key,
            &config.embeddings.model,
            config.embeddings.dimensions,
        )),
        None => {
            tracing::warn!("embeddings enabled but no API key available; disabling enrichment");
            Arc::new(NoopEmbedding)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_config_error() {
        let mut config = Config::default();
        config.api_key = None;
        // The env var may leak in from the host; only assert when absent.
        if std::env::var(API_KEY_ENV).is_err() {
            let error = create_completion_backend(&config).unwrap_err();
            assert!(matches!(error, ConfigError::MissingApiKey(_)));
        }
    }

    #[test]
    fn configured_key_builds_backend() {
        let mut config = Config::default();
        config.api_key = Some("test-key".into());
        let backend = create_completion_backend(&config).unwrap();
        assert_eq!(backend.name(), "groq");
    }

    #[test]
    fn embeddings_disabled_yields_noop() {
        let config = Config::default();
        let backend = create_embedding_backend(&config);
        assert_eq!(backend.name(), "none");
    }

    #[test]
    fn embeddings_enabled_with_key_yields_real_backend() {
        let mut config = Config::default();
        config.api_key = Some("test-key".into());
        config.embeddings.enabled = true;
        let backend = create_embedding_backend(&config);
        assert_eq!(backend.name(), "openai-compatible");
    }
}
