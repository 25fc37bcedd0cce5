//! Pluggable retrieval-augmented context providers.
//!
//! Each provider contributes a named slice of auxiliary context for one
//! generation call. Providers are injected at construction time as an
//! ordered collection; they run concurrently and their outputs are
//! shallow-merged, last-registered wins on key collision.

mod email_history;
mod tone_inference;

pub use email_history::EmailHistoryProvider;
pub use tone_inference::{INFERRED_TONES_KEY, TONE_CONTEXT_KEY, ToneInferenceProvider};

use crate::generator::GenerationContext;
use futures_util::future::join_all;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Flat mapping of named context fragments.
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

pub trait ContextProvider: Send + Sync {
    /// Provider identifier, for diagnostics.
    fn name(&self) -> &str;

    fn retrieve<'a>(
        &'a self,
        prompt: &'a str,
        context: &'a GenerationContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ContextMap>> + Send + 'a>>;
}

/// Run every provider concurrently and merge the results in registration
/// order. A failing provider is logged and contributes nothing; generation
/// proceeds with whatever the rest supplied.
pub async fn aggregate(
    providers: &[Arc<dyn ContextProvider>],
    prompt: &str,
    context: &GenerationContext,
) -> ContextMap {
    let results = join_all(
        providers
            .iter()
            .map(|provider| provider.retrieve(prompt, context)),
    )
    .await;

    let mut merged = ContextMap::new();
    for (provider, result) in providers.iter().zip(results) {
        match result {
            Ok(fragment) => {
                for (key, value) in fragment {
                    merged.insert(key, value);
                }
            }
            Err(error) => {
                tracing::warn!(provider = provider.name(), %error, "context provider failed");
            }
        }
    }
    merged
}
