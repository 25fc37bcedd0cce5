use super::{ContextMap, ContextProvider};
use crate::generator::GenerationContext;
use crate::tone;
use std::future::Future;
use std::pin::Pin;

pub const INFERRED_TONES_KEY: &str = "inferred_tones";
pub const TONE_CONTEXT_KEY: &str = "tone_context";

/// Wraps the tone heuristics as a context provider. Never fails: the
/// heuristics are pure, and any unrepresentable state degrades to the fixed
/// fallback tones.
pub struct ToneInferenceProvider;

impl ContextProvider for ToneInferenceProvider {
    fn name(&self) -> &str {
        "tone-inference"
    }

    fn retrieve<'a>(
        &'a self,
        _prompt: &'a str,
        context: &'a GenerationContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ContextMap>> + Send + 'a>> {
        Box::pin(async move {
            let content = context.current_content.as_deref().unwrap_or("");
            let inference = tone::infer(content, &context.recipients);

            let mut fragment = ContextMap::new();
            fragment.insert(
                INFERRED_TONES_KEY.to_string(),
                serde_json::json!(inference.tones),
            );
            fragment.insert(
                TONE_CONTEXT_KEY.to_string(),
                serde_json::json!(inference.rationale),
            );
            Ok(fragment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::ToneLabel;

    #[tokio::test]
    async fn emits_tones_and_rationale() {
        let context = GenerationContext {
            current_content: Some("This is urgent, deadline tomorrow".into()),
            ..GenerationContext::default()
        };

        let fragment = ToneInferenceProvider
            .retrieve("write a reply", &context)
            .await
            .unwrap();

        let tones: Vec<ToneLabel> =
            serde_json::from_value(fragment[INFERRED_TONES_KEY].clone()).unwrap();
        assert_eq!(tones[0], ToneLabel::Urgent);
        assert!(
            fragment[TONE_CONTEXT_KEY]
                .as_str()
                .unwrap()
                .starts_with("Based on the email context")
        );
    }

    #[tokio::test]
    async fn empty_context_yields_baseline_tones() {
        let fragment = ToneInferenceProvider
            .retrieve("hello", &GenerationContext::default())
            .await
            .unwrap();

        let tones: Vec<ToneLabel> =
            serde_json::from_value(fragment[INFERRED_TONES_KEY].clone()).unwrap();
        assert_eq!(tones, vec![ToneLabel::Professional, ToneLabel::Friendly]);
    }
}
