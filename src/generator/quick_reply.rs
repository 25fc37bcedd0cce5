//! Tone-varied quick-reply fan-out.

use super::orchestrator::EmailGenerator;
use super::{GeneratedResponse, GenerationContext, ResponseKind, UserIdentity};
use crate::context::{ContextProvider, EmailHistoryProvider, INFERRED_TONES_KEY, TONE_CONTEXT_KEY, ToneInferenceProvider};
use crate::error::{DraftError, Result};
use crate::prompt::ToneModifier;
use crate::tone::{self, ToneLabel};
use futures_util::future::join_all;
use std::sync::Arc;

impl EmailGenerator {
    /// Generate up to three alternate brief replies, one per inferred tone,
    /// concurrently.
    ///
    /// A failed slot degrades to a labeled placeholder; it never aborts the
    /// batch. A question-kind slot short-circuits the whole batch to that
    /// single question, since a clarifying question outranks speculative
    /// drafts. Cancellation is the one exception to slot isolation: it
    /// propagates cleanly.
    pub async fn quick_replies(
        &self,
        user_prompt: &str,
        context: &GenerationContext,
    ) -> Result<Vec<GeneratedResponse>> {
        let (tones, rationale) = infer_reply_tones(user_prompt, context).await;

        let slots = join_all(
            tones
                .iter()
                .map(|tone| self.quick_reply_slot(*tone, user_prompt, &rationale, context)),
        )
        .await;

        let mut results: Vec<Option<Vec<GeneratedResponse>>> = Vec::with_capacity(slots.len());
        for (tone, slot) in tones.iter().zip(slots) {
            match slot {
                Ok(responses) => results.push(Some(responses)),
                Err(error) if error.is_cancelled() => return Err(DraftError::Cancelled),
                Err(error) => {
                    tracing::warn!(tone = %tone, %error, "quick-reply slot failed");
                    results.push(None);
                }
            }
        }

        Ok(collapse_results(&tones, results))
    }

    async fn quick_reply_slot(
        &self,
        tone: ToneLabel,
        user_prompt: &str,
        rationale: &str,
        context: &GenerationContext,
    ) -> Result<Vec<GeneratedResponse>> {
        let slot_identity = context.identity.clone().map(|who| UserIdentity {
            name: who
                .name
                .map(|name| format!("{name} (Quick {} Reply)", tone.title())),
            email: who.email,
        });
        let slot_context = GenerationContext {
            current_content: context.current_content.clone(),
            recipients: context.recipients.clone(),
            // Each slot drafts in a fresh conversation.
            conversation_id: None,
            identity: slot_identity,
            cancel: context.cancel.clone(),
        };

        let slot_generator = EmailGenerator {
            backend: Arc::clone(&self.backend),
            embeddings: Arc::clone(&self.embeddings),
            store: Arc::clone(&self.store),
            providers: vec![Arc::new(EmailHistoryProvider::default())],
            modifiers: vec![Arc::new(ToneModifier::new(tone))],
            options: self.options.clone(),
        };

        let slot_prompt = format!(
            "Generate a brief reply that matches the following context: {rationale}\n\n{user_prompt}"
        );
        slot_generator.generate(&slot_prompt, &slot_context).await
    }
}

async fn infer_reply_tones(
    user_prompt: &str,
    context: &GenerationContext,
) -> (Vec<ToneLabel>, String) {
    let fragment = ToneInferenceProvider
        .retrieve(user_prompt, context)
        .await
        .unwrap_or_default();

    let tones = fragment
        .get(INFERRED_TONES_KEY)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_else(|| tone::fallback().tones);
    let rationale = fragment
        .get(TONE_CONTEXT_KEY)
        .and_then(|value| value.as_str().map(ToString::to_string))
        .unwrap_or_else(|| tone::fallback().rationale);

    (tones, rationale)
}

/// Collapse per-slot outcomes into the batch result. A question anywhere
/// wins outright; otherwise every tone yields either a labeled reply or a
/// placeholder.
fn collapse_results(
    tones: &[ToneLabel],
    results: Vec<Option<Vec<GeneratedResponse>>>,
) -> Vec<GeneratedResponse> {
    if let Some(question) = results
        .iter()
        .flatten()
        .flat_map(|responses| responses.iter())
        .find(|response| response.kind == ResponseKind::Question)
    {
        return vec![question.clone()];
    }

    tones
        .iter()
        .zip(results)
        .map(|(tone, slot)| {
            let email = slot.and_then(|responses| {
                responses
                    .into_iter()
                    .find(|response| response.kind == ResponseKind::Email)
            });
            match email {
                Some(response) => GeneratedResponse::new(
                    ResponseKind::Email,
                    format!("[{}]\n\n{}", tone.title(), response.content),
                    None,
                ),
                None => GeneratedResponse::new(
                    ResponseKind::Email,
                    format!("No {tone} response generated."),
                    None,
                ),
            }
        })
        .collect()
}
