use super::postprocess::postprocess;
use super::{GeneratedResponse, GenerationContext, InsertPosition, ResponseKind, mint_conversation_id};
use crate::context::{self, ContextProvider};
use crate::conversation::{ConversationSeed, ConversationStore};
use crate::error::{DraftError, Result};
use crate::prompt::{self, PromptModifier};
use crate::providers::embeddings::{EmbeddingBackend, embed_named};
use crate::providers::traits::{CompletionBackend, CompletionRequest, CompletionResponse};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ─── Options ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub model: String,
    pub temperature: f64,
    /// Token budget when the prompt classifies as a question about the email.
    pub question_max_tokens: u32,
    /// Token budget for drafting requests.
    pub draft_max_tokens: u32,
    /// Base system turn seeded into every new conversation.
    pub system_prompt: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            question_max_tokens: 150,
            draft_max_tokens: 1000,
            system_prompt: "You are an email assistant.".to_string(),
        }
    }
}

// ─── Question classification ────────────────────────────────────────────────

const QUESTION_OPENERS: &[&str] = &[
    "what", "how", "why", "when", "where", "who", "can you", "could you", "would you", "will you",
    "is it", "are there", "should i", "do you",
];

/// Deterministic question-vs-drafting classification. Computed exactly once
/// per call on the outgoing (modifier-rewritten) prompt; the result gates
/// both token budget and response kind.
fn is_question(prompt: &str) -> bool {
    let trimmed = prompt.trim().to_lowercase();
    if trimmed.ends_with('?') {
        return true;
    }
    QUESTION_OPENERS
        .iter()
        .any(|opener| trimmed.starts_with(opener))
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Composes conversation memory, context providers, prompt modifiers, and
/// the completion backend into one request/response cycle.
pub struct EmailGenerator {
    pub(super) backend: Arc<dyn CompletionBackend>,
    pub(super) embeddings: Arc<dyn EmbeddingBackend>,
    pub(super) store: Arc<ConversationStore>,
    pub(super) providers: Vec<Arc<dyn ContextProvider>>,
    pub(super) modifiers: Vec<Arc<dyn PromptModifier>>,
    pub(super) options: GeneratorOptions,
}

impl EmailGenerator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        embeddings: Arc<dyn EmbeddingBackend>,
        store: Arc<ConversationStore>,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            backend,
            embeddings,
            store,
            providers: Vec::new(),
            modifiers: Vec::new(),
            options,
        }
    }

    /// Register a context provider. Registration order is the merge order:
    /// on key collision the last-registered provider wins.
    pub fn with_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register a prompt modifier. Modifiers apply in registration order.
    pub fn with_modifier(mut self, modifier: Arc<dyn PromptModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// The stock provider set: prior-correspondence metadata plus tone
    /// inference.
    pub fn with_default_providers(self) -> Self {
        self.with_provider(Arc::new(crate::context::EmailHistoryProvider::default()))
            .with_provider(Arc::new(crate::context::ToneInferenceProvider))
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// One full generation cycle. Returns exactly one response: a
    /// `question` response for prompts that classify as questions about the
    /// email, an `email` response otherwise.
    pub async fn generate(
        &self,
        user_prompt: &str,
        context: &GenerationContext,
    ) -> Result<Vec<GeneratedResponse>> {
        let conversation_id = context
            .conversation_id
            .clone()
            .unwrap_or_else(mint_conversation_id);
        let seed = ConversationSeed {
            system_prompt: &self.options.system_prompt,
            signature_name: context.identity_name(),
        };
        self.store.ensure(&conversation_id, &seed);

        let aggregated = context::aggregate(&self.providers, user_prompt, context).await;
        let outgoing = prompt::apply_all(&self.modifiers, user_prompt, &aggregated);

        self.store.append_user(&conversation_id, &outgoing);
        let question = is_question(&outgoing);

        let system_prompt = self.build_system_prompt(&conversation_id, context);
        let composed_prompt = format!(
            "{}\n\nUser: {outgoing}",
            self.store.history_prompt_for(&conversation_id)
        );
        let auxiliary_context = self
            .embedding_enrichment(&conversation_id, &outgoing, context)
            .await;

        let request = CompletionRequest {
            model: self.options.model.clone(),
            system_prompt,
            user_prompt: composed_prompt,
            temperature: self.options.temperature,
            max_tokens: if question {
                self.options.question_max_tokens
            } else {
                self.options.draft_max_tokens
            },
            auxiliary_context,
        };

        let response = self
            .call_backend(&request, context.cancel.as_ref())
            .await?;
        self.store
            .append_assistant(&conversation_id, &response.text);

        let generated = if question {
            GeneratedResponse::new(
                ResponseKind::Question,
                response.text,
                Some(InsertPosition::Replace),
            )
        } else {
            GeneratedResponse::new(
                ResponseKind::Email,
                postprocess(&response.text),
                Some(InsertPosition::Replace),
            )
        };
        Ok(vec![generated])
    }

    fn build_system_prompt(&self, conversation_id: &str, context: &GenerationContext) -> String {
        let mut system_prompt = self.store.system_prompt_for(conversation_id);

        if let Some(draft) = context
            .current_content
            .as_deref()
            .filter(|draft| !draft.is_empty())
        {
            system_prompt.push_str("\n\nThe user's current email draft is:\n\n");
            system_prompt.push_str(draft);
        }

        if !context.recipients.is_empty() {
            system_prompt.push_str("\n\nThe email is addressed to: ");
            system_prompt.push_str(&context.recipients.join(", "));
        }

        system_prompt
    }

    /// Best-effort embedding enrichment. Failures never abort generation.
    async fn embedding_enrichment(
        &self,
        conversation_id: &str,
        outgoing: &str,
        context: &GenerationContext,
    ) -> Option<serde_json::Value> {
        let recent = self.store.recent_history(conversation_id, 4);

        let mut entries: Vec<(&str, &str)> = Vec::new();
        if let Some(draft) = context
            .current_content
            .as_deref()
            .filter(|draft| !draft.is_empty())
        {
            entries.push(("current_email", draft));
        }
        entries.push(("user_prompt", outgoing));
        if !recent.is_empty() {
            entries.push(("conversation_history", &recent));
        }

        match embed_named(self.embeddings.as_ref(), &entries).await {
            Ok(named) if !named.is_empty() => Some(serde_json::Value::Object(named)),
            Ok(_) => None,
            Err(error) => {
                tracing::debug!(%error, "embedding enrichment failed; continuing without");
                None
            }
        }
    }

    async fn call_backend(
        &self,
        request: &CompletionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<CompletionResponse> {
        let Some(token) = cancel else {
            return Ok(self.backend.complete(request).await?);
        };

        if token.is_cancelled() {
            return Err(DraftError::Cancelled);
        }

        tokio::select! {
            biased;
            () = token.cancelled() => Err(DraftError::Cancelled),
            result = self.backend.complete(request) => Ok(result?),
        }
    }
}

// ─── Test doubles ───────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;
    use crate::conversation::{ConversationLimits, TurnRole};
    use crate::prompt::ToneModifier;
    use crate::providers::embeddings::NoopEmbedding;
    use crate::tone::ToneLabel;
    use std::future::Future;
    use std::pin::Pin;

    fn generator_with(backend: Arc<FakeBackend>) -> EmailGenerator {
        EmailGenerator::new(
            backend,
            Arc::new(NoopEmbedding),
            Arc::new(ConversationStore::new(ConversationLimits::default())),
            GeneratorOptions::default(),
        )
    }

    #[test]
    fn question_classification_matches_fixed_rule() {
        assert!(is_question("Can you confirm the meeting time?"));
        assert!(is_question("should i resend the invoice"));
        assert!(is_question("  WHAT time works for you  "));
        assert!(is_question("does this read well?"));
        assert!(!is_question("Write a reply thanking the sender"));
        assert!(!is_question("Draft a follow-up about the contract"));
    }

    #[tokio::test]
    async fn question_prompt_yields_single_question_response_with_short_budget() {
        let backend = Arc::new(FakeBackend::reply_with("Which meeting do you mean?"));
        let generator = generator_with(Arc::clone(&backend));

        let responses = generator
            .generate(
                "Can you confirm the meeting time?",
                &GenerationContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].kind, ResponseKind::Question);
        assert_eq!(responses[0].position, Some(InsertPosition::Replace));
        assert_eq!(responses[0].content, "Which meeting do you mean?");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 150);
    }

    #[tokio::test]
    async fn drafting_prompt_yields_postprocessed_email_with_long_budget() {
        let backend = Arc::new(FakeBackend::reply_with(
            "Subject: Thanks\nHi,\n\n\n\nFriday works.   \nBest,\nJane",
        ));
        let generator = generator_with(Arc::clone(&backend));

        let responses = generator
            .generate(
                "Write a reply thanking the sender and proposing Friday",
                &GenerationContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].kind, ResponseKind::Email);
        assert_eq!(responses[0].position, Some(InsertPosition::Replace));
        assert_eq!(responses[0].content, "Hi,\n\nFriday works.\nBest,\nJane");
        assert_eq!(backend.requests()[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn classification_runs_on_the_modifier_rewritten_prompt() {
        let backend = Arc::new(FakeBackend::reply_with("Done."));
        let generator = generator_with(Arc::clone(&backend))
            .with_modifier(Arc::new(ToneModifier::new(ToneLabel::Casual)));

        // Bare "what should we do" classifies as a question, but the tone
        // instruction is prepended first, so the outgoing prompt does not.
        let responses = generator
            .generate("what should we do about the invoice", &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(responses[0].kind, ResponseKind::Email);
        assert_eq!(backend.requests()[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn system_prompt_carries_draft_and_recipients_as_labeled_paragraphs() {
        let backend = Arc::new(FakeBackend::reply_with("ok"));
        let generator = generator_with(Arc::clone(&backend));

        let context = GenerationContext {
            current_content: Some("Dear team, first attempt".into()),
            recipients: vec!["a@example.com".into(), "b@example.org".into()],
            ..GenerationContext::default()
        };
        generator.generate("polish this", &context).await.unwrap();

        let system_prompt = &backend.requests()[0].system_prompt;
        assert!(system_prompt.starts_with("You are an email assistant."));
        assert!(
            system_prompt
                .contains("The user's current email draft is:\n\nDear team, first attempt")
        );
        assert!(
            system_prompt.contains("The email is addressed to: a@example.com, b@example.org")
        );
    }

    #[tokio::test]
    async fn identity_seeds_signature_instruction_into_system_prompt() {
        let backend = Arc::new(FakeBackend::reply_with("ok"));
        let generator = generator_with(Arc::clone(&backend));

        let context = GenerationContext {
            identity: Some(super::super::UserIdentity {
                name: Some("Jane".into()),
                email: Some("jane@example.com".into()),
            }),
            ..GenerationContext::default()
        };
        generator.generate("draft a note", &context).await.unwrap();

        let system_prompt = &backend.requests()[0].system_prompt;
        assert!(system_prompt.contains("Always sign emails with Jane."));
    }

    #[tokio::test]
    async fn history_replays_into_the_composed_prompt() {
        let backend = Arc::new(FakeBackend::reply_with("First reply"));
        let generator = generator_with(Arc::clone(&backend));
        let context = GenerationContext {
            conversation_id: Some("conv_fixed".into()),
            ..GenerationContext::default()
        };

        generator.generate("first prompt", &context).await.unwrap();
        generator.generate("second prompt", &context).await.unwrap();

        let second_request = &backend.requests()[1];
        assert!(second_request.user_prompt.contains("User: first prompt"));
        assert!(second_request.user_prompt.contains("Assistant: First reply"));
        // The current prompt appears both as the last history turn and as
        // the appended final turn; this repetition is pinned legacy shape.
        assert_eq!(
            second_request.user_prompt.matches("User: second prompt").count(),
            2
        );
        assert!(second_request.user_prompt.ends_with("User: second prompt"));
    }

    #[tokio::test]
    async fn successful_call_records_assistant_turn() {
        let backend = Arc::new(FakeBackend::reply_with("Raw assistant text"));
        let generator = generator_with(backend);
        let context = GenerationContext {
            conversation_id: Some("conv_record".into()),
            ..GenerationContext::default()
        };

        generator.generate("write something", &context).await.unwrap();

        let turns = generator.store().turns("conv_record").unwrap();
        let last = turns.last().unwrap();
        assert_eq!(last.role, TurnRole::Assistant);
        assert_eq!(last.content, "Raw assistant text");
    }

    #[tokio::test]
    async fn backend_failure_propagates_and_no_assistant_turn_is_recorded() {
        let backend = Arc::new(FakeBackend::respond(|_| {
            Err(crate::error::BackendError::Request {
                backend: "fake".into(),
                message: "boom".into(),
            })
        }));
        let generator = generator_with(backend);
        let context = GenerationContext {
            conversation_id: Some("conv_fail".into()),
            ..GenerationContext::default()
        };

        let error = generator.generate("draft it", &context).await.unwrap_err();
        assert!(matches!(error, DraftError::Backend(_)));

        let turns = generator.store().turns("conv_fail").unwrap();
        assert!(turns.iter().all(|turn| turn.role != TurnRole::Assistant));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits_without_backend_call() {
        let backend = Arc::new(FakeBackend::reply_with("never seen"));
        let generator = generator_with(Arc::clone(&backend));

        let token = CancellationToken::new();
        token.cancel();
        let context = GenerationContext {
            cancel: Some(token),
            ..GenerationContext::default()
        };

        let error = generator.generate("draft it", &context).await.unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_flight_yields_cancelled_not_backend_error() {
        let backend = Arc::new(
            FakeBackend::reply_with("too late").with_delay(std::time::Duration::from_secs(60)),
        );
        let generator = Arc::new(generator_with(Arc::clone(&backend)));

        let token = CancellationToken::new();
        let context = GenerationContext {
            cancel: Some(token.clone()),
            ..GenerationContext::default()
        };

        let task = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.generate("draft it", &context).await }
        });
        tokio::task::yield_now().await;
        token.cancel();

        let error = task.await.unwrap().unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_provider_does_not_fail_generation() {
        struct BrokenProvider;

        impl ContextProvider for BrokenProvider {
            fn name(&self) -> &str {
                "broken"
            }

            fn retrieve<'a>(
                &'a self,
                _prompt: &'a str,
                _context: &'a GenerationContext,
            ) -> Pin<Box<dyn Future<Output = anyhow::Result<crate::context::ContextMap>> + Send + 'a>>
            {
                Box::pin(async { anyhow::bail!("provider store offline") })
            }
        }

        let backend = Arc::new(FakeBackend::reply_with("still fine"));
        let generator = generator_with(backend).with_provider(Arc::new(BrokenProvider));

        let responses = generator
            .generate("write a reply", &GenerationContext::default())
            .await
            .unwrap();
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn missing_conversation_id_mints_one() {
        let backend = Arc::new(FakeBackend::reply_with("ok"));
        let generator = generator_with(backend);

        generator
            .generate("write a reply", &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(generator.store().conversation_count(), 1);
    }
}
