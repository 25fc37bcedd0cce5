//! Full-reply drafting from an email thread.

use super::document::Document;
use super::orchestrator::EmailGenerator;
use super::{GenerationContext, ThreadContext};
use crate::error::Result;
use std::fmt::Write as _;

/// A generated reply in both exposed forms: the stable block structure and
/// plain text.
#[derive(Debug, Clone)]
pub struct DraftReply {
    pub document: Document,
    pub plain_text: String,
}

/// Draft a complete reply to the given thread (messages newest-first).
pub async fn initial_reply(
    generator: &EmailGenerator,
    thread: &ThreadContext,
    context: &GenerationContext,
) -> Result<DraftReply> {
    let prompt = build_reply_prompt(thread);

    let reply_context = GenerationContext {
        current_content: None,
        ..context.clone()
    };
    let responses = generator.generate(&prompt, &reply_context).await?;

    let content = responses
        .into_iter()
        .next()
        .map(|response| response.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| anyhow::anyhow!("failed to generate reply content"))?;

    Ok(DraftReply {
        document: Document::from_lines(&content),
        plain_text: content,
    })
}

fn build_reply_prompt(thread: &ThreadContext) -> String {
    let mut prompt = String::from("Generate a complete email reply based on this thread:\n\n");

    if let Some(subject) = thread.subject.as_deref() {
        let _ = writeln!(prompt, "Subject: {subject}\n");
    }

    for (index, message) in thread.messages.iter().rev().enumerate() {
        let _ = writeln!(prompt, "Email {}:", index + 1);
        let _ = writeln!(prompt, "From: {}", message.sender);
        let _ = writeln!(prompt, "Time: {}", message.timestamp);
        let _ = writeln!(prompt, "Content:\n{}\n", message.content);
    }

    prompt.push_str("\nPlease generate a natural and contextual reply that:");
    prompt.push_str("\n1. Addresses key points from previous emails");
    prompt.push_str("\n2. Maintains appropriate tone and formality");
    prompt.push_str("\n3. Includes a suitable greeting and sign-off");
    prompt
}

#[cfg(test)]
mod tests {
    use super::super::orchestrator::testing::FakeBackend;
    use super::super::orchestrator::GeneratorOptions;
    use super::super::ThreadMessage;
    use super::*;
    use crate::conversation::{ConversationLimits, ConversationStore};
    use crate::providers::embeddings::NoopEmbedding;
    use std::sync::Arc;

    fn thread() -> ThreadContext {
        ThreadContext {
            subject: Some("Project kickoff".into()),
            messages: vec![
                ThreadMessage {
                    sender: "Ada Lovelace <ada@example.com>".into(),
                    timestamp: "2026-07-02T10:00:00Z".into(),
                    content: "Latest: can we move to Thursday?".into(),
                },
                ThreadMessage {
                    sender: "Grace Hopper <grace@example.com>".into(),
                    timestamp: "2026-07-01T09:00:00Z".into(),
                    content: "Proposing Wednesday for kickoff.".into(),
                },
            ],
        }
    }

    fn generator_with(backend: Arc<FakeBackend>) -> EmailGenerator {
        EmailGenerator::new(
            backend,
            Arc::new(NoopEmbedding),
            Arc::new(ConversationStore::new(ConversationLimits::default())),
            GeneratorOptions::default(),
        )
    }

    #[test]
    fn reply_prompt_renders_thread_oldest_first_with_instructions() {
        let prompt = build_reply_prompt(&thread());

        assert!(prompt.starts_with("Generate a complete email reply based on this thread:"));
        assert!(prompt.contains("Subject: Project kickoff"));

        let first = prompt.find("Grace Hopper").unwrap();
        let second = prompt.find("Ada Lovelace").unwrap();
        assert!(first < second, "oldest message must render first");

        assert!(prompt.contains("Email 1:"));
        assert!(prompt.contains("Email 2:"));
        assert!(prompt.ends_with(
            "1. Addresses key points from previous emails\n\
             2. Maintains appropriate tone and formality\n\
             3. Includes a suitable greeting and sign-off"
        ));
    }

    #[tokio::test]
    async fn reply_exposes_plain_text_and_line_per_paragraph_document() {
        let backend = Arc::new(FakeBackend::reply_with(
            "Hi Grace,\n\nThursday works for me.\nBest,\nJane",
        ));
        let generator = generator_with(backend);

        let reply = initial_reply(&generator, &thread(), &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(reply.plain_text, "Hi Grace,\n\nThursday works for me.\nBest,\nJane");
        assert_eq!(reply.document.blocks.len(), 5);
        assert!(reply.document.blocks[1].runs.is_empty());
        assert_eq!(reply.document.blocks[0].runs[0].text, "Hi Grace,");
    }
}
