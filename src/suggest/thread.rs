//! Continuation-prompt assembly for inline suggestions.

use crate::generator::ThreadContext;
use std::fmt::Write as _;

/// Build the prompt asking for a natural continuation of `block_text`.
///
/// With thread context the model is steered by the prior emails (rendered
/// oldest-first); without it a generic professional/friendly continuation is
/// requested.
pub fn build_continuation_prompt(thread: Option<&ThreadContext>, block_text: &str) -> String {
    let mut prompt = String::new();

    match thread {
        Some(thread) if !thread.messages.is_empty() => {
            prompt.push_str("Given this email thread:\n");
            if let Some(subject) = thread.subject.as_deref() {
                let _ = write!(prompt, "Subject: {subject}\n\n");
            }
            for message in thread.messages.iter().rev() {
                let _ = write!(
                    prompt,
                    "From: {}\nTime: {}\nContent:\n{}\n\n",
                    message.sender, message.timestamp, message.content
                );
            }
            prompt.push_str(
                "Now the user is writing a reply. Based on the thread context and current text, \
                 suggest a natural continuation that:\n",
            );
            prompt.push_str("1. Maintains a consistent tone with previous emails\n");
            prompt.push_str("2. Addresses any questions or points raised in the thread\n");
            prompt.push_str("3. Follows the conversation flow naturally\n\n");
        }
        _ => {
            prompt.push_str(
                "Suggest a natural continuation for this email text that maintains a \
                 professional and friendly tone.\n\n",
            );
        }
    }

    prompt.push_str("Current text to continue:");
    format!("{prompt} {block_text}")
}
