//! Pluggable prompt modifiers.
//!
//! Modifiers are pure, total transformers over the outgoing prompt text,
//! injected at construction time and applied strictly in registration order
//! (each receives the output of the previous; never reordered).

use crate::context::ContextMap;
use crate::tone::ToneLabel;
use std::sync::Arc;

pub trait PromptModifier: Send + Sync {
    /// Modifier identifier, for diagnostics.
    fn name(&self) -> &str;

    fn modify(&self, prompt: &str, context: &ContextMap) -> String;
}

/// Fold the prompt through all modifiers in registration order.
pub fn apply_all(modifiers: &[Arc<dyn PromptModifier>], prompt: &str, context: &ContextMap) -> String {
    modifiers.iter().fold(prompt.to_string(), |acc, modifier| {
        modifier.modify(&acc, context)
    })
}

/// Prepends the fixed instruction sentence for one tone.
pub struct ToneModifier {
    tone: ToneLabel,
}

impl ToneModifier {
    pub fn new(tone: ToneLabel) -> Self {
        Self { tone }
    }
}

impl PromptModifier for ToneModifier {
    fn name(&self) -> &str {
        "tone"
    }

    fn modify(&self, prompt: &str, _context: &ContextMap) -> String {
        format!("{}\n\n{prompt}", self.tone.instruction())
    }
}
