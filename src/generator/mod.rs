//! Generation orchestration: context aggregation, prompt construction, and
//! response shaping for full drafts and quick replies.

mod document;
mod orchestrator;
mod postprocess;
mod quick_reply;
mod reply;

pub use document::{Document, Paragraph, TextRun};
pub use orchestrator::{EmailGenerator, GeneratorOptions};
pub use postprocess::postprocess;
pub use reply::{DraftReply, initial_reply};

#[cfg(test)]
pub(crate) use orchestrator::testing;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ─── Identity boundary ──────────────────────────────────────────────────────

/// The current user's identity, used to personalize signatures and
/// quick-reply labels. Absence is valid and degrades gracefully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
}

// ─── Generation input ───────────────────────────────────────────────────────

/// Input bundle to one generation call. Immutable per call.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// The draft currently in the compose surface, if any.
    pub current_content: Option<String>,
    /// Recipient addresses, possibly empty.
    pub recipients: Vec<String>,
    /// Caller-supplied conversation identifier; a fresh one is minted when
    /// absent. Callers are responsible for session-scoping these.
    pub conversation_id: Option<String>,
    pub identity: Option<UserIdentity>,
    /// Fires to abort the in-flight completion call.
    pub cancel: Option<CancellationToken>,
}

impl GenerationContext {
    pub fn identity_name(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|who| who.name.as_deref())
    }
}

// ─── Generation output ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseKind {
    Email,
    Question,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Start,
    End,
    Replace,
}

/// One generated response. `kind` is decided exactly once, when the response
/// is produced, and is never reinterpreted downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub id: String,
    pub content: String,
    pub kind: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<InsertPosition>,
}

impl GeneratedResponse {
    pub(crate) fn new(kind: ResponseKind, content: String, position: Option<InsertPosition>) -> Self {
        Self {
            id: format!("{kind}-{}", Uuid::new_v4()),
            content,
            kind,
            position,
        }
    }
}

// ─── Email threads ──────────────────────────────────────────────────────────

/// One prior email in the thread being replied to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Preformatted sender, e.g. `Ada Lovelace <ada@example.com>`.
    pub sender: String,
    pub timestamp: String,
    pub content: String,
}

/// Thread context attached to reply generation and inline suggestions,
/// newest message first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadContext {
    pub subject: Option<String>,
    pub messages: Vec<ThreadMessage>,
}

// ─── Conversation identifiers ───────────────────────────────────────────────

/// Mint a fresh conversation identifier from a timestamp component and a
/// random component.
pub fn mint_conversation_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("conv_{}_{}", Utc::now().timestamp_millis(), suffix)
}
