use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

/// One role-tagged message turn inside a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered turn sequence for one conversation identifier. Insertion order is
/// meaningful: it defines prompt history replay order.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub(super) turns: Vec<ConversationTurn>,
    /// Logical clock stamp of the last touch, for least-recently-used
    /// eviction.
    pub(super) touched: u64,
}

impl ConversationRecord {
    pub(super) fn new(touched: u64) -> Self {
        Self {
            turns: Vec::new(),
            touched,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}
