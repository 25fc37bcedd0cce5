//! Process-wide conversation memory with explicit, injected eviction.

mod store;
mod types;

pub use store::{ConversationLimits, ConversationSeed, ConversationStore};
pub use types::{ConversationRecord, ConversationTurn, TurnRole};
