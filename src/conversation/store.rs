use super::types::{ConversationRecord, ConversationTurn, TurnRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

// ─── Eviction policy ────────────────────────────────────────────────────────

/// Constructor-injected bounds on process-wide conversation memory.
/// Zero means unbounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConversationLimits {
    #[serde(default = "default_max_turns")]
    pub max_turns_per_conversation: usize,
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

fn default_max_turns() -> usize {
    200
}

fn default_max_conversations() -> usize {
    256
}

impl Default for ConversationLimits {
    fn default() -> Self {
        Self {
            max_turns_per_conversation: default_max_turns(),
            max_conversations: default_max_conversations(),
        }
    }
}

// ─── Seed turns ─────────────────────────────────────────────────────────────

/// What a freshly created conversation is seeded with.
#[derive(Debug, Clone, Copy)]
pub struct ConversationSeed<'a> {
    /// Base system turn content.
    pub system_prompt: &'a str,
    /// When known, an extra system turn instructs the model to sign emails
    /// with this name.
    pub signature_name: Option<&'a str>,
}

// ─── Store ──────────────────────────────────────────────────────────────────

struct StoreInner {
    records: HashMap<String, ConversationRecord>,
    clock: u64,
}

/// Process-wide keyed memory of role-tagged turns per conversation
/// identifier.
///
/// Appends to different identifiers are independent; concurrent appends to
/// the same identifier serialize through the lock into some total order
/// consistent with arrival. Nothing here suspends, so the lock is never held
/// across an await point.
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
    limits: ConversationLimits,
}

impl ConversationStore {
    pub fn new(limits: ConversationLimits) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                records: HashMap::new(),
                clock: 0,
            }),
            limits,
        }
    }

    /// Create the conversation with its seed turns if absent, else leave it
    /// untouched. Idempotent: seeding never re-runs for a known identifier.
    pub fn ensure(&self, id: &str, seed: &ConversationSeed<'_>) {
        let mut inner = self.lock();
        inner.clock += 1;
        let stamp = inner.clock;

        if let Some(record) = inner.records.get_mut(id) {
            record.touched = stamp;
            return;
        }

        if self.limits.max_conversations > 0
            && inner.records.len() >= self.limits.max_conversations
        {
            evict_least_recently_used(&mut inner.records);
        }

        let mut record = ConversationRecord::new(stamp);
        record
            .turns
            .push(ConversationTurn::new(TurnRole::System, seed.system_prompt));
        if let Some(name) = seed.signature_name {
            record.turns.push(ConversationTurn::new(
                TurnRole::System,
                format!("User name: {name}. Always sign emails with {name}."),
            ));
        }
        inner.records.insert(id.to_string(), record);
    }

    pub fn append_user(&self, id: &str, content: &str) {
        self.append(id, TurnRole::User, content);
    }

    pub fn append_assistant(&self, id: &str, content: &str) {
        self.append(id, TurnRole::Assistant, content);
    }

    fn append(&self, id: &str, role: TurnRole, content: &str) {
        let mut inner = self.lock();
        inner.clock += 1;
        let stamp = inner.clock;
        let Some(record) = inner.records.get_mut(id) else {
            tracing::warn!(conversation = id, "append to unknown conversation dropped");
            return;
        };
        record.touched = stamp;
        record.turns.push(ConversationTurn::new(role, content));
        enforce_turn_cap(record, self.limits.max_turns_per_conversation);
    }

    /// All system turns, insertion order, blank-line separated.
    pub fn system_prompt_for(&self, id: &str) -> String {
        self.render(id, |turn| match turn.role {
            TurnRole::System => Some(turn.content.clone()),
            TurnRole::User | TurnRole::Assistant => None,
        })
    }

    /// All user/assistant turns rendered `User: …` / `Assistant: …`,
    /// insertion order, blank-line separated.
    pub fn history_prompt_for(&self, id: &str) -> String {
        self.render(id, |turn| match turn.role {
            TurnRole::User => Some(format!("User: {}", turn.content)),
            TurnRole::Assistant => Some(format!("Assistant: {}", turn.content)),
            TurnRole::System => None,
        })
    }

    /// The last `n` user/assistant turns rendered with lowercase role tags,
    /// used as embedding-enrichment input.
    pub fn recent_history(&self, id: &str, n: usize) -> String {
        let inner = self.lock();
        let Some(record) = inner.records.get(id) else {
            return String::new();
        };
        let rendered: Vec<String> = record
            .turns
            .iter()
            .filter_map(|turn| match turn.role {
                TurnRole::User => Some(format!("user: {}", turn.content)),
                TurnRole::Assistant => Some(format!("assistant: {}", turn.content)),
                TurnRole::System => None,
            })
            .collect();
        let start = rendered.len().saturating_sub(n);
        rendered[start..].join("\n\n")
    }

    /// Snapshot of one conversation's turns, if it exists.
    pub fn turns(&self, id: &str) -> Option<Vec<ConversationTurn>> {
        self.lock().records.get(id).map(|r| r.turns.clone())
    }

    pub fn conversation_count(&self) -> usize {
        self.lock().records.len()
    }

    fn render(&self, id: &str, select: impl Fn(&ConversationTurn) -> Option<String>) -> String {
        let inner = self.lock();
        let Some(record) = inner.records.get(id) else {
            return String::new();
        };
        record
            .turns
            .iter()
            .filter_map(select)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Drop the oldest non-system turns until the record fits. Seed turns
/// (system role) always survive.
fn enforce_turn_cap(record: &mut ConversationRecord, max_turns: usize) {
    if max_turns == 0 {
        return;
    }
    while record.turns.len() > max_turns {
        let Some(index) = record
            .turns
            .iter()
            .position(|turn| turn.role != TurnRole::System)
        else {
            return;
        };
        record.turns.remove(index);
    }
}

fn evict_least_recently_used(records: &mut HashMap<String, ConversationRecord>) {
    let Some(oldest) = records
        .iter()
        .min_by_key(|(_, record)| record.touched)
        .map(|(id, _)| id.clone())
    else {
        return;
    };
    tracing::debug!(conversation = %oldest, "evicting least-recently-used conversation");
    records.remove(&oldest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seed<'a>() -> ConversationSeed<'a> {
        ConversationSeed {
            system_prompt: "You are an email assistant.",
            signature_name: None,
        }
    }

    fn signed_seed(name: &str) -> ConversationSeed<'_> {
        ConversationSeed {
            system_prompt: "You are an email assistant.",
            signature_name: Some(name),
        }
    }

    #[test]
    fn ensure_seeds_base_system_turn() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &seed());

        let turns = store.turns("c1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::System);
        assert_eq!(turns[0].content, "You are an email assistant.");
    }

    #[test]
    fn ensure_with_identity_adds_signature_instruction() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &signed_seed("Jane"));

        let turns = store.turns("c1").unwrap();
        assert_eq!(turns.len(), 2);
        assert!(turns[1].content.contains("Always sign emails with Jane"));
    }

    #[test]
    fn ensure_is_idempotent_and_preserves_appends() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &seed());
        store.append_user("c1", "hello");
        store.ensure("c1", &signed_seed("Jane"));

        let turns = store.turns("c1").unwrap();
        // Second ensure must not reseed: still one system turn plus the
        // appended user turn.
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "hello");
    }

    #[test]
    fn system_prompt_joins_system_turns_in_order() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &signed_seed("Jane"));

        let rendered = store.system_prompt_for("c1");
        assert!(rendered.starts_with("You are an email assistant.\n\nUser name: Jane."));
    }

    #[test]
    fn history_prompt_renders_role_labels_in_insertion_order() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &seed());
        store.append_user("c1", "draft a reply");
        store.append_assistant("c1", "Sure, here it is.");

        assert_eq!(
            store.history_prompt_for("c1"),
            "User: draft a reply\n\nAssistant: Sure, here it is."
        );
    }

    #[test]
    fn unknown_conversation_renders_empty() {
        let store = ConversationStore::new(ConversationLimits::default());
        assert_eq!(store.system_prompt_for("missing"), "");
        assert_eq!(store.history_prompt_for("missing"), "");
    }

    #[test]
    fn recent_history_takes_last_n_turns() {
        let store = ConversationStore::new(ConversationLimits::default());
        store.ensure("c1", &seed());
        for i in 0..4 {
            store.append_user("c1", &format!("u{i}"));
            store.append_assistant("c1", &format!("a{i}"));
        }

        let recent = store.recent_history("c1", 4);
        assert_eq!(recent, "user: u2\n\nassistant: a2\n\nuser: u3\n\nassistant: a3");
    }

    #[test]
    fn turn_cap_drops_oldest_non_system_turns() {
        let store = ConversationStore::new(ConversationLimits {
            max_turns_per_conversation: 4,
            max_conversations: 0,
        });
        store.ensure("c1", &seed());
        for i in 0..4 {
            store.append_user("c1", &format!("m{i}"));
        }

        let turns = store.turns("c1").unwrap();
        assert_eq!(turns.len(), 4);
        // The system seed survives; the oldest user turn is gone.
        assert_eq!(turns[0].role, TurnRole::System);
        assert_eq!(turns[1].content, "m1");
        assert_eq!(turns[3].content, "m3");
    }

    #[test]
    fn conversation_cap_evicts_least_recently_used() {
        let store = ConversationStore::new(ConversationLimits {
            max_turns_per_conversation: 0,
            max_conversations: 2,
        });
        store.ensure("first", &seed());
        store.ensure("second", &seed());
        // Touch "first" so "second" is the eviction candidate.
        store.append_user("first", "still active");
        store.ensure("third", &seed());

        assert_eq!(store.conversation_count(), 2);
        assert!(store.turns("first").is_some());
        assert!(store.turns("second").is_none());
        assert!(store.turns("third").is_some());
    }

    #[test]
    fn concurrent_appends_to_different_ids_all_land() {
        let store = Arc::new(ConversationStore::new(ConversationLimits::default()));
        store.ensure("a", &seed());
        store.ensure("b", &seed());

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append_user(id, &format!("{id}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // One seed turn plus fifty appends each.
        assert_eq!(store.turns("a").unwrap().len(), 51);
        assert_eq!(store.turns("b").unwrap().len(), 51);
    }
}
