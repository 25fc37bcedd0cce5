//! Inline "ghost text" suggestions for a live compose surface.
//!
//! One engine instance attaches to one editing surface and owns all of its
//! suggestion state; nothing here is shared across surfaces.

mod engine;
mod thread;

pub use engine::SuggestionEngine;
pub use thread::build_continuation_prompt;

use serde::{Deserialize, Serialize};

// ─── Config ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Debounce window for qualifying edits, timed from the last edit.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ─── Surface boundary ───────────────────────────────────────────────────────

/// What the engine observes about the surface after an edit.
#[derive(Debug, Clone)]
pub struct EditSnapshot {
    /// Plain text of the block the cursor is in.
    pub block_text: String,
    /// Whether the cursor sits at the end of that block.
    pub cursor_at_block_end: bool,
}

/// Events the surface feeds into the engine.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    Edited(EditSnapshot),
    /// The dedicated accept key. A no-op unless a suggestion is showing, so
    /// the surface can fall through to default key handling.
    Accept,
    Teardown,
}

/// Rendering half of the surface boundary. `show_suggestion` renders a
/// non-committed overlay near the cursor; only `insert_text` may mutate the
/// document.
pub trait SurfaceSink: Send {
    fn show_suggestion(&mut self, text: &str);
    fn clear_suggestion(&mut self);
    fn insert_text(&mut self, text: &str);
}

/// Observable per-surface suggestion cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionState {
    pub pending_text: Option<String>,
    pub is_loading: bool,
}

// ─── Signoff detection ──────────────────────────────────────────────────────

const SIGNOFF_PATTERNS: &[&str] = &[
    "best regards",
    "regards",
    "sincerely",
    "cheers",
    "thanks",
    "thank you",
    "yours truly",
    "best wishes",
    "warm regards",
    "kind regards",
    "all the best",
];

/// Whether the block already contains a closing signoff phrase. Re-evaluated
/// on every edit, so suggestions resume once the signoff is removed.
pub fn has_signoff(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SIGNOFF_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
