use serde::{Deserialize, Serialize};
use strum::Display;

// ─── Tone labels ────────────────────────────────────────────────────────────

/// The closed set of tones the drafting pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToneLabel {
    Professional,
    Friendly,
    Formal,
    Casual,
    Urgent,
    Apologetic,
}

impl ToneLabel {
    /// Instruction sentence prepended to prompts by a tone modifier.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Professional => "Write in a professional and business-appropriate tone.",
            Self::Friendly => {
                "Write in a warm and friendly tone while maintaining professionalism."
            }
            Self::Formal => "Write in a formal tone suitable for official communications.",
            Self::Casual => "Write in a casual and conversational tone.",
            Self::Urgent => "Write with a sense of urgency and importance.",
            Self::Apologetic => "Write in a sincere and apologetic tone.",
        }
    }

    /// Human-readable description used when explaining an inference.
    pub fn description(self) -> &'static str {
        match self {
            Self::Professional => "Maintaining a professional and business-appropriate tone",
            Self::Friendly => "Keeping a warm and friendly tone while maintaining professionalism",
            Self::Formal => "Using a formal tone suitable for official communications",
            Self::Casual => "Adopting a casual and conversational tone",
            Self::Urgent => "Conveying a sense of urgency and importance",
            Self::Apologetic => "Expressing a sincere and apologetic tone",
        }
    }

    /// Capitalized form for user-facing labels, e.g. `[Urgent]`.
    pub fn title(self) -> &'static str {
        match self {
            Self::Professional => "Professional",
            Self::Friendly => "Friendly",
            Self::Formal => "Formal",
            Self::Casual => "Casual",
            Self::Urgent => "Urgent",
            Self::Apologetic => "Apologetic",
        }
    }
}

// ─── Inference result ───────────────────────────────────────────────────────

/// Ranked tones (at most three, first-detected-first) plus a rationale string
/// suitable for inclusion in a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneInference {
    pub tones: Vec<ToneLabel>,
    pub rationale: String,
}

// ─── Pattern tables ─────────────────────────────────────────────────────────

const URGENT_CONTENT: &[&str] = &["urgent", "asap", "immediately", "right away", "deadline"];
const FORMAL_CONTENT: &[&str] = &["dear sir", "dear madam", "regards", "sincerely", "yours truly"];
const CASUAL_CONTENT: &[&str] = &["hey", "hi there", "thanks", "cheers", "best"];
const APOLOGETIC_CONTENT: &[&str] = &["sorry", "apologize", "regret", "unfortunately", "mistake"];

const FORMAL_DOMAINS: &[&str] = &["gov", "edu", "org"];
const URGENT_ADDRESS_KEYWORDS: &[&str] = &["urgent", "emergency", "support", "help"];

fn matches_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

#[derive(Debug, Default)]
struct ContentSignals {
    urgent: bool,
    formal: bool,
    casual: bool,
    apologetic: bool,
}

#[derive(Debug, Default)]
struct RecipientSignals {
    urgent: bool,
    formal: bool,
}

fn analyze_content(content: &str) -> ContentSignals {
    let lowered = content.to_lowercase();
    ContentSignals {
        urgent: matches_any(&lowered, URGENT_CONTENT),
        formal: matches_any(&lowered, FORMAL_CONTENT),
        casual: matches_any(&lowered, CASUAL_CONTENT),
        apologetic: matches_any(&lowered, APOLOGETIC_CONTENT),
    }
}

fn analyze_recipients(recipients: &[String]) -> RecipientSignals {
    let lowered: Vec<String> = recipients.iter().map(|r| r.to_lowercase()).collect();
    RecipientSignals {
        urgent: lowered
            .iter()
            .any(|addr| matches_any(addr, URGENT_ADDRESS_KEYWORDS)),
        formal: lowered
            .iter()
            .any(|addr| matches_any(addr, FORMAL_DOMAINS)),
    }
}

// ─── Inference ──────────────────────────────────────────────────────────────

/// Infer up to three tones from the current draft text and the recipient
/// list. Pure and deterministic; never touches the network.
///
/// Detection order is behaviorally significant and drives quick-reply
/// ordering: urgent wins if either source flags it; formal takes priority
/// over casual; apologetic is additive; professional and friendly pad the
/// tail when absent.
pub fn infer(content: &str, recipients: &[String]) -> ToneInference {
    let content_signals = analyze_content(content);
    let recipient_signals = analyze_recipients(recipients);

    let mut tones = Vec::with_capacity(3);

    if content_signals.urgent || recipient_signals.urgent {
        tones.push(ToneLabel::Urgent);
    }

    if content_signals.formal || recipient_signals.formal {
        tones.push(ToneLabel::Formal);
    } else if content_signals.casual {
        tones.push(ToneLabel::Casual);
    }

    if content_signals.apologetic {
        tones.push(ToneLabel::Apologetic);
    }

    if !tones.contains(&ToneLabel::Professional) {
        tones.push(ToneLabel::Professional);
    }
    if !tones.contains(&ToneLabel::Friendly) {
        tones.push(ToneLabel::Friendly);
    }

    tones.truncate(3);

    let rationale = rationale_for(&tones);
    ToneInference { tones, rationale }
}

/// Fixed fallback used when a caller needs tones but has no inference.
pub fn fallback() -> ToneInference {
    ToneInference {
        tones: vec![ToneLabel::Professional, ToneLabel::Friendly],
        rationale: "Using default professional and friendly tones.".to_string(),
    }
}

fn rationale_for(tones: &[ToneLabel]) -> String {
    let descriptions: Vec<&str> = tones.iter().map(|t| t.description()).collect();
    format!(
        "Based on the email context, I've identified these appropriate tones: {}.",
        descriptions.join(", ")
    )
}
