use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for draftpilot.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum DraftError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Completion backend ──────────────────────────────────────────────
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    // ── Cancellation ────────────────────────────────────────────────────
    /// A caller-supplied cancellation token fired while the completion call
    /// was in flight. Never retried, never rendered as an error message.
    #[error("generation cancelled")]
    Cancelled,

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DraftError {
    /// Whether this error is a cancellation outcome rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error(
        "no API key configured for backend {0} (set DRAFTPILOT_API_KEY or api_key in config.toml)"
    )]
    MissingApiKey(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Completion backend errors ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend {backend} request failed: {message}")]
    Request { backend: String, message: String },

    #[error("backend {backend} rate-limited (retry after {retry_after_secs}s)")]
    RateLimited {
        backend: String,
        retry_after_secs: u64,
    },

    #[error("backend {backend} authentication failed")]
    Auth { backend: String },

    #[error("backend {backend} returned a malformed response: {message}")]
    Decode { backend: String, message: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, DraftError>;
