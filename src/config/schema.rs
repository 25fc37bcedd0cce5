use crate::conversation::ConversationLimits;
use crate::error::ConfigError;
use crate::generator::{GeneratorOptions, UserIdentity};
use crate::suggest::SuggestionConfig;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Completion API key; DRAFTPILOT_API_KEY overrides when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend identifier, for diagnostics and error messages.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub conversation: ConversationLimits,

    #[serde(default)]
    pub suggestions: SuggestionConfig,

    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_backend() -> String {
    "groq".into()
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_key: None,
            backend: default_backend(),
            base_url: default_base_url(),
            generation: GenerationConfig::default(),
            conversation: ConversationLimits::default(),
            suggestions: SuggestionConfig::default(),
            embeddings: EmbeddingConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

// ── Generation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier; environment-chosen, only the request shape is
    /// fixed here.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Short budget for question-classified prompts.
    #[serde(default = "default_question_max_tokens")]
    pub question_max_tokens: u32,

    /// Long budget for drafting prompts.
    #[serde(default = "default_draft_max_tokens")]
    pub draft_max_tokens: u32,

    /// Base system turn for new conversations.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_question_max_tokens() -> u32 {
    150
}

fn default_draft_max_tokens() -> u32 {
    1000
}

fn default_system_prompt() -> String {
    "You are an email assistant.".into()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            question_max_tokens: default_question_max_tokens(),
            draft_max_tokens: default_draft_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

// ── Embeddings (advisory enrichment) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimensions() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

// ── Identity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Display name used for signature instructions and quick-reply labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ── Loading ──────────────────────────────────────────────────────

impl Config {
    /// Load the user config, writing a default file on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        if path.exists() {
            return Self::load_from(&path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config = Self {
            config_path: path.clone(),
            ..Self::default()
        };
        let rendered = toml::to_string_pretty(&config)
            .map_err(|error| ConfigError::Load(error.to_string()))?;
        fs::write(&path, rendered)?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&raw).map_err(|error| ConfigError::Load(error.to_string()))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature {} outside 0.0..=2.0",
                self.generation.temperature
            )));
        }
        if self.generation.question_max_tokens == 0 || self.generation.draft_max_tokens == 0 {
            return Err(ConfigError::Validation(
                "token budgets must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            model: self.generation.model.clone(),
            temperature: self.generation.temperature,
            question_max_tokens: self.generation.question_max_tokens,
            draft_max_tokens: self.generation.draft_max_tokens,
            system_prompt: self.generation.system_prompt.clone(),
        }
    }

    /// Identity boundary: absent name and email is a valid state.
    pub fn identity(&self) -> Option<UserIdentity> {
        if self.identity.name.is_none() && self.identity.email.is_none() {
            return None;
        }
        Some(UserIdentity {
            name: self.identity.name.clone(),
            email: self.identity.email.clone(),
        })
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dirs = UserDirs::new()
        .ok_or_else(|| ConfigError::Load("cannot determine home directory".into()))?;
    Ok(dirs
        .home_dir()
        .join(".config")
        .join("draftpilot")
        .join("config.toml"))
}
