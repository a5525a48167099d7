//! Configuration loading and validation for the Storyloom context engine.
//!
//! Loads configuration from a TOML file with serde defaults for every field,
//! so an empty file is a valid configuration. Validates all settings before
//! the engine starts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model the payload is assembled for (drives tokenizer selection)
    #[serde(default = "default_model")]
    pub model: String,

    /// Relevance scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Reveal gate configuration
    #[serde(default)]
    pub gating: GatingConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream timeout configuration
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Fixed prompt sections
    #[serde(default)]
    pub prompt: PromptConfig,
}

fn default_model() -> String {
    "claude-sonnet-4".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            scoring: ScoringConfig::default(),
            gating: GatingConfig::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

/// Weights and horizon for the relevance ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the semantic-similarity term
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight of the recency term
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f32,

    /// Weight of the explicit-tag boost
    #[serde(default = "default_tag_weight")]
    pub tag_weight: f32,

    /// Linear recency decay horizon in days; candidates older than this
    /// score 0 on the recency term
    #[serde(default = "default_recency_horizon_days")]
    pub recency_horizon_days: u32,
}

fn default_semantic_weight() -> f32 {
    0.6
}
fn default_recency_weight() -> f32 {
    0.3
}
fn default_tag_weight() -> f32 {
    0.1
}
fn default_recency_horizon_days() -> u32 {
    90
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            recency_weight: default_recency_weight(),
            tag_weight: default_tag_weight(),
            recency_horizon_days: default_recency_horizon_days(),
        }
    }
}

/// How `RedactedUntilScene` positions are compared.
///
/// The platform's source material is ambiguous on whether reveals follow the
/// authoring index or in-story chronology, so this is a configuration point
/// rather than an inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealComparison {
    /// Compare authoring-order positions (default).
    #[default]
    AuthoringOrder,
    /// Compare in-story chronological instants when both scenes carry one,
    /// falling back to authoring order otherwise.
    StoryTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatingConfig {
    /// Position comparison mode for scene-gated reveals
    #[serde(default)]
    pub reveal_comparison: RevealComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Whether compose results are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_cache_ttl_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for the batched embedding lookup; on expiry the ranker
    /// degrades to tag-only scoring instead of failing the call
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_ms: u64,

    /// Deadline for one whole `compose` call, store queries included; on
    /// expiry the caller gets `UpstreamUnavailable`
    #[serde(default = "default_compose_timeout_ms")]
    pub compose_ms: u64,
}

fn default_embedding_timeout_ms() -> u64 {
    1500
}

fn default_compose_timeout_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_ms: default_embedding_timeout_ms(),
            compose_ms: default_compose_timeout_ms(),
        }
    }
}

/// Fixed, non-droppable prompt sections. These count against the token
/// budget but are never trimmed; if they alone exceed the budget the call
/// fails with `BudgetInfeasible`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// System preamble
    #[serde(default = "default_system")]
    pub system: String,

    /// Task instructions
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Guardrail lines appended to every payload
    #[serde(default = "default_guardrails")]
    pub guardrails: Vec<String>,
}

fn default_system() -> String {
    "You are a fiction co-writing assistant. Continue the manuscript in the \
     established voice, using only the narrative material provided below."
        .into()
}

fn default_instructions() -> String {
    "Write the next passage of the target scene. Stay consistent with the \
     scene context and canon facts. Do not invent plot developments that \
     contradict the provided material."
        .into()
}

fn default_guardrails() -> Vec<String> {
    vec![
        "Never reference events, identities, or relationships that are not \
         present in the provided context."
            .into(),
        "Do not foreshadow or hint at information absent from the provided \
         canon facts."
            .into(),
    ]
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: default_system(),
            instructions: default_instructions(),
            guardrails: default_guardrails(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "engine config loaded");
        Ok(config)
    }

    /// Validate all settings. Called by `load`; call directly when building
    /// a config in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scoring;
        for (name, w) in [
            ("semantic_weight", s.semantic_weight),
            ("recency_weight", s.recency_weight),
            ("tag_weight", s.tag_weight),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::Invalid(format!(
                    "scoring.{name} must be in [0, 1], got {w}"
                )));
            }
        }
        let sum = s.semantic_weight + s.recency_weight + s.tag_weight;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(ConfigError::Invalid(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        if s.recency_horizon_days == 0 {
            return Err(ConfigError::Invalid(
                "scoring.recency_horizon_days must be positive".into(),
            ));
        }
        if self.timeouts.compose_ms == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.compose_ms must be positive".into(),
            ));
        }
        if self.timeouts.embedding_ms >= self.timeouts.compose_ms {
            return Err(ConfigError::Invalid(format!(
                "timeouts.embedding_ms ({}) must be below timeouts.compose_ms ({})",
                self.timeouts.embedding_ms, self.timeouts.compose_ms
            )));
        }
        if self.model.is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.prompt.system.is_empty() {
            return Err(ConfigError::Invalid("prompt.system must not be empty".into()));
        }
        Ok(())
    }
}
