//! Request and result types for context composition.
//!
//! `ContextRequest` is built per call and discarded; `ContextResult` may be
//! cached and is shared between concurrent identical requests via `Arc`.

use serde::{Deserialize, Serialize};

use crate::story::SceneId;

/// Bounds and defaults for `ContextRequest` fields.
pub const WINDOW_SCENES_MIN: usize = 1;
pub const WINDOW_SCENES_MAX: usize = 10;
pub const WINDOW_SCENES_DEFAULT: usize = 3;
pub const MAX_TOKENS_MIN: usize = 100;
pub const MAX_TOKENS_DEFAULT: usize = 2000;

/// A single composition request. Ephemeral — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    /// Target scene the author is writing
    pub scene_id: SceneId,

    /// How many preceding-scene summaries to include, in [1, 10]
    #[serde(default = "default_window_scenes")]
    pub window_scenes: usize,

    /// Author override: include gated facts, spoiler-flagged, for
    /// author-facing tools only. Must never be set on calls whose output
    /// reaches an external model without separate explicit consent.
    #[serde(default)]
    pub include_spoilers_for_author_tools: bool,

    /// Hard token budget for the assembled payload, ≥ 100
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_window_scenes() -> usize {
    WINDOW_SCENES_DEFAULT
}
fn default_max_tokens() -> usize {
    MAX_TOKENS_DEFAULT
}

impl ContextRequest {
    /// A request for `scene_id` with all defaults.
    pub fn new(scene_id: impl Into<SceneId>) -> Self {
        Self {
            scene_id: scene_id.into(),
            window_scenes: WINDOW_SCENES_DEFAULT,
            include_spoilers_for_author_tools: false,
            max_tokens: MAX_TOKENS_DEFAULT,
        }
    }

    pub fn with_window(mut self, window_scenes: usize) -> Self {
        self.window_scenes = window_scenes;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_author_spoilers(mut self, include: bool) -> Self {
        self.include_spoilers_for_author_tools = include;
        self
    }
}

/// The assembled prompt payload, ready for a model provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptObject {
    /// Fixed system preamble (never trimmed)
    pub system: String,

    /// Fixed task instructions (never trimmed)
    pub instructions: String,

    /// Narrative context: preceding-scene summaries, the current scene body,
    /// and ranked supporting material, in prompt order
    pub scene_context: Vec<String>,

    /// Visible canon facts, highest confidence first
    pub canon_facts: Vec<String>,

    /// Project style guidelines
    pub style_guidelines: Vec<String>,

    /// Fixed guardrail text (never trimmed)
    pub guardrails: Vec<String>,
}

/// Audit entry naming an excluded (or spoiler-flagged) fact and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redaction {
    /// The gated fact
    pub fact_id: String,

    /// Human-readable reason the fact was (or would have been) withheld
    pub reason: String,

    /// True when the fact was included anyway under author override
    #[serde(default)]
    pub included_as_spoiler: bool,
}

/// Statistics for one assembled section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStats {
    /// Section name
    pub name: String,
    /// Tokens consumed by this section
    pub tokens: usize,
    /// Blocks included after budget truncation
    pub blocks_included: usize,
    /// Blocks available before truncation
    pub blocks_total: usize,
}

/// Record of blocks dropped during budget enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropRecord {
    /// Which section
    pub section: String,
    /// Number of blocks dropped
    pub blocks_dropped: usize,
    /// Estimated tokens of dropped content
    pub tokens_dropped: usize,
    /// Why
    pub reason: String,
}

/// Assembly metadata — token accounting and truncation audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Configured budget
    pub budget: usize,
    /// Per-section statistics
    pub sections: Vec<SectionStats>,
    /// Truncation records
    pub drops: Vec<DropRecord>,
}

/// The complete composition result. Ephemeral, cacheable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    /// The assembled prompt
    pub prompt: PromptObject,

    /// Every fact withheld by gating (and every spoiler-flagged inclusion)
    pub redactions: Vec<Redaction>,

    /// Total tokens of the assembled payload; always ≤ the request budget
    pub token_estimate: usize,

    /// Token accounting and truncation audit
    pub stats: AssemblyStats,
}
