//! Canon facts and their reveal states.
//!
//! A canon fact is a discrete piece of persistent story truth attached to an
//! entity. Its reveal state controls the narrative position at which the fact
//! becomes visible to AI-bound payloads and preview UIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::story::{EntityId, SceneId};

/// Gating state of a canon fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
    /// Authored but not yet part of the revealed story. Never visible
    /// except under explicit author override.
    Planned,
    /// Part of the revealed story; always visible.
    Revealed,
    /// Hidden until the manuscript reaches a specific scene.
    RedactedUntilScene,
    /// Hidden until a wall-clock instant (e.g. serialized releases).
    RedactedUntilDate,
}

/// A discrete piece of persistent story truth attached to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonFact {
    /// Unique ID for this fact
    pub id: String,

    /// The entity this fact belongs to
    pub entity_id: EntityId,

    /// The fact text as it should appear in prompts
    pub text: String,

    /// Gating state
    pub reveal_state: RevealState,

    /// Scene at which the fact becomes visible
    /// (meaningful only for `RedactedUntilScene`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_scene_id: Option<SceneId>,

    /// Instant at which the fact becomes visible
    /// (meaningful only for `RedactedUntilDate`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_at: Option<DateTime<Utc>>,

    /// Author confidence that the fact is settled canon, in [0, 1].
    /// Higher-confidence facts survive budget truncation longer.
    pub confidence: f32,

    /// When this fact was created
    pub created_at: DateTime<Utc>,

    /// When this fact last changed
    pub updated_at: DateTime<Utc>,
}
