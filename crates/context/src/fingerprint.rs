//! Request fingerprinting for caching and call collapsing.
//!
//! The fingerprint is a SHA-256 over the request's effective inputs: the
//! request fields, the configured model, and the latest-modification
//! timestamps of the target scene and every visible fact and entity. Any
//! edit that could change the payload changes the fingerprint, so a cache
//! hit is always safe to return unchanged.

use sha2::{Digest, Sha256};
use storyloom_core::fact::CanonFact;
use storyloom_core::request::ContextRequest;
use storyloom_core::story::{Entity, Scene};

/// Compute the deterministic fingerprint for a request.
///
/// `visible_facts` are the facts that passed the gate (including
/// spoiler-flagged inclusions); hidden facts don't shape the payload beyond
/// their redaction entries, which are derived from the same inputs.
pub fn fingerprint(
    request: &ContextRequest,
    model: &str,
    scene: &Scene,
    visible_facts: &[&CanonFact],
    entities: &[Entity],
) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(visible_facts.len() + entities.len());
    for fact in visible_facts {
        lines.push(format!("fact:{}:{}", fact.id, fact.updated_at.timestamp_millis()));
    }
    for entity in entities {
        lines.push(format!(
            "ent:{}:{}",
            entity.id,
            entity.updated_at.timestamp_millis()
        ));
    }
    // Input order must not matter.
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(request.scene_id.as_bytes());
    hasher.update([0]);
    hasher.update(request.window_scenes.to_le_bytes());
    hasher.update(request.max_tokens.to_le_bytes());
    hasher.update([u8::from(request.include_spoilers_for_author_tools)]);
    hasher.update(model.as_bytes());
    hasher.update([0]);
    hasher.update(scene.updated_at.timestamp_millis().to_le_bytes());
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

/// Cache key for a fingerprint. Prefixed with project and scene so
/// invalidation can sweep `ctx/{project}/` or `ctx/{project}/{scene}/`.
pub fn cache_key(scene: &Scene, fp: &str) -> String {
    format!("ctx/{}/{}/{}", scene.project_id, scene.id, fp)
}

/// Prefix covering every cached composition for a scene.
pub fn scene_prefix(project_id: &str, scene_id: &str) -> String {
    format!("ctx/{project_id}/{scene_id}/")
}

/// Prefix covering every cached composition for a project.
pub fn project_prefix(project_id: &str) -> String {
    format!("ctx/{project_id}/")
}
