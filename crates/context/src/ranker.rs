//! Relevance ranker.
//!
//! Scores and orders candidate supporting material (entities, related
//! scenes) by semantic similarity plus recency and tag signals:
//!
//! `score = semantic_weight·similarity + recency_weight·recency + tag_weight·tag`
//!
//! Embeddings are an optional capability. The strategy is checked per call:
//! no target vector means the whole call scores tag-only; a candidate
//! missing its own vector degrades individually. Ranking never fails a
//! request.

use chrono::{DateTime, Utc};
use storyloom_config::ScoringConfig;

/// What kind of material a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Entity,
    Scene,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Entity => "entity",
            Self::Scene => "scene",
        })
    }
}

/// A candidate for the supporting-material section.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub id: String,
    /// Prompt-ready rendering of the candidate.
    pub rendered: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Precomputed vector, if the embedding pipeline has one.
    pub embedding: Option<Vec<f32>>,
    /// Manually tagged on the target scene.
    pub tagged: bool,
}

/// A scored candidate, ready for budget assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub kind: CandidateKind,
    pub id: String,
    pub text: String,
    /// Composite relevance in [0, 1].
    pub score: f32,
}

/// Capability-checked scoring strategy, selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    /// Target embedding available: full semantic + recency + tag scoring.
    Semantic,
    /// No target embedding: recency + tag terms only.
    TagOnly,
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. Returns 0.0 if either vector is empty, zero,
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Linear recency decay: 1.0 for brand-new material, 0.0 at and beyond the
/// horizon.
fn recency(updated_at: DateTime<Utc>, now: DateTime<Utc>, horizon_days: u32) -> f32 {
    let age_secs = (now - updated_at).num_seconds().max(0) as f64;
    let horizon_secs = f64::from(horizon_days) * 86_400.0;
    (1.0 - age_secs / horizon_secs).clamp(0.0, 1.0) as f32
}

/// Which strategy a call with this target embedding gets.
pub fn strategy_for(target_embedding: Option<&[f32]>) -> ScoringStrategy {
    match target_embedding {
        Some(v) if !v.is_empty() => ScoringStrategy::Semantic,
        _ => ScoringStrategy::TagOnly,
    }
}

/// Score and order candidates, highest first.
///
/// Ties break by stable creation order (created_at, then id).
pub fn rank(
    target_embedding: Option<&[f32]>,
    candidates: Vec<Candidate>,
    now: DateTime<Utc>,
    scoring: &ScoringConfig,
) -> Vec<Ranked> {
    let strategy = strategy_for(target_embedding);

    let mut scored: Vec<(Ranked, DateTime<Utc>)> = candidates
        .into_iter()
        .map(|c| {
            let semantic = match (strategy, target_embedding, c.embedding.as_deref()) {
                (ScoringStrategy::Semantic, Some(target), Some(emb)) => {
                    cosine_similarity(target, emb).clamp(0.0, 1.0)
                }
                // Candidate-level fallback: no vector, no semantic term.
                _ => 0.0,
            };
            let rec = recency(c.updated_at, now, scoring.recency_horizon_days);
            let tag = if c.tagged { 1.0 } else { 0.0 };

            let score = (scoring.semantic_weight * semantic
                + scoring.recency_weight * rec
                + scoring.tag_weight * tag)
                .clamp(0.0, 1.0);

            (
                Ranked {
                    kind: c.kind,
                    id: c.id,
                    text: c.rendered,
                    score,
                },
                c.created_at,
            )
        })
        .collect();

    scored.sort_by(|(a, a_created), (b, b_created)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_created.cmp(b_created))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored.into_iter().map(|(ranked, _)| ranked).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(id: &str, embedding: Option<Vec<f32>>, tagged: bool) -> Candidate {
        Candidate {
            kind: CandidateKind::Entity,
            id: id.into(),
            rendered: format!("render of {id}"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            embedding,
            tagged,
        }
    }

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_or_zero_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn fresh_tagged_identical_candidate_scores_one() {
        let target = vec![1.0, 0.0];
        let ranked = rank(
            Some(&target),
            vec![candidate("a", Some(vec![1.0, 0.0]), true)],
            Utc::now(),
            &config(),
        );
        assert!((ranked[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn negative_similarity_clamps_to_zero() {
        let target = vec![1.0, 0.0];
        let now = Utc::now();
        let mut opposite = candidate("a", Some(vec![-1.0, 0.0]), false);
        opposite.updated_at = now;
        let ranked = rank(Some(&target), vec![opposite], now, &config());
        // semantic term clamped to 0; recency term remains (fresh → 0.3)
        assert!((ranked[0].score - 0.3).abs() < 1e-5);
    }

    #[test]
    fn recency_decays_linearly_and_floors_at_horizon() {
        let now = Utc::now();
        let cfg = config(); // 90-day horizon

        let mut half = candidate("half", None, false);
        half.updated_at = now - Duration::days(45);
        let mut stale = candidate("stale", None, false);
        stale.updated_at = now - Duration::days(400);

        let ranked = rank(None, vec![half, stale], now, &cfg);
        let half_score = ranked.iter().find(|r| r.id == "half").unwrap().score;
        let stale_score = ranked.iter().find(|r| r.id == "stale").unwrap().score;
        assert!((half_score - 0.15).abs() < 1e-3); // 0.3 * 0.5
        assert_eq!(stale_score, 0.0);
    }

    #[test]
    fn higher_similarity_wins() {
        let target = vec![1.0, 0.0, 0.0];
        let now = Utc::now();
        let mut near = candidate("near", Some(vec![1.0, 0.0, 0.0]), false);
        near.updated_at = now;
        let mut far = candidate("far", Some(vec![0.1, 1.0, 0.0]), false);
        far.updated_at = now;

        let ranked = rank(Some(&target), vec![far, near], now, &config());
        assert_eq!(ranked[0].id, "near");
        assert_eq!(ranked[1].id, "far");
    }

    #[test]
    fn candidate_without_embedding_degrades_not_fails() {
        let target = vec![1.0, 0.0];
        let now = Utc::now();
        let mut with = candidate("with", Some(vec![1.0, 0.0]), false);
        with.updated_at = now;
        let mut without = candidate("without", None, true);
        without.updated_at = now;

        let ranked = rank(Some(&target), vec![with, without], now, &config());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "with"); // 0.6 + 0.3
        // tag-only candidate still scores recency + tag = 0.4
        assert!((ranked[1].score - 0.4).abs() < 1e-5);
    }

    #[test]
    fn no_target_embedding_selects_tag_only_strategy() {
        assert_eq!(strategy_for(None), ScoringStrategy::TagOnly);
        assert_eq!(strategy_for(Some(&[])), ScoringStrategy::TagOnly);
        assert_eq!(strategy_for(Some(&[1.0])), ScoringStrategy::Semantic);

        let now = Utc::now();
        let mut tagged = candidate("tagged", Some(vec![1.0]), true);
        tagged.updated_at = now;
        let mut untagged = candidate("untagged", Some(vec![1.0]), false);
        untagged.updated_at = now;

        // Embeddings present on candidates are ignored without a target.
        let ranked = rank(None, vec![untagged, tagged], now, &config());
        assert_eq!(ranked[0].id, "tagged");
        assert!((ranked[0].score - 0.4).abs() < 1e-5);
        assert!((ranked[1].score - 0.3).abs() < 1e-5);
    }

    #[test]
    fn ties_break_by_creation_order_then_id() {
        let now = Utc::now();
        let mut older = candidate("zzz", None, false);
        older.created_at = now - Duration::days(1);
        older.updated_at = now;
        let mut newer = candidate("aaa", None, false);
        newer.created_at = now;
        newer.updated_at = now;

        let ranked = rank(None, vec![newer, older], now, &config());
        // Equal scores: earlier creation first despite later id.
        assert_eq!(ranked[0].id, "zzz");
        assert_eq!(ranked[1].id, "aaa");
    }
}
