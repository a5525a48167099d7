//! Engine orchestration: the `compose` entry point, result caching, and
//! in-flight call collapsing.
//!
//! `compose` is read-only over story data and issues a bounded number of
//! store queries per call (scene, project scenes, entities, facts, style
//! guides) regardless of how much material the project holds. Results are
//! cached under a fingerprint of every input that could change the payload,
//! and concurrent identical requests collapse to a single computation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use storyloom_config::EngineConfig;
use storyloom_core::cache::ContextCache;
use storyloom_core::embedding::EmbeddingClient;
use storyloom_core::error::{ComposeError, StoreError};
use storyloom_core::fact::CanonFact;
use storyloom_core::request::{
    ContextRequest, ContextResult, MAX_TOKENS_MIN, Redaction, WINDOW_SCENES_MAX,
    WINDOW_SCENES_MIN,
};
use storyloom_core::store::StoryStore;
use storyloom_core::story::{Entity, Scene};
use storyloom_core::tokenizer::Tokenizer;

use crate::assembler::{self, AssemblyInput, VisibleFact};
use crate::fingerprint;
use crate::flight::{Flight, FlightMap, Outcome};
use crate::ranker::{self, Candidate, CandidateKind};
use crate::{gate, window};

/// The context composition engine. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct ContextEngine {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn StoryStore>,
    embeddings: Arc<dyn EmbeddingClient>,
    tokenizer: Arc<dyn Tokenizer>,
    cache: Arc<dyn ContextCache>,
    config: EngineConfig,
    flights: FlightMap,
}

/// Everything the deferred computation needs, gathered up front so the
/// leader's task owns its inputs outright.
struct ComputePlan {
    request: ContextRequest,
    scene: Scene,
    project_scenes: Vec<Scene>,
    entities: Vec<Entity>,
    /// Gated facts with their spoiler flag, in (created_at, id) order.
    visible: Vec<(CanonFact, bool)>,
    redactions: Vec<Redaction>,
    cache_key: String,
}

impl ContextEngine {
    pub fn new(
        store: Arc<dyn StoryStore>,
        embeddings: Arc<dyn EmbeddingClient>,
        tokenizer: Arc<dyn Tokenizer>,
        cache: Arc<dyn ContextCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                embeddings,
                tokenizer,
                cache,
                config,
                flights: FlightMap::new(),
            }),
        }
    }

    /// Compose the context payload for one request.
    ///
    /// Identical concurrent requests share one computation; identical
    /// sequential requests within the cache TTL share one cached result.
    /// The whole call is bounded by `timeouts.compose_ms`; on expiry the
    /// caller gets `UpstreamUnavailable` rather than an open-ended wait.
    pub async fn compose(&self, request: ContextRequest) -> Result<Arc<ContextResult>, ComposeError> {
        let deadline = Duration::from_millis(self.inner.config.timeouts.compose_ms);
        match tokio::time::timeout(deadline, self.compose_inner(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.inner.config.timeouts.compose_ms,
                    "composition deadline exceeded"
                );
                Err(ComposeError::UpstreamUnavailable(format!(
                    "composition exceeded the {}ms deadline",
                    self.inner.config.timeouts.compose_ms
                )))
            }
        }
    }

    async fn compose_inner(
        &self,
        request: ContextRequest,
    ) -> Result<Arc<ContextResult>, ComposeError> {
        validate(&request)?;
        let inner = &self.inner;

        let scene = inner
            .store
            .scene(&request.scene_id)
            .await
            .map_err(upstream)?
            .ok_or_else(|| ComposeError::SceneNotFound {
                scene_id: request.scene_id.clone(),
            })?;

        // One project-wide scene query serves reveal-scene resolution, the
        // continuity window, and related-scene candidates.
        let project_scenes = inner
            .store
            .scenes_in_project(&scene.project_id)
            .await
            .map_err(upstream)?;

        let entities = inner
            .store
            .entities(&scene.tagged_entity_ids)
            .await
            .map_err(upstream)?;
        let entity_ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
        let mut facts = inner
            .store
            .facts_for_entities(&entity_ids)
            .await
            .map_err(upstream)?;
        // Deterministic gate and redaction ordering.
        facts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        // ── Reveal gate ────────────────────────────────────────────────────
        let scenes_by_id: HashMap<&str, &Scene> =
            project_scenes.iter().map(|s| (s.id.as_str(), s)).collect();
        let now = Utc::now();
        let comparison = inner.config.gating.reveal_comparison;
        let author_override = request.include_spoilers_for_author_tools;

        let mut visible: Vec<(CanonFact, bool)> = Vec::new();
        let mut redactions: Vec<Redaction> = Vec::new();
        for fact in facts {
            let reveal_scene = fact
                .reveal_scene_id
                .as_deref()
                .and_then(|id| scenes_by_id.get(id).copied());
            let outcome = gate::evaluate(&fact, reveal_scene, &scene, comparison, now, author_override);
            if let Some(reason) = &outcome.withheld {
                redactions.push(Redaction {
                    fact_id: fact.id.clone(),
                    reason: reason.to_string(),
                    included_as_spoiler: outcome.spoiler,
                });
            }
            if outcome.visible {
                visible.push((fact, outcome.spoiler));
            }
        }

        // ── Cache lookup ───────────────────────────────────────────────────
        let visible_refs: Vec<&CanonFact> = visible.iter().map(|(f, _)| f).collect();
        let fp = fingerprint::fingerprint(&request, &inner.config.model, &scene, &visible_refs, &entities);
        let key = fingerprint::cache_key(&scene, &fp);

        if inner.config.cache.enabled {
            if let Some(hit) = inner.cache.get(&key).await {
                tracing::debug!(scene_id = %scene.id, "compose cache hit");
                return Ok(hit);
            }
        }

        // ── In-flight collapsing ───────────────────────────────────────────
        let plan = ComputePlan {
            request,
            scene,
            project_scenes,
            entities,
            visible,
            redactions,
            cache_key: key.clone(),
        };
        match inner.flights.join(&key).await {
            Flight::Follower(rx) => {
                tracing::debug!(scene_id = %plan.scene.id, "joined in-flight composition");
                FlightMap::wait(rx).await
            }
            Flight::Leader { tx, rx } => {
                // The leader's work runs in its own task so that a caller
                // abandoning the future doesn't strand the followers or the
                // cache fill.
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    // The same deadline bounds the deferred half, so a hung
                    // store resolves the flight instead of stranding every
                    // follower on it.
                    let deadline = Duration::from_millis(inner.config.timeouts.compose_ms);
                    let outcome = match tokio::time::timeout(deadline, inner.compute(plan)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(ComposeError::UpstreamUnavailable(format!(
                            "composition exceeded the {}ms deadline",
                            inner.config.timeouts.compose_ms
                        ))),
                    };
                    inner.flights.complete(&key, tx, outcome).await;
                });
                FlightMap::wait(rx).await
            }
        }
    }

    /// Drop every cached composition for one scene. Returns entries removed.
    pub async fn invalidate_scene(&self, project_id: &str, scene_id: &str) -> usize {
        let removed = self
            .inner
            .cache
            .delete_by_prefix(&fingerprint::scene_prefix(project_id, scene_id))
            .await;
        tracing::debug!(project_id, scene_id, removed, "scene cache invalidated");
        removed
    }

    /// Drop every cached composition for a project. Used after edits whose
    /// reach is hard to bound (entity renames, fact reveals, reorderings).
    pub async fn invalidate_project(&self, project_id: &str) -> usize {
        let removed = self
            .inner
            .cache
            .delete_by_prefix(&fingerprint::project_prefix(project_id))
            .await;
        tracing::debug!(project_id, removed, "project cache invalidated");
        removed
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl Inner {
    /// The deferred half of `compose`: ranking, window selection, budget
    /// assembly, and the cache fill. Runs once per flight.
    async fn compute(&self, plan: ComputePlan) -> Outcome {
        let style_guides = self
            .store
            .style_guides(&plan.scene.project_id)
            .await
            .map_err(upstream)?;

        // ── Continuity window ──────────────────────────────────────────────
        // The window never crosses a book boundary; ranking candidates below
        // span the whole project.
        let book_scenes: Vec<Scene> = plan
            .project_scenes
            .iter()
            .filter(|s| s.book_id == plan.scene.book_id)
            .cloned()
            .collect();
        let window = window::select(&book_scenes, &plan.scene, plan.request.window_scenes);
        let windowed: Vec<&str> = window.iter().map(|w| w.scene_id.as_str()).collect();

        // Related-scene candidates: summarized project scenes outside the
        // window and distinct from the target.
        let candidate_scenes: Vec<&Scene> = plan
            .project_scenes
            .iter()
            .filter(|s| {
                s.id != plan.scene.id
                    && s.summary.is_some()
                    && !windowed.contains(&s.id.as_str())
            })
            .collect();

        // ── Embeddings (optional capability) ───────────────────────────────
        let mut ids: Vec<String> = vec![plan.scene.id.clone()];
        ids.extend(plan.entities.iter().map(|e| e.id.clone()));
        ids.extend(candidate_scenes.iter().map(|s| s.id.clone()));

        let budget = Duration::from_millis(self.config.timeouts.embedding_ms);
        let mut vectors = match tokio::time::timeout(budget, self.embeddings.embeddings(&ids)).await
        {
            Ok(Ok(vectors)) => vectors,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "embedding lookup failed; ranking degrades to tag-only");
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.timeouts.embedding_ms,
                    "embedding lookup timed out; ranking degrades to tag-only"
                );
                HashMap::new()
            }
        };
        let target_embedding = vectors.remove(&plan.scene.id);

        // ── Supporting material ────────────────────────────────────────────
        let mut candidates: Vec<Candidate> = plan
            .entities
            .iter()
            .map(|e| Candidate {
                kind: CandidateKind::Entity,
                id: e.id.clone(),
                rendered: e.render(),
                created_at: e.created_at,
                updated_at: e.updated_at,
                embedding: vectors.remove(&e.id),
                tagged: true,
            })
            .collect();
        for s in &candidate_scenes {
            let Some(summary) = &s.summary else { continue };
            candidates.push(Candidate {
                kind: CandidateKind::Scene,
                id: s.id.clone(),
                rendered: format!("\"{}\": {}", s.title, summary),
                created_at: s.created_at,
                updated_at: s.updated_at,
                embedding: vectors.remove(&s.id),
                tagged: false,
            });
        }
        let ranked = ranker::rank(
            target_embedding.as_deref(),
            candidates,
            Utc::now(),
            &self.config.scoring,
        );

        // ── Facts, highest confidence first ────────────────────────────────
        let entity_names: HashMap<&str, &str> = plan
            .entities
            .iter()
            .map(|e| (e.id.as_str(), e.name.as_str()))
            .collect();
        let mut facts: Vec<VisibleFact> = plan
            .visible
            .iter()
            .map(|(fact, spoiler)| {
                let name = entity_names.get(fact.entity_id.as_str()).copied().unwrap_or("?");
                let marker = if *spoiler { "[SPOILER] " } else { "" };
                VisibleFact {
                    fact_id: fact.id.clone(),
                    rendered: format!("{marker}{name}: {}", fact.text),
                    confidence: fact.confidence,
                }
            })
            .collect();
        // Input order is (created_at, id); a stable sort keeps that as the
        // tie-break within equal confidence.
        facts.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // ── Budget assembly ────────────────────────────────────────────────
        let (prompt, token_estimate, stats) = assembler::assemble(
            AssemblyInput {
                prompt: &self.config.prompt,
                scene_body: plan.scene.body.clone(),
                window,
                facts,
                ranked,
                style_guidelines: style_guides.into_iter().map(|g| g.guideline).collect(),
                max_tokens: plan.request.max_tokens,
            },
            self.tokenizer.as_ref(),
            &self.config.model,
        )?;

        let result = Arc::new(ContextResult {
            prompt,
            redactions: plan.redactions,
            token_estimate,
            stats,
        });

        if self.config.cache.enabled {
            self.cache
                .set_with_ttl(
                    &plan.cache_key,
                    Arc::clone(&result),
                    Duration::from_secs(self.config.cache.ttl_secs),
                )
                .await;
        }
        tracing::debug!(
            scene_id = %plan.scene.id,
            token_estimate,
            redactions = result.redactions.len(),
            "composition complete"
        );
        Ok(result)
    }
}

fn validate(request: &ContextRequest) -> Result<(), ComposeError> {
    if !(WINDOW_SCENES_MIN..=WINDOW_SCENES_MAX).contains(&request.window_scenes) {
        return Err(ComposeError::InvalidRequest(format!(
            "window_scenes must be in [{WINDOW_SCENES_MIN}, {WINDOW_SCENES_MAX}], got {}",
            request.window_scenes
        )));
    }
    if request.max_tokens < MAX_TOKENS_MIN {
        return Err(ComposeError::InvalidRequest(format!(
            "max_tokens must be at least {MAX_TOKENS_MIN}, got {}",
            request.max_tokens
        )));
    }
    Ok(())
}

fn upstream(err: StoreError) -> ComposeError {
    ComposeError::UpstreamUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::HeuristicTokenizer;
    use storyloom_store::{InMemoryCache, InMemoryStore, StaticEmbeddingIndex};

    fn engine(store: InMemoryStore) -> ContextEngine {
        ContextEngine::new(
            Arc::new(store),
            Arc::new(StaticEmbeddingIndex::new()),
            Arc::new(HeuristicTokenizer),
            Arc::new(InMemoryCache::new()),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn out_of_bounds_request_rejected_before_any_lookup() {
        let eng = engine(InMemoryStore::new());

        let err = eng
            .compose(ContextRequest::new("scene-1").with_window(0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");

        let err = eng
            .compose(ContextRequest::new("scene-1").with_window(11))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");

        let err = eng
            .compose(ContextRequest::new("scene-1").with_max_tokens(99))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn unknown_scene_is_not_found() {
        let eng = engine(InMemoryStore::new());
        let err = eng.compose(ContextRequest::new("missing")).await.unwrap_err();
        match err {
            ComposeError::SceneNotFound { scene_id } => assert_eq!(scene_id, "missing"),
            other => panic!("expected SceneNotFound, got {other:?}"),
        }
    }
}
