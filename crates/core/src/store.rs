//! Story storage trait — the data-access collaborator.
//!
//! The engine is read-only over story data; this trait exposes batched
//! lookups only (one query per candidate type, never per candidate).
//! Implementations: in-memory (storyloom-store), plus whatever database the
//! hosting platform provides.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::fact::CanonFact;
use crate::story::{Entity, Scene, StyleGuide};

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// The store name (e.g., "in_memory", "postgres").
    fn name(&self) -> &str;

    /// Fetch a scene by ID.
    async fn scene(&self, id: &str) -> Result<Option<Scene>, StoreError>;

    /// All scenes of a project, sorted by authoring position ascending.
    async fn scenes_in_project(&self, project_id: &str) -> Result<Vec<Scene>, StoreError>;

    /// Batched entity lookup. Unknown IDs are silently absent.
    async fn entities(&self, ids: &[String]) -> Result<Vec<Entity>, StoreError>;

    /// All canon facts linked to any of the given entities.
    async fn facts_for_entities(&self, entity_ids: &[String]) -> Result<Vec<CanonFact>, StoreError>;

    /// Project style guidelines, in creation order.
    async fn style_guides(&self, project_id: &str) -> Result<Vec<StyleGuide>, StoreError>;
}
