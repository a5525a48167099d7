//! In-memory story store — useful for testing and single-process embedders.

use async_trait::async_trait;
use std::sync::Arc;
use storyloom_core::error::StoreError;
use storyloom_core::fact::CanonFact;
use storyloom_core::store::StoryStore;
use storyloom_core::story::{Entity, Scene, StyleGuide};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    scenes: Vec<Scene>,
    entities: Vec<Entity>,
    facts: Vec<CanonFact>,
    style_guides: Vec<StyleGuide>,
}

/// An in-memory store backed by plain Vecs.
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }

    /// Insert a scene, assigning an ID if empty. Returns the ID.
    pub async fn put_scene(&self, mut scene: Scene) -> String {
        if scene.id.is_empty() {
            scene.id = Uuid::new_v4().to_string();
        }
        let id = scene.id.clone();
        let mut tables = self.tables.write().await;
        tables.scenes.retain(|s| s.id != id);
        tables.scenes.push(scene);
        id
    }

    pub async fn put_entity(&self, mut entity: Entity) -> String {
        if entity.id.is_empty() {
            entity.id = Uuid::new_v4().to_string();
        }
        let id = entity.id.clone();
        let mut tables = self.tables.write().await;
        tables.entities.retain(|e| e.id != id);
        tables.entities.push(entity);
        id
    }

    pub async fn put_fact(&self, mut fact: CanonFact) -> String {
        if fact.id.is_empty() {
            fact.id = Uuid::new_v4().to_string();
        }
        let id = fact.id.clone();
        let mut tables = self.tables.write().await;
        tables.facts.retain(|f| f.id != id);
        tables.facts.push(fact);
        id
    }

    pub async fn put_style_guide(&self, mut guide: StyleGuide) -> String {
        if guide.id.is_empty() {
            guide.id = Uuid::new_v4().to_string();
        }
        let id = guide.id.clone();
        let mut tables = self.tables.write().await;
        tables.style_guides.retain(|g| g.id != id);
        tables.style_guides.push(guide);
        id
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn scene(&self, id: &str) -> Result<Option<Scene>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.scenes.iter().find(|s| s.id == id).cloned())
    }

    async fn scenes_in_project(&self, project_id: &str) -> Result<Vec<Scene>, StoreError> {
        let tables = self.tables.read().await;
        let mut scenes: Vec<Scene> = tables
            .scenes
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        scenes.sort_by_key(|s| s.position);
        Ok(scenes)
    }

    async fn entities(&self, ids: &[String]) -> Result<Vec<Entity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn facts_for_entities(
        &self,
        entity_ids: &[String],
    ) -> Result<Vec<CanonFact>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .facts
            .iter()
            .filter(|f| entity_ids.contains(&f.entity_id))
            .cloned()
            .collect())
    }

    async fn style_guides(&self, project_id: &str) -> Result<Vec<StyleGuide>, StoreError> {
        let tables = self.tables.read().await;
        let mut guides: Vec<StyleGuide> = tables
            .style_guides
            .iter()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        guides.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(guides)
    }
}
