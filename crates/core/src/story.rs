//! Story domain types — scenes, entities, and style guides.
//!
//! Scenes have immutable identity; content and summaries are mutated by the
//! editing subsystem, which bumps `updated_at`. The engine only ever reads
//! these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProjectId = String;
pub type BookId = String;
pub type ChapterId = String;
pub type SceneId = String;
pub type EntityId = String;

/// Authoring-order position of a scene: chapter ordinal within its book plus
/// scene ordinal within its chapter. Ordered lexicographically, so comparing
/// two positions answers "does this scene come later in the manuscript?".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ScenePosition {
    /// Chapter ordinal within the book (0-based).
    pub chapter: u32,
    /// Scene ordinal within the chapter (0-based).
    pub scene: u32,
}

impl ScenePosition {
    pub fn new(chapter: u32, scene: u32) -> Self {
        Self { chapter, scene }
    }
}

impl std::fmt::Display for ScenePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}/sc{}", self.chapter, self.scene)
    }
}

/// A single scene of the manuscript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Unique ID for this scene
    pub id: SceneId,

    /// Owning project
    pub project_id: ProjectId,

    /// Owning book
    pub book_id: BookId,

    /// Owning chapter
    pub chapter_id: ChapterId,

    /// Authoring-order position
    pub position: ScenePosition,

    /// Scene title (working label, shown in redaction reasons)
    pub title: String,

    /// Editor-maintained summary; `None` until the author writes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Full body text
    pub body: String,

    /// Entities the author manually tagged on this scene
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tagged_entity_ids: Vec<EntityId>,

    /// Optional in-story chronological instant, for projects that order
    /// reveals by story time rather than authoring order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_time: Option<DateTime<Utc>>,

    /// When this scene was created
    pub created_at: DateTime<Utc>,

    /// When this scene's content or summary last changed
    pub updated_at: DateTime<Utc>,
}

/// The kind of a story entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Location,
    Item,
    Organization,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Item => "item",
            Self::Organization => "organization",
        };
        f.write_str(s)
    }
}

/// A story entity — character, location, item, or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique ID for this entity
    pub id: EntityId,

    /// Owning project
    pub project_id: ProjectId,

    /// Entity kind
    pub kind: EntityKind,

    /// Canonical name
    pub name: String,

    /// Alternative names the manuscript may use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Freeform trait descriptions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,

    /// When this entity was created
    pub created_at: DateTime<Utc>,

    /// When this entity last changed
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Render the entity as a compact prompt line.
    pub fn render(&self) -> String {
        let mut out = format!("{} ({})", self.name, self.kind);
        if !self.aliases.is_empty() {
            out.push_str(&format!(", aka {}", self.aliases.join(", ")));
        }
        if !self.traits.is_empty() {
            out.push_str(&format!(": {}", self.traits.join("; ")));
        }
        out
    }
}

/// A project-level style guideline included in assembled prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleGuide {
    /// Unique ID
    pub id: String,

    /// Owning project
    pub project_id: ProjectId,

    /// The guideline text
    pub guideline: String,

    /// When this guideline was created
    pub created_at: DateTime<Utc>,

    /// When this guideline last changed
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_chapter_then_scene() {
        assert!(ScenePosition::new(0, 5) < ScenePosition::new(1, 0));
        assert!(ScenePosition::new(2, 1) < ScenePosition::new(2, 2));
        assert_eq!(ScenePosition::new(3, 4), ScenePosition::new(3, 4));
    }

    #[test]
    fn entity_render_includes_aliases_and_traits() {
        let e = Entity {
            id: "ent-1".into(),
            project_id: "proj".into(),
            kind: EntityKind::Character,
            name: "Mara Voss".into(),
            aliases: vec!["The Cartographer".into()],
            traits: vec!["sardonic".into(), "keeps a ledger of debts".into()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered = e.render();
        assert!(rendered.contains("Mara Voss"));
        assert!(rendered.contains("character"));
        assert!(rendered.contains("The Cartographer"));
        assert!(rendered.contains("ledger of debts"));
    }
}
