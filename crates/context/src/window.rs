//! Scene window selector.
//!
//! Gathers the bounded set of preceding-scene summaries for continuity.
//! Operates over a prefetched, position-sorted list of the target's book
//! scenes — the engine issues exactly one query per book regardless of
//! window size.

use storyloom_core::story::{Scene, ScenePosition};

/// Placeholder for scenes whose summary has not been written yet. Emitting a
/// fixed string instead of omitting the scene keeps the window size
/// deterministic for budget accounting.
pub const MISSING_SUMMARY_PLACEHOLDER: &str = "(no summary written yet)";

/// One slot of the continuity window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSlot {
    pub scene_id: String,
    pub title: String,
    pub position: ScenePosition,
    pub summary: String,
}

impl WindowSlot {
    /// Render the slot as a prompt line.
    pub fn render(&self) -> String {
        format!("[Earlier: {}] {}", self.title, self.summary)
    }
}

/// Select up to `n` preceding-scene summaries, oldest → newest.
///
/// Prefers scenes of the target's own chapter; once those are exhausted,
/// continues into the immediately preceding chapter. `book_scenes` is
/// already book-scoped, so a book boundary is never crossed.
pub fn select(book_scenes: &[Scene], target: &Scene, n: usize) -> Vec<WindowSlot> {
    let earliest_chapter = target.position.chapter.saturating_sub(1);

    let mut preceding: Vec<&Scene> = book_scenes
        .iter()
        .filter(|s| {
            s.id != target.id
                && s.position < target.position
                && s.position.chapter >= earliest_chapter
        })
        .collect();
    preceding.sort_by_key(|s| s.position);

    let start = preceding.len().saturating_sub(n);
    preceding[start..]
        .iter()
        .map(|s| WindowSlot {
            scene_id: s.id.clone(),
            title: s.title.clone(),
            position: s.position,
            summary: s
                .summary
                .clone()
                .unwrap_or_else(|| MISSING_SUMMARY_PLACEHOLDER.to_string()),
        })
        .collect()
}
