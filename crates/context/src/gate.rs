//! Reveal gate evaluator.
//!
//! Decides, for one canon fact and one story position, whether the fact is
//! currently visible. Pure arithmetic — the clock is injected so evaluation
//! is deterministic and independently testable. Visibility is two-valued;
//! the spoiler flag is an orthogonal annotation for author-facing UIs and is
//! only ever set when an author override bypasses a gate.

use chrono::{DateTime, Utc};
use storyloom_config::RevealComparison;
use storyloom_core::fact::{CanonFact, RevealState};
use storyloom_core::story::{Scene, ScenePosition};

/// Why a fact is (or would be) withheld at the target position.
#[derive(Debug, Clone, PartialEq)]
pub enum HiddenReason {
    /// PLANNED facts are not part of the revealed story.
    Planned,
    /// Gated behind a scene the manuscript has not reached yet.
    AwaitingScene {
        scene_id: String,
        title: String,
        position: ScenePosition,
    },
    /// Gated behind a wall-clock instant that has not passed yet.
    AwaitingDate { reveal_at: DateTime<Utc> },
    /// The gate itself is broken (scene-gated fact with no resolvable
    /// reveal scene). Withheld rather than silently revealed.
    MisconfiguredGate,
}

impl std::fmt::Display for HiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planned => write!(f, "planned fact, not yet part of the revealed story"),
            Self::AwaitingScene {
                scene_id,
                title,
                position,
            } => write!(
                f,
                "not revealed until \"{title}\" ({scene_id}, {position})"
            ),
            Self::AwaitingDate { reveal_at } => {
                write!(f, "not revealed until {}", reveal_at.to_rfc3339())
            }
            Self::MisconfiguredGate => {
                write!(f, "misconfigured gate: reveal scene missing or unknown")
            }
        }
    }
}

/// Outcome of evaluating one fact at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    /// Whether the fact may appear in the payload.
    pub visible: bool,
    /// True when visibility came from an author override bypassing a gate.
    /// Downstream editorial UI renders these as spoilers; payloads carrying
    /// this flag must never reach an external model without explicit consent.
    pub spoiler: bool,
    /// The reason the fact is (or without the override would be) withheld.
    /// `Some` here means a redaction record must be emitted.
    pub withheld: Option<HiddenReason>,
}

impl GateOutcome {
    fn visible() -> Self {
        Self {
            visible: true,
            spoiler: false,
            withheld: None,
        }
    }
}

/// Has the manuscript, at `target`, reached `reveal`?
///
/// `StoryTime` compares in-story instants when both scenes carry one and
/// falls back to authoring order otherwise.
fn reached(target: &Scene, reveal: &Scene, comparison: RevealComparison) -> bool {
    match comparison {
        RevealComparison::AuthoringOrder => target.position >= reveal.position,
        RevealComparison::StoryTime => match (target.story_time, reveal.story_time) {
            (Some(t), Some(r)) => t >= r,
            _ => target.position >= reveal.position,
        },
    }
}

/// Evaluate one fact at the target scene.
///
/// `reveal_scene` is the resolved scene behind `fact.reveal_scene_id`, if
/// any; resolution is the caller's job so this stays a pure function.
/// Author override bypasses every gate (misconfigured ones included, same as
/// PLANNED) but the suppressed reason is still reported so the audit entry
/// exists.
pub fn evaluate(
    fact: &CanonFact,
    reveal_scene: Option<&Scene>,
    target: &Scene,
    comparison: RevealComparison,
    now: DateTime<Utc>,
    author_override: bool,
) -> GateOutcome {
    let withheld = match fact.reveal_state {
        RevealState::Revealed => None,
        RevealState::Planned => Some(HiddenReason::Planned),
        RevealState::RedactedUntilScene => match (&fact.reveal_scene_id, reveal_scene) {
            (Some(_), Some(reveal)) => {
                if reached(target, reveal, comparison) {
                    None
                } else {
                    Some(HiddenReason::AwaitingScene {
                        scene_id: reveal.id.clone(),
                        title: reveal.title.clone(),
                        position: reveal.position,
                    })
                }
            }
            // Reference missing, or set but pointing at nothing we can
            // resolve. Never crash, never silently reveal.
            _ => Some(HiddenReason::MisconfiguredGate),
        },
        RevealState::RedactedUntilDate => match fact.reveal_at {
            Some(reveal_at) if now >= reveal_at => None,
            Some(reveal_at) => Some(HiddenReason::AwaitingDate { reveal_at }),
            None => Some(HiddenReason::MisconfiguredGate),
        },
    };

    match withheld {
        None => GateOutcome::visible(),
        Some(reason) if author_override => GateOutcome {
            visible: true,
            spoiler: true,
            withheld: Some(reason),
        },
        Some(reason) => GateOutcome {
            visible: false,
            spoiler: false,
            withheld: Some(reason),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storyloom_core::story::ScenePosition;

    fn scene(id: &str, chapter: u32, pos: u32) -> Scene {
        Scene {
            id: id.into(),
            project_id: "proj".into(),
            book_id: "book-1".into(),
            chapter_id: format!("ch{chapter}"),
            position: ScenePosition::new(chapter, pos),
            title: format!("Scene {id}"),
            summary: None,
            body: String::new(),
            tagged_entity_ids: vec![],
            story_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fact(state: RevealState) -> CanonFact {
        CanonFact {
            id: "fact-1".into(),
            entity_id: "ent-1".into(),
            text: "is_villain".into(),
            reveal_state: state,
            reveal_scene_id: None,
            reveal_at: None,
            confidence: 0.9,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn revealed_is_always_visible() {
        let target = scene("t", 0, 0);
        let out = evaluate(
            &fact(RevealState::Revealed),
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(out.visible);
        assert!(!out.spoiler);
        assert!(out.withheld.is_none());
    }

    #[test]
    fn planned_is_hidden_without_override() {
        let target = scene("t", 9, 9);
        let out = evaluate(
            &fact(RevealState::Planned),
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(!out.visible);
        assert_eq!(out.withheld, Some(HiddenReason::Planned));
    }

    #[test]
    fn planned_is_visible_under_override_and_spoiler_flagged() {
        let target = scene("t", 0, 0);
        let out = evaluate(
            &fact(RevealState::Planned),
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            true,
        );
        assert!(out.visible);
        assert!(out.spoiler);
        assert!(out.withheld.is_some());
    }

    #[test]
    fn scene_gate_hidden_before_reveal_position() {
        let mut f = fact(RevealState::RedactedUntilScene);
        f.reveal_scene_id = Some("scene-45".into());
        let reveal = scene("scene-45", 4, 5);
        let target = scene("scene-20", 2, 0);

        let out = evaluate(
            &f,
            Some(&reveal),
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(!out.visible);
        let reason = out.withheld.unwrap().to_string();
        assert!(reason.contains("scene-45"));
    }

    #[test]
    fn scene_gate_visible_at_and_after_reveal_position() {
        let mut f = fact(RevealState::RedactedUntilScene);
        f.reveal_scene_id = Some("scene-45".into());
        let reveal = scene("scene-45", 4, 5);

        // Exactly at the reveal position.
        let at = scene("t", 4, 5);
        let out = evaluate(
            &f,
            Some(&reveal),
            &at,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(out.visible);
        assert!(out.withheld.is_none());

        // Past it.
        let past = scene("t", 7, 0);
        let out = evaluate(
            &f,
            Some(&reveal),
            &past,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(out.visible);
    }

    #[test]
    fn scene_gate_without_reference_is_misconfigured_not_revealed() {
        let f = fact(RevealState::RedactedUntilScene);
        let target = scene("t", 9, 9);
        let out = evaluate(
            &f,
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(!out.visible);
        assert_eq!(out.withheld, Some(HiddenReason::MisconfiguredGate));
        assert!(out.withheld.unwrap().to_string().contains("misconfigured"));
    }

    #[test]
    fn scene_gate_with_unresolvable_reference_is_misconfigured() {
        let mut f = fact(RevealState::RedactedUntilScene);
        f.reveal_scene_id = Some("deleted-scene".into());
        let target = scene("t", 9, 9);
        let out = evaluate(
            &f,
            None, // caller could not resolve the scene
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert_eq!(out.withheld, Some(HiddenReason::MisconfiguredGate));
    }

    #[test]
    fn misconfigured_gate_bypassed_by_override() {
        let f = fact(RevealState::RedactedUntilScene);
        let target = scene("t", 0, 0);
        let out = evaluate(
            &f,
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            true,
        );
        assert!(out.visible);
        assert!(out.spoiler);
        assert_eq!(out.withheld, Some(HiddenReason::MisconfiguredGate));
    }

    #[test]
    fn date_gate_follows_the_injected_clock() {
        let now = Utc::now();
        let mut f = fact(RevealState::RedactedUntilDate);
        f.reveal_at = Some(now + Duration::hours(1));
        let target = scene("t", 0, 0);

        let out = evaluate(
            &f,
            None,
            &target,
            RevealComparison::AuthoringOrder,
            now,
            false,
        );
        assert!(!out.visible);
        assert!(matches!(
            out.withheld,
            Some(HiddenReason::AwaitingDate { .. })
        ));

        let out = evaluate(
            &f,
            None,
            &target,
            RevealComparison::AuthoringOrder,
            now + Duration::hours(2),
            false,
        );
        assert!(out.visible);
    }

    #[test]
    fn date_gate_without_timestamp_is_misconfigured() {
        let f = fact(RevealState::RedactedUntilDate);
        let target = scene("t", 0, 0);
        let out = evaluate(
            &f,
            None,
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert_eq!(out.withheld, Some(HiddenReason::MisconfiguredGate));
    }

    #[test]
    fn story_time_comparison_overrides_authoring_order() {
        let mut f = fact(RevealState::RedactedUntilScene);
        f.reveal_scene_id = Some("flashback".into());

        // The reveal scene comes later in authoring order but earlier in
        // story time (a flashback).
        let mut reveal = scene("flashback", 8, 0);
        reveal.story_time = Some(Utc::now() - Duration::days(365));
        let mut target = scene("t", 2, 0);
        target.story_time = Some(Utc::now());

        let out = evaluate(
            &f,
            Some(&reveal),
            &target,
            RevealComparison::StoryTime,
            Utc::now(),
            false,
        );
        assert!(out.visible);

        // Same scenes under authoring order stay hidden.
        let out = evaluate(
            &f,
            Some(&reveal),
            &target,
            RevealComparison::AuthoringOrder,
            Utc::now(),
            false,
        );
        assert!(!out.visible);
    }

    #[test]
    fn story_time_falls_back_when_instants_missing() {
        let mut f = fact(RevealState::RedactedUntilScene);
        f.reveal_scene_id = Some("r".into());
        let reveal = scene("r", 1, 0); // no story_time
        let target = scene("t", 3, 0);

        let out = evaluate(
            &f,
            Some(&reveal),
            &target,
            RevealComparison::StoryTime,
            Utc::now(),
            false,
        );
        assert!(out.visible); // authoring-order fallback: 3.0 >= 1.0
    }
}
