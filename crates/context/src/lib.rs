//! # Storyloom Context
//!
//! The context composition engine: given a target scene, assemble a
//! bounded-size prompt payload containing only narrative material visible
//! from that position in the story, rank supporting facts and entities by
//! relevance, and return an auditable record of what was withheld.
//!
//! ## Components
//!
//! - [`gate`] — the reveal gate evaluator: decides per fact and story
//!   position whether a canon fact is currently visible
//! - [`window`] — the scene window selector: bounded preceding-scene
//!   summaries for continuity
//! - [`ranker`] — relevance ranking over heterogeneous candidates
//!   (entities, related scenes) by semantic similarity, recency, and tags
//! - [`assembler`] — priority-ordered token budget enforcement
//! - [`engine`] — orchestration, caching, and in-flight call collapsing
//!
//! The engine is read-only over story data and deterministic: identical
//! requests with no intervening data changes return identical results.

pub mod assembler;
pub mod engine;
pub mod fingerprint;
pub mod flight;
pub mod gate;
pub mod ranker;
pub mod token;
pub mod window;

pub use assembler::{AssemblyInput, VisibleFact};
pub use engine::ContextEngine;
pub use gate::{GateOutcome, HiddenReason, evaluate};
pub use ranker::{Candidate, CandidateKind, Ranked, ScoringStrategy};
pub use token::HeuristicTokenizer;
pub use window::WindowSlot;
