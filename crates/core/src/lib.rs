//! # Storyloom Core
//!
//! Domain types, traits, and error definitions for the Storyloom context
//! composition engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (story storage, embedding retrieval, token
//! counting, caching) is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod cache;
pub mod embedding;
pub mod error;
pub mod fact;
pub mod request;
pub mod store;
pub mod story;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use cache::ContextCache;
pub use embedding::EmbeddingClient;
pub use error::{ComposeError, EmbeddingError, StoreError, TokenizerError};
pub use fact::{CanonFact, RevealState};
pub use request::{
    AssemblyStats, ContextRequest, ContextResult, DropRecord, PromptObject, Redaction,
    SectionStats,
};
pub use store::StoryStore;
pub use story::{Entity, EntityKind, Scene, ScenePosition, StyleGuide};
pub use tokenizer::Tokenizer;
