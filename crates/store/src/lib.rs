//! In-memory implementations of the Storyloom collaborator traits.
//!
//! Useful for tests and for embedders that keep story data in process.
//! Real deployments back `StoryStore` with the platform's database; these
//! implementations are behaviorally complete stand-ins.

mod cache;
mod embedding;
mod in_memory;

pub use cache::InMemoryCache;
pub use embedding::StaticEmbeddingIndex;
pub use in_memory::InMemoryStore;
