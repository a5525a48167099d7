//! Embedding retrieval trait.
//!
//! Vectors are precomputed by an external pipeline; the engine only consumes
//! them. An ID with no vector is simply absent from the response — that is a
//! normal condition, not an error, and ranking degrades to tag-only scoring.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::EmbeddingError;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Batched lookup: fixed-length vector per ID, or absent if unavailable.
    async fn embeddings(&self, ids: &[String]) -> Result<HashMap<String, Vec<f32>>, EmbeddingError>;
}
