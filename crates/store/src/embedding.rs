//! Static embedding index — precomputed vectors keyed by ID.
//!
//! Stands in for the platform's embedding-retrieval service. IDs without a
//! vector are simply absent from lookups, which is how the real service
//! reports "unavailable".

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use storyloom_core::embedding::EmbeddingClient;
use storyloom_core::error::EmbeddingError;
use tokio::sync::RwLock;

pub struct StaticEmbeddingIndex {
    vectors: Arc<RwLock<HashMap<String, Vec<f32>>>>,
}

impl StaticEmbeddingIndex {
    pub fn new() -> Self {
        Self {
            vectors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn put(&self, id: impl Into<String>, vector: Vec<f32>) {
        self.vectors.write().await.insert(id.into(), vector);
    }

    pub async fn remove(&self, id: &str) {
        self.vectors.write().await.remove(id);
    }
}

impl Default for StaticEmbeddingIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for StaticEmbeddingIndex {
    async fn embeddings(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<f32>>, EmbeddingError> {
        let vectors = self.vectors.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| vectors.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }
}
