//! In-memory context cache with TTL and prefix invalidation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storyloom_core::cache::ContextCache;
use storyloom_core::request::ContextResult;
use tokio::sync::RwLock;

struct Entry {
    value: Arc<ContextResult>,
    expires_at: Instant,
}

/// A process-local cache backed by a HashMap. Expired entries are dropped
/// lazily on read and swept opportunistically on write.
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Arc<ContextResult>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(Arc::clone(&entry.value))
    }

    async fn set_with_ttl(&self, key: &str, value: Arc<ContextResult>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    async fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(prefix, removed, "cache prefix sweep");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::request::{AssemblyStats, PromptObject};

    fn result(token_estimate: usize) -> Arc<ContextResult> {
        Arc::new(ContextResult {
            prompt: PromptObject {
                system: "sys".into(),
                instructions: "inst".into(),
                scene_context: vec![],
                canon_facts: vec![],
                style_guidelines: vec![],
                guardrails: vec![],
            },
            redactions: vec![],
            token_estimate,
            stats: AssemblyStats {
                budget: 2000,
                sections: vec![],
                drops: vec![],
            },
        })
    }

    #[tokio::test]
    async fn set_and_get() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("ctx/p1/s1/abc", result(10), Duration::from_secs(60))
            .await;

        let hit = cache.get("ctx/p1/s1/abc").await.unwrap();
        assert_eq!(hit.token_estimate, 10);
        assert!(cache.get("ctx/p1/s1/other").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_behave_as_absent() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("ctx/p1/s1/abc", result(10), Duration::from_millis(0))
            .await;
        assert!(cache.get("ctx/p1/s1/abc").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn prefix_sweep_removes_matching_keys_only() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_with_ttl("ctx/p1/s1/a", result(1), ttl).await;
        cache.set_with_ttl("ctx/p1/s1/b", result(2), ttl).await;
        cache.set_with_ttl("ctx/p1/s2/c", result(3), ttl).await;
        cache.set_with_ttl("ctx/p2/s1/d", result(4), ttl).await;

        let removed = cache.delete_by_prefix("ctx/p1/s1/").await;
        assert_eq!(removed, 2);
        assert!(cache.get("ctx/p1/s2/c").await.is_some());
        assert!(cache.get("ctx/p2/s1/d").await.is_some());

        let removed = cache.delete_by_prefix("ctx/p1/").await;
        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
    }
}
