//! Context cache trait.
//!
//! Keys are composed as `ctx/{project}/{scene}/{fingerprint}` so that
//! invalidation can sweep by key prefix (over-invalidating a little in
//! exchange for not tracking exact fingerprints). Entries carry a short TTL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::request::ContextResult;

#[async_trait]
pub trait ContextCache: Send + Sync {
    /// Fetch a live entry. Expired entries behave as absent.
    async fn get(&self, key: &str) -> Option<Arc<ContextResult>>;

    /// Store an entry with a time-to-live.
    async fn set_with_ttl(&self, key: &str, value: Arc<ContextResult>, ttl: Duration);

    /// Delete every entry whose key starts with `prefix`. Returns the number
    /// of entries removed.
    async fn delete_by_prefix(&self, prefix: &str) -> usize;
}
