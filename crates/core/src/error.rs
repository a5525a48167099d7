//! Error types for the Storyloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; callers see the error of
//! the seam they crossed, never a catch-all.

use thiserror::Error;

/// The caller-visible error for `compose`.
///
/// Callers always receive either a complete payload or exactly one of these —
/// never a partial result. `Clone` because concurrent identical requests share
/// a single computation and every waiter gets the same outcome.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error("Target scene not found: {scene_id}")]
    SceneNotFound { scene_id: String },

    #[error(
        "Fixed prompt sections ({fixed_tokens} tokens) exceed the token budget ({max_tokens})"
    )]
    BudgetInfeasible {
        fixed_tokens: usize,
        max_tokens: usize,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ComposeError {
    /// Machine-readable error code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SceneNotFound { .. } => "NOT_FOUND",
            Self::BudgetInfeasible { .. } => "BUDGET_INFEASIBLE",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Store unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding lookup failed: {0}")]
    LookupFailed(String),

    #[error("Embedding service unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("No tokenizer for model: {0}")]
    UnsupportedModel(String),

    #[error("Tokenizer failed: {0}")]
    Failed(String),
}
