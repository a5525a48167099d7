//! Token counting trait.
//!
//! Returns an integer count for (text, model). Implementations may not
//! support every model; `UnsupportedModel` tells the engine to fall back to
//! its character-ratio heuristic rather than fail the request.

use crate::error::TokenizerError;

pub trait Tokenizer: Send + Sync {
    /// Count tokens for `text` under the named model.
    fn count(&self, text: &str, model: &str) -> Result<usize, TokenizerError>;
}
