//! Error types for the semantic layer.
//!
//! Transport failures, timeouts, and unparseable replies are not errors
//! at this boundary: the classifier folds them into the returned result
//! so a scan can finish on the deterministic fallback. The only
//! surfaced condition is the absence of any provider while one is
//! required.

use thiserror::Error;

/// Semantic layer error.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// Classification is required but no model backend could be found.
    #[error("no language model provider available")]
    NoProvider,
}
