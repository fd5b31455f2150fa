//! Engine error types.
//!
//! Only two conditions escape a scan: a catalog that failed to load at
//! initialization, and the absence of a required model backend. Every
//! other failure is degraded inside the responsible layer and carried
//! in the layered result.

use thiserror::Error;

use warden_detect::CatalogError;

/// Engine error.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The pattern catalog could not be loaded. Fatal at
    /// initialization; there is no partial catalog.
    #[error("pattern catalog failed to load")]
    PatternLoad(#[from] CatalogError),

    /// Classification is required but no model backend was found.
    #[error("no language model provider available and one is required")]
    NoLlmProvider,
}
