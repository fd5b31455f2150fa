//! # Warden Semantic
//!
//! Model-backed intent classification for the agent-warden intrusion
//! detection engine. A message that the heuristics consider ambiguous
//! is sent to a language model with a strict JSON reply contract; when
//! no model is reachable the layer degrades to a deterministic mapping
//! from heuristic flags.
//!
//! ## Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`intent`] | The closed intent taxonomy and risk weights |
//! | [`fallback`] | Flag-to-intent mapping used without a model |
//! | [`provider`] | Backend probing (Ollama, LM Studio, hosted) |
//! | [`classifier`] | Prompting, reply validation, degradation |
//!
//! ## Failure policy
//!
//! The classifier never aborts a scan for a transient reason. Network
//! failures, timeouts, HTTP errors, and unparseable replies all fold
//! into the returned [`SemanticResult`] with an `error` or
//! `parse_error` note. The single hard error is [`SemanticError::NoProvider`]
//! in required mode.

pub mod classifier;
pub mod error;
pub mod fallback;
pub mod intent;
pub mod provider;

pub use classifier::{Classifier, SemanticConfig, SemanticMode, SemanticResult};
pub use error::SemanticError;
pub use intent::{Intent, Recommendation};
pub use provider::{ProbeTargets, ProviderKind, ResolvedProvider, DEFAULT_MODEL};
