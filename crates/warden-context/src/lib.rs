//! # Warden Context
//!
//! Stateful risk adjustment for the agent-warden intrusion detection
//! engine. The heuristic and semantic layers judge a message in
//! isolation; this layer judges it in context: source channel trust,
//! the sender's track record, send rate, and whether the same attack
//! pattern is hitting the process from several senders at once.
//!
//! ## Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`source`] | Source channel taxonomy, trust and multiplier tables |
//! | [`history`] | Bounded per-sender records and recent-message ring |
//! | [`evaluator`] | The risk adjustment pipeline |
//!
//! All state is process-local and bounded; nothing is persisted. The
//! ledger mutexes guard short CPU-only sections and are never held
//! across I/O, so one evaluator instance is safe to share between
//! concurrent scans.

pub mod evaluator;
pub mod history;
pub mod source;

pub use evaluator::{ContextConfig, ContextEvaluator, ContextResult, RateLimit};
pub use history::{Ledger, RecentEntry, SenderRecord};
pub use source::{ScanContext, Source};
