//! # Heuristic Scanner
//!
//! Runs the compiled pattern catalog over a message and every decoded or
//! folded rendering of it, then aggregates the hits into a single risk
//! score and flag set.
//!
//! ## Sweep order
//!
//! 1. The original message.
//! 2. The confusable-folded view, when folding changed anything.
//! 3. Each decoded view from the payload decoders.
//!
//! Hits are not deduplicated across views. An attack that only matches
//! after decoding still counts, and the same rule firing on several
//! views raises the hit count on purpose: stacked indicators are how an
//! encoded attack climbs past the single-pattern risk ceiling.
//!
//! ## Aggregation
//!
//! The layer risk is the maximum category risk across hits. When three
//! or more hits accumulate while the maximum stays below 0.7, the score
//! is lifted to `min(0.9, raw + 0.1 * hits)` and the synthetic
//! `multiple_indicators` flag is added.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::decode::{decode_all, DecodeKind};
use crate::normalize::fold_confusables;

/// Synthetic flag raised when several weak indicators stack up.
pub const MULTIPLE_INDICATORS: &str = "multiple_indicators";

/// Maximum characters of matched text carried in a trace.
const EXCERPT_CHARS: usize = 100;

/// Scanner tuning knobs.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Sweep decoded payload views in addition to the original message.
    pub decode_payloads: bool,
    /// Sweep the confusable-folded view when it differs.
    pub normalize_unicode: bool,
    /// Lower bound of the band in which semantic review is requested.
    pub semantic_threshold: f64,
    /// Upper bound of that band; at or past it the heuristics alone are
    /// decisive.
    pub block_threshold: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            decode_payloads: true,
            normalize_unicode: true,
            semantic_threshold: 0.3,
            block_threshold: 0.8,
        }
    }
}

/// One rule hit on one scanning view.
#[derive(Debug, Clone, Serialize)]
pub struct RuleMatch {
    /// Owning category of the rule that fired.
    pub category: String,
    /// Risk of that category.
    pub risk: f64,
    /// Rule description.
    pub description: String,
    /// Matched text, truncated to 100 characters.
    pub excerpt: String,
    /// Which decoded view the hit came from; `None` for the original.
    pub decoded_from: Option<DecodeKind>,
}

/// Aggregated result of the heuristic sweep.
#[derive(Debug, Clone, Serialize)]
pub struct HeuristicResult {
    /// Aggregated risk in [0, 1].
    pub risk_score: f64,
    /// Distinct categories that fired, plus any synthetic flags.
    pub flags: BTreeSet<String>,
    /// Every hit, in sweep order.
    pub matches: Vec<RuleMatch>,
    /// Whether the score landed in the band where semantic review adds
    /// signal.
    pub requires_semantic: bool,
    /// Wall time spent scanning, in milliseconds.
    pub elapsed_ms: u64,
}

/// Outcome of the fast pre-filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QuickCheck {
    /// No high-risk pattern matched.
    Clean,
    /// A high-risk pattern matched.
    Dangerous {
        /// Category of the first matching rule.
        category: String,
        /// Description of the first matching rule.
        description: String,
    },
}

impl QuickCheck {
    /// Returns true for [`QuickCheck::Dangerous`].
    pub fn is_dangerous(&self) -> bool {
        matches!(self, QuickCheck::Dangerous { .. })
    }
}

/// The heuristic detection layer.
#[derive(Debug)]
pub struct Scanner {
    catalog: Catalog,
    config: ScannerConfig,
}

impl Scanner {
    /// Create a scanner over a compiled catalog.
    pub fn new(catalog: Catalog, config: ScannerConfig) -> Self {
        Self { catalog, config }
    }

    /// Full sweep: original view, folded view, decoded views.
    pub fn scan(&self, message: &str) -> HeuristicResult {
        let started = Instant::now();
        let mut matches = Vec::new();

        self.sweep(message, None, &mut matches);

        if self.config.normalize_unicode {
            if let Cow::Owned(folded) = fold_confusables(message) {
                self.sweep(&folded, Some(DecodeKind::UnicodeNormalized), &mut matches);
            }
        }

        if self.config.decode_payloads {
            for view in decode_all(message) {
                if view.text != message {
                    self.sweep(&view.text, Some(view.kind), &mut matches);
                }
            }
        }

        let raw_risk = matches.iter().map(|m| m.risk).fold(0.0, f64::max);
        let mut flags: BTreeSet<String> =
            matches.iter().map(|m| m.category.clone()).collect();

        let mut risk_score = raw_risk;
        if matches.len() >= 3 && raw_risk < 0.7 {
            risk_score = (raw_risk + 0.1 * matches.len() as f64).min(0.9);
            flags.insert(MULTIPLE_INDICATORS.to_string());
        }
        let risk_score = risk_score.clamp(0.0, 1.0);

        let requires_semantic = risk_score > self.config.semantic_threshold
            && risk_score < self.config.block_threshold;

        if !matches.is_empty() {
            debug!(
                hits = matches.len(),
                risk = risk_score,
                "heuristic sweep matched"
            );
        }

        HeuristicResult {
            risk_score,
            flags,
            matches,
            requires_semantic,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Fast pre-filter: only high-risk categories, only the original
    /// view, first hit wins. No decoding, no folding.
    pub fn quick_check(&self, message: &str) -> QuickCheck {
        for rule in self.catalog.rules() {
            if rule.risk < 0.7 {
                continue;
            }
            if rule.regex.is_match(message) {
                return QuickCheck::Dangerous {
                    category: rule.category.clone(),
                    description: rule.description.clone(),
                };
            }
        }
        QuickCheck::Clean
    }

    /// The compiled catalog backing this scanner.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn sweep(&self, text: &str, origin: Option<DecodeKind>, out: &mut Vec<RuleMatch>) {
        for rule in self.catalog.rules() {
            for hit in rule.regex.find_iter(text) {
                out.push(RuleMatch {
                    category: rule.category.clone(),
                    risk: rule.risk,
                    description: rule.description.clone(),
                    excerpt: excerpt(hit.as_str()),
                    decoded_from: origin,
                });
            }
        }
    }
}

/// Truncate matched text to the trace budget on a char boundary.
fn excerpt(matched: &str) -> String {
    if matched.chars().count() <= EXCERPT_CHARS {
        matched.to_string()
    } else {
        matched.chars().take(EXCERPT_CHARS).collect()
    }
}
