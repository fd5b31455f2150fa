//! # Context Evaluator
//!
//! Adjusts the risk of the current message using everything the engine
//! knows beyond its text: where it came from, who sent it, how often
//! they send, and whether the same attack pattern is arriving from
//! other senders at the same time.
//!
//! ## Evaluation order
//!
//! 1. Base risk: the heuristic score or the confidence-weighted intent
//!    risk, whichever is higher.
//! 2. Source multiplier.
//! 3. Sender reputation: a flagged message from a repeat offender is
//!    floored at an escalating sender risk. A clean message never gains
//!    risk from history alone.
//! 4. Rate limiting: +0.2 when the sender exceeded its window budget.
//! 5. Cross-sender repetition: +0.1 when the matched patterns were just
//!    seen from several other senders.
//! 6. Clamp to [0, 1], then record the message in the ledger.
//!
//! The record step is the only mutation on the scan path.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_detect::HeuristicResult;
use warden_semantic::SemanticResult;

use crate::history::{now_ms, Ledger};
use crate::source::ScanContext;

/// Sliding-window rate limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    /// Window length in milliseconds.
    #[serde(rename = "window")]
    pub window_ms: u64,
    /// Messages allowed per window.
    pub max: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max: 10,
        }
    }
}

/// Context layer configuration.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Track sender history at all. When off, every history-derived
    /// signal reads neutral and nothing is recorded.
    pub history_enabled: bool,
    /// Bound on the cross-sender recent-message ring.
    pub max_history_size: usize,
    /// Per-sender rate limit.
    pub rate_limit: RateLimit,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_enabled: true,
            max_history_size: 1000,
            rate_limit: RateLimit::default(),
        }
    }
}

/// Outcome of context evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    /// Risk before context adjustment.
    pub base_risk: f64,
    /// Final risk after all adjustments, in [0, 1].
    pub adjusted_risk: f64,
    /// Trust weight of the source channel.
    pub source_trust: f64,
    /// Multiplier applied for the source channel.
    pub source_multiplier: f64,
    /// Reputation floor applied for this sender, zero when none.
    pub sender_risk: f64,
    /// Whether the sender exceeded its rate budget.
    pub rate_limit_violation: bool,
    /// Whether the matched patterns repeat across other senders.
    pub pattern_repetition: bool,
    /// Wall time of the evaluation, in milliseconds.
    pub elapsed_ms: u64,
}

/// The context evaluation layer.
#[derive(Debug, Default)]
pub struct ContextEvaluator {
    ledger: Ledger,
    config: ContextConfig,
}

impl ContextEvaluator {
    /// Create an evaluator with an empty ledger.
    pub fn new(config: ContextConfig) -> Self {
        Self {
            ledger: Ledger::new(),
            config,
        }
    }

    /// Evaluate one message and record it.
    pub fn evaluate(
        &self,
        heuristic: &HeuristicResult,
        semantic: Option<&SemanticResult>,
        ctx: &ScanContext,
    ) -> ContextResult {
        let started = Instant::now();
        let now = now_ms();

        let intent_risk = semantic
            .map(|s| s.intent.risk_weight() * s.confidence)
            .unwrap_or(0.0);
        let base_risk = heuristic.risk_score.max(intent_risk);

        let source_trust = ctx.source.trust();
        let source_multiplier = ctx.source.risk_multiplier();
        let mut adjusted = base_risk * source_multiplier;

        let mut sender_risk = 0.0;
        let mut rate_limit_violation = false;
        let mut pattern_repetition = false;
        let descriptions: Vec<String> = heuristic
            .matches
            .iter()
            .map(|m| m.description.clone())
            .collect();

        if self.config.history_enabled {
            // Reputation only ever raises risk for a message that is
            // itself suspicious.
            let violations = self.ledger.violations_of(&ctx.sender_id);
            if !heuristic.flags.is_empty() && violations > 2 {
                sender_risk = (0.2 + 0.05 * f64::from(violations)).min(0.7);
                adjusted = adjusted.max(sender_risk);
            }

            let sent = self.ledger.sends_in_window(
                &ctx.sender_id,
                now,
                self.config.rate_limit.window_ms,
            );
            if sent >= self.config.rate_limit.max as usize {
                rate_limit_violation = true;
                adjusted = (adjusted + 0.2).min(1.0);
            }

            if self.ledger.repeated_elsewhere(&ctx.sender_id, &descriptions) {
                pattern_repetition = true;
                adjusted = (adjusted + 0.1).min(1.0);
            }
        }

        let adjusted_risk = adjusted.clamp(0.0, 1.0);

        if self.config.history_enabled {
            self.ledger.record(
                &ctx.sender_id,
                now,
                self.config.rate_limit.window_ms,
                base_risk,
                adjusted_risk,
                descriptions,
                self.config.max_history_size,
            );
        }

        debug!(
            sender = %ctx.sender_id,
            base = base_risk,
            adjusted = adjusted_risk,
            rate_limited = rate_limit_violation,
            "context evaluated"
        );

        ContextResult {
            base_risk,
            adjusted_risk,
            source_trust,
            source_multiplier,
            sender_risk,
            rate_limit_violation,
            pattern_repetition,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Set or clear the explicit trust flag on a sender record.
    pub fn mark_trusted(&self, sender_id: &str, trusted: bool) {
        self.ledger.mark_trusted(sender_id, trusted);
    }

    /// Explicit trust flag for a sender, if any.
    pub fn trust_of(&self, sender_id: &str) -> Option<bool> {
        self.ledger.trust_of(sender_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use warden_detect::RuleMatch;

    use crate::source::Source;

    fn heuristic(risk: f64, categories: &[&str]) -> HeuristicResult {
        let matches: Vec<RuleMatch> = categories
            .iter()
            .map(|c| RuleMatch {
                category: c.to_string(),
                risk,
                description: format!("{c} indicator"),
                excerpt: String::new(),
                decoded_from: None,
            })
            .collect();
        HeuristicResult {
            risk_score: risk,
            flags: categories.iter().map(|c| c.to_string()).collect(),
            matches,
            requires_semantic: false,
            elapsed_ms: 0,
        }
    }

    fn benign() -> HeuristicResult {
        HeuristicResult {
            risk_score: 0.0,
            flags: BTreeSet::new(),
            matches: Vec::new(),
            requires_semantic: false,
            elapsed_ms: 0,
        }
    }

    fn ctx(source: Source, sender: &str) -> ScanContext {
        ScanContext::new().with_source(source).with_sender(sender)
    }

    #[test]
    fn source_multiplier_is_applied() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let result = evaluator.evaluate(
            &heuristic(0.5, &["discovery"]),
            None,
            &ctx(Source::Public, "s1"),
        );
        assert!((result.adjusted_risk - 0.6).abs() < 1e-9);
        assert_eq!(result.source_multiplier, 1.2);
        assert_eq!(result.source_trust, 0.3);
    }

    #[test]
    fn internal_source_halves_risk() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let result = evaluator.evaluate(
            &heuristic(0.6, &["discovery"]),
            None,
            &ctx(Source::Internal, "s1"),
        );
        assert!((result.adjusted_risk - 0.3).abs() < 1e-9);
    }

    #[test]
    fn adjusted_risk_is_clamped_to_one() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let result = evaluator.evaluate(
            &heuristic(0.9, &["data_exfiltration"]),
            None,
            &ctx(Source::Email, "s1"),
        );
        assert_eq!(result.adjusted_risk, 1.0);
    }

    #[test]
    fn semantic_intent_raises_base_risk() {
        use warden_semantic::SemanticResult;
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let flags: BTreeSet<String> = ["command_injection".to_string()].into();
        let semantic = SemanticResult::from_flags(&flags, "disabled");
        // Heuristics saw nothing, but the classifier is confident.
        let result = evaluator.evaluate(&benign(), Some(&semantic), &ctx(Source::Known, "s1"));
        // 0.95 weight * 0.8 confidence = 0.76
        assert!((result.base_risk - 0.76).abs() < 1e-9);
    }

    #[test]
    fn rate_limit_triggers_on_eleventh_message() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let context = ctx(Source::Public, "burst");

        for _ in 0..10 {
            let result = evaluator.evaluate(&benign(), None, &context);
            assert!(!result.rate_limit_violation);
        }

        let result = evaluator.evaluate(&benign(), None, &context);
        assert!(result.rate_limit_violation);
        assert!((result.adjusted_risk - 0.2).abs() < 1e-9);
    }

    #[test]
    fn repeat_offender_floors_flagged_messages() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let context = ctx(Source::Known, "offender");

        // Three high-risk messages build up violations.
        for _ in 0..3 {
            evaluator.evaluate(&heuristic(0.9, &["command_injection"]), None, &context);
        }

        // A mildly suspicious message is floored by reputation.
        let result = evaluator.evaluate(&heuristic(0.1, &["encoding"]), None, &context);
        assert!((result.sender_risk - 0.35).abs() < 1e-9);
        assert!(result.adjusted_risk >= 0.35);
    }

    #[test]
    fn clean_message_gains_nothing_from_reputation() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let context = ctx(Source::Known, "offender");

        for _ in 0..3 {
            evaluator.evaluate(&heuristic(0.9, &["command_injection"]), None, &context);
        }

        let result = evaluator.evaluate(&benign(), None, &context);
        assert_eq!(result.sender_risk, 0.0);
        assert_eq!(result.adjusted_risk, 0.0);
    }

    #[test]
    fn cross_sender_repetition_raises_risk() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        let wave = heuristic(0.5, &["discovery"]);

        for sender in ["a", "b", "c"] {
            evaluator.evaluate(&wave, None, &ctx(Source::Public, sender));
        }

        let result = evaluator.evaluate(&wave, None, &ctx(Source::Public, "d"));
        assert!(result.pattern_repetition);
        // 0.5 * 1.2 + 0.1
        assert!((result.adjusted_risk - 0.7).abs() < 1e-9);
    }

    #[test]
    fn disabled_history_reads_neutral() {
        let config = ContextConfig {
            history_enabled: false,
            ..ContextConfig::default()
        };
        let evaluator = ContextEvaluator::new(config);
        let context = ctx(Source::Public, "s1");

        for _ in 0..20 {
            let result = evaluator.evaluate(&benign(), None, &context);
            assert!(!result.rate_limit_violation);
            assert_eq!(result.sender_risk, 0.0);
        }
    }

    #[test]
    fn adjusted_risk_never_leaves_unit_interval() {
        let evaluator = ContextEvaluator::new(ContextConfig::default());
        for source in [Source::Internal, Source::Email, Source::Untrusted] {
            for risk in [0.0, 0.3, 0.7, 1.0] {
                let result = evaluator.evaluate(
                    &heuristic(risk, &["discovery"]),
                    None,
                    &ctx(source, "s"),
                );
                assert!((0.0..=1.0).contains(&result.adjusted_risk));
                // Before bumps, adjusted is at least base * multiplier,
                // capped at 1.
                let floor = (risk * source.risk_multiplier()).min(1.0);
                assert!(result.adjusted_risk >= floor - 1e-9);
            }
        }
    }
}
