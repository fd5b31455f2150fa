//! # Decision Resolver
//!
//! Turns the three layer results into one action. Priority order:
//!
//! 1. Sender allow list.
//! 2. Sender block list.
//! 3. Critical-intent shortcut: command injection, credential theft,
//!    and data exfiltration block outright when classified with
//!    confidence above 0.7.
//! 4. The threshold ladder over the adjusted risk (the strict table
//!    when strict mode is on).
//!
//! The allow and block lists are mutually exclusive: inserting a sender
//! into one removes it from the other, so a sender is never both.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use warden_context::{ContextResult, ScanContext};
use warden_detect::{HeuristicResult, RuleMatch};
use warden_semantic::{Intent, SemanticResult};

use crate::config::Thresholds;

/// Final action for a scanned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forward the message.
    Allow,
    /// Forward the message but surface an alert.
    Warn,
    /// Reject the message.
    Block,
    /// Do not forward; hold a metadata-only record for review.
    Quarantine,
}

impl Action {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Warn => "warn",
            Action::Block => "block",
            Action::Quarantine => "quarantine",
        }
    }

    /// True when the message must not be forwarded.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Action::Block | Action::Quarantine)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full decision trace.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Chosen action.
    pub action: Action,
    /// Risk score the action was chosen on.
    pub risk_score: f64,
    /// Final intent attributed to the message.
    pub intent: Intent,
    /// Why this action was chosen.
    pub reason: String,
    /// Threshold table in effect.
    pub thresholds: Thresholds,
    /// Whether strict mode was in effect.
    pub strict_mode: bool,
    /// Classifier confidence, when classification ran.
    pub confidence: Option<f64>,
    /// Heuristic flags carried into the trace.
    pub flags: Vec<String>,
    /// Heuristic matches carried into the trace.
    pub matches: Vec<RuleMatch>,
    /// Classifier observations carried into the trace.
    pub red_flags: Vec<String>,
    /// Wall time of the decision, in milliseconds.
    pub elapsed_ms: u64,
}

/// Heuristic flags in the order they outrank each other when no
/// semantic intent is available.
const FLAG_PRIORITY: [(&str, Intent); 7] = [
    ("command_injection", Intent::CommandInjection),
    ("credential_theft", Intent::CredentialTheft),
    ("data_exfiltration", Intent::DataExfiltration),
    ("instruction_override", Intent::InstructionOverride),
    ("impersonation", Intent::Impersonation),
    ("discovery", Intent::Discovery),
    ("encoding", Intent::Encoding),
];

#[derive(Debug, Default)]
struct SenderLists {
    allow: HashSet<String>,
    block: HashSet<String>,
}

#[derive(Debug, Clone, Copy)]
struct Policy {
    thresholds: Thresholds,
    strict_mode: bool,
}

/// The decision layer.
#[derive(Debug)]
pub struct DecisionResolver {
    lists: Mutex<SenderLists>,
    policy: Mutex<Policy>,
}

impl DecisionResolver {
    /// Create a resolver with empty sender lists.
    pub fn new(thresholds: Thresholds, strict_mode: bool) -> Self {
        Self::with_lists(
            thresholds,
            strict_mode,
            std::iter::empty::<String>(),
            std::iter::empty::<String>(),
        )
    }

    /// Create a resolver with pre-seeded sender lists. A sender present
    /// in both starts blocked.
    pub fn with_lists(
        thresholds: Thresholds,
        strict_mode: bool,
        allow: impl IntoIterator<Item = impl Into<String>>,
        block: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut lists = SenderLists::default();
        for sender in allow {
            lists.allow.insert(sender.into());
        }
        for sender in block {
            let sender = sender.into();
            lists.allow.remove(&sender);
            lists.block.insert(sender);
        }
        Self {
            lists: Mutex::new(lists),
            policy: Mutex::new(Policy {
                thresholds,
                strict_mode,
            }),
        }
    }

    /// Add a sender to the allow list, removing it from the block list.
    pub fn allow_sender(&self, sender_id: &str) {
        let mut lists = lock(&self.lists);
        lists.block.remove(sender_id);
        lists.allow.insert(sender_id.to_string());
    }

    /// Add a sender to the block list, removing it from the allow list.
    pub fn block_sender(&self, sender_id: &str) {
        let mut lists = lock(&self.lists);
        lists.allow.remove(sender_id);
        lists.block.insert(sender_id.to_string());
    }

    /// Whether a sender is currently allow-listed.
    pub fn is_allow_listed(&self, sender_id: &str) -> bool {
        lock(&self.lists).allow.contains(sender_id)
    }

    /// Whether a sender is currently block-listed.
    pub fn is_block_listed(&self, sender_id: &str) -> bool {
        lock(&self.lists).block.contains(sender_id)
    }

    /// Replace the non-strict threshold table.
    pub fn set_thresholds(&self, thresholds: Thresholds) {
        lock(&self.policy).thresholds = thresholds;
    }

    /// Toggle strict mode.
    pub fn set_strict_mode(&self, strict_mode: bool) {
        lock(&self.policy).strict_mode = strict_mode;
    }

    /// The configured (non-strict) threshold table.
    pub fn thresholds(&self) -> Thresholds {
        lock(&self.policy).thresholds
    }

    /// Resolve the final action for one message.
    pub fn decide(
        &self,
        heuristic: &HeuristicResult,
        semantic: Option<&SemanticResult>,
        context: Option<&ContextResult>,
        ctx: &ScanContext,
    ) -> Decision {
        let started = Instant::now();

        let policy = *lock(&self.policy);
        let effective = if policy.strict_mode {
            Thresholds::STRICT
        } else {
            policy.thresholds
        };

        let risk_score = context
            .map(|c| c.adjusted_risk)
            .unwrap_or(heuristic.risk_score);
        let confidence = semantic.map(|s| s.confidence);
        let intent = final_intent(heuristic, semantic);

        let (allow_listed, block_listed) = {
            let lists = lock(&self.lists);
            (
                lists.allow.contains(&ctx.sender_id),
                lists.block.contains(&ctx.sender_id),
            )
        };

        let (action, reason) = if allow_listed {
            (Action::Allow, "sender in allow list".to_string())
        } else if block_listed {
            (Action::Block, "sender in block list".to_string())
        } else if intent.is_critical() && confidence.is_some_and(|c| c > 0.7) {
            (
                Action::Block,
                format!("critical intent {intent} classified with high confidence"),
            )
        } else if risk_score >= effective.quarantine {
            (
                Action::Quarantine,
                format!(
                    "risk {risk_score:.2} at or above quarantine threshold {:.2}",
                    effective.quarantine
                ),
            )
        } else if risk_score >= effective.block {
            (
                Action::Block,
                format!(
                    "risk {risk_score:.2} at or above block threshold {:.2}",
                    effective.block
                ),
            )
        } else if risk_score >= effective.warn {
            (
                Action::Warn,
                format!(
                    "risk {risk_score:.2} at or above warn threshold {:.2}",
                    effective.warn
                ),
            )
        } else {
            (
                Action::Allow,
                format!(
                    "risk {risk_score:.2} below warn threshold {:.2}",
                    effective.warn
                ),
            )
        };

        debug!(%action, %intent, risk = risk_score, "decision resolved");

        Decision {
            action,
            risk_score,
            intent,
            reason,
            thresholds: effective,
            strict_mode: policy.strict_mode,
            confidence,
            flags: heuristic.flags.iter().cloned().collect(),
            matches: heuristic.matches.clone(),
            red_flags: semantic.map(|s| s.red_flags.clone()).unwrap_or_default(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Final intent: the classifier's verdict when it found something,
/// otherwise the highest-priority heuristic flag.
fn final_intent(heuristic: &HeuristicResult, semantic: Option<&SemanticResult>) -> Intent {
    if let Some(semantic) = semantic {
        if semantic.intent != Intent::Benign {
            return semantic.intent;
        }
    }
    for (flag, intent) in FLAG_PRIORITY {
        if heuristic.flags.contains(flag) {
            return intent;
        }
    }
    Intent::Benign
}

/// Lock a mutex, recovering from poisoning; decision state stays usable
/// even if a panicking thread died mid-update.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
