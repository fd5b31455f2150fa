//! # Sender Ledger
//!
//! Process-local memory of who sent what. Two bounded structures:
//!
//! - A per-sender record: recent send timestamps (trimmed to ten rate
//!   windows), a violation counter, and an explicit trust flag.
//! - A ring of recent messages across all senders, used to spot the
//!   same attack pattern arriving from several senders at once.
//!
//! Both live behind their own mutex. Lock scopes are short and strictly
//! CPU-bound; nothing here is held across I/O. A poisoned lock degrades
//! to neutral answers (zero violations, no repetition, no recording)
//! instead of failing the scan.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

/// How many recent messages the repetition check inspects.
const REPETITION_LOOKBACK: usize = 20;

/// Distinct other senders required to call a pattern repeated.
const REPETITION_SENDERS: usize = 3;

/// Wall-clock milliseconds since the unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-sender history.
#[derive(Debug, Default)]
pub struct SenderRecord {
    /// Send timestamps in epoch milliseconds, oldest first.
    pub timestamps: VecDeque<u64>,
    /// How many high-risk messages this sender has produced.
    pub violations: u32,
    /// Explicit operator trust decision, when one was made.
    pub trusted: Option<bool>,
}

/// One entry in the cross-sender recent-message ring.
#[derive(Debug, Clone)]
pub struct RecentEntry {
    /// When the message was evaluated, epoch milliseconds.
    pub at_ms: u64,
    /// Who sent it.
    pub sender_id: String,
    /// Its adjusted risk.
    pub risk: f64,
    /// Descriptions of the rules it matched.
    pub rule_descriptions: Vec<String>,
}

/// Bounded, mutex-guarded sender history.
#[derive(Debug, Default)]
pub struct Ledger {
    senders: Mutex<HashMap<String, SenderRecord>>,
    recent: Mutex<VecDeque<RecentEntry>>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Violation count for a sender. Zero for unknown senders and on
    /// ledger failure.
    pub fn violations_of(&self, sender_id: &str) -> u32 {
        match self.senders.lock() {
            Ok(senders) => senders.get(sender_id).map_or(0, |r| r.violations),
            Err(_) => {
                warn!("sender ledger poisoned; treating sender as clean");
                0
            }
        }
    }

    /// How many messages the sender produced within the window ending
    /// now.
    pub fn sends_in_window(&self, sender_id: &str, now_ms: u64, window_ms: u64) -> usize {
        let floor = now_ms.saturating_sub(window_ms);
        match self.senders.lock() {
            Ok(senders) => senders
                .get(sender_id)
                .map_or(0, |r| r.timestamps.iter().filter(|&&t| t >= floor).count()),
            Err(_) => {
                warn!("sender ledger poisoned; skipping rate limit");
                0
            }
        }
    }

    /// Whether any of the given rule descriptions was recently matched
    /// by messages from several other senders.
    pub fn repeated_elsewhere(&self, sender_id: &str, descriptions: &[String]) -> bool {
        if descriptions.is_empty() {
            return false;
        }
        match self.recent.lock() {
            Ok(recent) => {
                let mut others: Vec<&str> = Vec::new();
                for entry in recent.iter().rev().take(REPETITION_LOOKBACK) {
                    if entry.sender_id == sender_id {
                        continue;
                    }
                    if !entry
                        .rule_descriptions
                        .iter()
                        .any(|d| descriptions.contains(d))
                    {
                        continue;
                    }
                    if !others.contains(&entry.sender_id.as_str()) {
                        others.push(&entry.sender_id);
                        if others.len() >= REPETITION_SENDERS {
                            return true;
                        }
                    }
                }
                false
            }
            Err(_) => {
                warn!("recent-message ring poisoned; skipping repetition check");
                false
            }
        }
    }

    /// Record one evaluated message: stamp the sender's ring, bump the
    /// violation counter on high base risk, and push the recent entry.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        sender_id: &str,
        now_ms: u64,
        window_ms: u64,
        base_risk: f64,
        adjusted_risk: f64,
        descriptions: Vec<String>,
        max_recent: usize,
    ) {
        match self.senders.lock() {
            Ok(mut senders) => {
                let record = senders.entry(sender_id.to_string()).or_default();
                record.timestamps.push_back(now_ms);
                let floor = now_ms.saturating_sub(window_ms.saturating_mul(10));
                while record.timestamps.front().is_some_and(|&t| t < floor) {
                    record.timestamps.pop_front();
                }
                if base_risk > 0.7 {
                    record.violations += 1;
                }
            }
            Err(_) => {
                warn!("sender ledger poisoned; dropping history update");
                return;
            }
        }

        match self.recent.lock() {
            Ok(mut recent) => {
                recent.push_back(RecentEntry {
                    at_ms: now_ms,
                    sender_id: sender_id.to_string(),
                    risk: adjusted_risk,
                    rule_descriptions: descriptions,
                });
                while recent.len() > max_recent {
                    recent.pop_front();
                }
            }
            Err(_) => warn!("recent-message ring poisoned; dropping entry"),
        }
    }

    /// Set or clear the explicit trust flag for a sender.
    pub fn mark_trusted(&self, sender_id: &str, trusted: bool) {
        match self.senders.lock() {
            Ok(mut senders) => {
                senders
                    .entry(sender_id.to_string())
                    .or_default()
                    .trusted = Some(trusted);
            }
            Err(_) => warn!("sender ledger poisoned; dropping trust update"),
        }
    }

    /// Explicit trust flag for a sender, if one was set.
    pub fn trust_of(&self, sender_id: &str) -> Option<bool> {
        self.senders
            .lock()
            .ok()
            .and_then(|senders| senders.get(sender_id).and_then(|r| r.trusted))
    }
}
