//! # Security Event Log
//!
//! Structured records for every non-allow outcome, emitted through
//! `tracing` under the `warden::audit` target. The raw message never
//! appears anywhere in the record: it is represented by a SHA-256
//! digest prefix, which is enough to correlate repeat payloads without
//! retaining their content.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use warden_context::Source;
use warden_semantic::Intent;

use crate::decision::Action;

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Severity label: `warning` for blocking outcomes, `info`
    /// otherwise.
    pub level: &'static str,
    /// Record type.
    pub kind: &'static str,
    /// Final intent.
    pub intent: Intent,
    /// Final risk score.
    pub risk_score: f64,
    /// Final action.
    pub action: Action,
    /// Source channel of the message.
    pub source: Source,
    /// Heuristic flags raised.
    pub flags: Vec<String>,
    /// Digest prefix of the raw message.
    pub message_hash: String,
    /// Decision reason.
    pub details: String,
}

impl SecurityEvent {
    /// Build a record for a resolved scan.
    pub fn for_decision(
        intent: Intent,
        risk_score: f64,
        action: Action,
        source: Source,
        flags: Vec<String>,
        message: &str,
        details: String,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level: if action.is_blocking() { "warning" } else { "info" },
            kind: "scan_decision",
            intent,
            risk_score,
            action,
            source,
            flags,
            message_hash: message_digest(message),
            details,
        }
    }
}

/// Privacy-preserving digest of a message: the first 8 bytes of its
/// SHA-256, as 16 hex digits.
pub fn message_digest(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Emit a record to the audit log.
pub fn record(event: &SecurityEvent) {
    if event.action.is_blocking() {
        warn!(
            target: "warden::audit",
            action = %event.action,
            intent = %event.intent,
            risk = event.risk_score,
            source = %event.source,
            flags = ?event.flags,
            hash = %event.message_hash,
            details = %event.details,
            "security event"
        );
    } else {
        info!(
            target: "warden::audit",
            action = %event.action,
            intent = %event.intent,
            risk = event.risk_score,
            source = %event.source,
            flags = ?event.flags,
            hash = %event.message_hash,
            details = %event.details,
            "security event"
        );
    }
}
