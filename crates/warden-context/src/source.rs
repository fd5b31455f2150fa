//! # Message Sources
//!
//! Where a message arrived from, with the trust weight reported to
//! operators and the risk multiplier applied during evaluation. The two
//! tables are deliberately separate: trust describes the channel, the
//! multiplier describes how much a given risk score should be amplified
//! or damped for that channel. An internal channel halves risk; email,
//! the classic indirect-injection carrier, amplifies it the most.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin channel of a scanned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Same-process or same-trust-domain traffic.
    Internal,
    /// Authenticated caller.
    Authenticated,
    /// Known but unauthenticated counterpart.
    Known,
    /// General public traffic. The default.
    #[default]
    Public,
    /// Explicitly distrusted origin.
    Untrusted,
    /// Inbound webhook delivery.
    Webhook,
    /// Email content.
    Email,
    /// Third-party API payload.
    Api,
    /// Scraped or browsed web content.
    Web,
}

impl Source {
    /// Trust weight reported in context traces.
    pub fn trust(&self) -> f64 {
        match self {
            Source::Internal => 1.0,
            Source::Authenticated => 0.8,
            Source::Known => 0.6,
            Source::Public => 0.3,
            Source::Untrusted => 0.1,
            Source::Webhook => 0.2,
            Source::Email => 0.3,
            Source::Api => 0.4,
            Source::Web => 0.2,
        }
    }

    /// Multiplier applied to the base risk during evaluation.
    pub fn risk_multiplier(&self) -> f64 {
        match self {
            Source::Internal => 0.5,
            Source::Authenticated => 0.8,
            Source::Known => 1.0,
            Source::Public => 1.2,
            Source::Untrusted => 1.0,
            Source::Webhook => 1.2,
            Source::Email => 1.3,
            Source::Api => 1.1,
            Source::Web => 1.2,
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Internal => "internal",
            Source::Authenticated => "authenticated",
            Source::Known => "known",
            Source::Public => "public",
            Source::Untrusted => "untrusted",
            Source::Webhook => "webhook",
            Source::Email => "email",
            Source::Api => "api",
            Source::Web => "web",
        }
    }

    /// Parse a source label. Unknown labels fall back to [`Source::Public`].
    pub fn from_label(label: &str) -> Source {
        match label.trim().to_ascii_lowercase().as_str() {
            "internal" => Source::Internal,
            "authenticated" => Source::Authenticated,
            "known" => Source::Known,
            "public" => Source::Public,
            "untrusted" => Source::Untrusted,
            "webhook" => Source::Webhook,
            "email" => Source::Email,
            "api" => Source::Api,
            "web" => Source::Web,
            _ => Source::Public,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scan caller context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanContext {
    /// Origin channel.
    pub source: Source,
    /// Stable sender identifier; history is keyed on it.
    pub sender_id: String,
    /// Free-form caller metadata. Never interpreted by the engine.
    pub metadata: serde_json::Value,
}

impl Default for ScanContext {
    fn default() -> Self {
        Self {
            source: Source::Public,
            sender_id: "anonymous".to_string(),
            metadata: serde_json::Value::Null,
        }
    }
}

impl ScanContext {
    /// Default context: public source, anonymous sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the origin channel.
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Set the sender identifier.
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_and_multiplier_tables() {
        assert_eq!(Source::Internal.trust(), 1.0);
        assert_eq!(Source::Internal.risk_multiplier(), 0.5);
        assert_eq!(Source::Email.trust(), 0.3);
        assert_eq!(Source::Email.risk_multiplier(), 1.3);
        assert_eq!(Source::Untrusted.trust(), 0.1);
        assert_eq!(Source::Untrusted.risk_multiplier(), 1.0);
    }

    #[test]
    fn unknown_label_falls_back_to_public() {
        assert_eq!(Source::from_label("carrier-pigeon"), Source::Public);
        assert_eq!(Source::from_label(""), Source::Public);
    }

    #[test]
    fn known_labels_round_trip() {
        for source in [
            Source::Internal,
            Source::Authenticated,
            Source::Known,
            Source::Public,
            Source::Untrusted,
            Source::Webhook,
            Source::Email,
            Source::Api,
            Source::Web,
        ] {
            assert_eq!(Source::from_label(source.as_str()), source);
        }
    }

    #[test]
    fn context_defaults() {
        let ctx = ScanContext::new();
        assert_eq!(ctx.source, Source::Public);
        assert_eq!(ctx.sender_id, "anonymous");
        assert!(ctx.metadata.is_null());
    }

    #[test]
    fn context_builder() {
        let ctx = ScanContext::new()
            .with_source(Source::Email)
            .with_sender("mailer-7");
        assert_eq!(ctx.source, Source::Email);
        assert_eq!(ctx.sender_id, "mailer-7");
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Webhook).unwrap(), "\"webhook\"");
    }
}
