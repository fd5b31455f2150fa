//! # Intent Taxonomy
//!
//! The fixed vocabulary of threat classifications. Every layer of the
//! engine speaks this taxonomy: the classifier returns one of these
//! values, the context layer weights them into risk, and the decision
//! layer short-circuits on the critical ones.
//!
//! The taxonomy is closed. A model reply naming anything else is coerced
//! to [`Intent::Benign`] during validation rather than extending the
//! set, so downstream consumers never see an unknown intent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified intent of a scanned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Ordinary, harmless traffic.
    Benign,
    /// Probing questions without clear malicious intent.
    Curious,
    /// Attempts to read back the system prompt.
    PromptLeak,
    /// Attempts to replace the agent's standing instructions.
    InstructionOverride,
    /// Attempts to execute shell or code payloads.
    CommandInjection,
    /// Attempts to obtain secrets or credentials.
    CredentialTheft,
    /// Attempts to move data to an external destination.
    DataExfiltration,
    /// False claims of identity or authority.
    Impersonation,
    /// Reconnaissance of tools, model, and environment.
    Discovery,
    /// Manipulation through trust, urgency, or pressure.
    SocialEngineering,
    /// A step in a staged attack spread over several messages.
    MultiStage,
    /// Obfuscated payload with no decoded classification yet. Derived
    /// from the `encoding` heuristic flag only; the classifier never
    /// produces this value.
    Encoding,
}

impl Intent {
    /// Labels the classifier is allowed to return, in prompt order.
    pub const CLASSIFIER_LABELS: [&'static str; 11] = [
        "benign",
        "curious",
        "prompt_leak",
        "instruction_override",
        "command_injection",
        "credential_theft",
        "data_exfiltration",
        "impersonation",
        "discovery",
        "social_engineering",
        "multi_stage",
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Benign => "benign",
            Intent::Curious => "curious",
            Intent::PromptLeak => "prompt_leak",
            Intent::InstructionOverride => "instruction_override",
            Intent::CommandInjection => "command_injection",
            Intent::CredentialTheft => "credential_theft",
            Intent::DataExfiltration => "data_exfiltration",
            Intent::Impersonation => "impersonation",
            Intent::Discovery => "discovery",
            Intent::SocialEngineering => "social_engineering",
            Intent::MultiStage => "multi_stage",
            Intent::Encoding => "encoding",
        }
    }

    /// Parse a classifier label. Only taxonomy labels are accepted;
    /// `encoding` is engine-internal and deliberately not parseable
    /// here.
    pub fn from_label(label: &str) -> Option<Intent> {
        match label.trim().to_ascii_lowercase().as_str() {
            "benign" => Some(Intent::Benign),
            "curious" => Some(Intent::Curious),
            "prompt_leak" => Some(Intent::PromptLeak),
            "instruction_override" => Some(Intent::InstructionOverride),
            "command_injection" => Some(Intent::CommandInjection),
            "credential_theft" => Some(Intent::CredentialTheft),
            "data_exfiltration" => Some(Intent::DataExfiltration),
            "impersonation" => Some(Intent::Impersonation),
            "discovery" => Some(Intent::Discovery),
            "social_engineering" => Some(Intent::SocialEngineering),
            "multi_stage" => Some(Intent::MultiStage),
            _ => None,
        }
    }

    /// Base risk carried by this intent before confidence weighting.
    pub fn risk_weight(&self) -> f64 {
        match self {
            Intent::Benign => 0.0,
            Intent::Curious => 0.2,
            Intent::Encoding => 0.3,
            Intent::Discovery => 0.4,
            Intent::PromptLeak => 0.5,
            Intent::SocialEngineering => 0.6,
            Intent::Impersonation => 0.7,
            Intent::InstructionOverride => 0.85,
            Intent::CredentialTheft => 0.9,
            Intent::DataExfiltration => 0.9,
            Intent::MultiStage => 0.9,
            Intent::CommandInjection => 0.95,
        }
    }

    /// Intents that block outright when classified with high
    /// confidence.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Intent::CommandInjection | Intent::CredentialTheft | Intent::DataExfiltration
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action the classifier recommends. Informational: the decision layer
/// weighs intent and risk itself and never takes this at face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    /// Let the message through.
    #[default]
    Allow,
    /// Let it through but surface an alert.
    Warn,
    /// Reject the message.
    Block,
}

impl Recommendation {
    /// Lenient parse of the wire value; anything unrecognized reads as
    /// `Allow`, matching the reply-contract default.
    pub fn from_label(label: &str) -> Recommendation {
        match label.trim().to_ascii_lowercase().as_str() {
            "warn" => Recommendation::Warn,
            "block" => Recommendation::Block,
            _ => Recommendation::Allow,
        }
    }
}
