//! Engine configuration.
//!
//! One explicit record with documented defaults; nothing is parsed on
//! the scan path. Field names serialize in the camelCase form used by
//! deployment config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use warden_context::RateLimit;
use warden_semantic::{ProviderKind, DEFAULT_MODEL};

/// Action thresholds over the adjusted risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// At or above: surface a warning.
    pub warn: f64,
    /// At or above: block the message.
    pub block: f64,
    /// At or above: quarantine for review.
    pub quarantine: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn: 0.4,
            block: 0.8,
            quarantine: 0.9,
        }
    }
}

impl Thresholds {
    /// The tightened table used in strict mode.
    pub const STRICT: Thresholds = Thresholds {
        warn: 0.3,
        block: 0.6,
        quarantine: 0.8,
    };
}

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WardenConfig {
    /// Consult the language model for ambiguous messages. When off, the
    /// semantic layer answers from the heuristic-flag fallback.
    pub semantic_enabled: bool,
    /// Heuristic risk at which the semantic layer is consulted.
    pub semantic_threshold: f64,
    /// Use the tightened threshold table.
    pub strict_mode: bool,
    /// Action thresholds used outside strict mode.
    pub thresholds: Thresholds,
    /// Model backend selection.
    pub llm_provider: ProviderKind,
    /// Base URL override for the model backend.
    pub llm_endpoint: Option<String>,
    /// Model name; the default placeholder enables local
    /// auto-selection.
    pub llm_model: String,
    /// API key for the hosted backend.
    pub api_key: Option<String>,
    /// Fail scans when classification is needed but no backend exists.
    #[serde(rename = "requireLLM")]
    pub require_llm: bool,
    /// Directory of category pattern files. Unset means the built-in
    /// catalog.
    pub patterns_dir: Option<PathBuf>,
    /// Sweep decoded payload views.
    pub decode_payloads: bool,
    /// Sweep the confusable-folded view.
    pub normalize_unicode: bool,
    /// Accepted for config compatibility; decoding is single-pass.
    pub max_decode_depth: u32,
    /// Track sender history.
    pub history_enabled: bool,
    /// Bound on the recent-message ring.
    pub max_history_size: usize,
    /// Per-sender rate limit.
    pub rate_limit: RateLimit,
    /// Senders whose messages always pass.
    pub allow_list: Vec<String>,
    /// Senders whose messages are always blocked.
    pub block_list: Vec<String>,
    /// Log level hint for the embedding process.
    pub log_level: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            semantic_enabled: true,
            semantic_threshold: 0.3,
            strict_mode: false,
            thresholds: Thresholds::default(),
            llm_provider: ProviderKind::Auto,
            llm_endpoint: None,
            llm_model: DEFAULT_MODEL.to_string(),
            api_key: None,
            require_llm: true,
            patterns_dir: None,
            decode_payloads: true,
            normalize_unicode: true,
            max_decode_depth: 2,
            history_enabled: true,
            max_history_size: 1000,
            rate_limit: RateLimit::default(),
            allow_list: Vec::new(),
            block_list: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

/// Runtime-adjustable subset of the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    /// Replace the non-strict threshold table.
    pub thresholds: Option<Thresholds>,
    /// Toggle strict mode.
    pub strict_mode: Option<bool>,
    /// Toggle the semantic layer.
    pub semantic_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let config = WardenConfig::default();
        assert!(config.semantic_enabled);
        assert_eq!(config.semantic_threshold, 0.3);
        assert!(!config.strict_mode);
        assert_eq!(config.thresholds.warn, 0.4);
        assert_eq!(config.thresholds.block, 0.8);
        assert_eq!(config.thresholds.quarantine, 0.9);
        assert!(config.require_llm);
        assert_eq!(config.llm_model, "gpt-3.5-turbo");
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.max, 10);
        assert_eq!(config.max_history_size, 1000);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = WardenConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WardenConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.thresholds, config.thresholds);
        assert_eq!(parsed.llm_model, config.llm_model);
    }

    #[test]
    fn config_keys_are_camel_case() {
        let json = serde_json::to_value(WardenConfig::default()).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("semanticEnabled"));
        assert!(object.contains_key("requireLLM"));
        assert!(object.contains_key("rateLimit"));
        assert!(object.contains_key("maxHistorySize"));
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let parsed: WardenConfig =
            serde_json::from_str(r#"{ "strictMode": true, "semanticEnabled": false }"#).unwrap();
        assert!(parsed.strict_mode);
        assert!(!parsed.semantic_enabled);
        assert_eq!(parsed.thresholds, Thresholds::default());
    }

    #[test]
    fn strict_table_is_tighter() {
        let strict = Thresholds::STRICT;
        let default = Thresholds::default();
        assert!(strict.warn < default.warn);
        assert!(strict.block < default.block);
        assert!(strict.quarantine < default.quarantine);
    }
}
