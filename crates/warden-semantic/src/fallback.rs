//! Deterministic intent derivation from heuristic flags.
//!
//! Used whenever the model is unavailable: the classifier is disabled,
//! no provider was detected in best-effort mode, or a live call failed.
//! The mapping is a fixed priority list, so for a given flag set the
//! outcome is always the same.

use std::collections::BTreeSet;

use crate::intent::{Intent, Recommendation};

/// Flag-to-intent table, highest priority first. The first row whose
/// flag is present wins.
const FLAG_TABLE: &[(&str, Intent, f64, Recommendation)] = &[
    (
        "command_injection",
        Intent::CommandInjection,
        0.8,
        Recommendation::Block,
    ),
    (
        "credential_theft",
        Intent::CredentialTheft,
        0.8,
        Recommendation::Block,
    ),
    (
        "instruction_override",
        Intent::InstructionOverride,
        0.8,
        Recommendation::Block,
    ),
    (
        "data_exfiltration",
        Intent::DataExfiltration,
        0.8,
        Recommendation::Block,
    ),
    (
        "impersonation",
        Intent::Impersonation,
        0.7,
        Recommendation::Warn,
    ),
    ("discovery", Intent::Discovery, 0.6, Recommendation::Warn),
];

/// Map a heuristic flag set to `(intent, confidence, recommendation)`.
///
/// Flags outside the table (including synthetic ones) fall through to
/// benign at 0.5 confidence.
pub fn classify_flags(flags: &BTreeSet<String>) -> (Intent, f64, Recommendation) {
    for (flag, intent, confidence, recommendation) in FLAG_TABLE {
        if flags.contains(*flag) {
            return (*intent, *confidence, *recommendation);
        }
    }
    (Intent::Benign, 0.5, Recommendation::Allow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_flags_are_benign() {
        let (intent, confidence, rec) = classify_flags(&BTreeSet::new());
        assert_eq!(intent, Intent::Benign);
        assert_eq!(confidence, 0.5);
        assert_eq!(rec, Recommendation::Allow);
    }

    #[test]
    fn single_flag_maps_directly() {
        let (intent, confidence, rec) = classify_flags(&flags(&["instruction_override"]));
        assert_eq!(intent, Intent::InstructionOverride);
        assert_eq!(confidence, 0.8);
        assert_eq!(rec, Recommendation::Block);
    }

    #[test]
    fn priority_order_wins_on_multiple_flags() {
        // command_injection outranks discovery regardless of set order.
        let (intent, ..) = classify_flags(&flags(&["discovery", "command_injection"]));
        assert_eq!(intent, Intent::CommandInjection);
    }

    #[test]
    fn credential_theft_outranks_instruction_override() {
        let (intent, ..) =
            classify_flags(&flags(&["instruction_override", "credential_theft"]));
        assert_eq!(intent, Intent::CredentialTheft);
    }

    #[test]
    fn unmapped_flags_fall_through() {
        let (intent, confidence, rec) =
            classify_flags(&flags(&["encoding", "multiple_indicators"]));
        assert_eq!(intent, Intent::Benign);
        assert_eq!(confidence, 0.5);
        assert_eq!(rec, Recommendation::Allow);
    }

    #[test]
    fn mapping_is_deterministic() {
        let input = flags(&["impersonation", "discovery"]);
        let first = classify_flags(&input);
        for _ in 0..10 {
            assert_eq!(classify_flags(&input), first);
        }
    }
}
