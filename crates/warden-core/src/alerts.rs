//! # Alert Templates
//!
//! Static (intent, action) to text mapping. Selection only: templates
//! never influence the decision, and the engine attaches whichever line
//! matches the resolved outcome. Intents without a dedicated bucket use
//! the generic texts, and within a bucket any action without its own
//! line falls back to the warning line.

use warden_semantic::Intent;

use crate::decision::Action;
use crate::engine::ScanReport;

/// One-line notification for the resolved (intent, action) pair.
pub fn notification(intent: Intent, action: Action) -> &'static str {
    if action == Action::Allow {
        return "No threat indicators found.";
    }

    match intent {
        Intent::CommandInjection => match action {
            Action::Block => "Blocked: the message attempts to execute commands.",
            Action::Quarantine => "Quarantined: command execution attempt held for review.",
            _ => "Caution: the message contains command-like content.",
        },
        Intent::CredentialTheft => match action {
            Action::Block => "Blocked: the message solicits credentials or secrets.",
            Action::Quarantine => "Quarantined: credential solicitation held for review.",
            _ => "Caution: the message references credentials.",
        },
        Intent::DataExfiltration => match action {
            Action::Block => "Blocked: the message directs data to an external destination.",
            Action::Quarantine => "Quarantined: data redirection attempt held for review.",
            _ => "Caution: the message asks for data to be moved.",
        },
        Intent::InstructionOverride => match action {
            Action::Block => "Blocked: the message tries to override standing instructions.",
            Action::Quarantine => "Quarantined: instruction override attempt held for review.",
            _ => "Caution: the message pushes against standing instructions.",
        },
        Intent::PromptLeak => match action {
            Action::Block => "Blocked: the message probes for hidden instructions.",
            Action::Quarantine => "Quarantined: prompt disclosure attempt held for review.",
            _ => "Caution: the message asks about internal instructions.",
        },
        Intent::Impersonation => match action {
            Action::Block => "Blocked: the message claims an identity it cannot prove.",
            Action::Quarantine => "Quarantined: authority claim held for review.",
            _ => "Caution: the message claims special authority.",
        },
        Intent::Discovery => match action {
            Action::Block => "Blocked: the message maps internal capabilities.",
            Action::Quarantine => "Quarantined: reconnaissance held for review.",
            _ => "Caution: the message probes capabilities.",
        },
        Intent::SocialEngineering => match action {
            Action::Block => "Blocked: the message applies manipulative pressure.",
            Action::Quarantine => "Quarantined: manipulation attempt held for review.",
            _ => "Caution: the message applies social pressure.",
        },
        Intent::MultiStage => match action {
            Action::Block => "Blocked: the message looks like a step of a staged attack.",
            Action::Quarantine => "Quarantined: staged-attack step held for review.",
            _ => "Caution: the message may be part of a staged attack.",
        },
        Intent::Encoding => match action {
            Action::Block => "Blocked: the message hides content behind encoding.",
            Action::Quarantine => "Quarantined: encoded payload held for review.",
            _ => "Caution: the message contains encoded content.",
        },
        // Benign and curious messages can still trip rate limits or the
        // strict ladder; they share the generic bucket.
        Intent::Benign | Intent::Curious => match action {
            Action::Block => "Blocked: the message exceeded the risk threshold.",
            Action::Quarantine => "Quarantined: the message was held for review.",
            _ => "Caution: the message raised minor indicators.",
        },
    }
}

/// Verbose alert block for operators, rendered from a finished report.
pub fn alert_text(report: &ScanReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "[warden] {} ({})",
        report.action.as_str().to_uppercase(),
        report.intent
    ));
    lines.push(format!("risk: {:.2}", report.risk_score));
    lines.push(format!("reason: {}", report.layers.decision.reason));

    if !report.layers.decision.flags.is_empty() {
        lines.push(format!(
            "flags: {}",
            report.layers.decision.flags.join(", ")
        ));
    }
    if !report.layers.decision.red_flags.is_empty() {
        lines.push(format!(
            "observations: {}",
            report.layers.decision.red_flags.join("; ")
        ));
    }
    for hit in &report.layers.heuristic.matches {
        let origin = hit
            .decoded_from
            .map(|k| format!(" (via {k})"))
            .unwrap_or_default();
        lines.push(format!("match: {}{origin}", hit.description));
    }
    lines.push(notification(report.intent, report.action).to_string());

    lines.join("\n")
}
