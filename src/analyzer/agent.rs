//! Agent-signal extraction and tiered scoring
//!
//! Gathers every piece of evidence that specifically implicates an AI
//! browser agent, then scores the list through three rules: direct
//! presence evidence is near-conclusive, physically-impossible input
//! signals escalate, and purely temporal patterns are hard-capped so
//! fast-but-human sessions cannot cross the reporting thresholds alone.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::fingerprint::registry::COMET_EXTENSION_ID;
use crate::fingerprint::Fingerprint;
use crate::injection::InjectionAnalysis;
use crate::signal::{total_weight, Signal};

/// Direct evidence of the agent's presence in the page
const DEFINITIVE_SIGNALS: &[&str] = &[
    "comet.extension.cached",
    "comet.extension.script",
    "comet.extension.stylesheet",
    "comet.extension.resource_probe",
    "network.perplexity_agent",
    "injection.comet_extension_resource",
    "injection.comet_marker_attribute",
];

/// Agent-category assessment shipped in the report's `comet` group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAssessment {
    pub detected: bool,
    pub signal_count: usize,
    pub signals: Vec<Signal>,
    pub score: u32,
}

impl AgentAssessment {
    /// Build the assessment from an extracted signal list
    pub fn from_signals(signals: Vec<Signal>) -> Self {
        Self {
            detected: !signals.is_empty(),
            signal_count: signals.len(),
            score: agent_score(&signals),
            signals,
        }
    }
}

/// Collect agent-specific signals from every evidence source
pub fn extract_agent_signals(
    anomalies: &[Signal],
    fingerprint: &Fingerprint,
    injection: &InjectionAnalysis,
) -> Vec<Signal> {
    let mut signals = Vec::new();

    // Behavioral anomalies in the agent namespace
    signals.extend(
        anomalies
            .iter()
            .filter(|s| s.name.starts_with("comet."))
            .cloned(),
    );

    // Fingerprint evidence: the extension probe, the agent backend's
    // network targets, and in-page agent runtimes
    signals.extend(fingerprint.comet_extension.signals.iter().cloned());
    signals.extend(fingerprint.perplexity_network.signals.iter().cloned());
    signals.extend(
        fingerprint
            .extensions
            .signals
            .iter()
            .filter(|s| s.name.starts_with("agent_runtime."))
            .cloned(),
    );

    // A webdriver flag that flipped mid-session means a driver attached to
    // the user's own browser, which is how agentic extensions operate
    if let Some(changed) = fingerprint
        .webdriver
        .signals
        .iter()
        .find(|s| s.name == "webdriver.changed_mid_session")
    {
        signals.push(changed.clone());
    }

    // Injected UI that names the agent brand or carries its extension ID
    for group in &injection.signals {
        let references_agent = group.name.contains("comet")
            || group.name.contains("perplexity")
            || group
                .examples
                .iter()
                .any(|e| e.contains(COMET_EXTENSION_ID));

        if references_agent {
            signals.push(Signal::new(
                format!("injection.{}", group.name),
                json!(group.count),
                group.max_weight,
            ));
        }
    }

    signals
}

fn is_definitive(signal: &Signal) -> bool {
    DEFINITIVE_SIGNALS.contains(&signal.name.as_str())
}

/// Physically-impossible input evidence
///
/// `comet.zero_keystrokes` and `comet.low_per_page_mouse_ratio` are
/// reserved members of this set; nothing currently emits them.
fn is_tier1(signal: &Signal) -> bool {
    match signal.name.as_str() {
        "comet.ultra_precise_center" => true,
        "comet.low_mouse_to_action_ratio" => signal.weight >= 10,
        "comet.zero_keystrokes" | "comet.low_per_page_mouse_ratio" => true,
        _ => false,
    }
}

/// Behavioral agent evidence that humans can also produce
fn is_tier2(signal: &Signal) -> bool {
    signal.name.starts_with("comet.") && !is_tier1(signal)
}

/// Score an agent-signal list through the tiered model
pub fn agent_score(signals: &[Signal]) -> u32 {
    if signals.is_empty() {
        return 0;
    }

    let sum = total_weight(signals);

    if signals.iter().any(is_definitive) {
        return (70 + sum).min(100);
    }

    let tier1 = signals.iter().filter(|s| is_tier1(s)).count();
    let tier2 = signals.iter().filter(|s| is_tier2(s)).count();

    if tier1 >= 1 && tier2 >= 2 {
        (sum * 2).min(100)
    } else if tier1 >= 1 {
        ((sum as f64 * 1.5).round() as u32).min(100)
    } else {
        // Temporal evidence alone never crosses the probable-agent bar
        sum.min(40)
    }
}
