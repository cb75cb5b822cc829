//! Weighted anomaly signals
//!
//! Every detector in the engine reports evidence in one shared shape. The
//! dotted `name` is the stable identifier: downstream scoring selects
//! signals by name membership only, never by provenance.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single piece of weighted evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable dotted identifier, e.g. `click.center_precision`
    pub name: String,
    /// Probe-specific detail (ratio, count, matched value)
    pub value: Value,
    /// Severity weight in 1..=10
    pub weight: u32,
}

impl Signal {
    /// Create a signal
    pub fn new<N: Into<String>, V: Into<Value>>(name: N, value: V, weight: u32) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            weight,
        }
    }
}

/// Sum of weights over a signal slice
pub fn total_weight(signals: &[Signal]) -> u32 {
    signals.iter().map(|s| s.weight).sum()
}
