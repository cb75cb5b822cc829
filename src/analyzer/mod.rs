//! # Interaction analyzer
//!
//! Pure functions over the recorder's event stores. Each sub-analysis
//! emits weighted anomaly signals with stable dotted names; the composite
//! interaction sub-score applies a strong-signal multiplier and an
//! evidence-volume confidence factor. A separate pass extracts
//! agent-specific signals from all evidence sources and scores them
//! through the definitive/Tier-1/Tier-2 model.
//!
//! ## Module structure
//! - `stats`: variance and coefficient-of-variation helpers
//! - `interaction`: the anomaly catalog and interaction sub-score
//! - `agent`: agent-signal extraction and the tiered agent score

pub mod agent;
pub mod interaction;
pub mod stats;

#[cfg(test)]
mod tests;

pub use agent::{agent_score, extract_agent_signals, AgentAssessment};
pub use interaction::{analyze_state, AnalysisReport, Analyzer, EventCounts};
