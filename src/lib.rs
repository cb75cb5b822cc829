//! agentdetect: in-page detection engine for AI browser agents
//!
//! Observes a web session through a host-page abstraction, accumulates
//! behavioral and runtime evidence across page loads, scores it through a
//! multi-tier weighted model, and ships graded verdict reports to an
//! opaque backend sink.

pub mod config;
pub mod error;
pub mod signal;

pub mod analyzer;
pub mod fingerprint;
pub mod host;
pub mod injection;
pub mod orchestrator;
pub mod recorder;

// Re-exports
pub use config::DetectorConfig;
pub use error::{Error, Result};
pub use orchestrator::{DetectionEngine, DetectionResult, Verdict};
pub use signal::Signal;

/// agentdetect library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
