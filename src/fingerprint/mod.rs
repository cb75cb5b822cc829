//! # Fingerprint collector
//!
//! A bounded set of synchronous and asynchronous probes over the host
//! runtime: webdriver state, headless indicators, known helper extensions,
//! the Comet agent-extension resource probe, automation globals, DOM
//! markers, canvas and WebGL signatures, and recent network targets.
//!
//! ## Module structure
//! - `types`: the fingerprint result shape
//! - `registry`: static tables of known markers, globals and extensions
//! - `collector`: the probe implementations
//! - `comet`: the agent-extension probe (cache, scan, resource race)

pub mod collector;
pub mod comet;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;

pub use collector::FingerprintCollector;
pub use types::{CanvasProbe, Fingerprint, ProbeGroup, SignalGroup, WebglProbe};
