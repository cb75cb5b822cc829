//! Fingerprint result types

use serde::{Deserialize, Serialize};

use crate::host::NavigatorInfo;
use crate::signal::Signal;

/// Result of a probe that yields a boolean verdict plus evidence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeGroup {
    pub detected: bool,
    pub signals: Vec<Signal>,
}

impl ProbeGroup {
    pub(crate) fn from_signals(signals: Vec<Signal>, detected: bool) -> Self {
        Self { detected, signals }
    }
}

/// Result of a probe that only yields evidence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalGroup {
    pub signals: Vec<Signal>,
}

/// Canvas rendering probe result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasProbe {
    /// SHA-256 of the probe canvas data URL
    pub hash: Option<String>,
    pub anomalies: Vec<Signal>,
}

/// WebGL probe result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebglProbe {
    pub vendor: Option<String>,
    pub renderer: Option<String>,
    pub anomalies: Vec<Signal>,
}

/// Complete runtime fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub webdriver: ProbeGroup,
    pub headless: ProbeGroup,
    pub extensions: SignalGroup,
    pub comet_extension: ProbeGroup,
    pub perplexity_network: SignalGroup,
    pub globals: SignalGroup,
    pub dom_markers: SignalGroup,
    pub canvas: CanvasProbe,
    pub webgl: WebglProbe,
    pub navigator: NavigatorInfo,
    /// Composite 0..=100
    pub score: u32,
}

impl Fingerprint {
    /// Iterate every signal across all sub-groups
    pub fn all_signals(&self) -> impl Iterator<Item = &Signal> {
        self.webdriver
            .signals
            .iter()
            .chain(self.headless.signals.iter())
            .chain(self.extensions.signals.iter())
            .chain(self.comet_extension.signals.iter())
            .chain(self.perplexity_network.signals.iter())
            .chain(self.globals.signals.iter())
            .chain(self.dom_markers.signals.iter())
            .chain(self.canvas.anomalies.iter())
            .chain(self.webgl.anomalies.iter())
    }
}
