//! Fingerprint probe implementations

use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::comet;
use super::registry::*;
use super::types::{CanvasProbe, Fingerprint, ProbeGroup, SignalGroup, WebglProbe};
use crate::host::{ElementInfo, HostPage, NavigatorInfo, TabStorage, WindowMetrics};
use crate::signal::Signal;

/// Minimum plausible length of a genuine canvas data URL
const CANVAS_MIN_DATA_LEN: usize = 1000;

/// Collects the runtime fingerprint of the host page
///
/// `collect` may be called repeatedly; every call re-runs all probes against
/// the live page.
pub struct FingerprintCollector {
    page: Arc<dyn HostPage>,
    storage: Arc<dyn TabStorage>,
}

impl FingerprintCollector {
    /// Create a collector for the given page
    pub fn new(page: Arc<dyn HostPage>, storage: Arc<dyn TabStorage>) -> Self {
        Self { page, storage }
    }

    /// Run all probes and compose the fingerprint
    pub async fn collect(&self) -> Fingerprint {
        let navigator = self.page.navigator();
        let metrics = self.page.window_metrics();
        let elements = self.page.scan_elements();
        let stylesheets = self.page.stylesheet_urls();

        let webdriver = self.probe_webdriver(&navigator);
        let headless = probe_headless(&navigator, &metrics);
        let extensions = self.probe_extensions(&elements, &stylesheets);
        let comet_extension = comet::probe(
            self.page.as_ref(),
            self.storage.as_ref(),
            &elements,
            &stylesheets,
        )
        .await;
        let perplexity_network = self.probe_network();
        let globals = self.probe_globals();
        let dom_markers = self.probe_dom_markers();
        let canvas = self.probe_canvas();
        let webgl = self.probe_webgl();

        let mut fingerprint = Fingerprint {
            webdriver,
            headless,
            extensions,
            comet_extension,
            perplexity_network,
            globals,
            dom_markers,
            canvas,
            webgl,
            navigator,
            score: 0,
        };

        let (sum, count) = fingerprint
            .all_signals()
            .fold((0u32, 0usize), |(sum, count), s| (sum + s.weight, count + 1));
        fingerprint.score = normalize_score(sum, count);

        fingerprint
    }

    fn probe_webdriver(&self, navigator: &NavigatorInfo) -> ProbeGroup {
        let mut signals = Vec::new();

        if navigator.webdriver {
            signals.push(Signal::new("webdriver.active", true, 10));

            // The flag flipping after page scripts captured it as false means
            // a driver attached to an already-open session.
            if self.page.initial_webdriver() == Some(false) {
                signals.push(Signal::new("webdriver.changed_mid_session", true, 10));
            }
        }

        if !self.page.webdriver_getter_is_native() {
            signals.push(Signal::new("webdriver.getter_replaced", true, 9));
        }

        let detected = !signals.is_empty();
        ProbeGroup::from_signals(signals, detected)
    }

    fn probe_extensions(&self, elements: &[ElementInfo], stylesheets: &[String]) -> SignalGroup {
        let mut signals = Vec::new();

        for extension in KNOWN_EXTENSIONS {
            let marker_hit = elements
                .iter()
                .any(|e| e.classes.contains(extension.marker) || e.id.contains(extension.marker));

            if marker_hit {
                signals.push(Signal::new(
                    format!("extension.{}", extension.name),
                    extension.marker,
                    extension.weight,
                ));
            }

            if let Some(url) = stylesheets
                .iter()
                .filter(|url| url.contains("chrome-extension://"))
                .find(|url| url.contains(extension.resource_pattern))
            {
                signals.push(Signal::new(
                    format!("extension.{}.stylesheet", extension.name),
                    url.as_str(),
                    extension.weight,
                ));
            }
        }

        for (name, weight) in AGENT_RUNTIME_GLOBALS {
            if self.page.has_global(name) {
                signals.push(Signal::new(format!("agent_runtime.{}", name), true, *weight));
            }
        }

        SignalGroup { signals }
    }

    fn probe_network(&self) -> SignalGroup {
        let mut signals = Vec::new();

        if let Some(entry) = self
            .page
            .resource_entries()
            .iter()
            .find(|name| AGENT_NETWORK_PATTERN.is_match(name))
        {
            signals.push(Signal::new("network.perplexity_agent", entry.as_str(), 9));
        }

        SignalGroup { signals }
    }

    fn probe_globals(&self) -> SignalGroup {
        let mut signals = Vec::new();

        for (name, weight) in AUTOMATION_GLOBALS {
            if self.page.has_global(name) {
                signals.push(Signal::new(format!("global.{}", name), true, *weight));
            }
        }

        for name in self.page.document_property_names() {
            if DOC_PROPERTY_PATTERN.is_match(&name) {
                signals.push(Signal::new(
                    "document.suspicious_property",
                    name,
                    DOC_PROPERTY_WEIGHT,
                ));
            }
        }

        SignalGroup { signals }
    }

    fn probe_dom_markers(&self) -> SignalGroup {
        let mut signals = Vec::new();

        for (marker, value_pattern) in DOM_MARKERS.iter().zip(DOM_MARKER_VALUE_PATTERNS.iter()) {
            let hit = match value_pattern {
                Some(pattern) => self
                    .page
                    .attribute_values(marker.attribute)
                    .iter()
                    .find(|v| pattern.is_match(v))
                    .cloned(),
                None => (self.page.count_attribute(marker.attribute) > 0)
                    .then(|| marker.attribute.to_string()),
            };

            if let Some(value) = hit {
                signals.push(Signal::new(
                    format!("dom_marker.{}", marker.attribute),
                    value,
                    marker.weight,
                ));
            }
        }

        SignalGroup { signals }
    }

    fn probe_canvas(&self) -> CanvasProbe {
        match self.page.canvas_data_url() {
            Ok(data_url) => {
                let mut anomalies = Vec::new();

                if data_url.len() < CANVAS_MIN_DATA_LEN {
                    anomalies.push(Signal::new("canvas.data.short", data_url.len(), 6));
                }

                let digest = Sha256::digest(data_url.as_bytes());
                CanvasProbe {
                    hash: Some(format!("{:x}", digest)),
                    anomalies,
                }
            }
            Err(e) => CanvasProbe {
                hash: None,
                anomalies: vec![Signal::new("canvas.error", e.to_string(), 5)],
            },
        }
    }

    fn probe_webgl(&self) -> WebglProbe {
        match self.page.webgl_info() {
            Some(info) => {
                let mut anomalies = Vec::new();

                if WEBGL_SOFTWARE_PATTERN.is_match(&info.renderer) {
                    anomalies.push(Signal::new(
                        "webgl.software_renderer",
                        info.renderer.as_str(),
                        8,
                    ));
                }

                WebglProbe {
                    vendor: Some(info.vendor),
                    renderer: Some(info.renderer),
                    anomalies,
                }
            }
            None => WebglProbe {
                vendor: None,
                renderer: None,
                anomalies: vec![Signal::new("webgl.missing", true, 5)],
            },
        }
    }
}

fn probe_headless(navigator: &NavigatorInfo, metrics: &WindowMetrics) -> ProbeGroup {
    let mut signals = Vec::new();
    let chrome_branded = navigator.user_agent.contains("Chrome");

    if navigator.plugins_count == 0 {
        signals.push(Signal::new("headless.no_plugins", true, 6));
    }

    if navigator.languages.is_empty() {
        signals.push(Signal::new("headless.no_languages", true, 7));
    }

    if chrome_branded && !navigator.has_chrome_object {
        signals.push(Signal::new("headless.missing_chrome_object", true, 8));
    }

    if HEADLESS_UA_PATTERN.is_match(&navigator.user_agent) {
        signals.push(Signal::new(
            "headless.user_agent",
            navigator.user_agent.as_str(),
            10,
        ));
    }

    if metrics.outer_width == 0 || metrics.outer_height == 0 {
        signals.push(Signal::new("headless.zero_outer_window", true, 8));
    }

    if metrics.screen_width == 0 || metrics.screen_height == 0 {
        signals.push(Signal::new("headless.zero_screen", true, 7));
    }

    if chrome_branded && !navigator.has_connection_api {
        signals.push(Signal::new("headless.missing_connection", true, 4));
    }

    let detected = signals.iter().any(|s| s.weight >= 7);
    ProbeGroup::from_signals(signals, detected)
}

/// Normalize a weight sum against the signal count
pub(crate) fn normalize_score(sum: u32, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }

    let denominator = (count as f64 * 10.0).max(50.0);
    ((sum as f64 / denominator) * 100.0).round().min(100.0) as u32
}
