//! Injected-UI scanning and scoring

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use super::patterns::{attribute_patterns, is_host_element, text_patterns};
use crate::fingerprint::registry::COMET_EXTENSION_ID;
use crate::host::{CssPosition, ElementInfo, HostPage, PageEvent};

/// Minimum width/height for the floating-overlay heuristic
const FLOAT_MIN_SIZE: f64 = 50.0;
/// Minimum z-index for the floating-overlay heuristic
const FLOAT_MIN_Z: i32 = 9000;
/// Attribute mutations the observer reacts to
const OBSERVED_ATTRIBUTES: &[&str] = &[
    "class",
    "id",
    "src",
    "href",
    "style",
    "data-comet",
    "data-perplexity",
];
/// Hard bound on retained findings
const MAX_FINDINGS: usize = 1000;

/// Category of an injection finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    ElementPattern,
    TextPattern,
    FloatingUi,
    ShadowDom,
    ExtensionInjection,
}

/// Where a finding was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    InitialScan,
    MutationAdded,
    MutationAttribute,
    ShadowDomInjection,
    ChromeExtensionInjection,
}

impl FindingSource {
    fn label(&self) -> &'static str {
        match self {
            FindingSource::InitialScan => "initial_scan",
            FindingSource::MutationAdded => "mutation_added",
            FindingSource::MutationAttribute => "mutation_attribute",
            FindingSource::ShadowDomInjection => "shadow_dom_injection",
            FindingSource::ChromeExtensionInjection => "chrome_extension_injection",
        }
    }
}

/// A single injected-UI observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionFinding {
    pub kind: FindingKind,
    pub name: String,
    /// Matched attribute value, text fragment or resource URL
    pub detail: Option<String>,
    pub weight: u32,
    pub source: FindingSource,
}

/// Findings grouped by (kind, name) for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionSignalGroup {
    pub kind: FindingKind,
    pub name: String,
    pub count: usize,
    pub max_weight: u32,
    pub examples: Vec<String>,
}

/// Result of an injection analysis pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionAnalysis {
    /// Finding counts per source
    pub detection_counts: BTreeMap<String, usize>,
    pub signals: Vec<InjectionSignalGroup>,
    pub score: u32,
}

/// Watches the page for injected helper/agent UI
pub struct InjectionObserver {
    page: Arc<dyn HostPage>,
    findings: Arc<RwLock<Vec<InjectionFinding>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InjectionObserver {
    /// Create an observer for the given page
    pub fn new(page: Arc<dyn HostPage>) -> Self {
        Self {
            page,
            findings: Arc::new(RwLock::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    /// Run the initial scan and start watching mutations; idempotent
    pub fn start_monitoring(&self, debug_enabled: bool) {
        let mut task = self.task.lock().expect("task lock poisoned");
        if task.is_some() {
            return;
        }

        self.initial_scan(debug_enabled);

        let mut rx = self.page.events();
        let findings = self.findings.clone();

        *task = Some(tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        debug!("Mutation stream lagged by {} events", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                // A failure while analyzing one mutation must not stop the
                // observer; the record is skipped and watching continues.
                if let Err(e) = handle_mutation(&findings, &event) {
                    debug!("Skipping mutation record: {}", e);
                }
            }
        }));
    }

    /// Stop watching mutations; idempotent
    pub fn stop_monitoring(&self) {
        if let Some(task) = self.task.lock().expect("task lock poisoned").take() {
            task.abort();
        }
    }

    /// Group current findings and compute the injection sub-score
    pub fn analyze(&self) -> InjectionAnalysis {
        let findings = self.findings.read().expect("findings lock poisoned");

        let mut detection_counts: BTreeMap<String, usize> = BTreeMap::new();
        for finding in findings.iter() {
            *detection_counts
                .entry(finding.source.label().to_string())
                .or_insert(0) += 1;
        }

        let mut groups: BTreeMap<(FindingKind, String), InjectionSignalGroup> = BTreeMap::new();
        for finding in findings.iter() {
            let group = groups
                .entry((finding.kind, finding.name.clone()))
                .or_insert_with(|| InjectionSignalGroup {
                    kind: finding.kind,
                    name: finding.name.clone(),
                    count: 0,
                    max_weight: 0,
                    examples: Vec::new(),
                });

            group.count += 1;
            group.max_weight = group.max_weight.max(finding.weight);
            if group.examples.len() < 3 {
                if let Some(detail) = &finding.detail {
                    group.examples.push(detail.clone());
                }
            }
        }

        let signals: Vec<InjectionSignalGroup> = groups.into_values().collect();

        // Repeats of the same finding escalate, but saturate quickly.
        let sum: f64 = signals
            .iter()
            .map(|g| {
                let multiplicity = g.count.min(5) as f64;
                g.max_weight as f64 * (1.0 + 0.2 * (multiplicity - 1.0))
            })
            .sum();
        let score = ((sum / 50.0) * 100.0).round().min(100.0) as u32;

        InjectionAnalysis {
            detection_counts,
            signals,
            score,
        }
    }

    /// All raw findings recorded so far
    pub fn findings(&self) -> Vec<InjectionFinding> {
        self.findings.read().expect("findings lock poisoned").clone()
    }

    fn initial_scan(&self, debug_enabled: bool) {
        let elements = self.page.scan_elements();
        let mut findings = self.findings.write().expect("findings lock poisoned");

        for element in &elements {
            analyze_element(&mut findings, element, FindingSource::InitialScan);
        }

        // Embedded extension resources are aggregated as one named signal.
        let resource_urls = elements
            .iter()
            .filter(|e| e.tag == "img" || e.tag == "iframe")
            .filter_map(|e| e.src.as_deref())
            .chain(self.page.stylesheet_urls().iter().map(|s| s.as_str()))
            .filter(|url| is_extension_scheme(url))
            .map(str::to_string)
            .collect::<Vec<_>>();

        for url in resource_urls {
            push_finding(
                &mut findings,
                InjectionFinding {
                    kind: FindingKind::ExtensionInjection,
                    name: "extension.resources".to_string(),
                    detail: Some(url),
                    weight: 7,
                    source: FindingSource::InitialScan,
                },
            );
        }

        if debug_enabled {
            debug!(
                "Initial injection scan: {} elements, {} findings",
                elements.len(),
                findings.len()
            );
        }
    }
}

impl Drop for InjectionObserver {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn is_extension_scheme(url: &str) -> bool {
    url.starts_with("chrome-extension://") || url.starts_with("moz-extension://")
}

fn push_finding(findings: &mut Vec<InjectionFinding>, finding: InjectionFinding) {
    if findings.len() < MAX_FINDINGS {
        findings.push(finding);
    }
}

fn handle_mutation(
    findings: &RwLock<Vec<InjectionFinding>>,
    event: &PageEvent,
) -> crate::Result<()> {
    match event {
        PageEvent::NodesAdded { nodes, .. } => {
            let mut findings = findings
                .write()
                .map_err(|e| crate::Error::mutation(format!("lock error: {}", e)))?;

            for node in nodes {
                analyze_element(&mut findings, node, FindingSource::MutationAdded);

                // Injected resources under an extension scheme are the
                // strongest mutation evidence.
                for url in [node.src.as_deref(), node.href.as_deref()]
                    .into_iter()
                    .flatten()
                {
                    if url.contains(COMET_EXTENSION_ID) {
                        push_finding(
                            &mut findings,
                            InjectionFinding {
                                kind: FindingKind::ExtensionInjection,
                                name: "comet_extension_resource".to_string(),
                                detail: Some(url.to_string()),
                                weight: 10,
                                source: FindingSource::ChromeExtensionInjection,
                            },
                        );
                    } else if is_extension_scheme(url) {
                        push_finding(
                            &mut findings,
                            InjectionFinding {
                                kind: FindingKind::ExtensionInjection,
                                name: "extension_scheme_resource".to_string(),
                                detail: Some(url.to_string()),
                                weight: 10,
                                source: FindingSource::ChromeExtensionInjection,
                            },
                        );
                    }
                }

                if node.has_shadow_root && !is_host_element(node) {
                    push_finding(
                        &mut findings,
                        InjectionFinding {
                            kind: FindingKind::ShadowDom,
                            name: "shadow_root".to_string(),
                            detail: Some(node.tag.clone()),
                            weight: 7,
                            source: FindingSource::ShadowDomInjection,
                        },
                    );
                }
            }
        }

        PageEvent::AttributeChanged {
            element, attribute, ..
        } => {
            if !OBSERVED_ATTRIBUTES.contains(&attribute.as_str()) {
                return Ok(());
            }

            let mut findings = findings
                .write()
                .map_err(|e| crate::Error::mutation(format!("lock error: {}", e)))?;

            analyze_element(&mut findings, element, FindingSource::MutationAttribute);
        }

        _ => {}
    }

    Ok(())
}

/// Match one element against the pattern registries
fn analyze_element(
    findings: &mut Vec<InjectionFinding>,
    element: &ElementInfo,
    source: FindingSource,
) {
    // Agent overlay markers are checked before the host filter: a marker
    // attribute is conclusive wherever it appears.
    if element
        .data_attrs
        .iter()
        .any(|a| a == "data-comet" || a == "data-perplexity")
    {
        push_finding(
            findings,
            InjectionFinding {
                kind: FindingKind::ExtensionInjection,
                name: "comet_marker_attribute".to_string(),
                detail: Some(element.tag.clone()),
                weight: 10,
                source,
            },
        );
    }

    if is_host_element(element) {
        return;
    }

    let haystack = [
        element.classes.as_str(),
        element.id.as_str(),
        element.src.as_deref().unwrap_or(""),
        element.href.as_deref().unwrap_or(""),
    ]
    .join(" ");

    for (pattern, regex) in attribute_patterns() {
        if let Some(m) = regex.find(&haystack) {
            push_finding(
                findings,
                InjectionFinding {
                    kind: FindingKind::ElementPattern,
                    name: pattern.name.to_string(),
                    detail: Some(m.as_str().to_string()),
                    weight: pattern.weight,
                    source,
                },
            );
        }
    }

    if element.is_leaf {
        if let Some(text) = &element.text {
            for (pattern, regex) in text_patterns() {
                if let Some(m) = regex.find(text) {
                    push_finding(
                        findings,
                        InjectionFinding {
                            kind: FindingKind::TextPattern,
                            name: pattern.name.to_string(),
                            detail: Some(m.as_str().to_string()),
                            weight: pattern.weight,
                            source,
                        },
                    );
                }
            }
        }
    }

    if is_floating_overlay(element) {
        push_finding(
            findings,
            InjectionFinding {
                kind: FindingKind::FloatingUi,
                name: "floating_overlay".to_string(),
                detail: Some(format!(
                    "{}x{} z={}",
                    element.rect.width,
                    element.rect.height,
                    element.z_index.unwrap_or_default()
                )),
                weight: 6,
                source,
            },
        );
    }
}

/// A large fixed/absolute element stacked far above page content
fn is_floating_overlay(element: &ElementInfo) -> bool {
    matches!(element.position, CssPosition::Fixed | CssPosition::Absolute)
        && element.rect.width >= FLOAT_MIN_SIZE
        && element.rect.height >= FLOAT_MIN_SIZE
        && element.z_index.is_some_and(|z| z >= FLOAT_MIN_Z)
}
