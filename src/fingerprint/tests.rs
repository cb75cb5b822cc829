//! Fingerprint collector tests

use std::sync::Arc;

use super::collector::normalize_score;
use super::registry::{COMET_DETECTED_KEY, COMET_EXTENSION_ID};
use super::FingerprintCollector;
use crate::host::{ElementInfo, MemoryStorage, SimulatedPage, TabStorage};

fn collector(page: Arc<SimulatedPage>, storage: Arc<MemoryStorage>) -> FingerprintCollector {
    FingerprintCollector::new(page, storage)
}

#[tokio::test]
async fn test_benign_page_scores_low() {
    let page = Arc::new(SimulatedPage::new());
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert!(!fingerprint.webdriver.detected);
    assert!(!fingerprint.headless.detected);
    assert!(!fingerprint.comet_extension.detected);
    assert!(fingerprint.canvas.hash.is_some());
    assert!(fingerprint.canvas.anomalies.is_empty());
    assert_eq!(fingerprint.score, 0);
}

#[tokio::test]
async fn test_webdriver_flag_and_mid_session_change() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.navigator.webdriver = true;
        f.initial_webdriver = Some(false);
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert!(fingerprint.webdriver.detected);
    let names: Vec<&str> = fingerprint
        .webdriver
        .signals
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert!(names.contains(&"webdriver.active"));
    assert!(names.contains(&"webdriver.changed_mid_session"));
}

#[tokio::test]
async fn test_replaced_webdriver_getter() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| f.webdriver_getter_native = false);
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert!(fingerprint
        .webdriver
        .signals
        .iter()
        .any(|s| s.name == "webdriver.getter_replaced" && s.weight == 9));
}

#[tokio::test]
async fn test_headless_indicators() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.navigator.user_agent = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) HeadlessChrome/131.0.0.0 Safari/537.36"
            .to_string();
        f.navigator.plugins_count = 0;
        f.navigator.has_chrome_object = false;
        f.metrics.outer_width = 0;
        f.metrics.outer_height = 0;
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert!(fingerprint.headless.detected);
    let names: Vec<&str> = fingerprint
        .headless
        .signals
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert!(names.contains(&"headless.user_agent"));
    assert!(names.contains(&"headless.no_plugins"));
    assert!(names.contains(&"headless.missing_chrome_object"));
    assert!(names.contains(&"headless.zero_outer_window"));
    assert!(fingerprint.score >= 50);
}

#[tokio::test]
async fn test_headless_low_weight_only_not_detected() {
    let page = Arc::new(SimulatedPage::new());
    // Only the weight-6 plugins signal fires; below the detection bar.
    page.configure(|f| f.navigator.plugins_count = 0);
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert_eq!(fingerprint.headless.signals.len(), 1);
    assert!(!fingerprint.headless.detected);
}

#[tokio::test]
async fn test_automation_globals_and_document_properties() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.globals.insert("_phantom".to_string());
        f.globals.insert("cdc_adoQpoasnfa76pfcZLmcfl_Array".to_string());
        f.document_properties.push("$cdc_asdjflasutopfhvcZLmcfl_".to_string());
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    let names: Vec<&str> = fingerprint
        .globals
        .signals
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert!(names.contains(&"global._phantom"));
    assert!(names.contains(&"global.cdc_adoQpoasnfa76pfcZLmcfl_Array"));
    assert!(names.contains(&"document.suspicious_property"));
}

#[tokio::test]
async fn test_dom_marker_value_pattern() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.attributes.insert(
            "data-testid".to_string(),
            vec!["checkout-button".to_string(), "playwright-anchor".to_string()],
        );
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page.clone(), storage.clone()).collect().await;
    assert!(fingerprint
        .dom_markers
        .signals
        .iter()
        .any(|s| s.name == "dom_marker.data-testid"));

    // Ordinary test ids alone do not trip the marker
    page.configure(|f| {
        f.attributes
            .insert("data-testid".to_string(), vec!["checkout-button".to_string()]);
    });
    let fingerprint = collector(page, storage).collect().await;
    assert!(fingerprint.dom_markers.signals.is_empty());
}

#[tokio::test]
async fn test_comet_cached_positive() {
    let page = Arc::new(SimulatedPage::new());
    let storage = Arc::new(MemoryStorage::new());
    storage.write(COMET_DETECTED_KEY, "true").unwrap();

    let fingerprint = collector(page, storage).collect().await;

    assert!(fingerprint.comet_extension.detected);
    assert_eq!(
        fingerprint.comet_extension.signals[0].name,
        "comet.extension.cached"
    );
}

#[tokio::test]
async fn test_comet_script_scan() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.elements.push(ElementInfo {
            node: 1,
            tag: "script".to_string(),
            src: Some(format!(
                "chrome-extension://{}/content.js",
                COMET_EXTENSION_ID
            )),
            ..Default::default()
        });
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage.clone()).collect().await;

    assert!(fingerprint.comet_extension.detected);
    assert_eq!(
        fingerprint.comet_extension.signals[0].name,
        "comet.extension.script"
    );
    // Scan positives are not cached; only the resource probe caches
    assert!(storage.read(COMET_DETECTED_KEY).is_none());
}

#[tokio::test]
async fn test_comet_resource_probe_success_caches() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.extension_resources.insert(format!(
            "chrome-extension://{}/icon.png",
            COMET_EXTENSION_ID
        ));
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage.clone()).collect().await;

    assert!(fingerprint.comet_extension.detected);
    assert_eq!(
        fingerprint.comet_extension.signals[0].name,
        "comet.extension.resource_probe"
    );
    assert_eq!(storage.read(COMET_DETECTED_KEY).as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn test_comet_resource_probe_timeout() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        // The resource would load, but not before the probe deadline.
        f.resource_probe_delay_ms = 1_500;
        f.extension_resources.insert(format!(
            "chrome-extension://{}/icon.png",
            COMET_EXTENSION_ID
        ));
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage.clone()).collect().await;

    assert!(!fingerprint.comet_extension.detected);
    assert!(storage.read(COMET_DETECTED_KEY).is_none());
}

#[tokio::test]
async fn test_network_target_probe() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.resources
            .push("https://www.perplexity.ai/rest/sse/answers".to_string());
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page, storage).collect().await;

    assert!(fingerprint
        .perplexity_network
        .signals
        .iter()
        .any(|s| s.name == "network.perplexity_agent" && s.weight == 9));
}

#[tokio::test]
async fn test_canvas_short_data_and_error() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.canvas_data_url = Some("data:image/png;base64,AAAA".to_string());
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page.clone(), storage.clone()).collect().await;
    assert!(fingerprint
        .canvas
        .anomalies
        .iter()
        .any(|s| s.name == "canvas.data.short" && s.weight == 6));
    assert!(fingerprint.canvas.hash.is_some());

    page.configure(|f| f.canvas_data_url = None);
    let fingerprint = collector(page, storage).collect().await;
    assert!(fingerprint
        .canvas
        .anomalies
        .iter()
        .any(|s| s.name == "canvas.error" && s.weight == 5));
    assert!(fingerprint.canvas.hash.is_none());
}

#[tokio::test]
async fn test_webgl_software_renderer() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.webgl = Some(crate::host::WebglInfo {
            vendor: "Google Inc.".to_string(),
            renderer: "Google SwiftShader".to_string(),
        });
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = collector(page.clone(), storage.clone()).collect().await;
    assert!(fingerprint
        .webgl
        .anomalies
        .iter()
        .any(|s| s.name == "webgl.software_renderer" && s.weight == 8));

    page.configure(|f| f.webgl = None);
    let fingerprint = collector(page, storage).collect().await;
    assert!(fingerprint
        .webgl
        .anomalies
        .iter()
        .any(|s| s.name == "webgl.missing" && s.weight == 5));
}

#[test]
fn test_normalize_score() {
    assert_eq!(normalize_score(0, 0), 0);
    // One weight-10 signal against the 50 floor
    assert_eq!(normalize_score(10, 1), 20);
    // Six signals: denominator is count*10
    assert_eq!(normalize_score(30, 6), 50);
    // Saturation
    assert_eq!(normalize_score(500, 5), 100);
}
