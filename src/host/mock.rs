//! Simulated host implementations for testing
//!
//! `SimulatedPage` plays back a configurable page fixture and lets tests
//! feed synthetic input events into the engine; `MemoryStorage` and
//! `MockTransport` stand in for the tab store and the backend sink.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::events::{ElementInfo, PageEvent};
use super::traits::{
    HostPage, NavigatorInfo, ReportTransport, SignalReport, TabStorage, WebglInfo, WindowMetrics,
};
use crate::{Error, Result};

/// Configurable state behind a `SimulatedPage`
#[derive(Debug, Clone)]
pub struct PageFixture {
    pub url: String,
    pub title: String,
    pub navigator: NavigatorInfo,
    pub metrics: WindowMetrics,
    pub initial_webdriver: Option<bool>,
    pub webdriver_getter_native: bool,
    pub globals: HashSet<String>,
    pub document_properties: Vec<String>,
    pub elements: Vec<ElementInfo>,
    /// attribute name -> values present in the document
    pub attributes: HashMap<String, Vec<String>>,
    pub stylesheets: Vec<String>,
    pub resources: Vec<String>,
    /// None simulates a canvas probe failure
    pub canvas_data_url: Option<String>,
    pub webgl: Option<WebglInfo>,
    /// Extension resource URLs that load successfully
    pub extension_resources: HashSet<String>,
    /// Artificial latency for extension resource loads
    pub resource_probe_delay_ms: u64,
}

impl Default for PageFixture {
    fn default() -> Self {
        // A plain desktop Chrome session with nothing suspicious about it.
        Self {
            url: "https://example.edu/mod/quiz/attempt.php?attempt=91".to_string(),
            title: "Quiz attempt".to_string(),
            navigator: NavigatorInfo {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                    .to_string(),
                platform: "Win32".to_string(),
                languages: vec!["en-US".to_string(), "en".to_string()],
                plugins_count: 3,
                hardware_concurrency: 8,
                device_memory: Some(8.0),
                max_touch_points: 0,
                cookie_enabled: true,
                do_not_track: None,
                webdriver: false,
                has_chrome_object: true,
                has_connection_api: true,
            },
            metrics: WindowMetrics {
                outer_width: 1920,
                outer_height: 1040,
                screen_width: 1920,
                screen_height: 1080,
            },
            initial_webdriver: Some(false),
            webdriver_getter_native: true,
            globals: HashSet::new(),
            document_properties: vec!["location".to_string(), "title".to_string()],
            elements: Vec::new(),
            attributes: HashMap::new(),
            stylesheets: vec!["https://example.edu/theme/styles.css".to_string()],
            resources: Vec::new(),
            canvas_data_url: Some(format!(
                "data:image/png;base64,{}",
                "iVBORw0KGgoAAAANSUhEUg".repeat(64)
            )),
            webgl: Some(WebglInfo {
                vendor: "Google Inc. (NVIDIA)".to_string(),
                renderer: "ANGLE (NVIDIA GeForce RTX 3070 Direct3D11 vs_5_0 ps_5_0)".to_string(),
            }),
            extension_resources: HashSet::new(),
            resource_probe_delay_ms: 0,
        }
    }
}

/// Simulated host page
pub struct SimulatedPage {
    tx: broadcast::Sender<PageEvent>,
    fixture: RwLock<PageFixture>,
}

impl SimulatedPage {
    /// Create a simulated page with the default benign fixture
    pub fn new() -> Self {
        Self::with_fixture(PageFixture::default())
    }

    /// Create a simulated page from a prepared fixture
    pub fn with_fixture(fixture: PageFixture) -> Self {
        let (tx, _rx) = broadcast::channel(4096);
        Self {
            tx,
            fixture: RwLock::new(fixture),
        }
    }

    /// Feed an event into the page stream
    ///
    /// Events emitted before any subscriber attaches are dropped, matching
    /// how real listeners miss events dispatched before registration.
    pub fn emit(&self, event: PageEvent) {
        let _ = self.tx.send(event);
    }

    /// Mutate the underlying fixture
    pub fn configure<F: FnOnce(&mut PageFixture)>(&self, f: F) {
        let mut fixture = self.fixture.write().expect("fixture lock poisoned");
        f(&mut fixture);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PageFixture> {
        self.fixture.read().expect("fixture lock poisoned")
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostPage for SimulatedPage {
    fn events(&self) -> broadcast::Receiver<PageEvent> {
        self.tx.subscribe()
    }

    fn page_url(&self) -> String {
        self.read().url.clone()
    }

    fn page_title(&self) -> String {
        self.read().title.clone()
    }

    fn navigator(&self) -> NavigatorInfo {
        self.read().navigator.clone()
    }

    fn window_metrics(&self) -> WindowMetrics {
        self.read().metrics
    }

    fn initial_webdriver(&self) -> Option<bool> {
        self.read().initial_webdriver
    }

    fn webdriver_getter_is_native(&self) -> bool {
        self.read().webdriver_getter_native
    }

    fn has_global(&self, name: &str) -> bool {
        self.read().globals.contains(name)
    }

    fn document_property_names(&self) -> Vec<String> {
        self.read().document_properties.clone()
    }

    fn scan_elements(&self) -> Vec<ElementInfo> {
        self.read().elements.clone()
    }

    fn count_attribute(&self, attr: &str) -> usize {
        self.read().attributes.get(attr).map_or(0, |v| v.len())
    }

    fn attribute_values(&self, attr: &str) -> Vec<String> {
        self.read().attributes.get(attr).cloned().unwrap_or_default()
    }

    fn stylesheet_urls(&self) -> Vec<String> {
        self.read().stylesheets.clone()
    }

    fn resource_entries(&self) -> Vec<String> {
        self.read().resources.clone()
    }

    fn canvas_data_url(&self) -> Result<String> {
        self.read()
            .canvas_data_url
            .clone()
            .ok_or_else(|| Error::probe("canvas context unavailable"))
    }

    fn webgl_info(&self) -> Option<WebglInfo> {
        self.read().webgl.clone()
    }

    async fn load_extension_resource(&self, url: &str) -> bool {
        let (delay, hit) = {
            let fixture = self.read();
            (
                fixture.resource_probe_delay_ms,
                fixture.extension_resources.contains(url),
            )
        };

        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        hit
    }
}

/// In-memory tab storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail, to exercise best-effort semantics
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl TabStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.map.read().ok()?.get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::storage("quota exceeded"));
        }

        self.map
            .write()
            .map_err(|e| Error::storage(format!("lock error: {}", e)))?
            .insert(key.to_string(), value.to_string());

        Ok(())
    }
}

/// Transport double that records everything it is asked to send
#[derive(Debug, Default)]
pub struct MockTransport {
    reports: Mutex<Vec<SignalReport>>,
    beacons: Mutex<Vec<SignalReport>>,
    fail: AtomicBool,
}

impl MockTransport {
    /// Create a new recording transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Reports sent so far
    pub fn reports(&self) -> Vec<SignalReport> {
        self.reports.lock().expect("reports lock poisoned").clone()
    }

    /// Beacons sent so far
    pub fn beacons(&self) -> Vec<SignalReport> {
        self.beacons.lock().expect("beacons lock poisoned").clone()
    }
}

#[async_trait]
impl ReportTransport for MockTransport {
    async fn send_report(&self, payload: &SignalReport) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::transport("connection refused"));
        }

        self.reports
            .lock()
            .expect("reports lock poisoned")
            .push(payload.clone());
        Ok(())
    }

    async fn send_beacon(&self, payload: &SignalReport) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::transport("connection refused"));
        }

        self.beacons
            .lock()
            .expect("beacons lock poisoned")
            .push(payload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_page_event_stream() {
        let page = SimulatedPage::new();
        let mut rx = page.events();

        page.emit(PageEvent::MouseMove {
            x: 10.0,
            y: 20.0,
            time: 100.0,
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, PageEvent::MouseMove { x, .. } if x == 10.0));
    }

    #[tokio::test]
    async fn test_resource_probe_respects_fixture() {
        let page = SimulatedPage::new();
        page.configure(|f| {
            f.extension_resources
                .insert("chrome-extension://abc/icon.png".to_string());
        });

        assert!(
            page.load_extension_resource("chrome-extension://abc/icon.png")
                .await
        );
        assert!(
            !page
                .load_extension_resource("chrome-extension://abc/missing.png")
                .await
        );
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.write("k", "v").unwrap();
        assert_eq!(storage.read("k").as_deref(), Some("v"));
        assert!(storage.read("missing").is_none());

        storage.set_fail_writes(true);
        assert!(storage.write("k2", "v2").is_err());
        assert!(storage.read("k2").is_none());
    }
}
