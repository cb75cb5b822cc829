//! Host environment traits
//!
//! This module defines the abstract interfaces between the engine and the
//! page it observes: DOM and runtime queries, the tab-scoped persistent
//! store, and the outbound report transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::events::{ElementInfo, PageEvent};
use crate::Result;

// ============================================================================
// Host Page
// ============================================================================

/// Navigator runtime snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorInfo {
    pub user_agent: String,
    pub platform: String,
    pub languages: Vec<String>,
    pub plugins_count: u32,
    pub hardware_concurrency: u32,
    pub device_memory: Option<f64>,
    pub max_touch_points: u32,
    pub cookie_enabled: bool,
    pub do_not_track: Option<String>,
    pub webdriver: bool,
    /// Whether the `chrome` global object exists
    #[serde(skip)]
    pub has_chrome_object: bool,
    /// Whether the connection API is exposed
    #[serde(skip)]
    pub has_connection_api: bool,
}

/// Window and screen dimensions
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// WebGL debug renderer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebglInfo {
    pub vendor: String,
    pub renderer: String,
}

/// Host page interface
///
/// One live page context. All queries are cheap reads of already-materialized
/// page state; `load_extension_resource` is the single genuinely asynchronous
/// operation (it drives an image load on the host side).
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Subscribe to the page event stream
    fn events(&self) -> broadcast::Receiver<PageEvent>;

    /// Current page URL
    fn page_url(&self) -> String;

    /// Current page title
    fn page_title(&self) -> String;

    /// Navigator runtime snapshot
    fn navigator(&self) -> NavigatorInfo;

    /// Window and screen dimensions
    fn window_metrics(&self) -> WindowMetrics;

    /// `navigator.webdriver` as captured when page scripts first ran,
    /// if the host captured it
    fn initial_webdriver(&self) -> Option<bool>;

    /// Whether the `webdriver` property getter still reports native code
    fn webdriver_getter_is_native(&self) -> bool;

    /// Whether a global with the given name exists on the window
    fn has_global(&self, name: &str) -> bool;

    /// Own property names of the document object
    fn document_property_names(&self) -> Vec<String>;

    /// Descriptors for every element under `document.body`
    fn scan_elements(&self) -> Vec<ElementInfo>;

    /// Number of elements carrying the given attribute
    fn count_attribute(&self, attr: &str) -> usize;

    /// All values of the given attribute across the document
    fn attribute_values(&self, attr: &str) -> Vec<String>;

    /// URLs of all document stylesheets
    fn stylesheet_urls(&self) -> Vec<String>;

    /// Resource entry names from the performance timeline
    fn resource_entries(&self) -> Vec<String>;

    /// Render the probe canvas and return its data URL
    fn canvas_data_url(&self) -> Result<String>;

    /// WebGL vendor and unmasked renderer, if WebGL is available
    fn webgl_info(&self) -> Option<WebglInfo>;

    /// Attempt to load a resource at the given URL, reporting success
    async fn load_extension_resource(&self, url: &str) -> bool;
}

// ============================================================================
// Tab Storage
// ============================================================================

/// Tab-scoped persistent store
///
/// The only non-DOM impure dependency. Writes are best-effort: callers
/// swallow errors so a broken store is indistinguishable from an empty one.
pub trait TabStorage: Send + Sync {
    /// Read a value, or None when absent or unavailable
    fn read(&self, key: &str) -> Option<String>;

    /// Write a value (best-effort)
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// Report Transport
// ============================================================================

/// Signal type discriminator on the reporting RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Fingerprint,
    Combined,
    Unload,
}

/// Outbound report payload
///
/// Field names follow the backend's wire format exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    pub sesskey: String,
    pub contextid: i64,
    pub sessionid: String,
    pub signaltype: SignalType,
    /// JSON-stringified report body
    pub signaldata: String,
}

/// Outbound transport to the backend sink
///
/// Both paths are best-effort; the engine logs failures at debug level and
/// never propagates them.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Post a report over the signed RPC endpoint
    async fn send_report(&self, payload: &SignalReport) -> Result<()>;

    /// Post a minimal payload over the unload beacon endpoint
    async fn send_beacon(&self, payload: &SignalReport) -> Result<()>;
}
