//! Static registries of automation artifacts and known extensions

use once_cell::sync::Lazy;
use regex::Regex;

/// Chrome Web Store ID of the Comet agent extension
pub const COMET_EXTENSION_ID: &str = "npclhjbddhklpbnacpjloidibaggcgon";

/// Tab-storage key holding a prior positive Comet identification
pub const COMET_DETECTED_KEY: &str = "agentdetect_comet_detected";

/// Resource paths probed inside the Comet extension package
pub const COMET_RESOURCE_PATHS: &[&str] = &[
    "icon.png",
    "icons/icon-16.png",
    "icons/icon-128.png",
    "assets/logo.png",
];

/// Window globals left behind by automation frameworks
pub const AUTOMATION_GLOBALS: &[(&str, u32)] = &[
    // Selenium / WebDriver
    ("_selenium", 10),
    ("callSelenium", 10),
    ("_Selenium_IDE_Recorder", 10),
    ("__selenium_evaluate", 9),
    ("__selenium_unwrapped", 9),
    ("__webdriver_evaluate", 9),
    ("__webdriver_script_fn", 9),
    ("__webdriver_script_func", 9),
    ("__webdriver_script_function", 9),
    ("__driver_evaluate", 9),
    ("__fxdriver_evaluate", 9),
    ("__fxdriver_unwrapped", 9),
    ("_WEBDRIVER_ELEM_CACHE", 9),
    // ChromeDriver leaks its command cache under a fixed prefix
    ("cdc_adoQpoasnfa76pfcZLmcfl_Array", 10),
    ("cdc_adoQpoasnfa76pfcZLmcfl_Promise", 10),
    ("cdc_adoQpoasnfa76pfcZLmcfl_Symbol", 10),
    ("$cdc_asdjflasutopfhvcZLmcfl_", 10),
    // PhantomJS / SlimerJS / Nightmare
    ("_phantom", 10),
    ("callPhantom", 10),
    ("phantom", 8),
    ("__nightmare", 9),
    // Puppeteer / Playwright init hooks
    ("__puppeteer_evaluation_script__", 9),
    ("__pwInitScripts", 9),
    ("__playwright_evaluation_script__", 9),
    // iMacros
    ("iMacros", 7),
    ("imns", 7),
    // User-script managers
    ("GM_info", 5),
    ("unsafeWindow", 5),
];

/// Globals exposed by in-page AI agent runtimes
pub const AGENT_RUNTIME_GLOBALS: &[(&str, u32)] = &[
    ("__mcpClient", 8),
    ("__mcpBridge", 8),
    ("__MCP_CONTEXT__", 8),
    ("__claudeAgent", 9),
    ("claudeOverlay", 9),
];

/// Document own-property names planted by ChromeDriver-family drivers
pub static DOC_PROPERTY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\$?cdc_|_cdc_|\$chrome_asyncScriptInfo)").expect("valid regex"));

pub const DOC_PROPERTY_WEIGHT: u32 = 10;

/// Headless browser user agent brands
pub static HEADLESS_UA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HeadlessChrome|PhantomJS|SlimerJS").expect("valid regex"));

/// Software WebGL renderers used by headless environments
pub static WEBGL_SOFTWARE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SwiftShader|llvmpipe|Mesa|Software").expect("valid regex"));

/// Network targets of the Comet agent backend
pub static AGENT_NETWORK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"perplexity\.ai/(agent|rest/sse)").expect("valid regex"));

/// A known helper or agent extension
pub struct KnownExtension {
    /// Stable signal suffix
    pub name: &'static str,
    /// Substring looked for in element class/id attributes
    pub marker: &'static str,
    /// Pattern matched against chrome-extension:// stylesheet URLs
    pub resource_pattern: &'static str,
    pub weight: u32,
}

/// Registry of extensions that inject answer/assistant UI into pages
pub static KNOWN_EXTENSIONS: &[KnownExtension] = &[
    KnownExtension { name: "comet", marker: "comet-assistant", resource_pattern: "npclhjbddhklpbnacpjloidibaggcgon", weight: 10 },
    KnownExtension { name: "brainly", marker: "brainly", resource_pattern: "brainly", weight: 9 },
    KnownExtension { name: "chegg", marker: "chegg", resource_pattern: "chegg", weight: 9 },
    KnownExtension { name: "coursehero", marker: "course-hero", resource_pattern: "coursehero", weight: 9 },
    KnownExtension { name: "quizlet", marker: "quizlet-helper", resource_pattern: "quizlet", weight: 8 },
    KnownExtension { name: "photomath", marker: "photomath", resource_pattern: "photomath", weight: 8 },
    KnownExtension { name: "socratic", marker: "socratic", resource_pattern: "socratic", weight: 8 },
    KnownExtension { name: "symbolab", marker: "symbolab", resource_pattern: "symbolab", weight: 7 },
    KnownExtension { name: "mathway", marker: "mathway", resource_pattern: "mathway", weight: 7 },
    KnownExtension { name: "transcript_solver", marker: "answer-transcript", resource_pattern: "transcript-solver", weight: 8 },
    KnownExtension { name: "sider", marker: "sider-chat", resource_pattern: "sider", weight: 8 },
    KnownExtension { name: "monica", marker: "monica-widget", resource_pattern: "monica", weight: 8 },
    KnownExtension { name: "merlin", marker: "merlin-addon", resource_pattern: "merlin", weight: 8 },
    KnownExtension { name: "maxai", marker: "max-ai", resource_pattern: "maxai", weight: 8 },
    KnownExtension { name: "harpa", marker: "harpa", resource_pattern: "harpa", weight: 8 },
    KnownExtension { name: "wiseone", marker: "wiseone", resource_pattern: "wiseone", weight: 7 },
    KnownExtension { name: "chatgpt_sidebar", marker: "chatgpt-sidebar", resource_pattern: "chatgpt", weight: 8 },
    KnownExtension { name: "compose_ai", marker: "compose-ai", resource_pattern: "compose", weight: 6 },
    KnownExtension { name: "grammarly", marker: "grammarly", resource_pattern: "grammarly", weight: 5 },
    KnownExtension { name: "copyai", marker: "copy-ai", resource_pattern: "copyai", weight: 6 },
];

/// A DOM attribute planted by test or automation tooling
pub struct DomMarker {
    pub attribute: &'static str,
    pub weight: u32,
    /// When set, the attribute only counts if a value matches
    pub value_pattern: Option<&'static str>,
}

/// Attributes worth checking on any page
pub static DOM_MARKERS: &[DomMarker] = &[
    DomMarker { attribute: "data-selenium", weight: 8, value_pattern: None },
    DomMarker { attribute: "data-selenium-id", weight: 8, value_pattern: None },
    DomMarker { attribute: "webdriver", weight: 9, value_pattern: None },
    DomMarker { attribute: "data-automated", weight: 6, value_pattern: None },
    // data-testid is ubiquitous in hand-written frontends; only flag values
    // that name an automation framework
    DomMarker {
        attribute: "data-testid",
        weight: 7,
        value_pattern: Some(r"^(selenium|cypress|playwright)"),
    },
];

pub static DOM_MARKER_VALUE_PATTERNS: Lazy<Vec<Option<Regex>>> = Lazy::new(|| {
    DOM_MARKERS
        .iter()
        .map(|m| m.value_pattern.map(|p| Regex::new(p).expect("valid regex")))
        .collect()
});
