//! Detection engine lifecycle

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::report::{CombinedReport, FingerprintReport, UnloadReport};
use super::verdict::{combined_score, Verdict};
use crate::analyzer::{extract_agent_signals, AgentAssessment, AnalysisReport, Analyzer};
use crate::config::DetectorConfig;
use crate::fingerprint::{Fingerprint, FingerprintCollector};
use crate::host::{HostPage, PageEvent, ReportTransport, SignalReport, SignalType, TabStorage};
use crate::injection::{InjectionAnalysis, InjectionObserver};
use crate::recorder::EventRecorder;

/// Tab-storage key for session-id continuity
pub(crate) const SESSION_KEY: &str = "agentdetect_session";
/// A session id is reused across page loads for at most this long
pub(crate) const SESSION_MAX_AGE_MS: i64 = 30 * 60 * 1000;
/// Reported agent identifier
const AGENT_NAME: &str = "comet_agentic";

/// Persisted session-id record
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    id: String,
    timestamp: i64,
}

/// Result of one full detection pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub fingerprint: Fingerprint,
    pub interaction: AnalysisReport,
    pub injection: InjectionAnalysis,
    pub comet: AgentAssessment,
    pub combined_score: u32,
    pub verdict: Verdict,
    pub detected_agent: Option<String>,
    /// Whether a combined report was actually shipped
    pub reported: bool,
}

/// The detection engine
///
/// One engine per observed page context. `init` wires everything up,
/// `shutdown` tears it down; both are idempotent. Every public entry point
/// degrades instead of failing: probe, storage and transport errors are
/// contained and logged at debug level.
pub struct DetectionEngine {
    /// Self-reference handed to spawned tasks so they never keep the
    /// engine alive on their own
    weak: Weak<DetectionEngine>,
    page: Arc<dyn HostPage>,
    storage: Arc<dyn TabStorage>,
    transport: Arc<dyn ReportTransport>,
    config: RwLock<DetectorConfig>,
    session_id: RwLock<Option<String>>,
    recorder: Arc<EventRecorder>,
    analyzer: Analyzer,
    observer: Arc<InjectionObserver>,
    collector: Arc<FingerprintCollector>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl DetectionEngine {
    /// Create an engine over the given host bindings
    pub fn new(
        page: Arc<dyn HostPage>,
        storage: Arc<dyn TabStorage>,
        transport: Arc<dyn ReportTransport>,
    ) -> Arc<Self> {
        let start_time = chrono::Utc::now().timestamp_millis() as f64;

        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            recorder: Arc::new(EventRecorder::new(
                page.clone(),
                storage.clone(),
                start_time,
            )),
            analyzer: Analyzer::new(),
            observer: Arc::new(InjectionObserver::new(page.clone())),
            collector: Arc::new(FingerprintCollector::new(page.clone(), storage.clone())),
            page,
            storage,
            transport,
            config: RwLock::new(DetectorConfig::default()),
            session_id: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
        })
    }

    /// Initialize the engine with host-supplied options; idempotent
    ///
    /// Does nothing when the configuration disables the engine. Emits an
    /// immediate fingerprint-only report when the first collection already
    /// crosses the reporting threshold.
    pub async fn init(&self, options: serde_json::Value) {
        if self.initialized.load(Ordering::Acquire) {
            return;
        }

        let config = match DetectorConfig::from_options(options) {
            Ok(config) => config,
            Err(e) => {
                debug!("Invalid detector options, using defaults: {}", e);
                DetectorConfig::default()
            }
        };

        if !config.enabled {
            return;
        }

        if config.session_key.is_none() {
            debug!("No session key configured; all reports will be suppressed");
        }

        self.initialized.store(true, Ordering::Release);

        let session_id = restore_or_create_session(self.storage.as_ref());
        *self.session_id.write().expect("session lock poisoned") = Some(session_id.clone());

        let context_id = config.context_id;
        let debug_enabled = config.debug;
        let report_interval = config.report_interval;
        let min_report_score = config.min_report_score;
        *self.config.write().expect("config lock poisoned") = config;

        info!(session = %session_id, "Detection engine starting");

        self.recorder.start_monitoring(context_id);
        self.observer.start_monitoring(debug_enabled);

        let fingerprint = self.collector.collect().await;
        if fingerprint.score >= min_report_score {
            let payload = FingerprintReport {
                session_id: session_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                page_url: self.page.page_url(),
                page_title: self.page.page_title(),
                fingerprint,
            };
            self.ship(SignalType::Fingerprint, &payload).await;
        }

        let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
        tasks.push(spawn_periodic(self.weak.clone(), report_interval));
        tasks.push(spawn_lifecycle(self.weak.clone(), self.page.events()));
    }

    /// Run a full detection pass and ship a combined report when warranted
    pub async fn collect_and_report(&self) -> DetectionResult {
        let fingerprint = self.collector.collect().await;
        let interaction = self.analyzer.analyze(&self.recorder);
        let injection = self.observer.analyze();

        let agent_signals = extract_agent_signals(&interaction.anomalies, &fingerprint, &injection);
        let comet = AgentAssessment::from_signals(agent_signals);

        let score = combined_score(
            interaction.score,
            injection.score,
            fingerprint.score,
            comet.score,
        );
        let verdict = Verdict::from_score(score);
        let detected_agent = comet.detected.then(|| AGENT_NAME.to_string());

        let result = DetectionResult {
            fingerprint,
            interaction,
            injection,
            comet,
            combined_score: score,
            verdict,
            detected_agent,
            reported: false,
        };

        let min_report_score = self
            .config
            .read()
            .expect("config lock poisoned")
            .min_report_score;

        let reported = if score >= min_report_score {
            self.ship(SignalType::Combined, &report_body(&result, self)).await
        } else {
            false
        };

        DetectionResult { reported, ..result }
    }

    /// Externally-triggerable detection pass
    pub async fn run_analysis(&self) -> DetectionResult {
        self.collect_and_report().await
    }

    /// Stop timers, listeners and monitoring; idempotent
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().expect("tasks lock poisoned").drain(..) {
            task.abort();
        }

        self.recorder.stop_monitoring();
        self.observer.stop_monitoring();
        *self.session_id.write().expect("session lock poisoned") = None;

        if self.initialized.swap(false, Ordering::AcqRel) {
            info!("Detection engine stopped");
        }
    }

    /// Whether `init` has completed with an enabled configuration
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current session identifier, when initialized
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .expect("session lock poisoned")
            .clone()
    }

    /// Shared event recorder handle
    pub fn recorder(&self) -> Arc<EventRecorder> {
        self.recorder.clone()
    }

    /// Serialize and post one report; failures are logged, never raised
    async fn ship<T: Serialize>(&self, signal_type: SignalType, body: &T) -> bool {
        let Some(payload) = self.signal_report(signal_type, body) else {
            return false;
        };

        match self.transport.send_report(&payload).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Report delivery failed: {}", e);
                false
            }
        }
    }

    fn signal_report<T: Serialize>(
        &self,
        signal_type: SignalType,
        body: &T,
    ) -> Option<SignalReport> {
        let config = self.config.read().expect("config lock poisoned");

        let Some(sesskey) = config.session_key.clone() else {
            debug!("Suppressing {:?} report: no session key", signal_type);
            return None;
        };

        let signaldata = match serde_json::to_string(body) {
            Ok(json) => json,
            Err(e) => {
                debug!("Could not serialize report body: {}", e);
                return None;
            }
        };

        Some(SignalReport {
            sesskey,
            contextid: config.context_id.unwrap_or(0),
            sessionid: self.session_id().unwrap_or_default(),
            signaltype: signal_type,
            signaldata,
        })
    }

    async fn on_visibility_hidden(&self) {
        debug!("Page hidden; running detection pass");
        self.collect_and_report().await;
    }

    async fn on_before_unload(&self) {
        self.recorder.save_snapshot();

        let body = UnloadReport {
            session_id: self.session_id().unwrap_or_default(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            page_url: self.page.page_url(),
        };

        let Some(payload) = self.signal_report(SignalType::Unload, &body) else {
            return;
        };

        if let Err(e) = self.transport.send_beacon(&payload).await {
            debug!("Unload beacon failed: {}", e);
        }
    }
}

fn report_body(result: &DetectionResult, engine: &DetectionEngine) -> CombinedReport {
    CombinedReport {
        session_id: engine.session_id().unwrap_or_default(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        page_url: engine.page.page_url(),
        page_title: engine.page.page_title(),
        fingerprint: result.fingerprint.clone(),
        interaction: result.interaction.clone(),
        injection: result.injection.clone(),
        comet: result.comet.clone(),
        combined_score: result.combined_score,
        verdict: result.verdict,
        detected_agent: result.detected_agent.clone(),
    }
}

fn spawn_periodic(engine: Weak<DetectionEngine>, interval_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_millis(interval_ms.max(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            ticker.tick().await;
            let Some(engine) = engine.upgrade() else {
                break;
            };
            engine.collect_and_report().await;
        }
    })
}

fn spawn_lifecycle(
    engine: Weak<DetectionEngine>,
    mut rx: tokio::sync::broadcast::Receiver<PageEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };

            let Some(engine) = engine.upgrade() else {
                break;
            };

            match event {
                PageEvent::VisibilityHidden => engine.on_visibility_hidden().await,
                PageEvent::BeforeUnload => engine.on_before_unload().await,
                _ => {}
            }
        }
    })
}

/// Restore the tab's session id when it is still fresh, otherwise mint one
pub(crate) fn restore_or_create_session(storage: &dyn TabStorage) -> String {
    let now = chrono::Utc::now().timestamp_millis();

    if let Some(raw) = storage.read(SESSION_KEY) {
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) if now - stored.timestamp <= SESSION_MAX_AGE_MS => {
                debug!(session = %stored.id, "Reusing session id");
                return stored.id;
            }
            Ok(_) => debug!("Stored session expired; generating a new id"),
            Err(e) => warn!("Unreadable session record: {}", e),
        }
    }

    let id = generate_session_id(now);
    let record = StoredSession {
        id: id.clone(),
        timestamp: now,
    };

    if let Ok(json) = serde_json::to_string(&record) {
        if storage.write(SESSION_KEY, &json).is_err() {
            debug!("Could not persist session id");
        }
    }

    id
}

/// Session ids are `<time36>-<rand>`: millisecond timestamp in base 36 plus
/// a short random alphanumeric suffix
pub(crate) fn generate_session_id(now_ms: i64) -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| {
            let digit = rng.gen_range(0..36u32);
            char::from_digit(digit, 36).expect("digit in radix range")
        })
        .collect();

    format!("{}-{}", to_base36(now_ms.max(0) as u64), suffix)
}

pub(crate) fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(char::from_digit((n % 36) as u32, 36).expect("digit in radix range"));
        n /= 36;
    }
    digits.iter().rev().collect()
}
