//! Outbound report payload shapes
//!
//! These structs serialize to the `signaldata` JSON body of the reporting
//! RPC; field names are part of the wire format.

use serde::{Deserialize, Serialize};

use super::verdict::Verdict;
use crate::analyzer::{AgentAssessment, AnalysisReport};
use crate::fingerprint::Fingerprint;
use crate::injection::InjectionAnalysis;

/// Full combined report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReport {
    pub session_id: String,
    pub timestamp: i64,
    pub page_url: String,
    pub page_title: String,
    pub fingerprint: Fingerprint,
    pub interaction: AnalysisReport,
    pub injection: InjectionAnalysis,
    pub comet: AgentAssessment,
    pub combined_score: u32,
    pub verdict: Verdict,
    pub detected_agent: Option<String>,
}

/// Immediate fingerprint-only report emitted at init
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintReport {
    pub session_id: String,
    pub timestamp: i64,
    pub page_url: String,
    pub page_title: String,
    pub fingerprint: Fingerprint,
}

/// Minimal payload shipped over the unload beacon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnloadReport {
    pub session_id: String,
    pub timestamp: i64,
    pub page_url: String,
}
