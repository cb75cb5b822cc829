//! Configuration management for agentdetect

use crate::Result;
use serde::{Deserialize, Serialize};

/// Detection engine configuration
///
/// All fields are optional on the wire; absent fields fall back to the
/// defaults below. The host hands the engine a partial options object at
/// `init` time and the engine never reads configuration from anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Master switch; when false `init` is a no-op
    pub enabled: bool,

    /// Periodic reporting period in milliseconds
    pub report_interval: u64,

    /// Combined score below which reports are suppressed
    pub min_report_score: u32,

    /// Opaque integer identifier scoping tab-persistent storage
    pub context_id: Option<i64>,

    /// Opaque token attached to every report for server-side validation.
    /// When absent, all reports are suppressed.
    pub session_key: Option<String>,

    /// Emit diagnostic traces
    pub debug: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_interval: 30_000,
            min_report_score: 10,
            context_id: None,
            session_key: None,
            debug: false,
        }
    }
}

impl DetectorConfig {
    /// Merge host-supplied partial options over the defaults
    ///
    /// Unknown fields are ignored; a malformed value for a known field is a
    /// configuration error.
    pub fn from_options(options: serde_json::Value) -> Result<Self> {
        let config = serde_json::from_value(options)?;
        Ok(config)
    }
}
